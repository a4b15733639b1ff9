use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::db::store::{CollectionStore, MovieChanges, NewMovie, NewWishlistItem};
use crate::error::{AppError, AppResult};
use crate::models::{Genre, Movie, PermissionLevel, SharingGrant, WishlistItem};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// PostgreSQL-backed implementation of the Persistence Gateway
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Row shapes. Raw gateway rows stay inside this module; everything leaving it
// is converted to the typed entities in `models`.
// ============================================================================

#[derive(sqlx::FromRow)]
struct MovieRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    year: Option<i32>,
    director: Option<String>,
    user_rating: Option<f64>,
    poster_url: Option<String>,
    watched: bool,
    watched_date: Option<NaiveDate>,
    notes: Option<String>,
    imdb_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MovieRow> for Movie {
    fn from(row: MovieRow) -> Self {
        Movie {
            id: row.id,
            owner_id: row.user_id,
            title: row.title,
            year: row.year,
            director: row.director,
            user_rating: row.user_rating,
            poster_url: row.poster_url,
            watched: row.watched,
            watched_date: row.watched_date,
            notes: row.notes,
            imdb_id: row.imdb_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MovieGenresRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    year: Option<i32>,
    director: Option<String>,
    user_rating: Option<f64>,
    poster_url: Option<String>,
    watched: bool,
    watched_date: Option<NaiveDate>,
    notes: Option<String>,
    imdb_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    genres: Vec<String>,
}

impl From<MovieGenresRow> for (Movie, Vec<String>) {
    fn from(row: MovieGenresRow) -> Self {
        let movie = Movie {
            id: row.id,
            owner_id: row.user_id,
            title: row.title,
            year: row.year,
            director: row.director,
            user_rating: row.user_rating,
            poster_url: row.poster_url,
            watched: row.watched,
            watched_date: row.watched_date,
            notes: row.notes,
            imdb_id: row.imdb_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        };
        (movie, row.genres)
    }
}

#[derive(sqlx::FromRow)]
struct GenreRow {
    id: i32,
    name: String,
}

impl From<GenreRow> for Genre {
    fn from(row: GenreRow) -> Self {
        Genre {
            id: row.id,
            name: row.name,
        }
    }
}

#[derive(sqlx::FromRow)]
struct GrantRow {
    id: Uuid,
    owner_id: Uuid,
    shared_with_id: Uuid,
    permission_level: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<GrantRow> for SharingGrant {
    type Error = AppError;

    fn try_from(row: GrantRow) -> Result<Self, Self::Error> {
        let permission_level = PermissionLevel::parse(&row.permission_level).ok_or_else(|| {
            AppError::Internal(format!(
                "Unknown permission level in grant {}: {}",
                row.id, row.permission_level
            ))
        })?;

        Ok(SharingGrant {
            id: row.id,
            owner_id: row.owner_id,
            shared_with_id: row.shared_with_id,
            permission_level,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct WishlistRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    year: Option<i32>,
    director: Option<String>,
    genres: Vec<String>,
    poster_url: Option<String>,
    imdb_id: Option<String>,
    imdb_rating: Option<f64>,
    added_date: DateTime<Utc>,
}

impl From<WishlistRow> for WishlistItem {
    fn from(row: WishlistRow) -> Self {
        WishlistItem {
            id: row.id,
            owner_id: row.user_id,
            title: row.title,
            year: row.year,
            director: row.director,
            genres: row.genres,
            poster_url: row.poster_url,
            imdb_id: row.imdb_id,
            imdb_rating: row.imdb_rating,
            added_date: row.added_date,
        }
    }
}

const MOVIE_COLUMNS: &str = "id, user_id, title, year, director, user_rating, poster_url, \
     watched, watched_date, notes, imdb_id, created_at, updated_at";

const MOVIES_WITH_GENRES: &str = r#"
SELECT m.id, m.user_id, m.title, m.year, m.director, m.user_rating,
       m.poster_url, m.watched, m.watched_date, m.notes, m.imdb_id,
       m.created_at, m.updated_at,
       COALESCE(
           array_agg(g.name ORDER BY g.id) FILTER (WHERE g.name IS NOT NULL),
           '{}'
       ) AS genres
FROM movies m
LEFT JOIN movie_genres mg ON mg.movie_id = m.id
LEFT JOIN genres g ON g.id = mg.genre_id
"#;

const MOVIES_ORDERING: &str = r#"
GROUP BY m.id
ORDER BY m.watched_date DESC NULLS LAST, m.created_at DESC
"#;

#[async_trait]
impl CollectionStore for PgStore {
    async fn insert_movie(&self, movie: NewMovie) -> AppResult<Movie> {
        let sql = format!(
            "INSERT INTO movies (user_id, title, year, director, user_rating, poster_url, \
             watched, watched_date, notes, imdb_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {MOVIE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, MovieRow>(&sql)
            .bind(movie.owner_id)
            .bind(&movie.title)
            .bind(movie.year)
            .bind(&movie.director)
            .bind(movie.user_rating)
            .bind(&movie.poster_url)
            .bind(movie.watched)
            .bind(movie.watched_date)
            .bind(&movie.notes)
            .bind(&movie.imdb_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn movie_by_id(&self, id: Uuid) -> AppResult<Option<Movie>> {
        let sql = format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1");
        let row = sqlx::query_as::<_, MovieRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Movie::from))
    }

    async fn movies_with_genres_by_owner(
        &self,
        owner_id: Uuid,
    ) -> AppResult<Vec<(Movie, Vec<String>)>> {
        let sql = format!("{MOVIES_WITH_GENRES} WHERE m.user_id = $1 {MOVIES_ORDERING}");
        let rows = sqlx::query_as::<_, MovieGenresRow>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn movies_with_genres_by_owners(
        &self,
        owner_ids: &[Uuid],
    ) -> AppResult<Vec<(Movie, Vec<String>)>> {
        let sql = format!("{MOVIES_WITH_GENRES} WHERE m.user_id = ANY($1) {MOVIES_ORDERING}");
        let rows = sqlx::query_as::<_, MovieGenresRow>(&sql)
            .bind(owner_ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_movie(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: MovieChanges,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE movies SET \
                 title = COALESCE($3, title), \
                 year = COALESCE($4, year), \
                 director = COALESCE($5, director), \
                 user_rating = COALESCE($6, user_rating), \
                 poster_url = COALESCE($7, poster_url), \
                 watched = COALESCE($8, watched), \
                 watched_date = COALESCE($9, watched_date), \
                 notes = COALESCE($10, notes), \
                 imdb_id = COALESCE($11, imdb_id), \
                 updated_at = now() \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(owner_id)
        .bind(&changes.title)
        .bind(changes.year)
        .bind(&changes.director)
        .bind(changes.user_rating)
        .bind(&changes.poster_url)
        .bind(changes.watched)
        .bind(changes.watched_date)
        .bind(&changes.notes)
        .bind(&changes.imdb_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_movie(&self, id: Uuid, owner_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM movies WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn genre_by_name(&self, name: &str) -> AppResult<Option<Genre>> {
        let row = sqlx::query_as::<_, GenreRow>("SELECT id, name FROM genres WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Genre::from))
    }

    async fn insert_genre(&self, name: &str) -> AppResult<Genre> {
        // Upsert keeps the global name-dedup invariant even when two creates
        // race on the same new genre.
        let row = sqlx::query_as::<_, GenreRow>(
            "INSERT INTO genres (name) VALUES ($1) \
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
             RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn link_genre(&self, movie_id: Uuid, genre_id: i32) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO movie_genres (movie_id, genre_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(movie_id)
        .bind(genre_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear_genres(&self, movie_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM movie_genres WHERE movie_id = $1")
            .bind(movie_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn insert_grant(
        &self,
        owner_id: Uuid,
        shared_with_id: Uuid,
        level: PermissionLevel,
    ) -> AppResult<SharingGrant> {
        let row = sqlx::query_as::<_, GrantRow>(
            "INSERT INTO collection_shares (owner_id, shared_with_id, permission_level) \
             VALUES ($1, $2, $3) \
             RETURNING id, owner_id, shared_with_id, permission_level, created_at",
        )
        .bind(owner_id)
        .bind(shared_with_id)
        .bind(level.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
                AppError::DuplicateGrant
            } else {
                AppError::Database(e)
            }
        })?;

        row.try_into()
    }

    async fn grants_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<SharingGrant>> {
        let rows = sqlx::query_as::<_, GrantRow>(
            "SELECT id, owner_id, shared_with_id, permission_level, created_at \
             FROM collection_shares WHERE owner_id = $1 ORDER BY created_at",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn grants_by_grantee(&self, shared_with_id: Uuid) -> AppResult<Vec<SharingGrant>> {
        let rows = sqlx::query_as::<_, GrantRow>(
            "SELECT id, owner_id, shared_with_id, permission_level, created_at \
             FROM collection_shares WHERE shared_with_id = $1 ORDER BY created_at",
        )
        .bind(shared_with_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn grant_between(
        &self,
        owner_id: Uuid,
        shared_with_id: Uuid,
    ) -> AppResult<Option<SharingGrant>> {
        let row = sqlx::query_as::<_, GrantRow>(
            "SELECT id, owner_id, shared_with_id, permission_level, created_at \
             FROM collection_shares WHERE owner_id = $1 AND shared_with_id = $2",
        )
        .bind(owner_id)
        .bind(shared_with_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn delete_grant(&self, owner_id: Uuid, shared_with_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM collection_shares WHERE owner_id = $1 AND shared_with_id = $2",
        )
        .bind(owner_id)
        .bind(shared_with_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn upsert_profile(&self, user_id: Uuid, username: &str, email: &str) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO profiles (id, username, email) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET username = EXCLUDED.username, \
             email = EXCLUDED.email",
        )
        .bind(user_id)
        .bind(username)
        .bind(email)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn user_id_by_email(&self, email: &str) -> AppResult<Option<Uuid>> {
        let id: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM profiles WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(id.map(|(id,)| id))
    }

    async fn email_by_user_id(&self, user_id: Uuid) -> AppResult<Option<String>> {
        let email: Option<(String,)> = sqlx::query_as("SELECT email FROM profiles WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(email.map(|(email,)| email))
    }

    async fn insert_wishlist_item(&self, item: NewWishlistItem) -> AppResult<WishlistItem> {
        let row = sqlx::query_as::<_, WishlistRow>(
            "INSERT INTO wishlist_items (user_id, title, year, director, genres, poster_url, \
             imdb_id, imdb_rating) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING id, user_id, title, year, director, genres, poster_url, imdb_id, \
             imdb_rating, added_date",
        )
        .bind(item.owner_id)
        .bind(&item.title)
        .bind(item.year)
        .bind(&item.director)
        .bind(&item.genres)
        .bind(&item.poster_url)
        .bind(&item.imdb_id)
        .bind(item.imdb_rating)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn wishlist_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<WishlistItem>> {
        let rows = sqlx::query_as::<_, WishlistRow>(
            "SELECT id, user_id, title, year, director, genres, poster_url, imdb_id, \
             imdb_rating, added_date \
             FROM wishlist_items WHERE user_id = $1 ORDER BY added_date DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn wishlist_item(&self, id: Uuid, owner_id: Uuid) -> AppResult<Option<WishlistItem>> {
        let row = sqlx::query_as::<_, WishlistRow>(
            "SELECT id, user_id, title, year, director, genres, poster_url, imdb_id, \
             imdb_rating, added_date \
             FROM wishlist_items WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn delete_wishlist_item(&self, id: Uuid, owner_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM wishlist_items WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
