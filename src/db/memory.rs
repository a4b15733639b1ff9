use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::store::{CollectionStore, MovieChanges, NewMovie, NewWishlistItem};
use crate::error::{AppError, AppResult};
use crate::models::{Genre, Movie, PermissionLevel, SharingGrant, WishlistItem};

#[derive(Debug, Clone)]
struct Profile {
    email: String,
    #[allow(dead_code)]
    username: String,
}

#[derive(Default)]
struct Inner {
    movies: HashMap<Uuid, Movie>,
    genres: HashMap<i32, Genre>,
    next_genre_id: i32,
    movie_genres: Vec<(Uuid, i32)>,
    grants: HashMap<Uuid, SharingGrant>,
    profiles: HashMap<Uuid, Profile>,
    wishlist: HashMap<Uuid, WishlistItem>,
}

/// In-process implementation of the Persistence Gateway.
///
/// Backs tests and local development; mirrors the ordering and uniqueness
/// behavior of the PostgreSQL store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn genres_of(&self, movie_id: Uuid) -> Vec<String> {
        let mut links: Vec<i32> = self
            .movie_genres
            .iter()
            .filter(|(m, _)| *m == movie_id)
            .map(|(_, g)| *g)
            .collect();
        links.sort_unstable();
        links
            .into_iter()
            .filter_map(|g| self.genres.get(&g).map(|genre| genre.name.clone()))
            .collect()
    }

    fn movies_for<F>(&self, predicate: F) -> Vec<(Movie, Vec<String>)>
    where
        F: Fn(&Movie) -> bool,
    {
        let mut movies: Vec<Movie> = self
            .movies
            .values()
            .filter(|m| predicate(m))
            .cloned()
            .collect();
        // Watched date descending, dateless movies last, then newest first.
        movies.sort_by(|a, b| match (b.watched_date, a.watched_date) {
            (Some(db), Some(da)) => db.cmp(&da).then(b.created_at.cmp(&a.created_at)),
            (Some(_), None) => std::cmp::Ordering::Greater,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (None, None) => b.created_at.cmp(&a.created_at),
        });
        movies
            .into_iter()
            .map(|m| {
                let genres = self.genres_of(m.id);
                (m, genres)
            })
            .collect()
    }
}

#[async_trait]
impl CollectionStore for MemoryStore {
    async fn insert_movie(&self, movie: NewMovie) -> AppResult<Movie> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        let record = Movie {
            id: Uuid::new_v4(),
            owner_id: movie.owner_id,
            title: movie.title,
            year: movie.year,
            director: movie.director,
            user_rating: movie.user_rating,
            poster_url: movie.poster_url,
            watched: movie.watched,
            watched_date: movie.watched_date,
            notes: movie.notes,
            imdb_id: movie.imdb_id,
            created_at: now,
            updated_at: now,
        };
        inner.movies.insert(record.id, record.clone());
        Ok(record)
    }

    async fn movie_by_id(&self, id: Uuid) -> AppResult<Option<Movie>> {
        let inner = self.inner.lock().await;
        Ok(inner.movies.get(&id).cloned())
    }

    async fn movies_with_genres_by_owner(
        &self,
        owner_id: Uuid,
    ) -> AppResult<Vec<(Movie, Vec<String>)>> {
        let inner = self.inner.lock().await;
        Ok(inner.movies_for(|m| m.owner_id == owner_id))
    }

    async fn movies_with_genres_by_owners(
        &self,
        owner_ids: &[Uuid],
    ) -> AppResult<Vec<(Movie, Vec<String>)>> {
        let inner = self.inner.lock().await;
        Ok(inner.movies_for(|m| owner_ids.contains(&m.owner_id)))
    }

    async fn update_movie(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: MovieChanges,
    ) -> AppResult<u64> {
        let mut inner = self.inner.lock().await;
        let Some(movie) = inner.movies.get_mut(&id).filter(|m| m.owner_id == owner_id) else {
            return Ok(0);
        };

        if let Some(title) = changes.title {
            movie.title = title;
        }
        if let Some(year) = changes.year {
            movie.year = Some(year);
        }
        if let Some(director) = changes.director {
            movie.director = Some(director);
        }
        if let Some(rating) = changes.user_rating {
            movie.user_rating = Some(rating);
        }
        if let Some(poster_url) = changes.poster_url {
            movie.poster_url = Some(poster_url);
        }
        if let Some(watched) = changes.watched {
            movie.watched = watched;
        }
        if let Some(watched_date) = changes.watched_date {
            movie.watched_date = Some(watched_date);
        }
        if let Some(notes) = changes.notes {
            movie.notes = Some(notes);
        }
        if let Some(imdb_id) = changes.imdb_id {
            movie.imdb_id = Some(imdb_id);
        }
        movie.updated_at = Utc::now();

        Ok(1)
    }

    async fn delete_movie(&self, id: Uuid, owner_id: Uuid) -> AppResult<u64> {
        let mut inner = self.inner.lock().await;
        let owned = inner
            .movies
            .get(&id)
            .map(|m| m.owner_id == owner_id)
            .unwrap_or(false);
        if !owned {
            return Ok(0);
        }
        inner.movies.remove(&id);
        // Associations cascade, as the schema does.
        inner.movie_genres.retain(|(m, _)| *m != id);
        Ok(1)
    }

    async fn genre_by_name(&self, name: &str) -> AppResult<Option<Genre>> {
        let inner = self.inner.lock().await;
        Ok(inner.genres.values().find(|g| g.name == name).cloned())
    }

    async fn insert_genre(&self, name: &str) -> AppResult<Genre> {
        let mut inner = self.inner.lock().await;
        if let Some(existing) = inner.genres.values().find(|g| g.name == name) {
            return Ok(existing.clone());
        }
        inner.next_genre_id += 1;
        let genre = Genre {
            id: inner.next_genre_id,
            name: name.to_string(),
        };
        inner.genres.insert(genre.id, genre.clone());
        Ok(genre)
    }

    async fn link_genre(&self, movie_id: Uuid, genre_id: i32) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        if !inner.movie_genres.contains(&(movie_id, genre_id)) {
            inner.movie_genres.push((movie_id, genre_id));
        }
        Ok(())
    }

    async fn clear_genres(&self, movie_id: Uuid) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        inner.movie_genres.retain(|(m, _)| *m != movie_id);
        Ok(())
    }

    async fn insert_grant(
        &self,
        owner_id: Uuid,
        shared_with_id: Uuid,
        level: PermissionLevel,
    ) -> AppResult<SharingGrant> {
        let mut inner = self.inner.lock().await;
        let exists = inner
            .grants
            .values()
            .any(|g| g.owner_id == owner_id && g.shared_with_id == shared_with_id);
        if exists {
            return Err(AppError::DuplicateGrant);
        }
        let grant = SharingGrant {
            id: Uuid::new_v4(),
            owner_id,
            shared_with_id,
            permission_level: level,
            created_at: Utc::now(),
        };
        inner.grants.insert(grant.id, grant.clone());
        Ok(grant)
    }

    async fn grants_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<SharingGrant>> {
        let inner = self.inner.lock().await;
        let mut grants: Vec<SharingGrant> = inner
            .grants
            .values()
            .filter(|g| g.owner_id == owner_id)
            .cloned()
            .collect();
        grants.sort_by_key(|g| g.created_at);
        Ok(grants)
    }

    async fn grants_by_grantee(&self, shared_with_id: Uuid) -> AppResult<Vec<SharingGrant>> {
        let inner = self.inner.lock().await;
        let mut grants: Vec<SharingGrant> = inner
            .grants
            .values()
            .filter(|g| g.shared_with_id == shared_with_id)
            .cloned()
            .collect();
        grants.sort_by_key(|g| g.created_at);
        Ok(grants)
    }

    async fn grant_between(
        &self,
        owner_id: Uuid,
        shared_with_id: Uuid,
    ) -> AppResult<Option<SharingGrant>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .grants
            .values()
            .find(|g| g.owner_id == owner_id && g.shared_with_id == shared_with_id)
            .cloned())
    }

    async fn delete_grant(&self, owner_id: Uuid, shared_with_id: Uuid) -> AppResult<u64> {
        let mut inner = self.inner.lock().await;
        let before = inner.grants.len();
        inner
            .grants
            .retain(|_, g| !(g.owner_id == owner_id && g.shared_with_id == shared_with_id));
        Ok((before - inner.grants.len()) as u64)
    }

    async fn upsert_profile(&self, user_id: Uuid, username: &str, email: &str) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        inner.profiles.insert(
            user_id,
            Profile {
                email: email.to_string(),
                username: username.to_string(),
            },
        );
        Ok(())
    }

    async fn user_id_by_email(&self, email: &str) -> AppResult<Option<Uuid>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .profiles
            .iter()
            .find(|(_, p)| p.email == email)
            .map(|(id, _)| *id))
    }

    async fn email_by_user_id(&self, user_id: Uuid) -> AppResult<Option<String>> {
        let inner = self.inner.lock().await;
        Ok(inner.profiles.get(&user_id).map(|p| p.email.clone()))
    }

    async fn insert_wishlist_item(&self, item: NewWishlistItem) -> AppResult<WishlistItem> {
        let mut inner = self.inner.lock().await;
        let record = WishlistItem {
            id: Uuid::new_v4(),
            owner_id: item.owner_id,
            title: item.title,
            year: item.year,
            director: item.director,
            genres: item.genres,
            poster_url: item.poster_url,
            imdb_id: item.imdb_id,
            imdb_rating: item.imdb_rating,
            added_date: Utc::now(),
        };
        inner.wishlist.insert(record.id, record.clone());
        Ok(record)
    }

    async fn wishlist_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<WishlistItem>> {
        let inner = self.inner.lock().await;
        let mut items: Vec<WishlistItem> = inner
            .wishlist
            .values()
            .filter(|i| i.owner_id == owner_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.added_date.cmp(&a.added_date));
        Ok(items)
    }

    async fn wishlist_item(&self, id: Uuid, owner_id: Uuid) -> AppResult<Option<WishlistItem>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .wishlist
            .get(&id)
            .filter(|i| i.owner_id == owner_id)
            .cloned())
    }

    async fn delete_wishlist_item(&self, id: Uuid, owner_id: Uuid) -> AppResult<u64> {
        let mut inner = self.inner.lock().await;
        let owned = inner
            .wishlist
            .get(&id)
            .map(|i| i.owner_id == owner_id)
            .unwrap_or(false);
        if !owned {
            return Ok(0);
        }
        inner.wishlist.remove(&id);
        Ok(1)
    }
}
