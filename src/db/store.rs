use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Genre, Movie, PermissionLevel, SharingGrant, WishlistItem};

/// A movie row to insert, before the gateway assigns id and timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovie {
    pub owner_id: Uuid,
    pub title: String,
    pub year: Option<i32>,
    pub director: Option<String>,
    pub user_rating: Option<f64>,
    pub poster_url: Option<String>,
    pub watched: bool,
    pub watched_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub imdb_id: Option<String>,
}

/// Scalar column changes for a movie row. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieChanges {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub director: Option<String>,
    pub user_rating: Option<f64>,
    pub poster_url: Option<String>,
    pub watched: Option<bool>,
    pub watched_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub imdb_id: Option<String>,
}

/// A wishlist row to insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewWishlistItem {
    pub owner_id: Uuid,
    pub title: String,
    pub year: Option<i32>,
    pub director: Option<String>,
    pub genres: Vec<String>,
    pub poster_url: Option<String>,
    pub imdb_id: Option<String>,
    pub imdb_rating: Option<f64>,
}

/// The Persistence Gateway boundary.
///
/// All durable state flows through this trait: the services above it only see
/// the strongly-typed entities of the domain model, never raw rows. Listing
/// methods return movies ordered by watched date descending with dateless
/// movies last. The two identity-resolution methods mirror the gateway's
/// RPC functions and are the only path for cross-user lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CollectionStore: Send + Sync {
    // Movies
    async fn insert_movie(&self, movie: NewMovie) -> AppResult<Movie>;
    async fn movie_by_id(&self, id: Uuid) -> AppResult<Option<Movie>>;
    async fn movies_with_genres_by_owner(
        &self,
        owner_id: Uuid,
    ) -> AppResult<Vec<(Movie, Vec<String>)>>;
    async fn movies_with_genres_by_owners(
        &self,
        owner_ids: &[Uuid],
    ) -> AppResult<Vec<(Movie, Vec<String>)>>;
    /// Applies changes to the row matching (id, owner). Returns matched rows.
    async fn update_movie(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: MovieChanges,
    ) -> AppResult<u64>;
    /// Deletes the row matching (id, owner); associations cascade. Returns
    /// matched rows.
    async fn delete_movie(&self, id: Uuid, owner_id: Uuid) -> AppResult<u64>;

    // Genres
    async fn genre_by_name(&self, name: &str) -> AppResult<Option<Genre>>;
    /// Inserts a genre, reusing the existing row when the name is taken.
    async fn insert_genre(&self, name: &str) -> AppResult<Genre>;
    /// Associates a genre with a movie. Inserting an existing pair is a no-op.
    async fn link_genre(&self, movie_id: Uuid, genre_id: i32) -> AppResult<()>;
    async fn clear_genres(&self, movie_id: Uuid) -> AppResult<()>;

    // Sharing grants
    /// Inserts a grant. A second grant for the same (owner, grantee) pair
    /// fails with `DuplicateGrant`, surfaced from the gateway's uniqueness
    /// violation rather than a pre-check.
    async fn insert_grant(
        &self,
        owner_id: Uuid,
        shared_with_id: Uuid,
        level: PermissionLevel,
    ) -> AppResult<SharingGrant>;
    async fn grants_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<SharingGrant>>;
    async fn grants_by_grantee(&self, shared_with_id: Uuid) -> AppResult<Vec<SharingGrant>>;
    async fn grant_between(
        &self,
        owner_id: Uuid,
        shared_with_id: Uuid,
    ) -> AppResult<Option<SharingGrant>>;
    /// Returns the number of grants removed (zero when none existed).
    async fn delete_grant(&self, owner_id: Uuid, shared_with_id: Uuid) -> AppResult<u64>;

    // Profiles and identity resolution RPCs
    async fn upsert_profile(&self, user_id: Uuid, username: &str, email: &str) -> AppResult<()>;
    async fn user_id_by_email(&self, email: &str) -> AppResult<Option<Uuid>>;
    async fn email_by_user_id(&self, user_id: Uuid) -> AppResult<Option<String>>;

    // Wishlist
    async fn insert_wishlist_item(&self, item: NewWishlistItem) -> AppResult<WishlistItem>;
    async fn wishlist_by_owner(&self, owner_id: Uuid) -> AppResult<Vec<WishlistItem>>;
    async fn wishlist_item(&self, id: Uuid, owner_id: Uuid) -> AppResult<Option<WishlistItem>>;
    async fn delete_wishlist_item(&self, id: Uuid, owner_id: Uuid) -> AppResult<u64>;
}
