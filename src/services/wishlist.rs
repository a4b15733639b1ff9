use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::auth::IdentityProvider;
use crate::db::{CollectionStore, NewWishlistItem};
use crate::error::{AppError, AppResult};
use crate::models::{CreateMovieInput, MovieWithGenres, WishlistInput, WishlistItem};
use crate::services::collection::normalize_genres;
use crate::services::CollectionService;

/// Wishlist entries: movies the user intends to watch.
///
/// An entry can be promoted into the collection via `mark_watched`, which
/// runs the normal movie-creation path and removes the entry only after the
/// movie exists.
#[derive(Clone)]
pub struct WishlistService {
    store: Arc<dyn CollectionStore>,
    identity: Arc<dyn IdentityProvider>,
    collection: CollectionService,
}

impl WishlistService {
    pub fn new(
        store: Arc<dyn CollectionStore>,
        identity: Arc<dyn IdentityProvider>,
        collection: CollectionService,
    ) -> Self {
        Self {
            store,
            identity,
            collection,
        }
    }

    async fn require_user(&self, token: Option<&str>) -> AppResult<crate::auth::AuthUser> {
        let token = token.ok_or(AppError::Unauthenticated)?;
        self.identity
            .current_user(token)
            .await?
            .ok_or(AppError::Unauthenticated)
    }

    /// The caller's wishlist, newest first
    pub async fn list(&self, token: Option<&str>) -> AppResult<Vec<WishlistItem>> {
        let user = self.require_user(token).await?;
        self.store.wishlist_by_owner(user.id).await
    }

    pub async fn add(&self, token: Option<&str>, input: WishlistInput) -> AppResult<WishlistItem> {
        let user = self.require_user(token).await?;

        let title = input.title.trim();
        if title.is_empty() {
            return Err(AppError::InvalidInput(
                "Movie title must not be empty".to_string(),
            ));
        }

        let item = self
            .store
            .insert_wishlist_item(NewWishlistItem {
                owner_id: user.id,
                title: title.to_string(),
                year: input.year,
                director: input.director,
                genres: normalize_genres(&input.genres),
                poster_url: input.poster_url,
                imdb_id: input.imdb_id,
                imdb_rating: input.imdb_rating,
            })
            .await?;

        tracing::info!(item_id = %item.id, owner_id = %user.id, "Wishlist entry added");

        Ok(item)
    }

    pub async fn remove(&self, token: Option<&str>, id: Uuid) -> AppResult<()> {
        let user = self.require_user(token).await?;
        let matched = self.store.delete_wishlist_item(id, user.id).await?;
        if matched == 0 {
            return Err(AppError::NotFound("Wishlist entry not found".to_string()));
        }
        Ok(())
    }

    /// Promotes a wishlist entry into a watched movie.
    ///
    /// The movie is created first; the entry is removed only once creation
    /// succeeded, so a failed create leaves the wishlist untouched.
    pub async fn mark_watched(
        &self,
        token: Option<&str>,
        id: Uuid,
        watched_date: Option<NaiveDate>,
    ) -> AppResult<MovieWithGenres> {
        let user = self.require_user(token).await?;

        let item = self
            .store
            .wishlist_item(id, user.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Wishlist entry not found".to_string()))?;

        let movie = self
            .collection
            .create(
                token,
                CreateMovieInput {
                    title: item.title.clone(),
                    year: item.year,
                    director: item.director.clone(),
                    user_rating: None,
                    poster_url: item.poster_url.clone(),
                    watched: true,
                    watched_date: Some(watched_date.unwrap_or_else(|| Utc::now().date_naive())),
                    notes: None,
                    imdb_id: item.imdb_id.clone(),
                    genres: item.genres.clone(),
                },
            )
            .await?;

        self.store.delete_wishlist_item(id, user.id).await?;

        tracing::info!(
            item_id = %id,
            movie_id = %movie.id,
            owner_id = %user.id,
            "Wishlist entry promoted to watched movie"
        );

        Ok(movie)
    }
}
