use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::auth::IdentityProvider;
use crate::db::CollectionStore;
use crate::error::{AppError, AppResult};
use crate::models::{
    MovieWithGenres, PermissionLevel, SharedCollection, SharedMovie, SharedWithMe,
    UpdateMovieInput,
};
use crate::services::CollectionService;

const UNKNOWN_EMAIL: &str = "Unknown";

/// Sharing-grant CRUD and the shared-write permission gate.
///
/// Grants are never edited in place: the only transitions are create and
/// delete, and changing a permission level means revoke then re-share.
#[derive(Clone)]
pub struct SharingService {
    store: Arc<dyn CollectionStore>,
    identity: Arc<dyn IdentityProvider>,
    collection: CollectionService,
}

impl SharingService {
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

    /// Shares the caller's collection with the user behind `target_email`.
    ///
    /// The grant insert itself is authoritative for uniqueness: a duplicate
    /// pair surfaces as `DuplicateGrant` from the store, with no pre-check
    /// that could race a concurrent share.
    pub async fn share(
        &self,
        token: Option<&str>,
        target_email: &str,
        level: PermissionLevel,
    ) -> AppResult<SharedCollection> {
        let user = self.require_user(token).await?;

        let target_id = self
            .store
            .user_id_by_email(target_email)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let grant = self.store.insert_grant(user.id, target_id, level).await?;

        tracing::info!(
            owner_id = %user.id,
            shared_with_id = %target_id,
            level = %level,
            "Collection shared"
        );

        Ok(SharedCollection::from_grant(grant, target_email.to_string()))
    }

    /// All grants the caller has given out, with grantee emails resolved.
    ///
    /// Lookups are launched concurrently and awaited in input order. A hard
    /// resolution failure fails the whole listing; a user with no resolvable
    /// email degrades to a placeholder.
    pub async fn list_grants_as_owner(
        &self,
        token: Option<&str>,
    ) -> AppResult<Vec<SharedCollection>> {
        let user = self.require_user(token).await?;
        let grants = self.store.grants_by_owner(user.id).await?;

        let mut tasks = Vec::with_capacity(grants.len());
        for grant in &grants {
            let store = Arc::clone(&self.store);
            let grantee = grant.shared_with_id;
            tasks.push(tokio::spawn(
                async move { store.email_by_user_id(grantee).await },
            ));
        }

        let mut listed = Vec::with_capacity(grants.len());
        for (grant, task) in grants.into_iter().zip(tasks) {
            let email = task
                .await
                .map_err(|e| AppError::Internal(e.to_string()))??
                .unwrap_or_else(|| UNKNOWN_EMAIL.to_string());
            listed.push(SharedCollection::from_grant(grant, email));
        }

        Ok(listed)
    }

    /// Removes the caller's grant to the given user. Revoking a grant that
    /// does not exist is a no-op.
    pub async fn revoke(&self, token: Option<&str>, shared_with_id: Uuid) -> AppResult<()> {
        let user = self.require_user(token).await?;
        let removed = self.store.delete_grant(user.id, shared_with_id).await?;

        if removed == 0 {
            tracing::debug!(
                owner_id = %user.id,
                shared_with_id = %shared_with_id,
                "No grant to revoke"
            );
        } else {
            tracing::info!(
                owner_id = %user.id,
                shared_with_id = %shared_with_id,
                "Sharing revoked"
            );
        }

        Ok(())
    }

    /// Everything shared with the caller: their grants and the aggregated
    /// movies of every owner who shared, tagged with owner emails.
    ///
    /// With no grants this returns empty collections without querying movies.
    pub async fn list_shared_with_me(&self, token: Option<&str>) -> AppResult<SharedWithMe> {
        let user = self.require_user(token).await?;
        let grants = self.store.grants_by_grantee(user.id).await?;

        if grants.is_empty() {
            return Ok(SharedWithMe::default());
        }

        let mut owner_ids: Vec<Uuid> = Vec::new();
        for grant in &grants {
            if !owner_ids.contains(&grant.owner_id) {
                owner_ids.push(grant.owner_id);
            }
        }

        let emails = self.resolve_emails(&owner_ids).await?;
        let rows = self.store.movies_with_genres_by_owners(&owner_ids).await?;

        let movies = rows
            .into_iter()
            .map(|(movie, genres)| {
                let owner_email = emails
                    .get(&movie.owner_id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_EMAIL.to_string());
                SharedMovie {
                    movie: MovieWithGenres::from_parts(movie, genres),
                    owner_email,
                }
            })
            .collect();

        let grants = grants
            .into_iter()
            .map(|grant| {
                let email = emails
                    .get(&grant.owner_id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_EMAIL.to_string());
                SharedCollection::from_grant(grant, email)
            })
            .collect();

        Ok(SharedWithMe { grants, movies })
    }

    /// Writes to a movie in someone else's collection.
    ///
    /// The one true authorization gate: the grant from the movie's owner to
    /// the caller is re-read on every call, never cached, and must carry the
    /// `edit` level. The write itself runs through the same update path as
    /// an owner's update, keyed on the movie's true owner.
    pub async fn update_shared(
        &self,
        token: Option<&str>,
        movie_id: Uuid,
        input: UpdateMovieInput,
    ) -> AppResult<()> {
        let user = self.require_user(token).await?;

        let movie = self
            .store
            .movie_by_id(movie_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Movie not found".to_string()))?;

        let grant = self
            .store
            .grant_between(movie.owner_id, user.id)
            .await?
            .ok_or(AppError::AccessDenied)?;

        if grant.permission_level != PermissionLevel::Edit {
            return Err(AppError::InsufficientPermission);
        }

        tracing::info!(
            movie_id = %movie_id,
            owner_id = %movie.owner_id,
            editor_id = %user.id,
            "Shared movie update authorized"
        );

        self.collection
            .apply_update(movie_id, movie.owner_id, input)
            .await
    }

    /// Resolves each owner's email: launch all, await all, in input order
    async fn resolve_emails(&self, owner_ids: &[Uuid]) -> AppResult<HashMap<Uuid, String>> {
        let mut tasks = Vec::with_capacity(owner_ids.len());
        for owner_id in owner_ids {
            let store = Arc::clone(&self.store);
            let owner_id = *owner_id;
            tasks.push(tokio::spawn(async move {
                store.email_by_user_id(owner_id).await
            }));
        }

        let mut emails = HashMap::with_capacity(owner_ids.len());
        for (owner_id, task) in owner_ids.iter().zip(tasks) {
            let email = task
                .await
                .map_err(|e| AppError::Internal(e.to_string()))??
                .unwrap_or_else(|| UNKNOWN_EMAIL.to_string());
            emails.insert(*owner_id, email);
        }

        Ok(emails)
    }
}
