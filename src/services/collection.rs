use std::sync::Arc;

use uuid::Uuid;

use crate::auth::{AuthUser, IdentityProvider};
use crate::db::{CollectionStore, MovieChanges, NewMovie};
use crate::error::{AppError, AppResult};
use crate::models::{CreateMovieInput, MovieWithGenres, UpdateMovieInput};

/// Splits, trims, and deduplicates submitted genre names.
///
/// Entries may be pre-split or comma-separated; empty entries are dropped and
/// duplicates within one submission collapse to the first occurrence.
/// Matching is case-sensitive, as stored.
pub fn normalize_genres(raw: &[String]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for entry in raw {
        for part in entry.split(',') {
            let name = part.trim();
            if name.is_empty() || names.iter().any(|n| n == name) {
                continue;
            }
            names.push(name.to_string());
        }
    }
    names
}

/// Movie CRUD over the caller's own collection.
///
/// Every operation authenticates the caller against the identity provider
/// before touching the store; update and delete additionally predicate on
/// ownership so a foreign movie id behaves exactly like a missing one.
#[derive(Clone)]
pub struct CollectionService {
    store: Arc<dyn CollectionStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl CollectionService {
    pub fn new(store: Arc<dyn CollectionStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }

    pub(crate) async fn require_user(&self, token: Option<&str>) -> AppResult<AuthUser> {
        let token = token.ok_or(AppError::Unauthenticated)?;
        self.identity
            .current_user(token)
            .await?
            .ok_or(AppError::Unauthenticated)
    }

    /// All movies owned by the caller, most recently watched first
    pub async fn list_owned(&self, token: Option<&str>) -> AppResult<Vec<MovieWithGenres>> {
        let user = self.require_user(token).await?;
        let rows = self.store.movies_with_genres_by_owner(user.id).await?;
        Ok(rows
            .into_iter()
            .map(|(movie, genres)| MovieWithGenres::from_parts(movie, genres))
            .collect())
    }

    /// Creates a movie and its genre associations.
    ///
    /// The movie insert is all-or-nothing; each genre step is attempted
    /// independently afterwards and a failing genre is logged and skipped.
    /// The returned view-model lists only the genres whose association was
    /// actually confirmed.
    pub async fn create(
        &self,
        token: Option<&str>,
        input: CreateMovieInput,
    ) -> AppResult<MovieWithGenres> {
        let user = self.require_user(token).await?;

        let title = input.title.trim();
        if title.is_empty() {
            return Err(AppError::InvalidInput(
                "Movie title must not be empty".to_string(),
            ));
        }
        if let Some(year) = input.year {
            if year <= 0 {
                return Err(AppError::InvalidInput(
                    "Movie year must be a positive number".to_string(),
                ));
            }
        }

        let movie = self
            .store
            .insert_movie(NewMovie {
                owner_id: user.id,
                title: title.to_string(),
                year: input.year,
                director: input.director,
                user_rating: input.user_rating,
                poster_url: input.poster_url,
                watched: input.watched,
                watched_date: input.watched_date,
                notes: input.notes,
                imdb_id: input.imdb_id,
            })
            .await?;

        let names = normalize_genres(&input.genres);
        let confirmed = self.attach_genres(movie.id, &names).await;

        tracing::info!(
            movie_id = %movie.id,
            owner_id = %user.id,
            genre_count = confirmed.len(),
            "Movie created"
        );

        Ok(MovieWithGenres::from_parts(movie, confirmed))
    }

    /// Updates a movie the caller owns
    pub async fn update(
        &self,
        token: Option<&str>,
        id: Uuid,
        input: UpdateMovieInput,
    ) -> AppResult<()> {
        let user = self.require_user(token).await?;
        self.apply_update(id, user.id, input).await
    }

    /// The shared update path: scalar patch plus optional genre rewrite,
    /// keyed on the owning user. `update` passes the caller as owner;
    /// `update_shared` passes the movie's true owner after its grant check.
    pub(crate) async fn apply_update(
        &self,
        movie_id: Uuid,
        owner_id: Uuid,
        input: UpdateMovieInput,
    ) -> AppResult<()> {
        let changes = Self::validate_changes(&input)?;

        let matched = self.store.update_movie(movie_id, owner_id, changes).await?;
        if matched == 0 {
            return Err(AppError::NotFound("Movie not found".to_string()));
        }

        if let Some(genres) = input.genres {
            self.store.clear_genres(movie_id).await?;
            let names = normalize_genres(&genres);
            self.attach_genres(movie_id, &names).await;
        }

        tracing::debug!(movie_id = %movie_id, owner_id = %owner_id, "Movie updated");

        Ok(())
    }

    /// Deletes a movie the caller owns; associations cascade in the schema
    pub async fn delete(&self, token: Option<&str>, id: Uuid) -> AppResult<()> {
        let user = self.require_user(token).await?;
        let matched = self.store.delete_movie(id, user.id).await?;
        if matched == 0 {
            return Err(AppError::NotFound("Movie not found".to_string()));
        }

        tracing::info!(movie_id = %id, owner_id = %user.id, "Movie deleted");

        Ok(())
    }

    /// Creates each input in turn; a failing item is logged and skipped.
    ///
    /// Items run sequentially so same-batch genre upserts never race each
    /// other. Callers receive the movies that were created; failures are
    /// visible only in the logs.
    pub async fn bulk_import(
        &self,
        token: Option<&str>,
        inputs: Vec<CreateMovieInput>,
    ) -> AppResult<Vec<MovieWithGenres>> {
        self.require_user(token).await?;

        let total = inputs.len();
        let mut imported = Vec::with_capacity(total);
        for (index, input) in inputs.into_iter().enumerate() {
            let title = input.title.clone();
            match self.create(token, input).await {
                Ok(movie) => imported.push(movie),
                Err(AppError::Unauthenticated) => return Err(AppError::Unauthenticated),
                Err(e) => {
                    tracing::warn!(
                        index,
                        title = %title,
                        error = %e,
                        "Skipping movie during import"
                    );
                }
            }
        }

        tracing::info!(imported = imported.len(), total, "Bulk import finished");

        Ok(imported)
    }

    fn validate_changes(input: &UpdateMovieInput) -> AppResult<MovieChanges> {
        if let Some(title) = &input.title {
            if title.trim().is_empty() {
                return Err(AppError::InvalidInput(
                    "Movie title must not be empty".to_string(),
                ));
            }
        }
        if let Some(year) = input.year {
            if year <= 0 {
                return Err(AppError::InvalidInput(
                    "Movie year must be a positive number".to_string(),
                ));
            }
        }

        Ok(MovieChanges {
            title: input.title.as_ref().map(|t| t.trim().to_string()),
            year: input.year,
            director: input.director.clone(),
            user_rating: input.user_rating,
            poster_url: input.poster_url.clone(),
            watched: input.watched,
            watched_date: input.watched_date,
            notes: input.notes.clone(),
            imdb_id: input.imdb_id.clone(),
        })
    }

    /// Upserts and links each genre, returning the names that stuck
    async fn attach_genres(&self, movie_id: Uuid, names: &[String]) -> Vec<String> {
        let mut confirmed = Vec::with_capacity(names.len());
        for name in names {
            match self.upsert_and_link(movie_id, name).await {
                Ok(()) => confirmed.push(name.clone()),
                Err(e) => {
                    tracing::warn!(
                        movie_id = %movie_id,
                        genre = %name,
                        error = %e,
                        "Skipping genre association"
                    );
                }
            }
        }
        confirmed
    }

    async fn upsert_and_link(&self, movie_id: Uuid, name: &str) -> AppResult<()> {
        let genre = match self.store.genre_by_name(name).await? {
            Some(genre) => genre,
            None => self.store.insert_genre(name).await?,
        };
        self.store.link_genre(movie_id, genre.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{MemoryIdentityProvider, MockIdentityProvider};
    use crate::db::store::MockCollectionStore;
    use crate::db::MemoryStore;
    use crate::models::Genre;
    use chrono::Utc;

    fn input(title: &str, genres: &[&str]) -> CreateMovieInput {
        CreateMovieInput {
            title: title.to_string(),
            year: None,
            director: None,
            user_rating: None,
            poster_url: None,
            watched: true,
            watched_date: None,
            notes: None,
            imdb_id: None,
            genres: genres.iter().map(|g| g.to_string()).collect(),
        }
    }

    async fn service_with_user() -> (CollectionService, String) {
        let store = Arc::new(MemoryStore::new());
        let identity = Arc::new(MemoryIdentityProvider::new());
        let tokens = identity
            .sign_up("a@example.com", "hunter2", "alice")
            .await
            .unwrap();
        let service = CollectionService::new(store, identity);
        (service, tokens.access_token)
    }

    fn mock_identity(user: AuthUser) -> MockIdentityProvider {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_current_user()
            .returning(move |_| Ok(Some(user.clone())));
        identity
    }

    fn movie_from(draft: NewMovie) -> crate::models::Movie {
        let now = Utc::now();
        crate::models::Movie {
            id: Uuid::new_v4(),
            owner_id: draft.owner_id,
            title: draft.title,
            year: draft.year,
            director: draft.director,
            user_rating: draft.user_rating,
            poster_url: draft.poster_url,
            watched: draft.watched,
            watched_date: draft.watched_date,
            notes: draft.notes,
            imdb_id: draft.imdb_id,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_normalize_genres() {
        let raw = vec![
            " Sci-Fi , Drama, ,Sci-Fi".to_string(),
            "".to_string(),
            "Thriller".to_string(),
            "Drama".to_string(),
        ];
        assert_eq!(normalize_genres(&raw), vec!["Sci-Fi", "Drama", "Thriller"]);
    }

    #[test]
    fn test_normalize_genres_is_case_sensitive() {
        let raw = vec!["Drama".to_string(), "drama".to_string()];
        assert_eq!(normalize_genres(&raw), vec!["Drama", "drama"]);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthenticated() {
        let (service, _token) = service_with_user().await;
        let result = service.list_owned(None).await;
        assert!(matches!(result, Err(AppError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_title() {
        let (service, token) = service_with_user().await;
        let result = service.create(Some(&token), input("   ", &[])).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_create_then_list_owned() {
        let (service, token) = service_with_user().await;
        let created = service
            .create(Some(&token), input("Dune", &["Sci-Fi", "Drama"]))
            .await
            .unwrap();
        assert_eq!(created.genres, vec!["Sci-Fi", "Drama"]);

        let listed = service.list_owned(Some(&token)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Dune");
        assert_eq!(listed[0].genres, vec!["Sci-Fi", "Drama"]);
    }

    #[tokio::test]
    async fn test_create_returns_only_confirmed_genres() {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some("a@example.com".to_string()),
        };

        let mut store = MockCollectionStore::new();
        store
            .expect_insert_movie()
            .returning(|draft| Ok(movie_from(draft)));
        store.expect_genre_by_name().returning(|_| Ok(None));
        store.expect_insert_genre().returning(|name| {
            if name == "Drama" {
                Err(AppError::Internal("genre backend unavailable".to_string()))
            } else {
                Ok(Genre {
                    id: 1,
                    name: name.to_string(),
                })
            }
        });
        store.expect_link_genre().returning(|_, _| Ok(()));

        let service = CollectionService::new(Arc::new(store), Arc::new(mock_identity(user)));
        let created = service
            .create(Some("token"), input("Dune", &["Sci-Fi", "Drama"]))
            .await
            .unwrap();

        // The failed association is skipped, not reported as persisted.
        assert_eq!(created.genres, vec!["Sci-Fi"]);
    }

    #[tokio::test]
    async fn test_update_unknown_movie_is_not_found() {
        let (service, token) = service_with_user().await;
        let patch = UpdateMovieInput {
            title: Some("New title".to_string()),
            ..Default::default()
        };
        let result = service.update(Some(&token), Uuid::new_v4(), patch).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_rewrites_genres() {
        let (service, token) = service_with_user().await;
        let created = service
            .create(Some(&token), input("Dune", &["Sci-Fi"]))
            .await
            .unwrap();

        let patch = UpdateMovieInput {
            genres: Some(vec!["Adventure".to_string(), "Drama".to_string()]),
            ..Default::default()
        };
        service.update(Some(&token), created.id, patch).await.unwrap();

        let listed = service.list_owned(Some(&token)).await.unwrap();
        assert_eq!(listed[0].genres, vec!["Adventure", "Drama"]);
    }

    #[tokio::test]
    async fn test_delete_then_list_is_empty() {
        let (service, token) = service_with_user().await;
        let created = service.create(Some(&token), input("Heat", &[])).await.unwrap();

        service.delete(Some(&token), created.id).await.unwrap();
        assert!(service.list_owned(Some(&token)).await.unwrap().is_empty());

        let again = service.delete(Some(&token), created.id).await;
        assert!(matches!(again, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_bulk_import_skips_failing_items() {
        let (service, token) = service_with_user().await;
        let inputs = vec![
            input("Inception", &["Sci-Fi"]),
            input("", &[]),
            input("Memento", &[]),
        ];

        let imported = service.bulk_import(Some(&token), inputs).await.unwrap();
        let titles: Vec<&str> = imported.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Inception", "Memento"]);
    }

    #[tokio::test]
    async fn test_genre_dedup_across_movies() {
        let (service, token) = service_with_user().await;
        service
            .create(Some(&token), input("Movie one", &["Drama"]))
            .await
            .unwrap();
        service
            .create(Some(&token), input("Movie two", &["Drama"]))
            .await
            .unwrap();

        let listed = service.list_owned(Some(&token)).await.unwrap();
        assert!(listed.iter().all(|m| m.genres == vec!["Drama"]));
    }
}
