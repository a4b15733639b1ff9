/// Movie catalog provider abstraction
///
/// External catalog lookups (title search, detail fetch) sit behind this
/// trait so the HTTP layer can be swapped out in tests. Providers are
/// read-only and have no coupling to the persistence gateway.
use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{CatalogMovieDetails, CatalogSearchResult},
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Search the catalog by title. A blank query yields an empty result
    /// without a network call.
    async fn search(&self, query: &str) -> AppResult<Vec<CatalogSearchResult>>;

    /// Fetch full details for one catalog entry
    async fn details(&self, catalog_id: &str) -> AppResult<CatalogMovieDetails>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
