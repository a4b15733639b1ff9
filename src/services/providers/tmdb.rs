/// TMDB catalog provider
///
/// Wraps the themoviedb.org v3 API: /search/movie for title search and
/// /movie/{id}?append_to_response=credits for details. The director is
/// extracted from the credits crew; poster paths are expanded to full image
/// URLs.
use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{CatalogMovieDetails, CatalogSearchResult},
    services::providers::CatalogProvider,
};

const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p";

pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl TmdbProvider {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
        }
    }

    fn poster_url(path: Option<&str>, width: &str) -> Option<String> {
        path.map(|p| format!("{POSTER_BASE_URL}/{width}{p}"))
    }

    fn release_year(release_date: Option<&str>) -> Option<i32> {
        release_date
            .and_then(|d| d.split('-').next())
            .and_then(|y| y.parse().ok())
    }
}

// ============================================================================
// Raw API response shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiSearchResponse {
    results: Vec<ApiSearchHit>,
}

#[derive(Debug, Deserialize)]
struct ApiSearchHit {
    id: u64,
    title: String,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
}

impl From<ApiSearchHit> for CatalogSearchResult {
    fn from(hit: ApiSearchHit) -> Self {
        CatalogSearchResult {
            id: hit.id.to_string(),
            title: hit.title,
            year: TmdbProvider::release_year(hit.release_date.as_deref()),
            poster_url: TmdbProvider::poster_url(hit.poster_path.as_deref(), "w200"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiMovieDetails {
    id: u64,
    title: String,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
    #[serde(default)]
    vote_average: Option<f64>,
    #[serde(default)]
    genres: Vec<ApiGenre>,
    #[serde(default)]
    credits: Option<ApiCredits>,
}

#[derive(Debug, Deserialize)]
struct ApiGenre {
    name: String,
}

#[derive(Debug, Deserialize, Default)]
struct ApiCredits {
    #[serde(default)]
    crew: Vec<ApiCrewMember>,
}

#[derive(Debug, Deserialize)]
struct ApiCrewMember {
    name: String,
    job: String,
}

impl From<ApiMovieDetails> for CatalogMovieDetails {
    fn from(details: ApiMovieDetails) -> Self {
        let director = details.credits.as_ref().map(|credits| {
            credits
                .crew
                .iter()
                .filter(|member| member.job == "Director")
                .map(|member| member.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        });

        CatalogMovieDetails {
            id: details.id.to_string(),
            title: details.title,
            year: TmdbProvider::release_year(details.release_date.as_deref()),
            director: director.filter(|d| !d.is_empty()),
            genres: details.genres.into_iter().map(|g| g.name).collect(),
            plot: details.overview.filter(|o| !o.is_empty()),
            poster_url: TmdbProvider::poster_url(details.poster_path.as_deref(), "w500"),
            community_rating: details.vote_average,
        }
    }
}

#[async_trait]
impl CatalogProvider for TmdbProvider {
    async fn search(&self, query: &str) -> AppResult<Vec<CatalogSearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(vec![]);
        }

        let url = format!("{}/search/movie", self.api_url);
        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("query", query),
                ("include_adult", "false"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(status = %status, query = %query, "Catalog search failed");
            return Err(AppError::ExternalApi(format!(
                "Catalog returned status {}",
                status
            )));
        }

        let payload: ApiSearchResponse = response.json().await?;

        tracing::debug!(
            query = %query,
            result_count = payload.results.len(),
            "Catalog search finished"
        );

        Ok(payload.results.into_iter().map(Into::into).collect())
    }

    async fn details(&self, catalog_id: &str) -> AppResult<CatalogMovieDetails> {
        let url = format!("{}/movie/{}", self.api_url, catalog_id);
        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("append_to_response", "credits"),
            ])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(AppError::NotFound(
                "Movie not found in catalog".to_string(),
            )),
            status if status.is_success() => {
                let details: ApiMovieDetails = response.json().await?;
                Ok(details.into())
            }
            status => {
                tracing::error!(status = %status, catalog_id = %catalog_id, "Catalog lookup failed");
                Err(AppError::ExternalApi(format!(
                    "Catalog returned status {}",
                    status
                )))
            }
        }
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
