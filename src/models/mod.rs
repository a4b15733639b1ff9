use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

/// Access level attached to a sharing grant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    /// Grantee may view the collection
    Read,
    /// Grantee may view and modify the collection
    Edit,
}

impl PermissionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::Read => "read",
            PermissionLevel::Edit => "edit",
        }
    }

    /// Parses the stored representation. Returns `None` for anything the
    /// gateway should never have persisted.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "read" => Some(PermissionLevel::Read),
            "edit" => Some(PermissionLevel::Edit),
            _ => None,
        }
    }
}

impl Display for PermissionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A movie row as persisted by the gateway
#[derive(Debug, Clone, PartialEq)]
pub struct Movie {
    pub id: Uuid,
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A genre row. Names are unique and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

/// A sharing grant row linking an owner's collection to another user
#[derive(Debug, Clone, PartialEq)]
pub struct SharingGrant {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub shared_with_id: Uuid,
    pub permission_level: PermissionLevel,
    pub created_at: DateTime<Utc>,
}

/// A wishlist entry: a movie the user intends to watch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub year: Option<i32>,
    pub director: Option<String>,
    pub genres: Vec<String>,
    pub poster_url: Option<String>,
    pub imdb_id: Option<String>,
    pub imdb_rating: Option<f64>,
    pub added_date: DateTime<Utc>,
}

// ============================================================================
// View-models returned to clients
// ============================================================================

/// A movie denormalized with its flattened genre name list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieWithGenres {
    pub id: Uuid,
    pub title: String,
    pub year: Option<i32>,
    pub director: Option<String>,
    pub user_rating: Option<f64>,
    pub poster_url: Option<String>,
    pub watched: bool,
    pub watched_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub imdb_id: Option<String>,
    pub genres: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MovieWithGenres {
    pub fn from_parts(movie: Movie, genres: Vec<String>) -> Self {
        Self {
            id: movie.id,
            title: movie.title,
            year: movie.year,
            director: movie.director,
            user_rating: movie.user_rating,
            poster_url: movie.poster_url,
            watched: movie.watched,
            watched_date: movie.watched_date,
            notes: movie.notes,
            imdb_id: movie.imdb_id,
            genres,
            created_at: movie.created_at,
            updated_at: movie.updated_at,
        }
    }
}

/// A sharing grant with its counterpart's email resolved at read time.
///
/// For the owner's listing the counterpart is the grantee; for the grantee's
/// listing it is the owner. The email is never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedCollection {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub shared_with_id: Uuid,
    pub permission_level: PermissionLevel,
    pub counterpart_email: String,
    pub created_at: DateTime<Utc>,
}

impl SharedCollection {
    pub fn from_grant(grant: SharingGrant, counterpart_email: String) -> Self {
        Self {
            id: grant.id,
            owner_id: grant.owner_id,
            shared_with_id: grant.shared_with_id,
            permission_level: grant.permission_level,
            counterpart_email,
            created_at: grant.created_at,
        }
    }
}

/// A movie from someone else's collection, tagged with the owner's email
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedMovie {
    #[serde(flatten)]
    pub movie: MovieWithGenres,
    pub owner_email: String,
}

/// Everything visible to a grantee: their grants and the aggregated movies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedWithMe {
    pub grants: Vec<SharedCollection>,
    pub movies: Vec<SharedMovie>,
}

// ============================================================================
// Operation inputs
// ============================================================================

/// Input accepted by movie creation and bulk import.
///
/// Genre entries may be pre-split or comma-separated; normalization happens
/// in the collection service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMovieInput {
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub user_rating: Option<f64>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default = "default_watched")]
    pub watched: bool,
    #[serde(default)]
    pub watched_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
}

fn default_watched() -> bool {
    true
}

/// Partial update: absent fields keep their stored value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMovieInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub user_rating: Option<f64>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub watched: Option<bool>,
    #[serde(default)]
    pub watched_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub genres: Option<Vec<String>>,
}

/// Input accepted by wishlist creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistInput {
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub imdb_rating: Option<f64>,
}

// ============================================================================
// Catalog types
// ============================================================================

/// A catalog search hit, enough to render a picker row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSearchResult {
    pub id: String,
    pub title: String,
    pub year: Option<i32>,
    pub poster_url: Option<String>,
}

/// Full catalog details for one movie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMovieDetails {
    pub id: String,
    pub title: String,
    pub year: Option<i32>,
    pub director: Option<String>,
    pub genres: Vec<String>,
    pub plot: Option<String>,
    pub poster_url: Option<String>,
    pub community_rating: Option<f64>,
}
