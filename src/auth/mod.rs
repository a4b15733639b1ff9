use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;

pub mod http;
pub mod memory;

pub use http::HttpIdentityProvider;
pub use memory::MemoryIdentityProvider;

/// The authenticated principal behind an access token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Tokens returned by sign-up and sign-in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user: AuthUser,
}

/// External identity provider abstraction
///
/// Sessions are issued and validated by a hosted auth service; this layer
/// only ever sees access tokens and the user they resolve to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves the user behind an access token. `None` means the token is
    /// missing, expired, or revoked — not an infrastructure failure.
    async fn current_user(&self, access_token: &str) -> AppResult<Option<AuthUser>>;

    async fn sign_up(&self, email: &str, password: &str, username: &str)
        -> AppResult<SessionTokens>;

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<SessionTokens>;

    /// Builds the third-party OAuth authorize URL the client should visit.
    fn oauth_authorize_url<'a>(&self, provider: &str, redirect_to: Option<&'a str>) -> String;

    async fn sign_out(&self, access_token: &str) -> AppResult<()>;
}
