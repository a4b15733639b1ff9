/// GoTrue-compatible identity provider client
///
/// Talks to a hosted auth service over HTTP. Only the small surface this
/// application needs is wrapped: token-to-user resolution, credential
/// sign-up/sign-in, the OAuth authorize URL, and sign-out.
use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{AuthUser, IdentityProvider, SessionTokens};
use crate::error::{AppError, AppResult};

pub struct HttpIdentityProvider {
    http_client: HttpClient,
    base_url: String,
    api_key: String,
}

impl HttpIdentityProvider {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url,
            api_key,
        }
    }

    async fn error_message(response: reqwest::Response) -> String {
        #[derive(Deserialize)]
        struct ApiError {
            #[serde(alias = "msg", alias = "error_description")]
            message: Option<String>,
        }

        let status = response.status();
        match response.json::<ApiError>().await {
            Ok(ApiError {
                message: Some(message),
            }) => message,
            _ => format!("Auth service returned status {}", status),
        }
    }
}

/// Raw session payload from the auth service
#[derive(Debug, Deserialize)]
struct ApiSession {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    user: ApiUser,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

impl From<ApiUser> for AuthUser {
    fn from(user: ApiUser) -> Self {
        AuthUser {
            id: user.id,
            email: user.email,
        }
    }
}

impl From<ApiSession> for SessionTokens {
    fn from(session: ApiSession) -> Self {
        SessionTokens {
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            user: session.user.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn current_user(&self, access_token: &str) -> AppResult<Option<AuthUser>> {
        let url = format!("{}/user", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status if status.is_success() => {
                let user: ApiUser = response.json().await?;
                Ok(Some(user.into()))
            }
            status => {
                let message = Self::error_message(response).await;
                tracing::error!(status = %status, message = %message, "User lookup failed");
                Err(AppError::ExternalApi(message))
            }
        }
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> AppResult<SessionTokens> {
        let url = format!("{}/signup", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "username": username },
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = Self::error_message(response).await;
            tracing::warn!(status = %status, message = %message, "Sign-up rejected");
            return match status {
                StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                    Err(AppError::InvalidInput(message))
                }
                _ => Err(AppError::ExternalApi(message)),
            };
        }

        let session: ApiSession = response.json().await?;
        Ok(session.into())
    }

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<SessionTokens> {
        let url = format!("{}/token?grant_type=password", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&json!({
                "email": email,
                "password": password,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = Self::error_message(response).await;
            tracing::debug!(status = %status, message = %message, "Sign-in rejected");
            return match status {
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                    Err(AppError::Unauthenticated)
                }
                _ => Err(AppError::ExternalApi(message)),
            };
        }

        let session: ApiSession = response.json().await?;
        Ok(session.into())
    }

    fn oauth_authorize_url(&self, provider: &str, redirect_to: Option<&str>) -> String {
        let mut url = format!("{}/authorize?provider={}", self.base_url, provider);
        if let Some(redirect_to) = redirect_to {
            url.push_str("&redirect_to=");
            url.push_str(redirect_to);
        }
        url
    }

    async fn sign_out(&self, access_token: &str) -> AppResult<()> {
        let url = format!("{}/logout", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        // An already-expired token is not worth surfacing to the caller.
        if !response.status().is_success() && response.status() != StatusCode::UNAUTHORIZED {
            let message = Self::error_message(response).await;
            return Err(AppError::ExternalApi(message));
        }

        Ok(())
    }
}
