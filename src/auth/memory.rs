use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::{AuthUser, IdentityProvider, SessionTokens};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
struct Account {
    password: String,
    user: AuthUser,
}

#[derive(Default)]
struct Inner {
    accounts: HashMap<String, Account>,
    sessions: HashMap<String, AuthUser>,
}

/// In-process identity provider for tests and local development.
///
/// Accounts live in memory; tokens are random and valid until sign-out.
#[derive(Default)]
pub struct MemoryIdentityProvider {
    inner: Mutex<Inner>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn current_user(&self, access_token: &str) -> AppResult<Option<AuthUser>> {
        let inner = self.inner.lock().await;
        Ok(inner.sessions.get(access_token).cloned())
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _username: &str,
    ) -> AppResult<SessionTokens> {
        let mut inner = self.inner.lock().await;
        if inner.accounts.contains_key(email) {
            return Err(AppError::InvalidInput(
                "An account already exists for this email".to_string(),
            ));
        }

        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
        };
        inner.accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );

        let access_token = Uuid::new_v4().to_string();
        inner.sessions.insert(access_token.clone(), user.clone());

        Ok(SessionTokens {
            access_token,
            refresh_token: None,
            user,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<SessionTokens> {
        let mut inner = self.inner.lock().await;
        let user = match inner.accounts.get(email) {
            Some(account) if account.password == password => account.user.clone(),
            _ => return Err(AppError::Unauthenticated),
        };

        let access_token = Uuid::new_v4().to_string();
        inner.sessions.insert(access_token.clone(), user.clone());

        Ok(SessionTokens {
            access_token,
            refresh_token: None,
            user,
        })
    }

    fn oauth_authorize_url(&self, provider: &str, redirect_to: Option<&str>) -> String {
        match redirect_to {
            Some(redirect_to) => {
                format!("memory://authorize?provider={provider}&redirect_to={redirect_to}")
            }
            None => format!("memory://authorize?provider={provider}"),
        }
    }

    async fn sign_out(&self, access_token: &str) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        inner.sessions.remove(access_token);
        Ok(())
    }
}
