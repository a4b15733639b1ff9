use axum::{async_trait, extract::FromRequestParts, http::header, http::request::Parts};

/// Bearer token from the `Authorization` header, if any.
///
/// Extraction never rejects: whether a missing token is an error is decided
/// by the service layer, which owns the `Unauthenticated` contract.
pub struct Bearer(pub Option<String>);

impl Bearer {
    pub fn token(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Bearer {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());

        Ok(Bearer(token))
    }
}
