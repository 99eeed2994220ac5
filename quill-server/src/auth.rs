//! Request authentication
//!
//! A token comes from `Authorization: Bearer <token>` or, failing that, the
//! `jwt` cookie. Verifying it is delegated to an [`Authenticator`]; session
//! issuance lives outside this service.

use crate::error::{ApiError, NO_TOKEN, TOKEN_FAILED};
use crate::state::AppState;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use std::collections::HashMap;
use uuid::Uuid;

/// Cookie checked when no bearer header is present
pub const TOKEN_COOKIE: &str = "jwt";

/// Maps a presented token to the user it authenticates
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Option<Uuid>;
}

/// Fixed token table from configuration
#[derive(Debug, Default, Clone)]
pub struct StaticTokenAuthenticator {
    tokens: HashMap<String, Uuid>,
}

impl StaticTokenAuthenticator {
    pub fn new(tokens: HashMap<String, Uuid>) -> Self {
        Self { tokens }
    }

    pub fn with_token(mut self, token: impl Into<String>, user: Uuid) -> Self {
        self.tokens.insert(token.into(), user);
        self
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn authenticate(&self, token: &str) -> Option<Uuid> {
        self.tokens.get(token).copied()
    }
}

/// The user a request is made on behalf of
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let bearer = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|TypedHeader(auth)| auth.token().to_string());

        let token = bearer
            .or_else(|| {
                CookieJar::from_headers(&parts.headers)
                    .get(TOKEN_COOKIE)
                    .map(|cookie| cookie.value().to_string())
            })
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::Unauthorized(NO_TOKEN))?;

        match state.authenticator.authenticate(&token).await {
            Some(user) => Ok(AuthenticatedUser(user)),
            None => {
                tracing::debug!("Rejected unknown token");
                Err(ApiError::Unauthorized(TOKEN_FAILED))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_tokens() {
        let user = Uuid::new_v4();
        let auth = StaticTokenAuthenticator::default().with_token("secret", user);

        assert_eq!(auth.authenticate("secret").await, Some(user));
        assert_eq!(auth.authenticate("other").await, None);
    }
}
