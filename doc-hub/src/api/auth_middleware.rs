use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use doc_hub_core::TokenVerifier;

use super::AppState;
use crate::error::ApiError;

/// The caller behind a request, resolved from its bearer token. Handlers
/// that need an authenticated caller take this as an argument.
#[derive(Clone, Debug)]
pub struct Identity {
    pub login: String,
    pub token: String,
}

/// Returns the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}

/// Accepts `token` only if it verifies and is the token currently stored for
/// the login it names. Tokens cleared by logout or replaced by a newer login
/// are refused even though their signature still checks out.
pub async fn resolve_identity(state: &AppState, token: &str) -> Result<Identity, ApiError> {
    let claims = state.tokens.verify(token).await.map_err(|_| {
        tracing::debug!("token failed verification");
        ApiError::Unauthenticated
    })?;

    let user = state
        .db
        .find_user(&claims.sub)
        .await?
        .ok_or_else(|| {
            tracing::debug!(login = %claims.sub, "token names an unknown login");
            ApiError::Unauthenticated
        })?;

    if user.token.as_deref() != Some(token) {
        tracing::debug!(login = %user.login, "token is not the active token");
        return Err(ApiError::Unauthenticated);
    }

    Ok(Identity {
        login: user.login,
        token: token.to_string(),
    })
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(ApiError::Unauthenticated)?;
        resolve_identity(state, token).await
    }
}
