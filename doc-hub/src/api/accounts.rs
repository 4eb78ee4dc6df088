//! Registration, login and logout.

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, PathRejection},
        Path, State,
    },
    http::{header::AUTHORIZATION, HeaderMap},
};
use doc_hub_core::auth::credentials::{validate_login, validate_password};
use serde::Deserialize;

use super::{auth_middleware::Identity, envelope::Envelope, AppState};
use crate::error::{ApiError, ApiResult};

#[derive(Deserialize)]
struct LoginRequest {
    login: String,
    pswd: String,
}

fn parse_login_request(body: &[u8]) -> ApiResult<LoginRequest> {
    serde_json::from_slice(body).map_err(|e| ApiError::Validation(e.to_string()))
}

/// The admin token may be sent bare or as a bearer token.
fn is_admin(headers: &HeaderMap, admin_token: &str) -> bool {
    let Some(presented) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let presented = presented.strip_prefix("Bearer ").unwrap_or(presented);
    ring::constant_time::verify_slices_are_equal(presented.as_bytes(), admin_token.as_bytes())
        .is_ok()
}

pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Envelope> {
    if !is_admin(&headers, &state.admin_token) {
        return Err(ApiError::Forbidden);
    }

    let LoginRequest { login, pswd } = parse_login_request(&body?)?;
    validate_login(&login)?;
    validate_password(&pswd)?;

    let credentials = state.credentials.clone();
    let hash = tokio::task::spawn_blocking(move || credentials.hash(&pswd)).await??;
    state.db.create_user(&login, &hash).await?;

    tracing::info!(login = %login, "registered user");
    Ok(Envelope::act("login", login))
}

pub async fn login(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Envelope> {
    let LoginRequest { login, pswd } = parse_login_request(&body?)?;
    let user = state.db.find_user(&login).await?;

    // Unknown logins still pay for a verification.
    let hash = user
        .as_ref()
        .map(|u| u.password_hash.clone())
        .unwrap_or_default();
    let credentials = state.credentials.clone();
    let verified = tokio::task::spawn_blocking(move || credentials.verify(&hash, &pswd)).await?;

    let user = match user {
        Some(user) if verified => user,
        _ => {
            tracing::debug!(login = %login, "login refused");
            return Err(ApiError::Unauthenticated);
        }
    };

    let token = state.tokens.issue(&user.login)?;
    state.db.set_token(&user.login, &token).await?;

    tracing::info!(login = %user.login, "issued token");
    Ok(Envelope::act("token", token))
}

pub async fn logout(
    State(state): State<AppState>,
    identity: Identity,
    token: Result<Path<String>, PathRejection>,
) -> ApiResult<Envelope> {
    let Path(token) = token?;
    let cleared = state.db.clear_token(&identity.login, &token).await?;
    tracing::info!(login = %identity.login, cleared, "logout");
    Ok(Envelope::act(token, true))
}
