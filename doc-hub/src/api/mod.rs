//! HTTP API layer exposing account and document endpoints.

pub mod accounts;
pub mod auth_middleware;
pub mod docs;
pub mod envelope;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, MatchedPath, Request},
    routing::{delete, get, post},
    Router,
};
use doc_hub_core::{CredentialStore, Database, Hs256TokenService};
use tower_http::trace::TraceLayer;

use crate::config::{Config, DEFAULT_MAX_UPLOAD_BYTES};
use crate::error::ApiError;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub credentials: Arc<CredentialStore>,
    pub tokens: Arc<Hs256TokenService>,
    pub admin_token: Arc<str>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let db = Database::connect(&config.database_url, config.max_connections).await?;
        let credentials = CredentialStore::new()?;
        let tokens = Hs256TokenService::new(&config.jwt_secret)
            .with_ttl(config.token_ttl_secs.map(Duration::from_secs));

        Ok(Self::from_parts(db, credentials, tokens, &config.admin_token)
            .with_max_upload_bytes(config.max_upload_bytes))
    }

    pub fn from_parts(
        db: Database,
        credentials: CredentialStore,
        tokens: Hs256TokenService,
        admin_token: &str,
    ) -> Self {
        Self {
            db,
            credentials: Arc::new(credentials),
            tokens: Arc::new(tokens),
            admin_token: Arc::from(admin_token),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    #[cfg(test)]
    pub(crate) async fn for_tests() -> Self {
        Self::from_parts(
            Database::in_memory().await.unwrap(),
            CredentialStore::insecure_for_tests(),
            Hs256TokenService::new("test-secret"),
            "admin-token",
        )
    }
}

/// Request span keyed by the route template. The raw URI is left out since
/// `/api/auth/{token}` carries a bearer token.
fn request_span(req: &Request) -> tracing::Span {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(MatchedPath::as_str)
        .unwrap_or("<unmatched>");
    tracing::info_span!("request", method = %req.method(), route = %route)
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn not_implemented() -> ApiError {
    ApiError::NotImplemented
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;
    Router::new()
        .route(
            "/api/register",
            post(accounts::register).fallback(method_not_allowed),
        )
        .route("/api/auth", post(accounts::login).fallback(method_not_allowed))
        .route(
            "/api/auth/{token}",
            delete(accounts::logout).fallback(method_not_allowed),
        )
        .route(
            "/api/docs",
            get(docs::list)
                .post(docs::create)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/docs/{id}",
            get(docs::fetch)
                .delete(docs::remove)
                .fallback(method_not_allowed),
        )
        .route("/health", get(|| async { "OK" }))
        .fallback(not_implemented)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .with_state(state)
}
