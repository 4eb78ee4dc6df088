//! Document upload, listing, fetch and delete.

use axum::{
    body::Bytes,
    extract::{
        multipart::MultipartRejection,
        rejection::{PathRejection, QueryRejection},
        Multipart, Path, Query, State,
    },
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use doc_hub_core::query::ListParams;
use doc_hub_core::storage::NewDocument;
use doc_hub_core::DocumentQuery;
use serde::Deserialize;
use serde_json::Value;

use super::{auth_middleware::Identity, envelope::Envelope, AppState};
use crate::error::{ApiError, ApiResult};

/// Upload metadata from the `meta` multipart part. `token` is the
/// caller-chosen document id.
#[derive(Deserialize, Debug)]
struct Meta {
    #[serde(default)]
    name: String,
    #[serde(default)]
    file: bool,
    #[serde(default)]
    public: bool,
    #[serde(default)]
    token: String,
    #[serde(default)]
    mime: String,
    #[serde(default)]
    grant: Option<Vec<String>>,
}

#[derive(Default)]
struct UploadParts {
    meta: Option<Bytes>,
    json: Option<Bytes>,
    file: Option<Bytes>,
}

async fn read_parts(mut multipart: Multipart) -> ApiResult<UploadParts> {
    let mut parts = UploadParts::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "meta" => parts.meta = Some(field.bytes().await?),
            "json" => parts.json = Some(field.bytes().await?),
            "file" => parts.file = Some(field.bytes().await?),
            other => tracing::debug!(part = other, "ignoring unknown multipart part"),
        }
    }
    Ok(parts)
}

fn parse_json_part(raw: Option<Bytes>) -> ApiResult<Option<Value>> {
    let Some(raw) = raw.filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    let value: Value = serde_json::from_slice(&raw)
        .map_err(|e| ApiError::Validation(format!("json part: {e}")))?;
    if !value.is_object() {
        return Err(ApiError::Validation("json part must be an object".into()));
    }
    Ok(Some(value))
}

pub async fn create(
    State(state): State<AppState>,
    identity: Identity,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Envelope> {
    let parts = read_parts(multipart?).await?;

    let meta = parts
        .meta
        .ok_or_else(|| ApiError::Validation("missing meta part".into()))?;
    let meta: Meta = serde_json::from_slice(&meta)
        .map_err(|e| ApiError::Validation(format!("meta part: {e}")))?;
    if meta.token.is_empty() || meta.name.is_empty() {
        return Err(ApiError::Validation("meta needs token and name".into()));
    }

    let json = parse_json_part(parts.json)?;

    // Only store a payload the metadata announces, so has_file always
    // matches what is stored.
    let payload = if meta.file {
        let file = parts
            .file
            .ok_or_else(|| ApiError::Validation("meta.file is set but no file part".into()))?;
        Some(file.to_vec())
    } else {
        None
    };

    let doc = NewDocument {
        id: meta.token,
        name: meta.name,
        mime: meta.mime,
        public: meta.public,
        grant: meta.grant.unwrap_or_default(),
        owner: identity.login,
        json,
        payload,
    };
    state.db.insert_document(&doc).await?;

    tracing::info!(
        id = %doc.id,
        owner = %doc.owner,
        bytes = doc.payload.as_ref().map_or(0, Vec::len),
        "stored document"
    );
    Ok(Envelope::upload(doc.json, doc.name))
}

pub async fn list(
    State(state): State<AppState>,
    identity: Identity,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Envelope> {
    let Query(params) = params?;
    let query = DocumentQuery::for_caller(&identity.login, &params)?;
    let docs = state.db.list_documents(&query).await?;
    Ok(Envelope::docs(docs))
}

/// Raw bytes under the stored MIME type when the document has a payload,
/// otherwise its metadata. HEAD gets the same headers and no body.
pub async fn fetch(
    State(state): State<AppState>,
    _identity: Identity,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<Response> {
    let Path(id) = id?;
    let doc = state.db.get_document(&id).await?.ok_or(ApiError::NotFound)?;

    match doc.payload {
        Some(bytes) if doc.summary.file => {
            let content_type = HeaderValue::from_str(&doc.summary.mime)
                .ok()
                .filter(|_| !doc.summary.mime.is_empty())
                .unwrap_or(HeaderValue::from_static("application/octet-stream"));
            Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
        }
        _ => Ok(Envelope::document(doc.summary, doc.json).into_response()),
    }
}

pub async fn remove(
    State(state): State<AppState>,
    identity: Identity,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<Envelope> {
    let Path(id) = id?;
    let removed = state.db.delete_document(&id).await?;
    tracing::info!(id = %id, caller = %identity.login, removed, "delete document");
    Ok(Envelope::act(id, true))
}
