//! The JSON body shared by every non-binary response:
//! `{error?:{code,text}, response?:{...}, data?:{doc?, json?, file?}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use doc_hub_core::storage::DocumentSummary;
use serde::Serialize;
use serde_json::{Map, Value};

pub fn status_text(status: StatusCode) -> &'static str {
    match status {
        StatusCode::OK => "ok",
        StatusCode::BAD_REQUEST => "bad params",
        StatusCode::UNAUTHORIZED => "unauthorized",
        StatusCode::FORBIDDEN => "forbidden",
        StatusCode::NOT_FOUND => "not found",
        StatusCode::METHOD_NOT_ALLOWED => "method not allowed",
        StatusCode::NOT_IMPLEMENTED => "not implemented",
        _ => "internal error",
    }
}

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub code: u16,
    pub text: &'static str,
}

#[derive(Serialize, Debug, Default)]
pub struct Data {
    #[serde(rename = "doc", skip_serializing_if = "Option::is_none")]
    pub docs: Option<Vec<DocumentSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

#[derive(Serialize, Debug, Default)]
pub struct Envelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Data>,
}

impl Envelope {
    pub fn error(status: StatusCode) -> Self {
        Self {
            error: Some(ErrorBody {
                code: status.as_u16(),
                text: status_text(status),
            }),
            ..Default::default()
        }
    }

    /// Acknowledges an action with a single `key: value` pair.
    pub fn act(key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut map = Map::new();
        map.insert(key.into(), value.into());
        Self {
            response: Some(map),
            ..Default::default()
        }
    }

    pub fn docs(docs: Vec<DocumentSummary>) -> Self {
        Self {
            data: Some(Data {
                docs: Some(docs),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn document(doc: DocumentSummary, json: Option<Value>) -> Self {
        Self {
            data: Some(Data {
                docs: Some(vec![doc]),
                json,
                file: None,
            }),
            ..Default::default()
        }
    }

    pub fn upload(json: Option<Value>, name: String) -> Self {
        Self {
            data: Some(Data {
                docs: None,
                json,
                file: Some(name),
            }),
            ..Default::default()
        }
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
