use std::{io, path::PathBuf};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document must be a JSON object")]
    InvalidInput,
    #[error("storage unavailable at {path}: {source}")]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    // Never returned by `JsonStore::load`; kept so the cause can be logged.
    #[error("malformed state in {path}: {source}")]
    MalformedState {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("invalid movie name: {0:?}")]
    InvalidInput(String),
    #[error("movie not found: {0}")]
    NotFound(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum PlugError {
    #[error("plug request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("plug answered with status {0}")]
    Status(u16),
    #[error("plug reply is not valid JSON: {0}")]
    Decode(#[source] reqwest::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid bind address {value:?}: {source}")]
    InvalidBind {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("invalid plug timeout {value:?}: {source}")]
    InvalidTimeout {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

fn error_body(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "status": "error", "message": message }))).into_response()
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = match self {
            StoreError::InvalidInput => StatusCode::BAD_REQUEST,
            StoreError::StorageUnavailable { .. } | StoreError::MalformedState { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error_body(status, self.to_string())
    }
}

impl IntoResponse for MediaError {
    fn into_response(self) -> Response {
        let status = match self {
            MediaError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            MediaError::NotFound(_) => StatusCode::NOT_FOUND,
            MediaError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_body(status, self.to_string())
    }
}

impl IntoResponse for PlugError {
    fn into_response(self) -> Response {
        error_body(StatusCode::BAD_GATEWAY, self.to_string())
    }
}
