use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("invalid audio: {0}")]
    InvalidAudio(String),

    #[error(transparent)]
    Core(#[from] auralis_core::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::InvalidAudio(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::Core(auralis_core::Error::UnknownPreset(name)) => {
                (StatusCode::BAD_REQUEST, format!("unknown preset: {name}"))
            }
            ServerError::Core(auralis_core::Error::InvalidInput(msg)) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::Core(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
