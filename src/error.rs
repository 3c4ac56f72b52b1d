use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::config::NO_CONFIG_MESSAGE;

/// Body of every greeting API response, successful or not.
#[derive(Debug, Serialize)]
pub struct Greeting {
    pub content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{}", NO_CONFIG_MESSAGE)]
    NoConfig,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NoConfig => {
                tracing::warn!("Greeting requested before any configuration was loaded");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Greeting {
            content: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
