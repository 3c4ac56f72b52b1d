//! Greeting API handler.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use tracing::instrument;

use crate::config::DEFAULT_NAME;
use crate::error::{AppError, Greeting};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GreetingQuery {
    pub name: Option<String>,
}

/// Render the configured message for `?name=` (default "World").
///
/// Responds 500 with `{"content": "no config map"}` while no configuration
/// is published.
#[instrument(name = "greeting::greet", skip(state, query))]
pub async fn greet(
    State(state): State<AppState>,
    Query(query): Query<GreetingQuery>,
) -> Result<Json<Greeting>, AppError> {
    let name = query.name.unwrap_or_else(|| DEFAULT_NAME.to_string());

    let config = state.greetings.load().ok_or(AppError::NoConfig)?;

    tracing::debug!(name = %name, "Replying to request");
    Ok(Json(Greeting {
        content: config.render(&name),
    }))
}
