//! HTTP route handlers.
//!
//! The API lives under `/api`; every other path falls through to the static
//! asset directory. API responses are never cached, static assets briefly.
//!
//! Request tracing is enabled via middleware that assigns a request ID to
//! each incoming request, allowing correlation of all logs within a request.

pub mod greeting;
pub mod health;

use axum::{middleware, routing::get, Router};
use http::header::{HeaderValue, CACHE_CONTROL};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::{CACHE_CONTROL_API, CACHE_CONTROL_STATIC};
use crate::http::static_files::create_static_service;
use crate::middleware::request_id_layer;
use crate::state::AppState;

/// Creates the Axum router with all routes and cache headers.
pub fn create_router(state: AppState) -> Router {
    // Greeting - never cached, follows the ConfigMap
    let api_routes = Router::new()
        .route("/api/greeting", get(greeting::greet))
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_API),
        ));

    // Health checks - no caching, always fresh for probes
    let health_routes = Router::new()
        .route("/api/health/liveness", get(health::liveness))
        .route("/api/health/readiness", get(health::readiness));

    // Everything else - static assets
    let static_routes = Router::new()
        .fallback_service(create_static_service(&state.config.http.static_dir))
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_STATIC),
        ));

    Router::new()
        .merge(api_routes)
        .merge(health_routes)
        .merge(static_routes)
        .with_state(state)
        // Request ID middleware - creates root span with request_id for correlation
        .layer(middleware::from_fn(request_id_layer))
}
