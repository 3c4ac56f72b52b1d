//! Health check endpoints for container orchestration.
//!
//! Served on the paths OpenShift templates probe by default. Both only check
//! that the process can answer HTTP: a service without a ConfigMap is still
//! alive and still ready, it just answers greetings with a 500.

/// Liveness probe handler.
pub async fn liveness() -> &'static str {
    "OK"
}

/// Readiness probe handler.
pub async fn readiness() -> &'static str {
    "OK"
}
