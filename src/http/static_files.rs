//! Static file serving.
//!
//! Serves the front-end that calls the greeting API. Directory requests
//! resolve to their `index.html`.

use std::path::Path;

use tower_http::services::ServeDir;

/// Create the static file service rooted at `dir`.
pub fn create_static_service(dir: &Path) -> ServeDir {
    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "Static directory missing, only the API will be served");
    }
    ServeDir::new(dir).append_index_html_on_directories(true)
}
