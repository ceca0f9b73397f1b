//! Prebuilt frontend serving for production mode.

use std::path::Path;

use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

/// Serves `static_dir` as the fallback of `router`, with unknown paths
/// resolving to `index.html` so client-side routes load the app shell.
pub fn with_static_assets<S>(router: Router<S>, static_dir: &Path) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    if !static_dir.join("index.html").is_file() {
        tracing::warn!(
            "static directory {} has no index.html; frontend requests will 404",
            static_dir.display()
        );
    }

    let index = static_dir.join("index.html");
    router.fallback_service(ServeDir::new(static_dir).fallback(ServeFile::new(index)))
}
