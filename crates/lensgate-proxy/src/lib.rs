//! Credential-holding proxy in front of a hosted inference service.
//!
//! The browser negotiates its WebRTC session through `POST /api/init-webrtc`;
//! the proxy attaches the server-side API key and forwards the offer once.

#![forbid(unsafe_code)]

pub mod assets;
pub mod config;
pub mod error;
pub mod inference;
pub mod request;
pub mod security;
pub mod web;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use config::{ProxyArgs, ProxyConfig, RuntimeMode};
pub use error::ProxyError;
pub use inference::{HttpSessionInitiator, SessionInitiator, UpstreamError};

const MAX_BODY_BYTES: usize = 256 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub initiator: Arc<dyn SessionInitiator>,
    pub init_limiter: Arc<security::FixedWindowRateLimiter>,
}

impl AppState {
    pub fn new(config: ProxyConfig, initiator: Arc<dyn SessionInitiator>) -> Self {
        let init_limiter = Arc::new(security::FixedWindowRateLimiter::for_session_init(&config));
        Self {
            config: Arc::new(config),
            initiator,
            init_limiter,
        }
    }
}

/// API routes plus CORS and request tracing. Static assets are mounted in production only.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/init-webrtc", post(web::init_webrtc))
        .route("/api/health", get(web::health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(security::build_cors_layer(&state.config))
        .layer(TraceLayer::new_for_http());

    let router = match state.config.mode {
        RuntimeMode::Production => assets::with_static_assets(api, &state.config.static_dir),
        RuntimeMode::Development => api,
    };

    router.with_state(state)
}
