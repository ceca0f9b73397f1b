use std::net::SocketAddr;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Json, State},
    http::{HeaderMap, StatusCode},
};
use lensgate_common::{HealthResponse, SessionAnswer};
use uuid::Uuid;

use crate::error::ProxyError;
use crate::request::{self, RawInitRequest};
use crate::{security, AppState};

/// `POST /api/init-webrtc`: validate, attach the credential, forward once.
pub async fn init_webrtc(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<RawInitRequest>, JsonRejection>,
) -> Result<Json<SessionAnswer>, ProxyError> {
    let client_ip = security::effective_client_ip(
        &headers,
        connect_info.map(|ConnectInfo(addr)| addr),
        state.config.trust_proxy_headers,
    );
    if !state.init_limiter.allow(&format!("init:{client_ip}")) {
        tracing::warn!(%client_ip, "session initialization rate limited");
        return Err(ProxyError::RateLimited);
    }

    let Json(raw) = payload.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ProxyError::PayloadTooLarge
        } else {
            ProxyError::bad_request(format!("Invalid JSON body: {}", rejection.body_text()))
        }
    })?;
    let request = request::validate(raw)?;

    let Some(api_key) = state.config.api_key.as_ref() else {
        tracing::error!("session initialization requested but no API key is configured");
        return Err(ProxyError::MissingCredential);
    };

    let request_id = Uuid::new_v4();
    let workflow = request.wrtc_params.source.describe();
    tracing::info!(%request_id, %workflow, "initializing inference session");

    match state.initiator.initialize(api_key, &request).await {
        Ok(answer) => {
            tracing::info!(
                %request_id,
                pipeline_id = answer.pipeline_id().unwrap_or("unknown"),
                "inference session initialized"
            );
            Ok(Json(answer))
        }
        Err(err) => {
            tracing::error!(%request_id, error = %err, "inference session initialization failed");
            Err(ProxyError::Upstream(err))
        }
    }
}

/// `GET /api/health`: readiness plus whether a credential is present.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let api_key_configured = state.config.api_key_configured();
    let message = if api_key_configured {
        "Proxy is ready"
    } else {
        "API key not configured; set LENSGATE_API_KEY"
    };
    Json(HealthResponse {
        status: "ok".to_string(),
        api_key_configured,
        message: message.to_string(),
    })
}
