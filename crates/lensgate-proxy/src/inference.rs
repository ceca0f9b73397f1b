//! Outbound side of the proxy: the hosted inference service's session
//! initialization call.
//!
//! Handlers only see [`SessionInitiator`]; the reqwest-backed implementation
//! lives here and tests substitute their own.

use std::time::Duration;

use async_trait::async_trait;
use lensgate_common::{
    helpers::trim_base_url, ApiKey, InitWebrtcRequest, SessionAnswer, SessionOffer,
    WorkflowSource,
};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub const DEFAULT_SERVER_URL: &str = "https://serverless.roboflow.com";

const INIT_WORKER_PATH: &str = "/initialise_webrtc_worker";
const DEFAULT_THREAD_POOL_WORKERS: u32 = 4;
const VIDEO_METADATA_INPUT_NAME: &str = "video_metadata";
const MAX_FORWARDED_ERROR_CHARS: usize = 512;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("inference server request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx answer. `message` is whatever the vendor put in its error body.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("inference server returned an unreadable answer: {0}")]
    InvalidAnswer(String),

    #[error("{0}")]
    Failed(String),
}

/// Starts a vendor inference session for a browser offer.
#[async_trait]
pub trait SessionInitiator: Send + Sync + 'static {
    async fn initialize(
        &self,
        api_key: &ApiKey,
        request: &InitWebrtcRequest,
    ) -> Result<SessionAnswer, UpstreamError>;
}

/// [`SessionInitiator`] backed by the vendor's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpSessionInitiator {
    http: reqwest::Client,
    server_url: String,
}

impl HttpSessionInitiator {
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lensgate-proxy/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(http, server_url))
    }

    pub fn with_client(http: reqwest::Client, server_url: &str) -> Self {
        Self {
            http,
            server_url: trim_base_url(server_url).to_string(),
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }
}

#[async_trait]
impl SessionInitiator for HttpSessionInitiator {
    async fn initialize(
        &self,
        api_key: &ApiKey,
        request: &InitWebrtcRequest,
    ) -> Result<SessionAnswer, UpstreamError> {
        InferenceClient::init(&self.http, api_key, &self.server_url)
            .initialize_webrtc_worker(request)
            .await
    }
}

/// Per-request vendor client handle: the shared connection pool plus the credential.
pub struct InferenceClient<'a> {
    http: &'a reqwest::Client,
    api_key: &'a ApiKey,
    server_url: &'a str,
}

impl<'a> InferenceClient<'a> {
    pub fn init(http: &'a reqwest::Client, api_key: &'a ApiKey, server_url: &'a str) -> Self {
        Self {
            http,
            api_key,
            server_url,
        }
    }

    pub async fn initialize_webrtc_worker(
        &self,
        request: &InitWebrtcRequest,
    ) -> Result<SessionAnswer, UpstreamError> {
        let url = format!("{}{}", self.server_url, INIT_WORKER_PATH);
        let body = WorkerRequest::new(self.api_key, request);

        let response = self.http.post(&url).json(&body).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(UpstreamError::Rejected {
                status: status.as_u16(),
                message: extract_error_message(&bytes),
            });
        }

        // Kept as untyped JSON; the browser gets exactly what the vendor produced.
        serde_json::from_slice::<Value>(&bytes)
            .map(SessionAnswer::from_value)
            .map_err(|err| UpstreamError::InvalidAnswer(err.to_string()))
    }
}

/// Wire body of the vendor's worker initialization call.
#[derive(Debug, Serialize)]
struct WorkerRequest<'a> {
    workflow_configuration: WorkflowConfiguration<'a>,
    api_key: &'a str,
    webrtc_realtime_processing: bool,
    webrtc_offer: &'a SessionOffer,
    webrtc_turn_config: Option<Value>,
    stream_output: &'a [String],
    data_output: &'a [String],
}

#[derive(Debug, Serialize)]
struct WorkflowConfiguration<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    workflow_specification: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    workspace_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    workflow_id: Option<&'a str>,
    image_input_name: &'a str,
    workflows_parameters: Option<&'a Map<String, Value>>,
    workflows_thread_pool_workers: u32,
    cancel_thread_pool_tasks_on_exit: bool,
    video_metadata_input_name: &'static str,
}

impl<'a> WorkerRequest<'a> {
    fn new(api_key: &'a ApiKey, request: &'a InitWebrtcRequest) -> Self {
        let params = &request.wrtc_params;
        let (workflow_specification, workspace_name, workflow_id) = match &params.source {
            WorkflowSource::Specification { workflow_spec } => (Some(workflow_spec), None, None),
            WorkflowSource::Published {
                workspace_name,
                workflow_id,
            } => (None, Some(workspace_name.as_str()), Some(workflow_id.as_str())),
        };

        Self {
            workflow_configuration: WorkflowConfiguration {
                kind: "WorkflowConfiguration",
                workflow_specification,
                workspace_name,
                workflow_id,
                image_input_name: &params.image_input_name,
                workflows_parameters: params.workflow_parameters.as_ref(),
                workflows_thread_pool_workers: params
                    .thread_pool_workers
                    .unwrap_or(DEFAULT_THREAD_POOL_WORKERS),
                cancel_thread_pool_tasks_on_exit: true,
                video_metadata_input_name: VIDEO_METADATA_INPUT_NAME,
            },
            api_key: api_key.expose(),
            webrtc_realtime_processing: true,
            webrtc_offer: &request.offer,
            webrtc_turn_config: None,
            stream_output: &params.stream_output_names,
            data_output: &params.data_output_names,
        }
    }
}

/// Pulls a human readable message out of a vendor error body.
///
/// JSON bodies are searched for `message`, `detail` and `error` string fields;
/// anything else is forwarded as trimmed text. Empty bodies yield an empty string
/// and the caller substitutes its fallback.
fn extract_error_message(body: &[u8]) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body) {
        for key in ["message", "detail", "error"] {
            if let Some(Value::String(message)) = map.get(key) {
                return truncate(message.trim());
            }
        }
        return String::new();
    }

    truncate(String::from_utf8_lossy(body).trim())
}

fn truncate(message: &str) -> String {
    message.chars().take(MAX_FORWARDED_ERROR_CHARS).collect()
}
