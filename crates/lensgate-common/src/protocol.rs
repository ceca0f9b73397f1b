use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Input name used by vendor workflows when the caller does not pick one.
pub const DEFAULT_IMAGE_INPUT_NAME: &str = "image";

/// Client-generated WebRTC offer. Opaque to the proxy and forwarded as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOffer {
    pub sdp: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl SessionOffer {
    pub fn new(sdp: impl Into<String>) -> Self {
        Self {
            sdp: sdp.into(),
            kind: "offer".to_string(),
        }
    }
}

/// How the vendor locates the workflow to run. Exactly one mode per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkflowSource {
    /// Inline workflow definition.
    Specification {
        #[serde(rename = "workflowSpec")]
        workflow_spec: Value,
    },
    /// Workflow published in a vendor workspace.
    Published {
        #[serde(rename = "workspaceName")]
        workspace_name: String,
        #[serde(rename = "workflowId")]
        workflow_id: String,
    },
}

impl WorkflowSource {
    pub fn published(workspace_name: impl Into<String>, workflow_id: impl Into<String>) -> Self {
        Self::Published {
            workspace_name: workspace_name.into(),
            workflow_id: workflow_id.into(),
        }
    }

    /// Label used in logs; never includes the inline definition.
    pub fn describe(&self) -> String {
        match self {
            Self::Specification { .. } => "inline workflow specification".to_string(),
            Self::Published {
                workspace_name,
                workflow_id,
            } => format!("{workspace_name}/{workflow_id}"),
        }
    }
}

/// Workflow identification plus the auxiliary worker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowParams {
    #[serde(flatten)]
    pub source: WorkflowSource,
    #[serde(default = "default_image_input_name")]
    pub image_input_name: String,
    #[serde(default)]
    pub stream_output_names: Vec<String>,
    #[serde(default)]
    pub data_output_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_parameters: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_pool_workers: Option<u32>,
}

fn default_image_input_name() -> String {
    DEFAULT_IMAGE_INPUT_NAME.to_string()
}

impl WorkflowParams {
    pub fn new(source: WorkflowSource) -> Self {
        Self {
            source,
            image_input_name: default_image_input_name(),
            stream_output_names: Vec::new(),
            data_output_names: Vec::new(),
            workflow_parameters: None,
            thread_pool_workers: None,
        }
    }
}

/// Body of `POST /api/init-webrtc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitWebrtcRequest {
    pub offer: SessionOffer,
    #[serde(rename = "wrtcParams")]
    pub wrtc_params: WorkflowParams,
}

/// Vendor-produced answer, kept as the exact JSON the vendor sent.
///
/// Nothing is decoded into typed fields, so relaying it never drops `null`s or
/// rejects values of an unexpected type. Accessors read what they can.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionAnswer(Value);

impl SessionAnswer {
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn sdp(&self) -> Option<&str> {
        self.0.get("sdp")?.as_str()
    }

    pub fn kind(&self) -> Option<&str> {
        self.0.get("type")?.as_str()
    }

    pub fn pipeline_id(&self) -> Option<&str> {
        self.context_str("pipeline_id")
    }

    pub fn request_id(&self) -> Option<&str> {
        self.context_str("request_id")
    }

    fn context_str(&self, field: &str) -> Option<&str> {
        self.0.get("context")?.get(field)?.as_str()
    }
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(rename = "apiKeyConfigured")]
    pub api_key_configured: bool,
    pub message: String,
}

/// Error body returned by every failing route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
