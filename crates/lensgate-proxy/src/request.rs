//! Validation boundary for `POST /api/init-webrtc`.
//!
//! The body is first read into permissive `Raw*` shapes so missing fields
//! produce a 400 with a precise message instead of a generic extractor
//! rejection, then narrowed into [`InitWebrtcRequest`].

use lensgate_common::{
    InitWebrtcRequest, SessionOffer, WorkflowParams, WorkflowSource, DEFAULT_IMAGE_INPUT_NAME,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ProxyError;

pub const MAX_SDP_BYTES: usize = 32 * 1024;

pub const MISSING_OFFER: &str = "Missing required field: offer (with sdp and type)";
pub const MISSING_WORKFLOW: &str = "Missing workflow identification: wrtcParams needs workflowSpec, or both workspaceName and workflowId";
pub const AMBIGUOUS_WORKFLOW: &str = "Ambiguous workflow identification: wrtcParams must use workflowSpec or workspaceName/workflowId, not both";

#[derive(Debug, Default, Deserialize)]
pub struct RawInitRequest {
    #[serde(default)]
    pub offer: Option<RawOffer>,
    #[serde(default, rename = "wrtcParams")]
    pub wrtc_params: Option<RawWorkflowParams>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawOffer {
    #[serde(default)]
    pub sdp: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawWorkflowParams {
    #[serde(default)]
    pub workflow_spec: Option<Value>,
    #[serde(default)]
    pub workspace_name: Option<String>,
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub image_input_name: Option<String>,
    #[serde(default)]
    pub stream_output_names: Option<Vec<String>>,
    #[serde(default)]
    pub data_output_names: Option<Vec<String>>,
    #[serde(default)]
    pub workflow_parameters: Option<Map<String, Value>>,
    #[serde(default)]
    pub thread_pool_workers: Option<u32>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Checks run in order and stop at the first failure: offer, then workflow identification.
pub fn validate(raw: RawInitRequest) -> Result<InitWebrtcRequest, ProxyError> {
    let offer = validate_offer(raw.offer)?;
    let wrtc_params = validate_params(raw.wrtc_params)?;
    Ok(InitWebrtcRequest { offer, wrtc_params })
}

fn validate_offer(raw: Option<RawOffer>) -> Result<SessionOffer, ProxyError> {
    let raw = raw.ok_or_else(|| ProxyError::bad_request(MISSING_OFFER))?;
    let (Some(sdp), Some(kind)) = (non_blank(raw.sdp), non_blank(raw.kind)) else {
        return Err(ProxyError::bad_request(MISSING_OFFER));
    };
    if sdp.len() > MAX_SDP_BYTES {
        return Err(ProxyError::bad_request(format!(
            "offer.sdp exceeds {MAX_SDP_BYTES} bytes"
        )));
    }
    Ok(SessionOffer { sdp, kind })
}

fn validate_params(raw: Option<RawWorkflowParams>) -> Result<WorkflowParams, ProxyError> {
    let raw = raw.ok_or_else(|| ProxyError::bad_request(MISSING_WORKFLOW))?;

    let spec = raw.workflow_spec;
    let published = match (non_blank(raw.workspace_name), non_blank(raw.workflow_id)) {
        (Some(workspace_name), Some(workflow_id)) => Some(WorkflowSource::Published {
            workspace_name,
            workflow_id,
        }),
        _ => None,
    };

    let source = match (spec, published) {
        (Some(_), Some(_)) => return Err(ProxyError::bad_request(AMBIGUOUS_WORKFLOW)),
        (Some(workflow_spec), None) => {
            if !workflow_spec.is_object() {
                return Err(ProxyError::bad_request(
                    "wrtcParams.workflowSpec must be a JSON object",
                ));
            }
            WorkflowSource::Specification { workflow_spec }
        }
        (None, Some(published)) => published,
        (None, None) => return Err(ProxyError::bad_request(MISSING_WORKFLOW)),
    };

    Ok(WorkflowParams {
        source,
        image_input_name: non_blank(raw.image_input_name)
            .unwrap_or_else(|| DEFAULT_IMAGE_INPUT_NAME.to_string()),
        stream_output_names: raw.stream_output_names.unwrap_or_default(),
        data_output_names: raw.data_output_names.unwrap_or_default(),
        workflow_parameters: raw.workflow_parameters,
        thread_pool_workers: raw.thread_pool_workers,
    })
}
