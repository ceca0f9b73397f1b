//! Turns form state into the configuration handed to a stream connector.

use lensgate_common::{
    InitWebrtcRequest, SessionOffer, WorkflowParams, WorkflowSource, DEFAULT_IMAGE_INPUT_NAME,
};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::camera::CameraConstraints;

pub const DEFAULT_PROXY_PATH: &str = "/api/init-webrtc";

const EXAMPLE_STREAM_OUTPUT: &str = "output_image";
const EXAMPLE_DATA_OUTPUT: &str = "predictions";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("Enter both a workspace name and a workflow id")]
    MissingWorkflowReference,

    #[error("Enter at least one stream output name")]
    MissingStreamOutput,

    #[error("Thread pool workers must be between 1 and 32")]
    InvalidThreadPoolWorkers,
}

/// Which workflow the session runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkflowMode {
    /// Built-in object detection workflow with box and label overlays.
    #[default]
    Example,
    /// A workflow published in the user's workspace.
    Custom,
}

/// Raw form fields as the user typed them.
#[derive(Debug, Clone, Default)]
pub struct ConnectionForm {
    pub mode: WorkflowMode,
    pub workspace_name: String,
    pub workflow_id: String,
    pub image_input_name: String,
    /// Comma-separated.
    pub stream_outputs: String,
    /// Comma-separated.
    pub data_outputs: String,
    pub workflow_parameters: Map<String, Value>,
    pub thread_pool_workers: Option<u32>,
    pub camera: CameraConstraints,
}

/// Options forwarded to the connector alongside the workflow parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    pub disable_input_stream_downscaling: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            disable_input_stream_downscaling: true,
        }
    }
}

/// Everything a connector needs to start one session.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfig {
    pub proxy_url: String,
    pub wrtc_params: WorkflowParams,
    pub camera: CameraConstraints,
    pub options: StreamOptions,
}

impl StreamConfig {
    /// Proxy request body for a given offer.
    pub fn init_request(&self, offer: SessionOffer) -> InitWebrtcRequest {
        InitWebrtcRequest {
            offer,
            wrtc_params: self.wrtc_params.clone(),
        }
    }
}

fn split_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn example_workflow_spec() -> Value {
    json!({
        "version": "1.0",
        "inputs": [
            { "type": "InferenceImage", "name": DEFAULT_IMAGE_INPUT_NAME }
        ],
        "steps": [
            {
                "type": "roboflow_core/roboflow_object_detection_model@v2",
                "name": "model",
                "images": "$inputs.image",
                "model_id": "yolov8n-640"
            },
            {
                "type": "roboflow_core/bounding_box_visualization@v1",
                "name": "boxes",
                "image": "$inputs.image",
                "predictions": "$steps.model.predictions"
            },
            {
                "type": "roboflow_core/label_visualization@v1",
                "name": "labels",
                "image": "$steps.boxes.image",
                "predictions": "$steps.model.predictions"
            }
        ],
        "outputs": [
            { "type": "JsonField", "name": EXAMPLE_STREAM_OUTPUT, "selector": "$steps.labels.image" },
            { "type": "JsonField", "name": EXAMPLE_DATA_OUTPUT, "selector": "$steps.model.predictions" }
        ]
    })
}

/// Validates the form and assembles a [`StreamConfig`] targeting `proxy_url`.
pub fn build_stream_config(
    form: &ConnectionForm,
    proxy_url: &str,
) -> Result<StreamConfig, FormError> {
    if let Some(workers) = form.thread_pool_workers {
        if !(1..=32).contains(&workers) {
            return Err(FormError::InvalidThreadPoolWorkers);
        }
    }

    let mut params = match form.mode {
        WorkflowMode::Example => {
            let mut params = WorkflowParams::new(WorkflowSource::Specification {
                workflow_spec: example_workflow_spec(),
            });
            params.stream_output_names = vec![EXAMPLE_STREAM_OUTPUT.to_string()];
            params.data_output_names = vec![EXAMPLE_DATA_OUTPUT.to_string()];
            params
        }
        WorkflowMode::Custom => {
            let workspace = form.workspace_name.trim();
            let workflow = form.workflow_id.trim();
            if workspace.is_empty() || workflow.is_empty() {
                return Err(FormError::MissingWorkflowReference);
            }

            let stream_outputs = split_names(&form.stream_outputs);
            if stream_outputs.is_empty() {
                return Err(FormError::MissingStreamOutput);
            }

            let mut params = WorkflowParams::new(WorkflowSource::published(workspace, workflow));
            params.stream_output_names = stream_outputs;
            params.data_output_names = split_names(&form.data_outputs);
            let input = form.image_input_name.trim();
            if !input.is_empty() {
                params.image_input_name = input.to_string();
            }
            params
        }
    };

    if !form.workflow_parameters.is_empty() {
        params.workflow_parameters = Some(form.workflow_parameters.clone());
    }
    params.thread_pool_workers = form.thread_pool_workers;

    Ok(StreamConfig {
        proxy_url: proxy_url.to_string(),
        wrtc_params: params,
        camera: form.camera.clone(),
        options: StreamOptions::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_mode_uses_inline_spec() {
        let config = build_stream_config(&ConnectionForm::default(), DEFAULT_PROXY_PATH).unwrap();

        assert_eq!(config.proxy_url, DEFAULT_PROXY_PATH);
        match &config.wrtc_params.source {
            WorkflowSource::Specification { workflow_spec } => {
                assert_eq!(workflow_spec["outputs"][0]["name"], json!("output_image"));
            }
            other => panic!("expected inline spec, got {other:?}"),
        }
        assert_eq!(config.wrtc_params.stream_output_names, vec!["output_image"]);
        assert_eq!(config.wrtc_params.data_output_names, vec!["predictions"]);
        assert!(config.options.disable_input_stream_downscaling);
    }

    #[test]
    fn test_example_mode_ignores_custom_fields() {
        let form = ConnectionForm {
            workspace_name: "acme".into(),
            workflow_id: "detect".into(),
            stream_outputs: "other".into(),
            ..Default::default()
        };
        let config = build_stream_config(&form, DEFAULT_PROXY_PATH).unwrap();
        assert!(matches!(
            config.wrtc_params.source,
            WorkflowSource::Specification { .. }
        ));
    }

    #[test]
    fn test_custom_mode_builds_published_reference() {
        let mut parameters = Map::new();
        parameters.insert("confidence".into(), json!(0.4));
        let form = ConnectionForm {
            mode: WorkflowMode::Custom,
            workspace_name: " acme ".into(),
            workflow_id: "people-counter".into(),
            image_input_name: "frame".into(),
            stream_outputs: "annotated, ,overlay".into(),
            data_outputs: "count".into(),
            workflow_parameters: parameters,
            thread_pool_workers: Some(2),
            ..Default::default()
        };

        let config = build_stream_config(&form, "http://127.0.0.1:3000/api/init-webrtc").unwrap();
        let params = &config.wrtc_params;
        assert_eq!(params.source, WorkflowSource::published("acme", "people-counter"));
        assert_eq!(params.image_input_name, "frame");
        assert_eq!(params.stream_output_names, vec!["annotated", "overlay"]);
        assert_eq!(params.data_output_names, vec!["count"]);
        assert_eq!(params.thread_pool_workers, Some(2));
        assert_eq!(
            params.workflow_parameters.as_ref().unwrap()["confidence"],
            json!(0.4)
        );
    }

    #[test]
    fn test_custom_mode_requires_reference_pair() {
        let form = ConnectionForm {
            mode: WorkflowMode::Custom,
            workspace_name: "acme".into(),
            stream_outputs: "output_image".into(),
            ..Default::default()
        };
        assert_eq!(
            build_stream_config(&form, DEFAULT_PROXY_PATH),
            Err(FormError::MissingWorkflowReference)
        );
    }

    #[test]
    fn test_custom_mode_requires_stream_output() {
        let form = ConnectionForm {
            mode: WorkflowMode::Custom,
            workspace_name: "acme".into(),
            workflow_id: "detect".into(),
            stream_outputs: " , ".into(),
            ..Default::default()
        };
        assert_eq!(
            build_stream_config(&form, DEFAULT_PROXY_PATH),
            Err(FormError::MissingStreamOutput)
        );
    }

    #[test]
    fn test_thread_pool_bounds() {
        let form = ConnectionForm {
            thread_pool_workers: Some(0),
            ..Default::default()
        };
        assert_eq!(
            build_stream_config(&form, DEFAULT_PROXY_PATH),
            Err(FormError::InvalidThreadPoolWorkers)
        );
    }

    #[test]
    fn test_init_request_wraps_offer() {
        let config = build_stream_config(&ConnectionForm::default(), DEFAULT_PROXY_PATH).unwrap();
        let request = config.init_request(SessionOffer::new("v=0"));
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["offer"], json!({"sdp": "v=0", "type": "offer"}));
        assert!(value["wrtcParams"]["workflowSpec"].is_object());
    }
}
