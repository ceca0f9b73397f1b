//! Capture side of Lensgate: camera option lists, session configuration,
//! the start/stop controller and an HTTP client for the proxy.
//!
//! Media itself stays behind [`connector::StreamConnector`]; this crate never
//! touches RTP or codecs.

#![forbid(unsafe_code)]

pub mod camera;
pub mod config;
pub mod connector;
pub mod controller;
pub mod signaler;

pub use camera::{camera_options, CameraCatalog, CameraConstraints, CameraDevice, CameraOptions};
pub use config::{build_stream_config, ConnectionForm, FormError, StreamConfig, WorkflowMode};
pub use connector::{Connection, DataPreview, StreamConnector, StreamRequest, VideoSink};
pub use controller::{
    CaptureController, ControllerError, SessionState, StartOutcome, StatusMessage, UiState,
};
pub use signaler::ProxySignaler;
