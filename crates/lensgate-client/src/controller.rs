//! Start/stop lifecycle of a single capture session.
//!
//! The controller owns the active [`Connection`] directly. Every exit path out
//! of `Connected` goes through [`CaptureController::stop`], which clears the
//! session before attempting cleanup so a failing teardown can never leave a
//! stale handle behind.

use std::sync::Arc;

use thiserror::Error;

use crate::config::StreamConfig;
use crate::connector::{
    Connection, DataPreview, StreamConnector, StreamOf, StreamRequest, VideoSink,
};

const API_KEY_HINT: &str = "Set LENSGATE_API_KEY for the proxy and restart it.";

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("{0}")]
    Connect(lensgate_common::Error),

    #[error("Remote stream unavailable: {0}")]
    RemoteStream(lensgate_common::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Connected,
    Stopping,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    Ready,
    Connecting,
    Connected,
    Stopped,
    Failed {
        message: String,
        hint: Option<String>,
    },
}

impl StatusMessage {
    fn failed(message: String) -> Self {
        let hint = message.contains("API key").then(|| API_KEY_HINT.to_string());
        StatusMessage::Failed { message, hint }
    }
}

impl std::fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusMessage::Ready => write!(f, "Ready"),
            StatusMessage::Connecting => write!(f, "Connecting..."),
            StatusMessage::Connected => write!(f, "Connected"),
            StatusMessage::Stopped => write!(f, "Stopped"),
            StatusMessage::Failed { message, hint } => match hint {
                Some(hint) => write!(f, "Error: {message} ({hint})"),
                None => write!(f, "Error: {message}"),
            },
        }
    }
}

/// What the view renders: button enablement plus the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    pub start_enabled: bool,
    pub stop_enabled: bool,
    pub status: StatusMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyActive,
}

pub struct CaptureController<C, V>
where
    C: StreamConnector,
{
    connector: C,
    video: V,
    session: Option<C::Connection>,
    state: SessionState,
    status: StatusMessage,
    preview: Arc<DataPreview>,
}

impl<C, V> CaptureController<C, V>
where
    C: StreamConnector,
    V: VideoSink<StreamOf<C>>,
{
    pub fn new(connector: C, video: V) -> Self {
        Self {
            connector,
            video,
            session: None,
            state: SessionState::Idle,
            status: StatusMessage::Ready,
            preview: DataPreview::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn preview(&self) -> &Arc<DataPreview> {
        &self.preview
    }

    pub fn video(&self) -> &V {
        &self.video
    }

    pub fn ui_state(&self) -> UiState {
        UiState {
            start_enabled: self.state == SessionState::Idle,
            stop_enabled: self.state == SessionState::Connected,
            status: self.status.clone(),
        }
    }

    pub async fn start(&mut self, config: StreamConfig) -> Result<StartOutcome, ControllerError> {
        if self.state != SessionState::Idle || self.session.is_some() {
            tracing::warn!("start ignored: a session is already {:?}", self.state);
            return Ok(StartOutcome::AlreadyActive);
        }

        self.state = SessionState::Connecting;
        self.status = StatusMessage::Connecting;
        self.preview.reset();
        tracing::info!(
            "connecting via {} ({})",
            config.proxy_url,
            config.wrtc_params.source.describe()
        );

        let request = StreamRequest {
            config,
            on_data: self.preview.clone(),
        };
        let connection = match self.connector.connect(request).await {
            Ok(connection) => connection,
            Err(err) => {
                tracing::error!("connect failed: {}", err);
                self.state = SessionState::Idle;
                self.status = StatusMessage::failed(err.to_string());
                return Err(ControllerError::Connect(err));
            }
        };

        let stream = match connection.remote_stream().await {
            Ok(stream) => stream,
            Err(err) => {
                tracing::error!("remote stream unavailable: {}", err);
                if let Err(cleanup_err) = connection.cleanup().await {
                    tracing::warn!("cleanup after failed start: {}", cleanup_err);
                }
                self.state = SessionState::Idle;
                self.status = StatusMessage::failed(err.to_string());
                return Err(ControllerError::RemoteStream(err));
            }
        };

        self.session = Some(connection);
        self.video.attach(stream);
        if let Err(err) = self.video.play().await {
            tracing::warn!("video playback did not start: {}", err);
        }

        self.state = SessionState::Connected;
        self.status = StatusMessage::Connected;
        tracing::info!("session connected");
        Ok(StartOutcome::Started)
    }

    /// Ends the session. Always lands in `Idle`; cleanup errors are only logged.
    pub async fn stop(&mut self) {
        let Some(connection) = self.session.take() else {
            self.state = SessionState::Idle;
            return;
        };

        self.state = SessionState::Stopping;
        if let Err(err) = connection.cleanup().await {
            tracing::warn!("connection cleanup failed: {}", err);
        }

        self.video.detach();
        self.preview.reset();
        self.state = SessionState::Idle;
        self.status = StatusMessage::Stopped;
        tracing::info!("session stopped");
    }

    /// Teardown hook for when the owning view goes away.
    pub async fn shutdown(&mut self) {
        if self.session.is_some() {
            self.stop().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{build_stream_config, ConnectionForm, DEFAULT_PROXY_PATH};
    use async_trait::async_trait;
    use lensgate_common::{Error, Result};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counters {
        connects: AtomicUsize,
        cleanups: AtomicUsize,
    }

    struct FakeConnection {
        counters: Arc<Counters>,
        fail_cleanup: bool,
        fail_stream: bool,
    }

    #[async_trait]
    impl Connection for FakeConnection {
        type Stream = String;

        async fn remote_stream(&self) -> Result<String> {
            if self.fail_stream {
                return Err(Error::internal("no remote track"));
            }
            Ok("remote-stream".to_string())
        }

        async fn cleanup(&self) -> Result<()> {
            self.counters.cleanups.fetch_add(1, Ordering::SeqCst);
            if self.fail_cleanup {
                return Err(Error::internal("peer connection already closed"));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeConnector {
        counters: Arc<Counters>,
        reject_with: Option<String>,
        fail_cleanup: bool,
        fail_stream: bool,
    }

    #[async_trait]
    impl StreamConnector for FakeConnector {
        type Connection = FakeConnection;

        async fn connect(&self, request: StreamRequest) -> Result<FakeConnection> {
            self.counters.connects.fetch_add(1, Ordering::SeqCst);
            if let Some(message) = &self.reject_with {
                return Err(Error::http(Some(500), message.clone()));
            }
            request.on_data.push(json!({"predictions": []}));
            Ok(FakeConnection {
                counters: self.counters.clone(),
                fail_cleanup: self.fail_cleanup,
                fail_stream: self.fail_stream,
            })
        }
    }

    #[derive(Default)]
    struct FakeVideo {
        attached: Option<String>,
        fail_play: bool,
        plays: usize,
    }

    #[async_trait]
    impl VideoSink<String> for FakeVideo {
        fn attach(&mut self, stream: String) {
            self.attached = Some(stream);
        }

        async fn play(&mut self) -> Result<()> {
            self.plays += 1;
            if self.fail_play {
                return Err(Error::internal("autoplay blocked"));
            }
            Ok(())
        }

        fn detach(&mut self) {
            self.attached = None;
        }
    }

    fn config() -> StreamConfig {
        build_stream_config(&ConnectionForm::default(), DEFAULT_PROXY_PATH).unwrap()
    }

    #[tokio::test]
    async fn test_start_connects_and_attaches_stream() {
        let connector = FakeConnector::default();
        let counters = connector.counters.clone();
        let mut controller = CaptureController::new(connector, FakeVideo::default());

        let outcome = controller.start(config()).await.unwrap();

        assert_eq!(outcome, StartOutcome::Started);
        assert_eq!(controller.state(), SessionState::Connected);
        assert_eq!(controller.video().attached.as_deref(), Some("remote-stream"));
        assert_eq!(controller.preview().message_count(), 1);
        assert_eq!(counters.connects.load(Ordering::SeqCst), 1);

        let ui = controller.ui_state();
        assert!(!ui.start_enabled);
        assert!(ui.stop_enabled);
        assert_eq!(ui.status, StatusMessage::Connected);
    }

    #[tokio::test]
    async fn test_second_start_is_noop() {
        let connector = FakeConnector::default();
        let counters = connector.counters.clone();
        let mut controller = CaptureController::new(connector, FakeVideo::default());

        controller.start(config()).await.unwrap();
        let outcome = controller.start(config()).await.unwrap();

        assert_eq!(outcome, StartOutcome::AlreadyActive);
        assert_eq!(counters.connects.load(Ordering::SeqCst), 1);
        assert_eq!(controller.state(), SessionState::Connected);
    }

    #[tokio::test]
    async fn test_failed_connect_returns_to_idle() {
        let connector = FakeConnector {
            reject_with: Some("Workflow not found".into()),
            ..Default::default()
        };
        let mut controller = CaptureController::new(connector, FakeVideo::default());

        let err = controller.start(config()).await.unwrap_err();

        assert!(matches!(err, ControllerError::Connect(_)));
        assert!(!controller.is_active());
        assert_eq!(controller.state(), SessionState::Idle);
        let ui = controller.ui_state();
        assert!(ui.start_enabled);
        assert!(!ui.stop_enabled);
        assert_eq!(
            ui.status,
            StatusMessage::Failed {
                message: "Workflow not found".into(),
                hint: None
            }
        );
    }

    #[tokio::test]
    async fn test_api_key_failure_carries_hint() {
        let connector = FakeConnector {
            reject_with: Some("Server configuration error: API key is not configured".into()),
            ..Default::default()
        };
        let mut controller = CaptureController::new(connector, FakeVideo::default());

        assert!(controller.start(config()).await.is_err());

        match controller.ui_state().status {
            StatusMessage::Failed { hint, .. } => assert_eq!(hint.as_deref(), Some(API_KEY_HINT)),
            other => panic!("expected failure status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stop_returns_to_idle_when_cleanup_fails() {
        let connector = FakeConnector {
            fail_cleanup: true,
            ..Default::default()
        };
        let counters = connector.counters.clone();
        let mut controller = CaptureController::new(connector, FakeVideo::default());
        controller.start(config()).await.unwrap();

        controller.stop().await;

        assert_eq!(counters.cleanups.load(Ordering::SeqCst), 1);
        assert!(!controller.is_active());
        assert_eq!(controller.state(), SessionState::Idle);
        assert_eq!(controller.video().attached, None);
        assert_eq!(controller.preview().message_count(), 0);
        let ui = controller.ui_state();
        assert!(ui.start_enabled);
        assert_eq!(ui.status, StatusMessage::Stopped);
    }

    #[tokio::test]
    async fn test_play_failure_is_not_fatal() {
        let video = FakeVideo {
            fail_play: true,
            ..Default::default()
        };
        let mut controller = CaptureController::new(FakeConnector::default(), video);

        controller.start(config()).await.unwrap();

        assert_eq!(controller.state(), SessionState::Connected);
        assert_eq!(controller.video().plays, 1);
    }

    #[tokio::test]
    async fn test_remote_stream_failure_cleans_up() {
        let connector = FakeConnector {
            fail_stream: true,
            ..Default::default()
        };
        let counters = connector.counters.clone();
        let mut controller = CaptureController::new(connector, FakeVideo::default());

        let err = controller.start(config()).await.unwrap_err();

        assert!(matches!(err, ControllerError::RemoteStream(_)));
        assert_eq!(counters.cleanups.load(Ordering::SeqCst), 1);
        assert!(!controller.is_active());
        assert!(controller.ui_state().start_enabled);
    }

    #[tokio::test]
    async fn test_shutdown_cleans_active_session_once() {
        let connector = FakeConnector::default();
        let counters = connector.counters.clone();
        let mut controller = CaptureController::new(connector, FakeVideo::default());

        controller.shutdown().await;
        assert_eq!(counters.cleanups.load(Ordering::SeqCst), 0);

        controller.start(config()).await.unwrap();
        controller.shutdown().await;
        controller.shutdown().await;
        assert_eq!(counters.cleanups.load(Ordering::SeqCst), 1);
        assert_eq!(controller.state(), SessionState::Idle);
    }
}
