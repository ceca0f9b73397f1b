//! Capability seams around the opaque stream SDK.
//!
//! A [`StreamConnector`] owns camera capture, peer-connection setup and the SDP
//! exchange through the proxy. The controller only sees the resulting
//! [`Connection`] and the data values pushed into a [`DataPreview`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lensgate_common::Result;
use serde_json::Value;

use crate::config::StreamConfig;

/// One established session.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Media handle the video sink renders.
    type Stream: Send;

    async fn remote_stream(&self) -> Result<Self::Stream>;

    /// Tears down the peer connection and stops local capture.
    async fn cleanup(&self) -> Result<()>;
}

#[async_trait]
pub trait StreamConnector: Send + Sync {
    type Connection: Connection;

    async fn connect(&self, request: StreamRequest) -> Result<Self::Connection>;
}

/// Stream type produced by a connector's connections.
pub type StreamOf<C> = <<C as StreamConnector>::Connection as Connection>::Stream;

pub struct StreamRequest {
    pub config: StreamConfig,
    /// Receives workflow data-channel values for the lifetime of the connection.
    pub on_data: Arc<DataPreview>,
}

/// Counters and last value of the workflow data channel, shown next to the video.
#[derive(Debug, Default)]
pub struct DataPreview {
    messages: AtomicU64,
    last: Mutex<Option<Value>>,
}

impl DataPreview {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, value: Value) {
        self.messages.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last.lock() {
            *last = Some(value);
        }
    }

    pub fn message_count(&self) -> u64 {
        self.messages.load(Ordering::Relaxed)
    }

    pub fn last_value(&self) -> Option<Value> {
        self.last.lock().ok().and_then(|last| last.clone())
    }

    pub fn reset(&self) {
        self.messages.store(0, Ordering::Relaxed);
        if let Ok(mut last) = self.last.lock() {
            *last = None;
        }
    }
}

/// Where the remote stream is rendered.
#[async_trait]
pub trait VideoSink<S: Send>: Send {
    fn attach(&mut self, stream: S);

    /// Starts playback. Browsers may refuse autoplay; callers treat failure as non-fatal.
    async fn play(&mut self) -> Result<()>;

    fn detach(&mut self);
}
