//! HTTP client for the proxy's two routes.

use std::time::Duration;

use lensgate_common::{
    helpers::trim_base_url, Error, ErrorResponse, HealthResponse, InitWebrtcRequest, Result,
    SessionAnswer,
};
use serde::de::DeserializeOwned;

const INIT_PATH: &str = "/api/init-webrtc";
const HEALTH_PATH: &str = "/api/health";

/// Talks to a running proxy. Connectors use [`ProxySignaler::init_webrtc`] for
/// the offer/answer exchange.
#[derive(Debug, Clone)]
pub struct ProxySignaler {
    http: reqwest::Client,
    base_url: String,
}

impl ProxySignaler {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lensgate-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: trim_base_url(base_url).to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn init_url(&self) -> String {
        format!("{}{}", self.base_url, INIT_PATH)
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let url = format!("{}{}", self.base_url, HEALTH_PATH);
        let response = self.http.get(&url).send().await.map_err(transport)?;
        read_json(response).await
    }

    pub async fn init_webrtc(&self, request: &InitWebrtcRequest) -> Result<SessionAnswer> {
        let response = self
            .http
            .post(self.init_url())
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        let answer: SessionAnswer = read_json(response).await?;
        if answer.sdp().is_none() || answer.kind().is_none() {
            return Err(Error::protocol("answer is missing sdp or type"));
        }
        Ok(answer)
    }
}

fn transport(err: reqwest::Error) -> Error {
    Error::http(err.status().map(|s| s.as_u16()), err)
}

/// Decodes a success body, or turns the proxy's `{error}` body into [`Error::Http`].
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(transport)?;

    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorResponse>(&bytes)
            .map(|body| body.error)
            .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).trim().to_string());
        let message = if message.is_empty() {
            format!("proxy returned {status}")
        } else {
            message
        };
        return Err(Error::http(Some(status.as_u16()), message));
    }

    Ok(serde_json::from_slice(&bytes)?)
}
