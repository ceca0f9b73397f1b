//! End-to-end tests against a fake inference server.
//!
//! Covers:
//! - the real reqwest client hitting `/initialise_webrtc_worker`
//! - credential attachment on the outbound call only
//! - vendor error bodies surfacing as `{error}` with status 500
//! - answers relayed as the vendor sent them, `null`s included
//! - unreachable vendor reported without the vendor URL

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::{self, Body},
    extract::State,
    http::{Request, StatusCode},
    routing::post,
    Json, Router,
};
use lensgate_common::ApiKey;
use lensgate_proxy::{build_router, AppState, HttpSessionInitiator, ProxyConfig};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

const SECRET: &str = "rf_integration_secret_42";

#[derive(Clone)]
struct VendorState {
    received: Arc<Mutex<Vec<Value>>>,
    reply: (StatusCode, Value),
}

async fn init_worker(
    State(state): State<VendorState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.received.lock().unwrap().push(body);
    (state.reply.0, Json(state.reply.1.clone()))
}

async fn spawn_vendor(reply: (StatusCode, Value)) -> (SocketAddr, Arc<Mutex<Vec<Value>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/initialise_webrtc_worker", post(init_worker))
        .with_state(VendorState {
            received: received.clone(),
            reply,
        });

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake vendor");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, received)
}

fn proxy_for(server_url: &str, api_key: Option<&str>) -> Router {
    let mut config = ProxyConfig::new(api_key.and_then(ApiKey::new));
    config.server_url = server_url.to_string();
    let initiator = HttpSessionInitiator::new(&config.server_url, Duration::from_secs(5))
        .expect("Failed to build HTTP client");
    build_router(AppState::new(config, Arc::new(initiator)))
}

async fn post_init(app: Router, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/init-webrtc")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn published_request() -> Value {
    json!({
        "offer": {"sdp": "v=0\r\ns=-\r\n", "type": "offer"},
        "wrtcParams": {
            "workspaceName": "acme",
            "workflowId": "people-counter",
            "imageInputName": "image",
            "streamOutputNames": ["output_image"],
            "dataOutputNames": ["count"],
            "workflowParameters": {"confidence": 0.5},
            "threadPoolWorkers": 2
        }
    })
}

#[tokio::test]
async fn test_answer_is_relayed_unchanged() {
    let answer = json!({
        "sdp": "v=0\r\ns=answer\r\n",
        "type": "answer",
        "context": {"request_id": "req-9", "pipeline_id": "pipe-9"}
    });
    let (addr, received) = spawn_vendor((StatusCode::OK, answer.clone())).await;

    let app = proxy_for(&format!("http://{addr}"), Some(SECRET));
    let (status, body) = post_init(app, published_request()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, answer);
    assert!(!body.to_string().contains(SECRET));

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    let outbound = &received[0];
    assert_eq!(outbound["api_key"], json!(SECRET));
    assert_eq!(
        outbound["webrtc_offer"],
        json!({"sdp": "v=0\r\ns=-\r\n", "type": "offer"})
    );
    assert_eq!(outbound["stream_output"], json!(["output_image"]));
    assert_eq!(outbound["data_output"], json!(["count"]));
    let config = &outbound["workflow_configuration"];
    assert_eq!(config["workspace_name"], json!("acme"));
    assert_eq!(config["workflow_id"], json!("people-counter"));
    assert_eq!(config["workflows_parameters"], json!({"confidence": 0.5}));
    assert_eq!(config["workflows_thread_pool_workers"], json!(2));
}

#[tokio::test]
async fn test_answer_with_null_and_numeric_context_is_relayed_verbatim() {
    let answer = json!({
        "sdp": "v=0",
        "type": "answer",
        "context": {"request_id": null, "pipeline_id": 42}
    });
    let (addr, _) = spawn_vendor((StatusCode::OK, answer.clone())).await;

    let app = proxy_for(&format!("http://{addr}"), Some(SECRET));
    let (status, body) = post_init(app, published_request()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, answer);
}

#[tokio::test]
async fn test_null_context_is_relayed_verbatim() {
    let answer = json!({"sdp": "v=0", "type": "answer", "context": null});
    let (addr, _) = spawn_vendor((StatusCode::OK, answer.clone())).await;

    let app = proxy_for(&format!("http://{addr}"), Some(SECRET));
    let (status, body) = post_init(app, published_request()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, answer);
}

#[tokio::test]
async fn test_vendor_error_message_is_forwarded() {
    let (addr, _) = spawn_vendor((
        StatusCode::UNAUTHORIZED,
        json!({"message": "boom"}),
    ))
    .await;

    let app = proxy_for(&format!("http://{addr}/"), Some(SECRET));
    let (status, body) = post_init(app, published_request()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "boom"}));
}

#[tokio::test]
async fn test_vendor_error_without_message_uses_fallback() {
    let (addr, _) = spawn_vendor((StatusCode::BAD_GATEWAY, json!({"code": 17}))).await;

    let app = proxy_for(&format!("http://{addr}"), Some(SECRET));
    let (status, body) = post_init(app, published_request()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Failed to initialize WebRTC worker"}));
}

#[tokio::test]
async fn test_missing_credential_never_reaches_vendor() {
    let (addr, received) = spawn_vendor((StatusCode::OK, json!({}))).await;

    let app = proxy_for(&format!("http://{addr}"), None);
    let (status, body) = post_init(app, published_request()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("API key"));
    assert!(received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_vendor_is_server_error() {
    // Bind then drop to get a port with nothing listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let app = proxy_for(&format!("http://{addr}"), Some(SECRET));
    let (status, body) = post_init(app, published_request()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Inference server unreachable"}));
    assert!(!body.to_string().contains(&addr.to_string()));
}
