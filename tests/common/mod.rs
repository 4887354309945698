// Shared fixtures for the router and upstream tests
#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, header},
    response::Response,
};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

use seed_gateway::config::Args;
use seed_gateway::feature::{FeatureCatalog, FeatureConfig};
use seed_gateway::relay::HttpUpstream;
use seed_gateway::router;
use seed_gateway::state::AppState;

pub const API_KEY: &str = "test-key";
pub const ADMIN_PASSWORD: &str = "open-sesame";

// router over a temp data dir and a given upstream
pub struct TestEnv {
    pub state: Arc<AppState>,
    pub app: Router,
    _data: TempDir,
}

impl TestEnv {
    pub fn new(upstream_base: &str) -> Self {
        Self::with_credential(upstream_base, Some(API_KEY))
    }

    pub fn with_credential(upstream_base: &str, key: Option<&str>) -> Self {
        let data = tempfile::tempdir().unwrap();
        let args = Args::parse_from([
            "seed-gateway",
            "--data-dir",
            data.path().to_str().unwrap(),
            "--admin-password",
            ADMIN_PASSWORD,
            "--rate-limit",
            "8",
            "--rate-window",
            "3600",
        ]);

        let catalog =
            FeatureCatalog::from_configs(features(upstream_base), |_| key.map(String::from))
                .unwrap();
        let upstream = HttpUpstream::new(Duration::from_secs(5)).unwrap();
        let state = Arc::new(AppState::new(&args, catalog, Arc::new(upstream)));

        Self {
            app: router(Arc::clone(&state)),
            state,
            _data: data,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }
}

pub fn features(upstream_base: &str) -> Vec<FeatureConfig> {
    let endpoint = format!("{}/v1/chat/completions", upstream_base);
    serde_json::from_value(serde_json::json!([
        {
            "name": "godseed",
            "endpoint": endpoint,
            "model": "collapse-model",
            "credential_env": "TEST_GODSEED_KEY",
            "system_prompt": "Collapse engine. Seed: {seed}",
            "user_prompt": "Begin. Seed: {seed}",
            "framing": "sse",
            "trailer": "still collapsing: {seed}",
            "unauthorized": "not authorized, submit a seed first"
        },
        {
            "name": "ai",
            "endpoint": endpoint,
            "model": "chat-model",
            "credential_env": "TEST_AI_KEY",
            "system_prompt": "Be helpful.",
            "framing": "text",
            "trailer": "--",
            "history": true,
            "headers": { "X-Title": "KnitSite AI Chat" }
        }
    ]))
    .unwrap()
}

pub fn start_request(feature: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(format!("/{}/start", feature))
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn stream_request(feature: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(format!("/{}/stream", feature));
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// "relay_session=<id>" from Set-Cookie
pub fn session_cookie(response: &Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_string())
        .expect("response sets a session cookie")
}

pub async fn body_string(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn sse_chunk(text: &str) -> String {
    let chunk = serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion.chunk",
        "choices": [{ "index": 0, "delta": { "content": text }, "finish_reason": null }]
    });
    format!("data: {}\n\n", chunk)
}

pub fn sse_body(parts: &[&str]) -> String {
    let mut body: String = parts.iter().map(|p| sse_chunk(p)).collect();
    body.push_str("data: [DONE]\n\n");
    body
}
