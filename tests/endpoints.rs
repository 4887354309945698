// Router-level tests: start/stream protocol, admin view, contact journal

mod common;

use axum::http::{StatusCode, header};
use serde_json::Value;
use wiremock::matchers::{header as header_is, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;

// No upstream is ever reached in these tests
const UNUSED_UPSTREAM: &str = "http://127.0.0.1:9";

async fn mount_sse(server: &MockServer, parts: &[&str]) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header_is("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body(parts), "text/event-stream"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn ninth_start_within_the_hour_is_rejected() {
    let env = TestEnv::new(UNUSED_UPSTREAM);

    for _ in 0..8 {
        let response = env.send(start_request("godseed", r#"{"seed":"abc"}"#, None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body, serde_json::json!({ "status": "ok" }));
    }

    let response = env.send(start_request("godseed", r#"{"seed":"abc"}"#, None)).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
}

#[tokio::test]
async fn stream_without_start_is_a_single_notice() {
    let env = TestEnv::new(UNUSED_UPSTREAM);

    let response = env.send(stream_request("godseed", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );
    assert_eq!(
        body_string(response).await,
        "data: not authorized, submit a seed first\n\n"
    );
}

#[tokio::test]
async fn unknown_feature_is_not_found() {
    let env = TestEnv::new(UNUSED_UPSTREAM);

    let response = env.send(start_request("nope", "{}", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = env.send(stream_request("nope", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn start_then_stream_relays_once() {
    let server = MockServer::start().await;
    mount_sse(&server, &["Hello", " world"]).await;
    let env = TestEnv::new(&server.uri());

    let started = env
        .send(start_request("godseed", r#"{"seed":"ash"}"#, None))
        .await;
    assert_eq!(started.status(), StatusCode::OK);
    let cookie = session_cookie(&started);

    let response = env.send(stream_request("godseed", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_string(response).await,
        "data: Hello\n\ndata:  world\n\ndata: still collapsing: ash\n\n"
    );

    // the upstream saw the rendered prompts
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent["stream"], true);
    assert_eq!(sent["model"], "collapse-model");
    assert_eq!(sent["messages"][0]["content"], "Collapse engine. Seed: ash");
    assert_eq!(sent["messages"][1]["content"], "Begin. Seed: ash");

    // the grant was single-use
    let replay = env.send(stream_request("godseed", Some(&cookie))).await;
    assert_eq!(
        body_string(replay).await,
        "data: not authorized, submit a seed first\n\n"
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn start_keeps_an_existing_session() {
    let env = TestEnv::new(UNUSED_UPSTREAM);

    let first = env.send(start_request("godseed", "{}", None)).await;
    let cookie = session_cookie(&first);
    let second = env.send(start_request("godseed", "{}", Some(&cookie))).await;

    assert_eq!(session_cookie(&second), cookie);
}

#[tokio::test]
async fn chat_history_is_per_session() {
    let server = MockServer::start().await;
    mount_sse(&server, &["fine, thanks"]).await;
    let env = TestEnv::new(&server.uri());

    // alice, round one
    let started = env
        .send(start_request("ai", r#"{"message":"how are you?"}"#, None))
        .await;
    let alice = session_cookie(&started);
    let response = env.send(stream_request("ai", Some(&alice))).await;
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/plain; charset=utf-8"
    );
    assert_eq!(body_string(response).await, "fine, thanks\n--");

    // alice, round two carries round one
    env.send(start_request("ai", r#"{"message":"and now?"}"#, Some(&alice)))
        .await;
    body_string(env.send(stream_request("ai", Some(&alice))).await).await;

    // bob starts clean
    let started = env
        .send(start_request("ai", r#"{"message":"hi"}"#, None))
        .await;
    let bob = session_cookie(&started);
    body_string(env.send(stream_request("ai", Some(&bob))).await).await;

    let requests = server.received_requests().await.unwrap();
    let messages: Vec<Value> = requests
        .iter()
        .map(|r| serde_json::from_slice::<Value>(&r.body).unwrap()["messages"].clone())
        .collect();

    assert_eq!(messages[0].as_array().unwrap().len(), 2);
    let second = messages[1].as_array().unwrap();
    assert_eq!(second.len(), 4);
    assert_eq!(second[1]["content"], "how are you?");
    assert_eq!(second[2]["role"], "assistant");
    assert_eq!(second[2]["content"], "fine, thanks");
    assert_eq!(second[3]["content"], "and now?");
    assert_eq!(messages[2].as_array().unwrap().len(), 2);

    assert_eq!(requests[0].headers.get("X-Title").unwrap(), "KnitSite AI Chat");
}

#[tokio::test]
async fn upstream_error_becomes_in_band_diagnostic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;
    let env = TestEnv::new(&server.uri());

    let cookie = session_cookie(&env.send(start_request("godseed", "{}", None)).await);
    let response = env.send(stream_request("godseed", Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "data: [error: HTTP 503]\n\n");
}

#[tokio::test]
async fn failed_chat_is_not_remembered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let env = TestEnv::new(&server.uri());

    let cookie = session_cookie(&env.send(start_request("ai", r#"{"seed":"hello"}"#, None)).await);
    let body = body_string(env.send(stream_request("ai", Some(&cookie))).await).await;

    assert_eq!(body, "\n[HTTP Error 500]");
    assert!(env.state.conversations.is_empty());
}

#[tokio::test]
async fn missing_credential_fails_without_calling_upstream() {
    let server = MockServer::start().await;
    let env = TestEnv::with_credential(&server.uri(), None);

    let cookie = session_cookie(&env.send(start_request("godseed", "{}", None)).await);
    let body = body_string(env.send(stream_request("godseed", Some(&cookie))).await).await;

    assert_eq!(body, "data: [error: credential]\n\n");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn admin_requires_the_password() {
    let env = TestEnv::new(UNUSED_UPSTREAM);

    let response = env.send(get("/admin?pwd=guess")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "wrong password");

    let response = env.send(get("/admin")).await;
    assert_eq!(body_string(response).await, "wrong password");
}

#[tokio::test]
async fn admin_view_lists_recorded_visits() {
    let env = TestEnv::new(UNUSED_UPSTREAM);

    env.send(get("/health")).await;
    env.send(start_request("godseed", "{}", None)).await;
    let response = env
        .send(get(&format!("/admin?pwd={}", ADMIN_PASSWORD)))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let view: Value = serde_json::from_str(&body_string(response).await).unwrap();
    let paths: Vec<&str> = view["visits"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["path"].as_str().unwrap())
        .collect();

    assert_eq!(paths, vec!["/health", "/godseed/start", "/admin"]);
    assert_eq!(view["visits_total"], 3);
    assert_eq!(view["pending_grants"], 1);
    assert_eq!(view["features"], serde_json::json!(["ai", "godseed"]));
    assert_eq!(view["visits"][0]["ip"], "unknown");
}

#[tokio::test]
async fn contact_is_journaled_and_throttled() {
    let env = TestEnv::new(UNUSED_UPSTREAM);
    let form = serde_json::json!({
        "name": " Mei ",
        "email": "mei@example.com",
        "business_type": "其他",
        "message": "x".repeat(2500)
    })
    .to_string();

    let contact = |body: String| {
        axum::http::Request::builder()
            .method("POST")
            .uri("/contact")
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(body))
            .unwrap()
    };

    let first = env.send(contact(form.clone())).await;
    assert_eq!(first.status(), StatusCode::OK);
    let second = env.send(contact(form)).await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

    let inquiries = env.state.inquiries.read_all().await.unwrap();
    assert_eq!(inquiries.len(), 1);
    assert_eq!(inquiries[0].name, "Mei");
    assert_eq!(inquiries[0].message.chars().count(), 2000);
}

#[tokio::test]
async fn health_and_metrics() {
    let env = TestEnv::new(UNUSED_UPSTREAM);

    let response = env.send(get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["status"], "healthy");

    env.send(start_request("godseed", "{}", None)).await;
    let metrics = body_string(env.send(get("/metrics")).await).await;
    assert!(metrics.contains("seed_gateway_start_requests_total"));
    assert!(metrics.contains("seed_gateway_rate_buckets"));
}
