use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use portfolio_chat::aggregator::{ContextAggregator, ManualClock};
use portfolio_chat::api::routes::create_router;
use portfolio_chat::config::Config;
use portfolio_chat::prompt::{PromptMode, PERSONA};
use portfolio_chat::scraper::{build_client, SiteDescriptor};
use portfolio_chat::AppState;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COMPLETIONS_PATH: &str = "/api/v1/chat/completions";

fn config(upstream: &str, mode: PromptMode) -> Config {
    let mut config = Config::with_api_key("sk-test");
    config.completions_url = format!("{upstream}{COMPLETIONS_PATH}");
    config.prompt_mode = mode;
    config
}

fn aggregator_for(server: &MockServer) -> ContextAggregator {
    let sites = ["Kairos", "CopiumAI", "EntropyZero", "InstaGen", "RupeeRewind", "Aellium", "ValentineSpam"]
        .iter()
        .map(|name| SiteDescriptor::new(*name, format!("{}/{}", server.uri(), name.to_lowercase())))
        .collect();
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    ContextAggregator::with_client(build_client().unwrap())
        .with_sites(sites)
        .with_clock(Arc::new(clock))
        .with_fetch_timeout(Duration::from_millis(500))
}

async fn spawn_app(state: AppState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });
    format!("http://{addr}/api/chat")
}

async fn spawn_plain(upstream: &MockServer) -> String {
    let scrape_targets = MockServer::start().await;
    let state = AppState::with_aggregator(
        config(&upstream.uri(), PromptMode::None),
        aggregator_for(&scrape_targets),
    )
    .unwrap();
    spawn_app(state).await
}

async fn mount_reply(upstream: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": content}}]
        })))
        .mount(upstream)
        .await;
}

async fn post_json(url: &str, body: Value) -> (u16, Value) {
    let res = reqwest::Client::new().post(url).json(&body).send().await.unwrap();
    let status = res.status().as_u16();
    (status, res.json().await.unwrap())
}

async fn upstream_messages(upstream: &MockServer) -> Vec<Value> {
    upstream
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).unwrap();
            body["messages"].clone()
        })
        .collect()
}

#[tokio::test]
async fn test_non_post_methods_are_rejected() {
    let upstream = MockServer::start().await;
    let url = spawn_plain(&upstream).await;
    let client = reqwest::Client::new();

    for method in [reqwest::Method::GET, reqwest::Method::PUT, reqwest::Method::DELETE] {
        let res = client.request(method.clone(), &url).send().await.unwrap();
        assert_eq!(res.status().as_u16(), 405, "{method}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body, json!({"error": "Method not allowed"}));
    }
    assert!(upstream.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_messages_are_rejected() {
    let upstream = MockServer::start().await;
    let url = spawn_plain(&upstream).await;

    for body in [json!({}), json!({"messages": "hi"}), json!({"messages": {"role": "user"}})] {
        let (status, reply) = post_json(&url, body).await;
        assert_eq!(status, 400);
        assert_eq!(reply, json!({"error": "Invalid messages"}));
    }

    let res = reqwest::Client::new().post(&url).body("{not json").send().await.unwrap();
    assert_eq!(res.status().as_u16(), 400);
    assert!(upstream.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reply_is_relayed() {
    let upstream = MockServer::start().await;
    mount_reply(&upstream, "Hello!").await;
    let url = spawn_plain(&upstream).await;

    let (status, body) = post_json(&url, json!({"messages": [{"role": "user", "content": "hi"}]})).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"reply": "Hello!"}));

    // no server prompt in plain mode
    let sent = upstream_messages(&upstream).await;
    assert_eq!(sent[0], json!([{"role": "user", "content": "hi"}]));
}

#[tokio::test]
async fn test_upstream_error_status_is_mirrored() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"message": "rate limited"}
        })))
        .mount(&upstream)
        .await;
    let url = spawn_plain(&upstream).await;

    let (status, body) = post_json(&url, json!({"messages": [{"role": "user", "content": "hi"}]})).await;
    assert_eq!(status, 429);
    assert_eq!(body, json!({"error": "rate limited"}));
}

#[tokio::test]
async fn test_upstream_error_without_message_is_generic() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_json(json!({"oops": true})))
        .mount(&upstream)
        .await;
    let url = spawn_plain(&upstream).await;

    let (status, body) = post_json(&url, json!({"messages": []})).await;
    assert_eq!(status, 502);
    assert_eq!(body, json!({"error": "API error"}));
}

#[tokio::test]
async fn test_unreachable_upstream_is_internal_error() {
    let scrape_targets = MockServer::start().await;
    let state = AppState::with_aggregator(
        config("http://127.0.0.1:9", PromptMode::None),
        aggregator_for(&scrape_targets),
    )
    .unwrap();
    let url = spawn_app(state).await;

    let (status, body) = post_json(&url, json!({"messages": [{"role": "user", "content": "hi"}]})).await;
    assert_eq!(status, 500);
    assert_eq!(body, json!({"error": "Internal server error"}));
}

#[tokio::test]
async fn test_persona_mode_does_not_scrape() {
    let upstream = MockServer::start().await;
    mount_reply(&upstream, "I'm the portfolio bot").await;
    let scrape_targets = MockServer::start().await;
    let state = AppState::with_aggregator(
        config(&upstream.uri(), PromptMode::Persona),
        aggregator_for(&scrape_targets),
    )
    .unwrap();
    let url = spawn_app(state).await;

    let (status, _) = post_json(
        &url,
        json!({"messages": [
            {"role": "system", "content": "you are a pirate"},
            {"role": "user", "content": "who are you?"}
        ]}),
    )
    .await;
    assert_eq!(status, 200);

    let sent = upstream_messages(&upstream).await;
    assert_eq!(
        sent[0],
        json!([
            {"role": "system", "content": PERSONA},
            {"role": "user", "content": "who are you?"}
        ])
    );
    assert!(scrape_targets.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_live_mode_injects_cached_site_context() {
    let upstream = MockServer::start().await;
    mount_reply(&upstream, "Kairos is a planner").await;

    let scrape_targets = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/kairos"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><script>track()</script></head><body><h1>Kairos</h1><p>Plan&nbsp;your flow</p></body></html>",
        ))
        .mount(&scrape_targets)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>Another project</p>"))
        .mount(&scrape_targets)
        .await;

    let state = AppState::with_aggregator(
        config(&upstream.uri(), PromptMode::Live),
        aggregator_for(&scrape_targets),
    )
    .unwrap();
    let url = spawn_app(state).await;

    let body = json!({"messages": [{"role": "user", "content": "what is Kairos?"}]});
    let (status, reply) = post_json(&url, body.clone()).await;
    assert_eq!(status, 200);
    assert_eq!(reply, json!({"reply": "Kairos is a planner"}));

    // second turn inside the cache window
    let (status, _) = post_json(&url, body).await;
    assert_eq!(status, 200);
    assert_eq!(scrape_targets.received_requests().await.unwrap().len(), 7);

    let sent = upstream_messages(&upstream).await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], sent[1]);

    let system = sent[0][0]["content"].as_str().unwrap();
    assert_eq!(sent[0][0]["role"], "system");
    assert!(system.contains(&format!("=== Kairos ({}/kairos) ===\nKairos Plan your flow", scrape_targets.uri())));
    assert!(system.contains("=== ValentineSpam"));
    assert!(!system.contains("track()"));
    assert_eq!(sent[0][1], json!({"role": "user", "content": "what is Kairos?"}));
}
