#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use axum_test::TestServer;
use flux_chat::config::{GatewayConfig, PollPolicy};
use flux_chat::web_server::{create_minijinja_env, router, AppState};
use flux_chat::Gateway;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "r8_test_token";
pub const PREDICTION_ID: &str = "ufawqhfynnddngldkgtslldrkq";

/// Gateway config pointed at a mock Replicate, polling fast.
pub fn test_config(api_base: &str) -> GatewayConfig {
    GatewayConfig::new(Some(TOKEN.to_string()))
        .with_api_base(api_base)
        .with_poll(PollPolicy {
            interval: Duration::from_millis(10),
            timeout: Duration::from_secs(5),
        })
}

pub fn test_server(config: GatewayConfig) -> TestServer {
    let state = AppState::new(
        create_minijinja_env(Path::new("templates")),
        Gateway::new(config),
    );
    TestServer::new(router(state, Path::new("static"))).unwrap()
}

pub fn prediction(status: &str, output: Value) -> Value {
    json!({
        "id": PREDICTION_ID,
        "version": "8beff3369e81422112d93b89ca01426147de542cd4684c244b673b105188fe5f",
        "status": status,
        "output": output,
        "error": null,
    })
}

pub async fn mount_create(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/predictions"))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(201).set_body_json(prediction("starting", Value::Null)))
        .expect(1)
        .mount(server)
        .await;
}

/// Serves `statuses` in order for the prediction, then `last` forever.
pub async fn mount_statuses(server: &MockServer, statuses: &[Value], last: Value) {
    for status in statuses {
        Mock::given(method("GET"))
            .and(path(format!("/predictions/{}", PREDICTION_ID)))
            .respond_with(ResponseTemplate::new(200).set_body_json(status.clone()))
            .up_to_n_times(1)
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path(format!("/predictions/{}", PREDICTION_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(last))
        .mount(server)
        .await;
}

/// Fails the test on drop if the provider sees any request at all.
pub async fn forbid_provider_calls(server: &MockServer) {
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}

/// Undo minijinja's HTML escaping so assertions can use plain text.
pub fn unescape(html: &str) -> String {
    html.replace("&#x2f;", "/")
        .replace("&#x27;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
