mod common;

use common::*;
use flux_chat::config::GatewayConfig;
use flux_chat::{Transcript, TranscriptEntry};
use serde::Serialize;
use serde_json::json;
use wiremock::MockServer;

#[derive(Serialize)]
struct ChatForm<'a> {
    prompt: &'a str,
    transcript: String,
}

fn hidden_transcript(html: &str) -> Transcript {
    let marker = "name=\"transcript\" value=\"";
    let start = html.find(marker).expect("transcript field") + marker.len();
    let end = start + html[start..].find('"').expect("closing quote");
    Transcript::from_json(&unescape(&html[start..end])).unwrap()
}

#[tokio::test]
async fn test_index_renders_empty_conversation() {
    let server = test_server(GatewayConfig::new(None));
    let response = server.get("/").await;
    response.assert_status_ok();

    let html = response.text();
    assert!(html.contains("<title>Flux Image Generator</title>"));
    assert!(html.contains("Describe the image you want to generate..."));
    assert!(!html.contains("role=\"alert\""));
    // blank draft keeps the button disabled
    assert!(html.contains("id=\"submit\" disabled"));
    assert!(hidden_transcript(&html).is_empty());
}

#[tokio::test]
async fn test_successful_submit_renders_image_entry() {
    let provider = MockServer::start().await;
    mount_create(&provider).await;
    mount_statuses(
        &provider,
        &[prediction("processing", json!(null))],
        prediction("succeeded", json!(["https://example/img.png"])),
    )
    .await;
    let server = test_server(test_config(&provider.uri()));

    let response = server
        .post("/")
        .form(&ChatForm {
            prompt: "a red balloon",
            transcript: String::new(),
        })
        .await;
    response.assert_status_ok();

    let html = unescape(&response.text());
    assert!(html.contains("<p>a red balloon</p>"));
    assert!(html.contains("Here's your generated image:"));
    assert!(html.contains("src=\"https://example/img.png\""));
    assert!(html.contains("loading=\"lazy\""));
    assert!(html.contains("this.src='/static/placeholder.svg'"));
    assert!(html.contains("<a href=\"https://example/img.png\" target=\"_blank\" rel=\"noopener noreferrer\">link</a>"));
    assert!(!html.contains("role=\"alert\""));

    let transcript = hidden_transcript(&response.text());
    assert_eq!(transcript.len(), 2);
    assert_eq!(
        transcript.entries()[1],
        TranscriptEntry::assistant_image("https://example/img.png")
    );
}

#[tokio::test]
async fn test_failed_submit_shows_banner_and_keeps_user_entry() {
    let provider = MockServer::start().await;
    mount_create(&provider).await;
    mount_statuses(&provider, &[], prediction("failed", json!(null))).await;
    let server = test_server(test_config(&provider.uri()));

    let mut previous = Transcript::new();
    previous.push(TranscriptEntry::user("a dog"));
    previous.push(TranscriptEntry::assistant_image("https://example/dog.png"));

    let response = server
        .post("/")
        .form(&ChatForm {
            prompt: "a cat",
            transcript: previous.to_json(),
        })
        .await;
    response.assert_status_ok();

    let html = unescape(&response.text());
    assert!(html.contains("<div class=\"error\" role=\"alert\">Image generation failed</div>"));
    assert!(html.contains("src=\"https://example/dog.png\""));

    let transcript = hidden_transcript(&response.text());
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript.entries()[2], TranscriptEntry::user("a cat"));
}

#[tokio::test]
async fn test_blank_submit_is_ignored() {
    let provider = MockServer::start().await;
    forbid_provider_calls(&provider).await;
    let server = test_server(test_config(&provider.uri()));

    let mut previous = Transcript::new();
    previous.push(TranscriptEntry::user("a dog"));

    let response = server
        .post("/")
        .form(&ChatForm {
            prompt: "   ",
            transcript: previous.to_json(),
        })
        .await;
    response.assert_status_ok();

    let html = response.text();
    assert!(!html.contains("role=\"alert\""));
    assert_eq!(hidden_transcript(&html), previous);
}

#[tokio::test]
async fn test_missing_token_reported_in_banner() {
    let server = test_server(GatewayConfig::new(None));
    let response = server
        .post("/")
        .form(&ChatForm {
            prompt: "a cat",
            transcript: String::new(),
        })
        .await;

    let html = unescape(&response.text());
    assert!(html.contains("REPLICATE_API_TOKEN is not configured"));
    assert_eq!(hidden_transcript(&response.text()).len(), 1);
}

#[tokio::test]
async fn test_script_urls_in_posted_transcript_are_not_rendered() {
    let server = test_server(GatewayConfig::new(None));

    let mut previous = Transcript::new();
    previous.push(TranscriptEntry::user("a dog"));
    previous.push(TranscriptEntry::assistant_image("javascript:alert(document.domain)"));
    previous.push(TranscriptEntry::assistant_image("https://example/dog.png"));

    let response = server
        .post("/")
        .form(&ChatForm {
            prompt: "   ",
            transcript: previous.to_json(),
        })
        .await;
    response.assert_status_ok();

    let html = unescape(&response.text());
    assert!(!html.to_ascii_lowercase().contains("javascript:"));
    assert!(html.contains("src=\"https://example/dog.png\""));

    let transcript = hidden_transcript(&response.text());
    assert_eq!(transcript.len(), 2);
    assert_eq!(
        transcript.entries()[1],
        TranscriptEntry::assistant_image("https://example/dog.png")
    );
}
