use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::conversation::ImageGateway;
use crate::replicate::ImageOutput;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
}

// Either half may be present depending on the status code
#[derive(Deserialize, Debug, Default)]
struct GenerateReply {
    #[serde(rename = "imageUrl")]
    image_url: Option<ImageOutput>,
    error: Option<String>,
}

/// Talks to a running server's `POST /api/generate`.
#[derive(Debug, Clone)]
pub struct HttpGatewayClient {
    http: Client,
    endpoint: String,
}

impl HttpGatewayClient {
    pub fn new(server_url: &str) -> Self {
        Self {
            http: Client::new(),
            endpoint: format!("{}/api/generate", server_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ImageGateway for HttpGatewayClient {
    async fn generate_image(&self, prompt: &str) -> Result<ImageOutput, String> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&GenerateRequest { prompt })
            .send()
            .await
            .map_err(|e| {
                error!("Failed to reach gateway at {}: {}", self.endpoint, e);
                e.to_string()
            })?;

        let status = response.status();
        let reply = response.json::<GenerateReply>().await.map_err(|e| {
            error!(%status, "Unreadable gateway response: {}", e);
            "Something went wrong".to_string()
        })?;
        debug!(%status, ?reply, "Gateway replied");

        if !status.is_success() {
            return Err(reply
                .error
                .unwrap_or_else(|| "Failed to generate image".to_string()));
        }

        reply
            .image_url
            .ok_or_else(|| "No image URL received".to_string())
    }
}
