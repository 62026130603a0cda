use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, instrument};

use crate::config::GenerationParams;
use crate::error::GatewayError;

// Structures matching Replicate's /v1/predictions endpoint
#[derive(Serialize)]
struct PredictionRequest<'a> {
    version: &'a str,
    input: PredictionInput<'a>,
}

#[derive(Serialize)]
struct PredictionInput<'a> {
    prompt: &'a str,
    #[serde(flatten)]
    params: &'a GenerationParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    // Anything newer than this client knows about keeps the job polling
    #[serde(other)]
    Unknown,
}

impl PredictionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PredictionStatus::Succeeded | PredictionStatus::Failed | PredictionStatus::Canceled
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub status: PredictionStatus,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl Prediction {
    /// The usable image reference, if the output holds one.
    pub fn image_output(&self) -> Option<ImageOutput> {
        self.output.as_ref().and_then(ImageOutput::from_value)
    }
}

/// Either a single image URL or an ordered list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageOutput {
    Single(String),
    Many(Vec<String>),
}

impl ImageOutput {
    /// Accepts a string or an array of strings; empty values count as missing.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(url) if !url.is_empty() => Some(ImageOutput::Single(url.clone())),
            Value::Array(items) if !items.is_empty() => {
                let urls = items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()?;
                Some(ImageOutput::Many(urls))
            }
            _ => None,
        }
    }

    /// The reference to display: the value itself, or the first of many.
    pub fn first(&self) -> Option<&str> {
        match self {
            ImageOutput::Single(url) => Some(url.as_str()),
            ImageOutput::Many(urls) => urls.first().map(String::as_str),
        }
        .filter(|url| !url.is_empty())
    }
}

/// Thin client over the Replicate predictions API.
#[derive(Debug, Clone)]
pub struct ReplicateClient {
    http: Client,
    api_base: String,
}

impl ReplicateClient {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_base: api_base.into(),
        }
    }

    fn predictions_endpoint(&self) -> String {
        format!("{}/predictions", self.api_base)
    }

    #[instrument(skip(self, token, params))]
    pub async fn create_prediction(
        &self,
        token: &str,
        params: &GenerationParams,
        prompt: &str,
    ) -> Result<Prediction, GatewayError> {
        let payload = PredictionRequest {
            version: &params.model_version,
            input: PredictionInput { prompt, params },
        };

        let response = self
            .http
            .post(self.predictions_endpoint())
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;

        let prediction = Self::read_prediction(response).await?;
        debug!(id = %prediction.id, status = ?prediction.status, "Prediction created");
        Ok(prediction)
    }

    #[instrument(skip(self, token))]
    pub async fn get_prediction(&self, token: &str, id: &str) -> Result<Prediction, GatewayError> {
        let response = self
            .http
            .get(format!("{}/{}", self.predictions_endpoint(), id))
            .bearer_auth(token)
            .send()
            .await?;

        let prediction = Self::read_prediction(response).await?;
        debug!(status = ?prediction.status, "Prediction fetched");
        Ok(prediction)
    }

    async fn read_prediction(response: reqwest::Response) -> Result<Prediction, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            let detail = error_detail(&body);
            error!(%status, %detail, "Replicate API request failed");
            return Err(GatewayError::Provider {
                status: status.as_u16(),
                detail,
            });
        }
        Ok(response.json::<Prediction>().await?)
    }
}

// Replicate errors look like {"title": ..., "detail": ...}; fall back to the raw body.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("detail")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
