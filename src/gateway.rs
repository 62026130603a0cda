//! The generation gateway: validates a prompt, submits a prediction and
//! drives it to a terminal state.

use std::time::Duration;

use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, info, instrument, warn};

use crate::config::GatewayConfig;
use crate::conversation::ImageGateway;
use crate::error::GatewayError;
use crate::replicate::{ImageOutput, Prediction, PredictionStatus, ReplicateClient};

/// Where a prediction is in its lifecycle, as seen by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationState {
    Submitted { id: String },
    Polling { id: String, attempts: u32 },
    Succeeded(ImageOutput),
    Failed(String),
    /// `attempts` counts status fetches that were started.
    TimedOut { waited: Duration, attempts: u32 },
}

impl GenerationState {
    /// Next state after observing a freshly fetched prediction.
    pub fn observe(id: String, attempts: u32, prediction: &Prediction) -> Self {
        match prediction.status {
            status if !status.is_terminal() => GenerationState::Polling { id, attempts },
            PredictionStatus::Succeeded => match prediction.image_output() {
                Some(output) => GenerationState::Succeeded(output),
                None => GenerationState::Failed(GatewayError::missing_output().to_string()),
            },
            // failed or canceled
            _ => {
                if let Some(reason) = &prediction.error {
                    warn!(%id, %reason, "Prediction did not succeed");
                }
                GenerationState::Failed(GatewayError::generation_failed().to_string())
            }
        }
    }
}

/// Rejects absent, empty and whitespace-only prompts.
pub fn validate_prompt(prompt: Option<&str>) -> Result<&str, GatewayError> {
    match prompt {
        Some(prompt) if !prompt.trim().is_empty() => Ok(prompt),
        _ => Err(GatewayError::prompt_required()),
    }
}

#[derive(Debug, Clone)]
pub struct Gateway {
    config: GatewayConfig,
    client: ReplicateClient,
}

impl Gateway {
    pub fn new(config: GatewayConfig) -> Self {
        let client = ReplicateClient::new(config.api_base.clone());
        Self { config, client }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn api_token(&self) -> Result<&str, GatewayError> {
        self.config
            .api_token
            .as_deref()
            .ok_or(GatewayError::Configuration)
    }

    #[instrument(skip(self))]
    pub async fn generate(&self, prompt: &str) -> Result<ImageOutput, GatewayError> {
        let token = self.api_token()?;
        let prompt = validate_prompt(Some(prompt))?;
        let poll = self.config.poll;
        let started = Instant::now();
        let deadline = started + poll.timeout;

        let create = self
            .client
            .create_prediction(token, &self.config.params, prompt);
        let prediction = match timeout_at(deadline, create).await {
            Ok(prediction) => prediction?,
            Err(_) => {
                warn!(waited = ?started.elapsed(), "Prediction submission timed out");
                return Err(GatewayError::timed_out(poll.timeout));
            }
        };
        info!(id = %prediction.id, "Submitted image generation");

        let mut state = GenerationState::Submitted { id: prediction.id };
        loop {
            state = match state {
                GenerationState::Submitted { id } => {
                    self.fetch(token, id, 1, started, deadline).await?
                }
                GenerationState::Polling { id, attempts } => {
                    sleep_until((Instant::now() + poll.interval).min(deadline)).await;
                    self.fetch(token, id, attempts + 1, started, deadline).await?
                }
                GenerationState::Succeeded(output) => {
                    info!(elapsed = ?started.elapsed(), "Image generation succeeded");
                    return Ok(output);
                }
                GenerationState::Failed(message) => {
                    return Err(GatewayError::Generation(message));
                }
                GenerationState::TimedOut { waited, attempts } => {
                    warn!(?waited, attempts, "Gave up polling prediction");
                    return Err(GatewayError::timed_out(poll.timeout));
                }
            };
            debug!(?state, "Generation state advanced");
        }
    }

    // One status fetch, cut short at the deadline
    async fn fetch(
        &self,
        token: &str,
        id: String,
        attempts: u32,
        started: Instant,
        deadline: Instant,
    ) -> Result<GenerationState, GatewayError> {
        let timed_out = |attempts| GenerationState::TimedOut {
            waited: started.elapsed(),
            attempts,
        };
        if Instant::now() >= deadline {
            return Ok(timed_out(attempts - 1));
        }
        match timeout_at(deadline, self.client.get_prediction(token, &id)).await {
            Ok(current) => Ok(GenerationState::observe(id, attempts, &current?)),
            Err(_) => Ok(timed_out(attempts)),
        }
    }
}

impl ImageGateway for Gateway {
    async fn generate_image(&self, prompt: &str) -> Result<ImageOutput, String> {
        self.generate(prompt).await.map_err(|e| e.to_string())
    }
}
