//! Gateway configuration: provider credential, endpoint, generation
//! parameters and the poll policy.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::constants;

/// Fixed parameters sent with every prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationParams {
    /// Replicate model version hash.
    #[serde(skip)]
    pub model_version: String,
    /// Number of denoising steps (default 50).
    pub num_inference_steps: u32,
    /// Classifier-free guidance scale (default 7.5).
    pub guidance_scale: f32,
    /// Things the model should steer away from.
    pub negative_prompt: String,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            model_version: constants::DEFAULT_MODEL_VERSION.to_string(),
            num_inference_steps: constants::DEFAULT_NUM_INFERENCE_STEPS,
            guidance_scale: constants::DEFAULT_GUIDANCE_SCALE,
            negative_prompt: constants::DEFAULT_NEGATIVE_PROMPT.to_string(),
        }
    }
}

/// How often and for how long the gateway polls a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Wall-clock deadline measured from submission.
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(constants::POLL_INTERVAL_MS),
            timeout: Duration::from_secs(constants::DEFAULT_POLL_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_token: Option<String>,
    pub api_base: String,
    pub params: GenerationParams,
    pub poll: PollPolicy,
}

impl GatewayConfig {
    pub fn new(api_token: Option<String>) -> Self {
        Self {
            api_token: api_token.filter(|token| !token.trim().is_empty()),
            api_base: constants::REPLICATE_API_BASE.clone(),
            params: GenerationParams::default(),
            poll: PollPolicy::default(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_token.is_some()
    }
}

/// Everything `serve` needs to boot the web server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub templates_dir: PathBuf,
    pub static_dir: PathBuf,
    pub gateway: GatewayConfig,
}

impl ServerConfig {
    pub fn new(port: u16, gateway: GatewayConfig) -> Self {
        Self {
            port,
            templates_dir: PathBuf::from("templates"),
            static_dir: PathBuf::from("static"),
            gateway,
        }
    }
}
