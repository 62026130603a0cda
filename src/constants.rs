// Constants for the gateway and UI, some overridable from the environment.

use std::env;

// Load the Replicate API base from environment or use the public endpoint.
// Use lazy_static to initialize static variables safely.
lazy_static::lazy_static! {
    pub static ref REPLICATE_API_BASE: String = env::var("REPLICATE_API_BASE")
        .ok()
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "https://api.replicate.com/v1".to_string());
}

/// Environment variable holding the provider credential.
pub const API_TOKEN_ENV: &str = "REPLICATE_API_TOKEN";

pub const DEFAULT_MODEL_VERSION: &str =
    "8beff3369e81422112d93b89ca01426147de542cd4684c244b673b105188fe5f";
pub const DEFAULT_NUM_INFERENCE_STEPS: u32 = 50;
pub const DEFAULT_GUIDANCE_SCALE: f32 = 7.5;
pub const DEFAULT_NEGATIVE_PROMPT: &str =
    "ugly, blurry, poor quality, duplicate, mutated, deformed";

pub const POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_PORT: u16 = 3000;

// Caption attached to every assistant reply in the transcript
pub const ASSISTANT_CAPTION: &str = "Here's your generated image:";
pub const PLACEHOLDER_IMAGE: &str = "/static/placeholder.svg";
pub const PAGE_TITLE: &str = "Flux Image Generator";
