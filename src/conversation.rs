//! Conversation state shared by the web page and the terminal chat.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants;
use crate::replicate::ImageOutput;

/// Anything that can turn a prompt into an image reference.
///
/// Errors are the user-facing message to show in the error slot.
pub trait ImageGateway {
    fn generate_image(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<ImageOutput, String>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl TranscriptEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            image_url: None,
        }
    }

    pub fn assistant_image(image_url: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: constants::ASSISTANT_CAPTION.to_string(),
            image_url: Some(image_url.into()),
        }
    }
}

/// Append-only, ordered log of turns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: TranscriptEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "[]".to_string())
    }

    /// Restores a transcript sent back by a client, dropping entries whose
    /// image reference is not an http(s) URL.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        if json.trim().is_empty() {
            return Ok(Self::new());
        }
        let mut transcript: Self = serde_json::from_str(json)?;
        transcript.entries.retain(|entry| match &entry.image_url {
            Some(url) if !is_web_url(url) => {
                warn!(%url, "Dropping transcript entry with non-http image reference");
                false
            }
            _ => true,
        });
        Ok(transcript)
    }
}

/// Only http(s) references are ever rendered into `src`/`href`.
pub fn is_web_url(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://")
}

#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    transcript: Transcript,
    draft: String,
    busy: bool,
    error: Option<String>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transcript(transcript: Transcript) -> Self {
        Self {
            transcript,
            ..Self::default()
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.draft = draft.into();
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether the submit control should be enabled.
    pub fn can_submit(&self) -> bool {
        !self.busy && !self.draft.trim().is_empty()
    }

    /// Starts a submission, returning the prompt to send.
    ///
    /// Returns `None` without touching any state when the draft is blank
    /// or another submission is still in flight.
    pub fn begin_submit(&mut self) -> Option<String> {
        if !self.can_submit() {
            debug!(busy = self.busy, "Ignoring submit");
            return None;
        }
        self.busy = true;
        self.error = None;
        let prompt = self.draft.clone();
        self.transcript.push(TranscriptEntry::user(prompt.clone()));
        Some(prompt)
    }

    /// Applies the gateway's answer to the submission started by `begin_submit`.
    pub fn finish_submit(&mut self, outcome: Result<ImageOutput, String>) {
        match outcome {
            Ok(output) => match output.first().filter(|url| is_web_url(url)) {
                Some(url) => self
                    .transcript
                    .push(TranscriptEntry::assistant_image(url)),
                None => self.error = Some("No image URL received".to_string()),
            },
            Err(message) => {
                warn!(%message, "Image generation failed");
                self.error = Some(message);
            }
        }
        self.busy = false;
        self.draft.clear();
    }

    /// Submits the current draft. Returns false when the submit was a no-op.
    pub async fn submit<G: ImageGateway>(&mut self, gateway: &G) -> bool {
        let Some(prompt) = self.begin_submit() else {
            return false;
        };
        let outcome = gateway.generate_image(&prompt).await;
        self.finish_submit(outcome);
        true
    }
}
