//! Deterministic in-process stand-ins for the remote services, for tests only.

use crate::services::{ReplyGenerator, ServiceError, SpeechSynthesizer, Transcriber};
use crate::session::History;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// Transcriber that always returns the same outcome.
pub struct FixedTranscriber {
    outcome: Result<String, u16>,
}

impl FixedTranscriber {
    pub fn hearing(text: &str) -> Self {
        Self {
            outcome: Ok(text.to_string()),
        }
    }

    /// Fails with an API error carrying `status`.
    pub fn failing(status: u16) -> Self {
        Self { outcome: Err(status) }
    }
}

#[async_trait]
impl Transcriber for FixedTranscriber {
    async fn transcribe(&self, _audio: &[u8]) -> Result<String, ServiceError> {
        match &self.outcome {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(ServiceError::Api {
                status: *status,
                message: "transcription failed".to_string(),
            }),
        }
    }
}

/// Generator that replies with a fixed string and records every history it was given.
#[derive(Default)]
pub struct RecordingGenerator {
    reply: Option<String>,
    delay: Duration,
    seen: Mutex<Vec<History>>,
}

impl RecordingGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            ..Self::default()
        }
    }

    /// Sleep before answering, to widen interleaving windows.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn seen(&self) -> Vec<History> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplyGenerator for RecordingGenerator {
    async fn generate(&self, history: &History) -> Result<String, ServiceError> {
        self.seen.lock().unwrap().push(history.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply
            .clone()
            .ok_or_else(|| ServiceError::Network("connection refused".to_string()))
    }
}

/// Synthesizer that returns fixed bytes, or fails when built with `failing`.
pub struct FixedSynthesizer {
    audio: Option<Vec<u8>>,
}

impl FixedSynthesizer {
    pub fn returning(audio: &[u8]) -> Self {
        Self {
            audio: Some(audio.to_vec()),
        }
    }

    pub fn failing() -> Self {
        Self { audio: None }
    }
}

#[async_trait]
impl SpeechSynthesizer for FixedSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, ServiceError> {
        self.audio.clone().ok_or(ServiceError::Api {
            status: 500,
            message: "synthesis failed".to_string(),
        })
    }
}
