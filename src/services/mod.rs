//! # Remote Speech and Language Services
//!
//! The three external capabilities used by the voice pipeline, each behind its own
//! trait so the pipeline can be exercised without a network:
//!
//! - **Transcriber**: audio bytes → transcript text
//! - **ReplyGenerator**: conversation history → one short reply
//! - **SpeechSynthesizer**: reply text → audio bytes
//!
//! The production implementations talk to an OpenAI-compatible REST API and share a
//! single HTTP client (see [`openai::OpenAiClient`]).

pub mod generation;
pub mod openai;
pub mod synthesis;
pub mod transcription;

#[cfg(test)]
pub mod mock;

use crate::session::History;
use async_trait::async_trait;
use std::fmt;

pub use generation::OpenAiReplyGenerator;
pub use openai::OpenAiClient;
pub use synthesis::OpenAiSpeechSynthesizer;
pub use transcription::OpenAiTranscriber;

/// Errors that can occur while calling a remote service.
#[derive(Debug)]
pub enum ServiceError {
    /// Network/HTTP error (connection refused, timeout, TLS, ...)
    Network(String),
    /// The service answered with a non-success status
    Api { status: u16, message: String },
    /// The response body could not be decoded
    Parse(String),
    /// The service answered successfully but without usable content
    EmptyResponse(&'static str),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Network(e) => write!(f, "Network error: {}", e),
            ServiceError::Api { status, message } => {
                write!(f, "OpenAI API error ({}): {}", status, message)
            }
            ServiceError::Parse(e) => write!(f, "Failed to parse API response: {}", e),
            ServiceError::EmptyResponse(what) => write!(f, "Empty response from {}", what),
        }
    }
}

impl std::error::Error for ServiceError {}

/// Speech-to-text.
///
/// An `Ok` with empty text means nothing intelligible was heard; that is not an error.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, ServiceError>;
}

/// Produces the assistant's next reply from the conversation so far.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(&self, history: &History) -> Result<String, ServiceError>;
}

/// Text-to-speech. The returned bytes are an opaque, already-encoded audio blob.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ServiceError>;
}
