//! Whisper-style speech-to-text over `POST /audio/transcriptions`.

use crate::services::{OpenAiClient, ServiceError, Transcriber};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info};

/// Filename hint sent with the upload; the service sniffs the container from it.
pub const UPLOAD_FILENAME: &str = "input.wav";

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

pub struct OpenAiTranscriber {
    client: OpenAiClient,
    model: String,
}

impl OpenAiTranscriber {
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    fn form(&self, audio: &[u8]) -> Result<Form, ServiceError> {
        let file_part = Part::bytes(audio.to_vec())
            .file_name(UPLOAD_FILENAME)
            .mime_str("audio/wav")
            .map_err(|e| ServiceError::Parse(e.to_string()))?;

        Ok(Form::new()
            .part("file", file_part)
            .text("model", self.model.clone()))
    }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, ServiceError> {
        debug!(bytes = audio.len(), model = %self.model, "Sending audio for transcription");

        let request = self
            .client
            .post("audio/transcriptions")
            .multipart(self.form(audio)?);

        let response: TranscriptionResponse = self
            .client
            .send(request)
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::Parse(e.to_string()))?;

        info!(chars = response.text.len(), "Transcription complete");
        Ok(response.text)
    }
}
