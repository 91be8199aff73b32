//! Text-to-speech over `POST /audio/speech`.

use crate::services::{OpenAiClient, ServiceError, SpeechSynthesizer};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
}

pub struct OpenAiSpeechSynthesizer {
    client: OpenAiClient,
    model: String,
    voice: String,
}

impl OpenAiSpeechSynthesizer {
    pub fn new(client: OpenAiClient, model: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            voice: voice.into(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeechSynthesizer {
    /// Returns the response body verbatim (MP3 by default). No re-encoding.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ServiceError> {
        debug!(chars = text.len(), voice = %self.voice, "Requesting speech synthesis");

        let request = self.client.post("audio/speech").json(&SpeechRequest {
            model: &self.model,
            voice: &self.voice,
            input: text,
        });

        let audio = self
            .client
            .send(request)
            .await?
            .bytes()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        info!(bytes = audio.len(), "Speech synthesized");
        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speech_request_shape() {
        let value = serde_json::to_value(SpeechRequest {
            model: "gpt-4o-mini-tts",
            voice: "alloy",
            input: "hi there",
        })
        .unwrap();

        assert_eq!(value["model"], "gpt-4o-mini-tts");
        assert_eq!(value["voice"], "alloy");
        assert_eq!(value["input"], "hi there");
    }
}
