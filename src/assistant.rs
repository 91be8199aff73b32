//! # Voice Assistant Pipeline
//!
//! Turns one recorded utterance into a spoken reply while keeping a short rolling
//! history per session.
//!
//! ## Processing Order:
//! 1. **Transcribe** the audio. An empty transcript ends the request early with a
//!    fallback reply and leaves the session store untouched.
//! 2. **Lock** the session so concurrent requests for the same id queue up.
//! 3. **Record** the user turn (creating the session if needed) and trim the history
//!    to the most recent [`HISTORY_LIMIT`] entries.
//! 4. **Generate** a reply from the trimmed history.
//! 5. **Record** the assistant turn. It is appended after the trim, so a session can
//!    briefly hold `HISTORY_LIMIT + 1` entries. The session lock is released here.
//! 6. **Synthesize** the reply into audio.
//!
//! Remote failures propagate unchanged. Nothing is retried and the user turn from
//! step 3 is not rolled back when a later step fails.

use crate::config::OpenAiConfig;
use crate::services::{
    OpenAiClient, OpenAiReplyGenerator, OpenAiSpeechSynthesizer, OpenAiTranscriber, ReplyGenerator,
    ServiceError, SpeechSynthesizer, Transcriber,
};
use crate::session::{InMemorySessionStore, SessionStore, Turn, HISTORY_LIMIT};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Reply text returned when the audio yielded no transcript.
pub const TRANSCRIPTION_FALLBACK_REPLY: &str = "Error: Could not transcribe";

/// Outcome of one voice exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceReply {
    /// Synthesized reply; `None` only when nothing could be transcribed
    pub audio: Option<Vec<u8>>,
    pub reply: String,
    pub transcript: String,
}

impl VoiceReply {
    fn untranscribed() -> Self {
        Self {
            audio: None,
            reply: TRANSCRIPTION_FALLBACK_REPLY.to_string(),
            transcript: String::new(),
        }
    }
}

/// Orchestrates transcription, history, generation and synthesis.
pub struct VoiceAssistant {
    transcriber: Arc<dyn Transcriber>,
    generator: Arc<dyn ReplyGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    sessions: Arc<dyn SessionStore>,
}

impl VoiceAssistant {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        generator: Arc<dyn ReplyGenerator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            transcriber,
            generator,
            synthesizer,
            sessions,
        }
    }

    /// Wire up the OpenAI-backed services and an empty in-memory store.
    pub fn from_config(config: &OpenAiConfig) -> Result<Self, ServiceError> {
        let client = OpenAiClient::new(config)?;

        Ok(Self::new(
            Arc::new(OpenAiTranscriber::new(client.clone(), &config.stt_model)),
            Arc::new(OpenAiReplyGenerator::new(client.clone(), &config.llm_model)),
            Arc::new(OpenAiSpeechSynthesizer::new(
                client,
                &config.tts_model,
                &config.tts_voice,
            )),
            Arc::new(InMemorySessionStore::new()),
        ))
    }

    pub fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }

    /// Start (or restart) a session with an empty history.
    pub fn start_session(&self, session_id: &str) {
        self.sessions.create(session_id);
        info!(session_id = %session_id, "Session started");
    }

    /// Forget a session. Unknown ids are fine.
    pub fn end_session(&self, session_id: &str) {
        self.sessions.delete(session_id);
        info!(session_id = %session_id, "Session ended");
    }

    /// Process one recorded utterance for `session_id`.
    pub async fn run(&self, audio: &[u8], session_id: &str) -> Result<VoiceReply, ServiceError> {
        let transcript = self.transcriber.transcribe(audio).await.map_err(|e| {
            error!(session_id = %session_id, error = %e, "Transcription failed");
            e
        })?;

        if transcript.is_empty() {
            warn!(session_id = %session_id, bytes = audio.len(), "No speech transcribed");
            return Ok(VoiceReply::untranscribed());
        }

        let reply = {
            let guard = self.sessions.lock(session_id).await;

            let mut history = self.sessions.get_or_create(session_id);
            history.push(Turn::user(transcript.as_str()));
            let history = history.trimmed(HISTORY_LIMIT);
            self.sessions.replace(session_id, history.clone());
            debug!(session_id = %guard.session_id(), turns = history.len(), "History updated");

            let reply = self.generator.generate(&history).await.map_err(|e| {
                error!(session_id = %session_id, error = %e, "Reply generation failed");
                e
            })?;

            if let Err(e) = self.sessions.append(session_id, Turn::assistant(reply.clone())) {
                // end_session raced with this exchange; don't resurrect the session.
                warn!(session_id = %session_id, error = %e, "Reply not recorded");
            }

            reply
        };

        let audio_out = self.synthesizer.synthesize(&reply).await.map_err(|e| {
            error!(session_id = %session_id, error = %e, "Speech synthesis failed");
            e
        })?;

        info!(
            session_id = %session_id,
            transcript_chars = transcript.len(),
            reply_chars = reply.len(),
            audio_bytes = audio_out.len(),
            "Voice exchange complete"
        );

        Ok(VoiceReply {
            audio: Some(audio_out),
            reply,
            transcript,
        })
    }
}
