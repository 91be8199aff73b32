//! `POST /api/voice`: one full voice exchange.

use crate::assistant::VoiceReply;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpResponse};
use base64::Engine;
use futures_util::stream::StreamExt;
use serde::Serialize;
use tracing::debug;

/// Largest accepted upload; matches the remote transcription limit.
pub const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

/// Largest accepted `session_id` form field.
pub const MAX_SESSION_ID_BYTES: usize = 1024;

/// Response body. `audio` is base64 and empty when nothing was transcribed.
#[derive(Debug, Serialize)]
pub struct VoiceResponse {
    pub transcript: String,
    pub reply: String,
    pub audio: String,
}

impl From<VoiceReply> for VoiceResponse {
    fn from(result: VoiceReply) -> Self {
        let audio = result
            .audio
            .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes))
            .unwrap_or_default();

        Self {
            transcript: result.transcript,
            reply: result.reply,
            audio,
        }
    }
}

struct VoiceUpload {
    audio: Vec<u8>,
    session_id: String,
}

/// Transcribe, reply and synthesize.
///
/// ## Request:
/// Multipart form data with fields `file` (recorded audio) and `session_id`.
///
/// ## Response:
/// ```json
/// {
///   "transcript": "what's the weather like",
///   "reply": "I can't check live weather, but I hope it's sunny!",
///   "audio": "SUQzBAAAAAAA..."
/// }
/// ```
pub async fn process_voice(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> AppResult<HttpResponse> {
    let upload = read_upload(&mut payload).await?;
    debug!(
        session_id = %upload.session_id,
        bytes = upload.audio.len(),
        "Voice upload received"
    );

    let result = state.assistant.run(&upload.audio, &upload.session_id).await?;
    if result.audio.is_some() {
        state.increment_voice_exchanges();
    }

    Ok(HttpResponse::Ok().json(VoiceResponse::from(result)))
}

async fn read_upload(payload: &mut Multipart) -> Result<VoiceUpload, AppError> {
    let mut audio: Option<Vec<u8>> = None;
    let mut session_id: Option<String> = None;

    while let Some(item) = payload.next().await {
        let mut field: Field =
            item.map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;

        match field_name(&field)?.as_str() {
            "file" => audio = Some(read_field(&mut field, MAX_AUDIO_BYTES).await?),
            "session_id" => session_id = Some(read_session_id_field(&mut field).await?),
            // Unknown fields are drained and ignored.
            _ => {
                read_field(&mut field, MAX_AUDIO_BYTES).await?;
            }
        }
    }

    let audio =
        audio.ok_or_else(|| AppError::ValidationError("No audio file provided".to_string()))?;
    let session_id = session_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::ValidationError("session_id is required".to_string()))?;

    Ok(VoiceUpload { audio, session_id })
}

pub(crate) fn field_name(field: &Field) -> Result<String, AppError> {
    field
        .content_disposition()
        .and_then(|cd| cd.get_name())
        .map(str::to_string)
        .ok_or_else(|| AppError::ValidationError("Missing field name".to_string()))
}

pub(crate) async fn read_session_id_field(field: &mut Field) -> Result<String, AppError> {
    let bytes = read_field(field, MAX_SESSION_ID_BYTES).await?;
    String::from_utf8(bytes)
        .map_err(|_| AppError::ValidationError("session_id must be UTF-8 text".to_string()))
}

pub(crate) async fn read_field(field: &mut Field, limit: usize) -> Result<Vec<u8>, AppError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::BadRequest(format!("Chunk error: {}", e)))?;
        if bytes.len() + chunk.len() > limit {
            return Err(AppError::ValidationError(format!(
                "Field too large (max: {} bytes)",
                limit
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::TRANSCRIPTION_FALLBACK_REPLY;
    use crate::handlers;
    use crate::session::Turn;
    use crate::state::test_support::{failing_state, fake_state};
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, App};
    use serde_json::Value;

    const BOUNDARY: &str = "voice-test-boundary";

    fn multipart_body(audio: Option<&[u8]>, session_id: Option<&str>) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some(id) = session_id {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\n\
                     Content-Disposition: form-data; name=\"session_id\"\r\n\r\n\
                     {id}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some(audio) = audio {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\n\
                     Content-Disposition: form-data; name=\"file\"; filename=\"user_voice.wav\"\r\n\
                     Content-Type: audio/wav\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(audio);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn voice_request(body: Vec<u8>) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/api/voice")
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload(body)
    }

    #[actix_web::test]
    async fn test_response_encodes_audio_as_base64() {
        let response = VoiceResponse::from(VoiceReply {
            audio: Some(b"AUDIO1".to_vec()),
            reply: "hi there".to_string(),
            transcript: "hello".to_string(),
        });
        assert_eq!(response.audio, "QVVESU8x");
    }

    #[actix_web::test]
    async fn test_voice_exchange_round_trip() {
        let state = fake_state("hello", "hi there", b"AUDIO1");
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(handlers::configure),
        )
        .await;

        let req = voice_request(multipart_body(Some(b"RIFF...."), Some("s1"))).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["transcript"], "hello");
        assert_eq!(body["reply"], "hi there");
        assert_eq!(body["audio"], "QVVESU8x");

        let history = state.assistant.sessions().history("s1").unwrap();
        assert_eq!(history.turns(), &[Turn::user("hello"), Turn::assistant("hi there")]);
        assert_eq!(state.get_metrics_snapshot().voice_exchanges, 1);
    }

    #[actix_web::test]
    async fn test_untranscribed_audio_returns_fallback() {
        let state = fake_state("", "unused", b"unused");
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(handlers::configure),
        )
        .await;

        let req = voice_request(multipart_body(Some(b"silence"), Some("s1"))).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["reply"], TRANSCRIPTION_FALLBACK_REPLY);
        assert_eq!(body["transcript"], "");
        assert_eq!(body["audio"], "");
        assert!(state.assistant.sessions().history("s1").is_none());
    }

    #[actix_web::test]
    async fn test_missing_fields_are_rejected() {
        let state = fake_state("hello", "hi there", b"AUDIO1");
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(handlers::configure),
        )
        .await;

        let req = voice_request(multipart_body(None, Some("s1"))).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = voice_request(multipart_body(Some(b"RIFF"), None)).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_remote_failure_maps_to_bad_gateway() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(failing_state()))
                .configure(handlers::configure),
        )
        .await;

        let req = voice_request(multipart_body(Some(b"RIFF"), Some("s1"))).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["type"], "upstream_error");
    }
}
