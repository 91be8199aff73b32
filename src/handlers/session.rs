//! Explicit session lifecycle: `POST /api/start_session` and `POST /api/end_session`.

use crate::error::{AppError, AppResult};
use crate::handlers::voice::{field_name, read_field, read_session_id_field, MAX_SESSION_ID_BYTES};
use crate::state::AppState;
use actix_multipart::Multipart;
use actix_web::{web, Either, HttpResponse};
use futures_util::stream::StreamExt;
use serde::Deserialize;
use serde_json::json;

/// Urlencoded body carrying the session id.
#[derive(Debug, Deserialize)]
pub struct SessionForm {
    pub session_id: String,
}

/// Either form encoding a browser may send.
pub type SessionBody = Either<web::Form<SessionForm>, Multipart>;

async fn session_id(body: SessionBody) -> Result<String, AppError> {
    let id = match body {
        Either::Left(form) => Some(form.into_inner().session_id),
        Either::Right(mut payload) => {
            let mut id = None;
            while let Some(item) = payload.next().await {
                let mut field =
                    item.map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;
                if field_name(&field)? == "session_id" {
                    id = Some(read_session_id_field(&mut field).await?);
                } else {
                    read_field(&mut field, MAX_SESSION_ID_BYTES).await?;
                }
            }
            id
        }
    };

    id.filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::ValidationError("session_id is required".to_string()))
}

/// Reset the session's history to empty, creating the session if needed.
pub async fn start_session(
    state: web::Data<AppState>,
    body: SessionBody,
) -> AppResult<HttpResponse> {
    state.assistant.start_session(&session_id(body).await?);
    Ok(HttpResponse::Ok().json(json!({ "status": "Session started" })))
}

/// Drop the session's history. Ending an unknown session is not an error.
pub async fn end_session(
    state: web::Data<AppState>,
    body: SessionBody,
) -> AppResult<HttpResponse> {
    state.assistant.end_session(&session_id(body).await?);
    Ok(HttpResponse::Ok().json(json!({ "status": "Session ended" })))
}
