pub mod session;
pub mod voice;

pub use session::*;
pub use voice::*;

use crate::health;
use actix_web::web;

/// Register every route of the service.
///
/// Shared between `main` and the handler tests so both see the same routing table.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/voice", web::post().to(process_voice))
            .route("/start_session", web::post().to(start_session))
            .route("/end_session", web::post().to(end_session))
            .route("/health", web::get().to(health::health_check))
            .route("/metrics", web::get().to(health::detailed_metrics)),
    )
    .route("/health", web::get().to(health::health_check))
    .route("/", web::get().to(health::root_status));
}
