//! # Session Module
//!
//! Per-session conversation state for the voice pipeline.
//!
//! ## Key Components:
//! - **History**: Ordered, append-only list of user/assistant turns with a trim policy
//! - **Session Store**: Injectable storage trait plus the in-memory implementation,
//!   including per-session mutual exclusion
//!
//! ## Lifecycle:
//! 1. **Created**: explicitly via `start_session`, or implicitly on the first voice request
//! 2. **Growing**: two turns per successful exchange, trimmed to the most recent entries
//! 3. **Deleted**: explicitly via `end_session`; there is no automatic expiry

pub mod history;
pub mod store;

pub use history::{History, Role, Turn, HISTORY_LIMIT};
pub use store::{InMemorySessionStore, SessionStore};
