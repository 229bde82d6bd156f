//! OPI bot - Telegram bot that keeps a shared register of oil wells
//!
//! Field staff add and update well records (field, well number, status,
//! comment) from a chat, list them and export them as CSV. Updates arrive
//! through a webhook served by axum, or by long polling for local runs.
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors, logging, metrics, exports and the HTTP server
//! - `storage`: SQLite pool, migrations and the well record store
//! - `telegram`: Command surface, multi-step sessions, dispatcher and delivery

pub mod cli;
pub mod core;
pub mod storage;
pub mod telegram;

// Re-export commonly used types for convenience
pub use crate::core::{config, AppError, AppResult, Config};
pub use storage::{create_pool, get_connection, DbConnection, DbPool, WellStore};
pub use telegram::{CommandDispatcher, IncomingMessage, Outbox, Reply};
