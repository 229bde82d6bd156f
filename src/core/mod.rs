//! Core utilities: configuration, errors, logging, metrics, exports and the HTTP server

pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod metrics;
pub mod web_server;

// Re-exports for convenience
pub use config::Config;
pub use error::{AppError, AppResult};
pub use logging::{init_logger, install_panic_hook};
