//! Common test utilities
//!
//! This module is shared across all integration tests

#![allow(dead_code)]

pub mod fixtures;
pub mod recorder;

#[allow(unused_imports)]
pub use fixtures::{create_message_json, TestEnvironment};
#[allow(unused_imports)]
pub use recorder::RecordingOutbox;
