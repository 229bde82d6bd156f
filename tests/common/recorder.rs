//! Outbox that records replies instead of calling the Bot API

use async_trait::async_trait;
use std::sync::Mutex;

use opibot::core::error::AppResult;
use opibot::telegram::{Outbox, Reply};

/// Captures every `(chat_id, reply)` pair in send order.
#[derive(Default)]
pub struct RecordingOutbox {
    sent: Mutex<Vec<(i64, Reply)>>,
}

impl RecordingOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(i64, Reply)> {
        self.sent.lock().unwrap().clone()
    }

    /// Text of every recorded message reply, documents skipped.
    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|(_, reply)| reply.as_text().map(str::to_string))
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Outbox for RecordingOutbox {
    async fn send(&self, chat_id: i64, reply: Reply) -> AppResult<()> {
        self.sent.lock().unwrap().push((chat_id, reply));
        Ok(())
    }
}
