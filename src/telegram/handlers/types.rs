//! Handler dependencies for the polling dispatcher

use std::sync::Arc;

use crate::telegram::dispatcher::CommandDispatcher;
use crate::telegram::outbox::Outbox;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub dispatcher: Arc<CommandDispatcher>,
    pub outbox: Arc<dyn Outbox>,
}

impl HandlerDeps {
    pub fn new(dispatcher: Arc<CommandDispatcher>, outbox: Arc<dyn Outbox>) -> Self {
        Self { dispatcher, outbox }
    }
}
