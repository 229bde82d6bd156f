//! Dispatcher schema for long polling mode
//!
//! Webhook mode does not use teloxide's dispatcher at all; both modes end up
//! in [`CommandDispatcher::handle`](crate::telegram::dispatcher::CommandDispatcher::handle).

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::types::{HandlerDeps, HandlerError};
use crate::core::metrics;
use crate::telegram::outbox::deliver;
use crate::telegram::types::IncomingMessage;

/// Creates the handler tree used with teloxide's `Dispatcher`.
///
/// # Arguments
/// * `deps` - Command dispatcher and outbox shared with every update
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    dptree::entry().branch(message_handler(deps))
}

/// Text messages go to the command dispatcher, everything else is dropped.
fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().is_some())
        .endpoint(move |msg: Message| {
            let deps = deps.clone();
            async move {
                metrics::UPDATES_RECEIVED_TOTAL.inc();
                let incoming = IncomingMessage::from(&msg);
                if let Some(reply) = deps.dispatcher.handle(&incoming) {
                    deliver(deps.outbox.as_ref(), incoming.chat_id, reply).await;
                }
                Ok(())
            }
        })
}
