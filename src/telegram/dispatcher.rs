//! Routes one incoming message to a command handler or to the pending
//! multi-step session of its chat.
//!
//! Precedence: a known command or keyboard label always wins. If a session
//! was pending for the same chat and sender it is discarded first, so the
//! next free-text message is never read as an answer to the old flow.

use std::sync::Arc;
use std::time::Duration;

use crate::core::metrics;
use crate::storage::wells::WellStore;
use crate::telegram::bot::{Command, MenuButton};
use crate::telegram::commands::{self, Input};
use crate::telegram::session::{ChatState, CompletedFlow, FlowKind, SessionKey, SessionStore, Submission};
use crate::telegram::types::{IncomingMessage, Reply};

pub struct CommandDispatcher {
    store: Arc<WellStore>,
    sessions: SessionStore,
}

impl CommandDispatcher {
    pub fn new(store: Arc<WellStore>, session_timeout: Option<Duration>) -> Self {
        Self {
            store,
            sessions: SessionStore::new(session_timeout),
        }
    }

    pub fn store(&self) -> &WellStore {
        &self.store
    }

    /// Current conversation state of a chat member.
    pub fn state(&self, chat_id: i64, user_id: Option<i64>) -> ChatState {
        self.sessions.state(session_key(chat_id, user_id))
    }

    /// Handles one message and returns the reply to send, if any.
    ///
    /// Never fails: store errors are already turned into reply text.
    /// Messages without text produce no reply.
    pub fn handle(&self, msg: &IncomingMessage) -> Option<Reply> {
        let text = msg.text.as_deref()?;
        let key = session_key(msg.chat_id, msg.user_id);

        let reply = match commands::classify(text) {
            Input::Command { command, args } => {
                self.interrupt(key);
                metrics::record_command(command.name());
                self.run_command(command, args, msg)
            }
            Input::Button(button) => {
                self.interrupt(key);
                metrics::record_command(button_metric(button));
                self.run_button(button, key)
            }
            Input::Text(text) => self.continue_session(key, text),
        };

        Some(reply)
    }

    fn run_command(&self, command: Command, args: &str, msg: &IncomingMessage) -> Reply {
        log::info!("Command /{} from chat {}", command.name(), msg.chat_id);
        match command {
            Command::Start => commands::start_text(msg.first_name.as_deref()),
            Command::Help => commands::help_text(),
            Command::Add => commands::add_command(&self.store, args),
            Command::Update => commands::update_command(&self.store, args),
            Command::Export => commands::export_reply(&self.store),
            Command::Show => commands::show_reply(&self.store),
            Command::Fields => commands::fields_reply(&self.store),
            Command::Wells => commands::wells_reply(&self.store),
        }
    }

    fn run_button(&self, button: MenuButton, key: SessionKey) -> Reply {
        match button {
            MenuButton::Fields => commands::fields_reply(&self.store),
            MenuButton::Wells => commands::wells_reply(&self.store),
            MenuButton::Add => self.begin_flow(key, FlowKind::Add),
            MenuButton::Update => self.begin_flow(key, FlowKind::Update),
        }
    }

    fn begin_flow(&self, key: SessionKey, kind: FlowKind) -> Reply {
        let first = self.sessions.begin(key, kind);
        log::info!("Started {} flow for {:?}", kind.name(), key);
        commands::flow_started(kind, first)
    }

    fn continue_session(&self, key: SessionKey, text: &str) -> Reply {
        let submission = self.sessions.submit(key, text);
        metrics::record_command(match submission {
            Submission::NoSession => "unknown",
            _ => "text",
        });

        match submission {
            Submission::Next(_, slot) => Reply::text(commands::prompt(slot)),
            Submission::Rejected(_, slot) => commands::step_rejected(slot),
            Submission::Complete(flow) => self.finish_flow(flow),
            Submission::Expired => Reply::text(commands::SESSION_EXPIRED),
            Submission::NoSession => Reply::text(commands::FALLBACK),
        }
    }

    fn finish_flow(&self, flow: CompletedFlow) -> Reply {
        match flow {
            CompletedFlow::Add {
                field,
                well,
                status,
                comment,
            } => commands::create_record(&self.store, &field, &well, &status, &comment),
            CompletedFlow::Update { well, status, comment } => {
                commands::update_record(&self.store, &well, &status, &comment)
            }
        }
    }

    fn interrupt(&self, key: SessionKey) {
        if self.sessions.discard(key) {
            log::info!("Pending session {:?} discarded by a command", key);
        }
    }
}

fn session_key(chat_id: i64, user_id: Option<i64>) -> SessionKey {
    (chat_id, user_id.unwrap_or(0))
}

fn button_metric(button: MenuButton) -> &'static str {
    match button {
        MenuButton::Fields => "fields",
        MenuButton::Wells => "wells",
        MenuButton::Add => "add_flow",
        MenuButton::Update => "update_flow",
    }
}
