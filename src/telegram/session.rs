//! Multi-step input sessions
//!
//! The chat delivers one line of text per turn, so adding or updating a well
//! through the keyboard buttons collects the record fields one message at a
//! time. A session is keyed by chat and sender, lives only in memory and ends
//! when the last field arrives, when a command interrupts it, or when it is
//! found idle for longer than the configured timeout.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Chat id and sender id. Messages without a sender use sender id 0.
pub type SessionKey = (i64, i64);

/// Which multi-step flow a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowKind {
    Add,
    Update,
}

/// A record field collected by one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSlot {
    Field,
    Well,
    Status,
    Comment,
}

impl FlowKind {
    /// Fields collected by this flow, in prompt order.
    pub fn slots(self) -> &'static [FieldSlot] {
        match self {
            FlowKind::Add => &[FieldSlot::Field, FieldSlot::Well, FieldSlot::Status, FieldSlot::Comment],
            FlowKind::Update => &[FieldSlot::Well, FieldSlot::Status, FieldSlot::Comment],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FlowKind::Add => "add",
            FlowKind::Update => "update",
        }
    }
}

/// Per-chat dispatcher state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Idle,
    AwaitingStep { kind: FlowKind, step: usize },
}

/// Answers of a finished flow, in the shape of the store call they feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletedFlow {
    Add {
        field: String,
        well: String,
        status: String,
        comment: String,
    },
    Update {
        well: String,
        status: String,
        comment: String,
    },
}

/// Outcome of feeding one message into a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Answer stored; ask for the next field
    Next(FlowKind, FieldSlot),
    /// Empty answer; ask for the same field again
    Rejected(FlowKind, FieldSlot),
    /// Last answer stored; the session is gone
    Complete(CompletedFlow),
    /// The session had been idle too long and was dropped
    Expired,
    /// Nothing pending for this key
    NoSession,
}

#[derive(Debug, Clone)]
struct Session {
    kind: FlowKind,
    answers: Vec<String>,
    touched: Instant,
}

impl Session {
    fn current_slot(&self) -> Option<FieldSlot> {
        self.kind.slots().get(self.answers.len()).copied()
    }

    fn finish(self) -> CompletedFlow {
        let kind = self.kind;
        let mut answers = self.answers.into_iter();
        let mut next = || answers.next().unwrap_or_default();
        match kind {
            FlowKind::Add => CompletedFlow::Add {
                field: next(),
                well: next(),
                status: next(),
                comment: next(),
            },
            FlowKind::Update => CompletedFlow::Update {
                well: next(),
                status: next(),
                comment: next(),
            },
        }
    }
}

/// All pending sessions of the process.
pub struct SessionStore {
    sessions: DashMap<SessionKey, Session>,
    timeout: Option<Duration>,
}

impl SessionStore {
    /// `timeout: None` keeps abandoned sessions until they are overwritten.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            sessions: DashMap::new(),
            timeout,
        }
    }

    /// Starts a flow, replacing whatever was pending for `key`.
    ///
    /// Returns the first field to ask for.
    pub fn begin(&self, key: SessionKey, kind: FlowKind) -> FieldSlot {
        self.purge_expired();

        let session = Session {
            kind,
            answers: Vec::with_capacity(kind.slots().len()),
            touched: Instant::now(),
        };
        if self.sessions.insert(key, session).is_some() {
            log::debug!("Session {:?} replaced by a new {} flow", key, kind.name());
        }
        kind.slots()[0]
    }

    /// Feeds one text message into the pending session for `key`.
    ///
    /// The entry stays locked for the whole step, so a concurrent `begin`
    /// for the same key either lands before it or after it.
    pub fn submit(&self, key: SessionKey, text: &str) -> Submission {
        let mut entry = match self.sessions.entry(key) {
            Entry::Occupied(entry) => entry,
            Entry::Vacant(_) => return Submission::NoSession,
        };

        if self.is_expired(entry.get()) {
            entry.remove();
            log::info!("Session {:?} expired", key);
            return Submission::Expired;
        }

        let session = entry.get_mut();
        session.touched = Instant::now();
        let kind = session.kind;
        let Some(slot) = session.current_slot() else {
            entry.remove();
            return Submission::NoSession;
        };

        let answer = text.trim();
        if answer.is_empty() {
            return Submission::Rejected(kind, slot);
        }
        session.answers.push(answer.to_string());

        if let Some(next) = session.current_slot() {
            return Submission::Next(kind, next);
        }

        Submission::Complete(entry.remove().finish())
    }

    /// Drops the pending session for `key`. Returns whether one existed.
    pub fn discard(&self, key: SessionKey) -> bool {
        self.sessions.remove(&key).is_some()
    }

    pub fn state(&self, key: SessionKey) -> ChatState {
        match self.sessions.get(&key) {
            Some(session) if !self.is_expired(&session) => ChatState::AwaitingStep {
                kind: session.kind,
                step: session.answers.len(),
            },
            _ => ChatState::Idle,
        }
    }

    /// Drops every expired session. Returns how many were dropped.
    ///
    /// Sessions of chats that never write again are only freed here.
    pub fn purge_expired(&self) -> usize {
        if self.timeout.is_none() {
            return 0;
        }
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !self.is_expired(session));
        let purged = before.saturating_sub(self.sessions.len());
        if purged > 0 {
            log::debug!("Purged {} expired sessions", purged);
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn is_expired(&self, session: &Session) -> bool {
        self.timeout
            .map(|timeout| session.touched.elapsed() > timeout)
            .unwrap_or(false)
    }
}
