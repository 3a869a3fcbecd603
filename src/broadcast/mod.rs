//! Broadcast Dispatcher
//!
//! Fans session events out to connected participants. Every connection owns
//! a bounded outbound queue; delivery is a non-blocking `try_send`, so a slow
//! or closed connection loses the event instead of stalling the session.

pub mod events;

pub use events::ServerEvent;

use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::warn;

use crate::session::roster::{ParticipantId, Role, Roster};

/// Outbound half of a connection's event queue
pub type EventSender = mpsc::Sender<ServerEvent>;

/// Who receives an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Every attached connection, joined or not
    All,
    Teachers,
    Students,
    Single(ParticipantId),
}

/// An event addressed to an audience
#[derive(Debug, Clone)]
pub struct Outbound {
    pub audience: Audience,
    pub event: ServerEvent,
}

impl Outbound {
    pub fn new(audience: Audience, event: ServerEvent) -> Self {
        Self { audience, event }
    }
}

/// Connection table keyed by participant id
#[derive(Debug, Default)]
pub struct Dispatcher {
    connections: HashMap<ParticipantId, EventSender>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a connection's queue. Re-attaching an id replaces its queue.
    pub fn attach(&mut self, id: ParticipantId, tx: EventSender) {
        self.connections.insert(id, tx);
    }

    /// Detach a connection. Returns false if it was not attached.
    pub fn detach(&mut self, id: ParticipantId) -> bool {
        self.connections.remove(&id).is_some()
    }

    pub fn is_attached(&self, id: ParticipantId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Deliver an event to its audience, resolving role scopes through the
    /// roster. Returns how many queues accepted the event.
    pub fn dispatch(&self, roster: &Roster, outbound: Outbound) -> usize {
        let Outbound { audience, event } = outbound;
        match audience {
            Audience::All => self
                .connections
                .iter()
                .filter(|(id, tx)| self.enqueue(**id, tx, event.clone()))
                .count(),
            Audience::Teachers => self.dispatch_role(roster, Role::Teacher, &event),
            Audience::Students => self.dispatch_role(roster, Role::Student, &event),
            Audience::Single(id) => match self.connections.get(&id) {
                Some(tx) => usize::from(self.enqueue(id, tx, event)),
                None => 0,
            },
        }
    }

    fn dispatch_role(&self, roster: &Roster, role: Role, event: &ServerEvent) -> usize {
        self.connections
            .iter()
            .filter(|(id, _)| roster.role_of(**id) == Some(role))
            .filter(|(id, tx)| self.enqueue(**id, tx, event.clone()))
            .count()
    }

    fn enqueue(&self, id: ParticipantId, tx: &EventSender, event: ServerEvent) -> bool {
        let name = event.name();
        match tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(participant = %id, event = name, "outbound queue full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(participant = %id, event = name, "connection closed, dropping event");
                false
            }
        }
    }
}
