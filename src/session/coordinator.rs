//! Session coordinator
//!
//! Serializes every mutation of the shared session behind one lock, applies
//! the resulting [`Transition`]s and owns the poll countdown. Events are
//! queued on the connections while the lock is held, so all clients see a
//! poll's created, tally and ended events in the same order.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::chat::ChatMessage;
use super::error::SessionResult;
use super::roster::{Participant, ParticipantId, Role};
use super::{Session, SessionSettings, TimerCommand, Transition};
use crate::broadcast::{Audience, Dispatcher, EventSender, Outbound, ServerEvent};
use crate::polls::{Poll, PollDraft, PollId};

struct ArmedTimer {
    poll_id: PollId,
    handle: JoinHandle<()>,
}

struct Inner {
    session: Session,
    dispatcher: Dispatcher,
    timer: Option<ArmedTimer>,
}

/// Counters for the health endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub connections: usize,
    pub participants: usize,
    pub students: usize,
    pub polls: usize,
    pub active_poll: Option<PollId>,
}

/// Shared handle to the live session
pub struct SessionCoordinator {
    inner: Mutex<Inner>,
}

impl SessionCoordinator {
    pub fn new(settings: SessionSettings) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                session: Session::new(settings),
                dispatcher: Dispatcher::new(),
                timer: None,
            }),
        })
    }

    /// Attach a freshly opened connection's outbound queue.
    pub fn connect(&self, conn: ParticipantId, tx: EventSender) {
        let mut inner = self.inner.lock();
        inner.dispatcher.attach(conn, tx);
        info!(participant = %conn, connections = inner.dispatcher.connection_count(), "connection opened");
    }

    /// Detach a closed connection and drop its participant. Idempotent.
    pub fn disconnect(&self, conn: ParticipantId) {
        let mut inner = self.inner.lock();
        if !inner.dispatcher.detach(conn) {
            return;
        }
        let transition = inner.session.leave(conn);
        Self::deliver(&inner, transition.outbound);
        info!(participant = %conn, connections = inner.dispatcher.connection_count(), "connection closed");
    }

    pub fn join(self: &Arc<Self>, conn: ParticipantId, role: Role, name: &str) -> SessionResult<()> {
        let result = self.apply(conn, |session| session.join(conn, role, name));
        if result.is_ok() {
            info!(participant = %conn, %role, name = name.trim(), "participant joined");
        }
        result
    }

    pub fn create_poll(self: &Arc<Self>, conn: ParticipantId, draft: PollDraft) -> SessionResult<()> {
        self.apply(conn, |session| session.create_poll(conn, draft))
    }

    pub fn submit_answer(self: &Arc<Self>, conn: ParticipantId, option: &str) -> SessionResult<()> {
        self.apply(conn, |session| session.submit_answer(conn, option))
    }

    pub fn end_poll(self: &Arc<Self>, conn: ParticipantId) -> SessionResult<()> {
        self.apply(conn, |session| session.end_poll(conn))
    }

    pub fn send_message(self: &Arc<Self>, conn: ParticipantId, content: &str) -> SessionResult<()> {
        self.apply(conn, |session| session.send_message(conn, content))
    }

    pub fn remove_student(
        self: &Arc<Self>,
        conn: ParticipantId,
        target: ParticipantId,
    ) -> SessionResult<()> {
        self.apply(conn, |session| session.remove_student(conn, target))
    }

    /// Report a rejected frame to the connection that sent it.
    pub fn reject(&self, conn: ParticipantId, kind: &str, message: &str) {
        let inner = self.inner.lock();
        debug!(participant = %conn, kind, message, "command rejected");
        Self::deliver(
            &inner,
            vec![Outbound::new(
                Audience::Single(conn),
                ServerEvent::validation_error(kind, message),
            )],
        );
    }

    /// Countdown for `poll_id` elapsed.
    pub fn on_timer_expiry(&self, poll_id: PollId) {
        let mut inner = self.inner.lock();
        if inner.timer.as_ref().is_some_and(|t| t.poll_id == poll_id) {
            inner.timer = None;
        }
        let transition = inner.session.expire_poll(poll_id);
        if transition.outbound.is_empty() {
            debug!(poll = %poll_id, "discarding stale poll timer");
            return;
        }
        info!(poll = %poll_id, "poll time limit reached");
        Self::deliver(&inner, transition.outbound);
    }

    pub fn polls(&self) -> Vec<Poll> {
        self.inner.lock().session.polls().history().to_vec()
    }

    pub fn current_poll(&self) -> Option<Poll> {
        self.inner.lock().session.polls().current().cloned()
    }

    pub fn students(&self) -> Vec<Participant> {
        self.inner.lock().session.roster().list_students()
    }

    pub fn chat(&self) -> Vec<ChatMessage> {
        self.inner.lock().session.chat().history().to_vec()
    }

    pub fn stats(&self) -> SessionStats {
        let inner = self.inner.lock();
        let session = &inner.session;
        SessionStats {
            connections: inner.dispatcher.connection_count(),
            participants: session.roster().len(),
            students: session.roster().student_count(),
            polls: session.polls().history().len(),
            active_poll: session
                .polls()
                .current()
                .filter(|p| p.is_active())
                .map(|p| p.id()),
        }
    }

    /// Whether a countdown is currently armed
    pub fn timer_armed(&self) -> bool {
        self.inner.lock().timer.is_some()
    }

    fn apply<F>(self: &Arc<Self>, conn: ParticipantId, op: F) -> SessionResult<()>
    where
        F: FnOnce(&mut Session) -> SessionResult<Transition>,
    {
        let mut inner = self.inner.lock();
        match op(&mut inner.session) {
            Ok(transition) => {
                if let Some(command) = transition.timer {
                    self.apply_timer(&mut inner, command);
                }
                Self::deliver(&inner, transition.outbound);
                Ok(())
            }
            Err(err) => {
                debug!(participant = %conn, kind = err.kind(), error = %err, "command rejected");
                Self::deliver(
                    &inner,
                    vec![Outbound::new(
                        Audience::Single(conn),
                        ServerEvent::validation_error(err.kind(), err.to_string()),
                    )],
                );
                Err(err)
            }
        }
    }

    fn apply_timer(self: &Arc<Self>, inner: &mut Inner, command: TimerCommand) {
        if let Some(previous) = inner.timer.take() {
            previous.handle.abort();
        }
        if let TimerCommand::Arm { poll_id, after } = command {
            let coordinator: Weak<Self> = Arc::downgrade(self);
            let handle = tokio::spawn(async move {
                tokio::time::sleep(after).await;
                if let Some(coordinator) = coordinator.upgrade() {
                    coordinator.on_timer_expiry(poll_id);
                }
            });
            debug!(poll = %poll_id, secs = after.as_secs(), "poll timer armed");
            inner.timer = Some(ArmedTimer { poll_id, handle });
        }
    }

    fn deliver(inner: &Inner, outbound: Vec<Outbound>) {
        let roster = inner.session.roster();
        for item in outbound {
            inner.dispatcher.dispatch(roster, item);
        }
    }
}

impl Drop for SessionCoordinator {
    fn drop(&mut self) {
        if let Some(timer) = self.inner.get_mut().timer.take() {
            timer.handle.abort();
        }
    }
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator").finish_non_exhaustive()
    }
}
