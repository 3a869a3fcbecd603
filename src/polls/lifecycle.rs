//! Poll Lifecycle Manager
//!
//! Owns the current poll and every poll before it. The state machine is
//! `NoPoll -> Active -> Ended`, and `Ended` is only left by creating a fresh
//! `Active` poll. At most one poll is active at any time.

use chrono::Utc;

use super::config::{EndReason, PollDraft, PollId, PollLimits};
use super::engine::Poll;
use crate::session::error::{SessionError, SessionResult};
use crate::session::roster::Roster;

/// Observable lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    NoPoll,
    Active(PollId),
    Ended(PollId),
}

/// Current poll plus history, in creation order
#[derive(Debug)]
pub struct PollLifecycle {
    history: Vec<Poll>,
    next_id: u64,
    limits: PollLimits,
}

impl PollLifecycle {
    pub fn new(limits: PollLimits) -> Self {
        Self {
            history: Vec::new(),
            next_id: 1,
            limits,
        }
    }

    pub fn phase(&self) -> PollPhase {
        match self.current() {
            None => PollPhase::NoPoll,
            Some(poll) if poll.is_active() => PollPhase::Active(poll.id()),
            Some(poll) => PollPhase::Ended(poll.id()),
        }
    }

    /// The most recently created poll, active or ended
    pub fn current(&self) -> Option<&Poll> {
        self.history.last()
    }

    /// The current poll, only while it is active
    pub fn active_mut(&mut self) -> Option<&mut Poll> {
        self.history.last_mut().filter(|p| p.is_active())
    }

    pub fn get(&self, id: PollId) -> Option<&Poll> {
        self.history.iter().find(|p| p.id() == id)
    }

    pub fn history(&self) -> &[Poll] {
        &self.history
    }

    /// Whether a new poll may be created right now
    pub fn can_create(&self, roster: &Roster) -> bool {
        match self.current() {
            None => true,
            Some(poll) if !poll.is_active() => true,
            Some(_) => roster.all_students_answered(),
        }
    }

    /// Create and activate a new poll.
    ///
    /// Clears every participant's answer state. If the previous poll was
    /// still active (allowed once every student answered) it is closed as
    /// `AllAnswered` so only one poll is ever active.
    pub fn create(&mut self, roster: &mut Roster, draft: PollDraft) -> SessionResult<&Poll> {
        if !self.can_create(roster) {
            return Err(SessionError::Precondition);
        }
        let definition = draft.validate(&self.limits)?;

        let now = Utc::now();
        if let Some(previous) = self.active_mut() {
            previous.finish(EndReason::AllAnswered, now);
        }
        roster.reset_answers();

        let id = PollId::new(self.next_id);
        self.next_id += 1;
        self.history.push(Poll::new(id, definition, now));
        Ok(&self.history[self.history.len() - 1])
    }

    /// End the active poll. Returns `None` when nothing was active.
    pub fn end_active(&mut self, reason: EndReason) -> Option<&Poll> {
        let poll = self.history.last_mut()?;
        if poll.finish(reason, Utc::now()) {
            Some(&*poll)
        } else {
            None
        }
    }

    /// Handle a countdown firing for `poll_id`.
    ///
    /// Ends the poll only if it is still the current one and still active;
    /// expirations for superseded polls are discarded.
    pub fn expire(&mut self, poll_id: PollId) -> Option<&Poll> {
        let is_current = self
            .current()
            .is_some_and(|poll| poll.id() == poll_id && poll.is_active());
        if !is_current {
            return None;
        }
        self.end_active(EndReason::TimerExpired)
    }

    /// End the active poll once every registered student has answered.
    pub fn complete_if_all_answered(&mut self, roster: &Roster) -> Option<&Poll> {
        if self.active_mut().is_some() && roster.all_students_answered() {
            self.end_active(EndReason::AllAnswered)
        } else {
            None
        }
    }
}
