//! Session aggregate
//!
//! `Session` owns the roster, the chat log and the poll lifecycle for the one
//! live classroom. Its operations are synchronous and never touch the
//! network: each returns a [`Transition`] listing the events to fan out and
//! the timer change to apply. The [`coordinator`] runs them under a single
//! lock and applies the transitions.

pub mod chat;
pub mod coordinator;
pub mod error;
pub mod roster;

pub use coordinator::SessionCoordinator;
pub use error::{SessionError, SessionResult};

use std::time::Duration;

use crate::broadcast::{Audience, Outbound, ServerEvent};
use crate::polls::{EndReason, PollDraft, PollId, PollLifecycle, PollLimits};
use chat::ChatLog;
use roster::{Participant, ParticipantId, Role, Roster};

/// Tunables for a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub poll_limits: PollLimits,
    pub max_message_len: usize,
    pub max_name_len: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            poll_limits: PollLimits::default(),
            max_message_len: 1000,
            max_name_len: 64,
        }
    }
}

/// Change to the poll countdown requested by an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    /// Start a countdown for `poll_id`, replacing any armed one
    Arm { poll_id: PollId, after: Duration },
    Disarm,
}

/// Result of a session operation
#[derive(Debug, Default)]
pub struct Transition {
    pub outbound: Vec<Outbound>,
    pub timer: Option<TimerCommand>,
}

impl Transition {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, audience: Audience, event: ServerEvent) {
        self.outbound.push(Outbound::new(audience, event));
    }

    pub fn is_empty(&self) -> bool {
        self.outbound.is_empty() && self.timer.is_none()
    }

    /// Names of the queued events, in order
    pub fn event_names(&self) -> Vec<&'static str> {
        self.outbound.iter().map(|o| o.event.name()).collect()
    }
}

/// The live classroom
#[derive(Debug)]
pub struct Session {
    roster: Roster,
    chat: ChatLog,
    polls: PollLifecycle,
    settings: SessionSettings,
}

impl Session {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            roster: Roster::new(),
            chat: ChatLog::new(settings.max_message_len),
            polls: PollLifecycle::new(settings.poll_limits.clone()),
            settings,
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    pub fn polls(&self) -> &PollLifecycle {
        &self.polls
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Register `id` under `role`. Joining again replaces the entry in place
    /// and keeps its answer state for the current poll. A participant coming
    /// back after removal gets its answer restored from the active poll.
    pub fn join(&mut self, id: ParticipantId, role: Role, name: &str) -> SessionResult<Transition> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::invalid("Name cannot be empty"));
        }
        if name.chars().count() > self.settings.max_name_len {
            return Err(SessionError::invalid(format!(
                "Name exceeds {} characters",
                self.settings.max_name_len
            )));
        }

        let mut participant = Participant::new(id, role, name);
        if let Some(previous) = self.roster.get(id) {
            participant.has_answered = previous.has_answered;
            participant.current_answer = previous.current_answer.clone();
            participant.joined_at = previous.joined_at;
        } else if let Some(answer) = self.polls.current().and_then(|p| {
            p.is_active().then(|| p.answer_of(id)).flatten()
        }) {
            participant.has_answered = true;
            participant.current_answer = Some(answer.to_string());
        }
        self.roster.join(participant.clone());

        let mut t = Transition::new();
        t.push(
            Audience::Single(id),
            ServerEvent::ParticipantJoinedAck {
                participant,
                current_poll: self.polls.current().cloned(),
                chat_history: self.chat.history().to_vec(),
            },
        );
        t.push(Audience::Teachers, self.roster_changed());
        Ok(t)
    }

    /// Drop a participant after its connection closed. Idempotent.
    pub fn leave(&mut self, id: ParticipantId) -> Transition {
        let mut t = Transition::new();
        if self.roster.remove(id).is_some() {
            t.push(Audience::Teachers, self.roster_changed());
        }
        t
    }

    /// Teacher removes a student. Removing an absent student is a no-op.
    pub fn remove_student(
        &mut self,
        actor: ParticipantId,
        target: ParticipantId,
    ) -> SessionResult<Transition> {
        self.require_teacher(actor, "remove a student")?;
        let mut t = Transition::new();
        match self.roster.role_of(target) {
            None => return Ok(t),
            Some(Role::Teacher) => {
                return Err(SessionError::invalid("Only students can be removed"));
            }
            Some(Role::Student) => {}
        }
        let Some(removed) = self.roster.remove(target) else {
            return Ok(t);
        };

        t.push(
            Audience::Single(target),
            ServerEvent::RemovedByTeacher {
                message: "You have been removed from the session by the teacher".to_string(),
            },
        );
        t.push(Audience::Teachers, self.roster_changed());
        t.push(
            Audience::Students,
            ServerEvent::ParticipantRemoved {
                participant_id: removed.id,
                name: removed.name,
            },
        );
        Ok(t)
    }

    /// Create and broadcast a new poll, arming its countdown.
    ///
    /// With every student already answered (including the zero-student
    /// case) the new poll ends immediately.
    pub fn create_poll(
        &mut self,
        actor: ParticipantId,
        draft: PollDraft,
    ) -> SessionResult<Transition> {
        self.require_teacher(actor, "create a poll")?;
        let superseded = self
            .polls
            .current()
            .filter(|p| p.is_active())
            .map(|p| p.id());

        let poll = self.polls.create(&mut self.roster, draft)?.clone();

        let mut t = Transition::new();
        if let Some(previous) = superseded.and_then(|id| self.polls.get(id)) {
            t.push(Audience::All, ServerEvent::poll_ended(previous));
        }
        t.push(Audience::All, ServerEvent::PollCreated { poll: poll.clone() });
        t.push(
            Audience::All,
            ServerEvent::PollTallyChanged {
                poll_id: poll.id(),
                tally: poll.results().clone(),
                student_name: None,
                answer: None,
            },
        );
        t.timer = Some(TimerCommand::Arm {
            poll_id: poll.id(),
            after: poll.time_limit(),
        });

        self.complete_if_all_answered(&mut t);
        Ok(t)
    }

    /// Teacher ends the active poll early. No-op when nothing is active.
    pub fn end_poll(&mut self, actor: ParticipantId) -> SessionResult<Transition> {
        self.require_teacher(actor, "end a poll")?;
        let mut t = Transition::new();
        if let Some(poll) = self.polls.end_active(EndReason::Manual) {
            t.push(Audience::All, ServerEvent::poll_ended(poll));
            t.timer = Some(TimerCommand::Disarm);
        }
        Ok(t)
    }

    /// Countdown for `poll_id` fired. Stale expirations produce nothing.
    pub fn expire_poll(&mut self, poll_id: PollId) -> Transition {
        let mut t = Transition::new();
        if let Some(poll) = self.polls.expire(poll_id) {
            t.push(Audience::All, ServerEvent::poll_ended(poll));
        }
        t
    }

    /// Record a student's answer and broadcast the new tally.
    pub fn submit_answer(
        &mut self,
        actor: ParticipantId,
        option: &str,
    ) -> SessionResult<Transition> {
        let option = option.trim();
        let tally = crate::polls::submit_answer(
            &mut self.roster,
            self.polls.active_mut(),
            actor,
            option,
        )?;
        let poll_id = self
            .polls
            .current()
            .map(|p| p.id())
            .ok_or(SessionError::NotActive)?;
        let student_name = self.roster.get(actor).map(|p| p.name.clone());

        let mut t = Transition::new();
        t.push(
            Audience::Single(actor),
            ServerEvent::AnswerAccepted {
                poll_id,
                option: option.to_string(),
            },
        );
        t.push(
            Audience::All,
            ServerEvent::PollTallyChanged {
                poll_id,
                tally,
                student_name,
                answer: Some(option.to_string()),
            },
        );
        self.complete_if_all_answered(&mut t);
        Ok(t)
    }

    /// Append a chat message and broadcast it.
    pub fn send_message(
        &mut self,
        actor: ParticipantId,
        content: &str,
    ) -> SessionResult<Transition> {
        let message = self.chat.append(&self.roster, actor, content)?;
        let mut t = Transition::new();
        t.push(Audience::All, ServerEvent::ChatMessageAdded { message });
        Ok(t)
    }

    fn complete_if_all_answered(&mut self, t: &mut Transition) {
        if let Some(poll) = self.polls.complete_if_all_answered(&self.roster) {
            t.push(Audience::All, ServerEvent::poll_ended(poll));
            t.timer = Some(TimerCommand::Disarm);
        }
    }

    fn require_teacher(&self, actor: ParticipantId, action: &'static str) -> SessionResult<()> {
        match self.roster.role_of(actor) {
            Some(Role::Teacher) => Ok(()),
            Some(Role::Student) => Err(SessionError::NotPermitted(action)),
            None => Err(SessionError::UnknownParticipant),
        }
    }

    fn roster_changed(&self) -> ServerEvent {
        ServerEvent::RosterChanged {
            students: self.roster.list_students(),
        }
    }
}
