//! Server-to-client events
//!
//! Every event is serialized adjacently tagged:
//! `{"event": "poll-created", "data": {...}}`.

use serde::Serialize;

use crate::polls::{EndReason, Poll, PollId, Tally};
use crate::session::chat::ChatMessage;
use crate::session::roster::{Participant, ParticipantId};

/// Closed set of events the server emits
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Sent to a participant right after it joins
    #[serde(rename_all = "camelCase")]
    ParticipantJoinedAck {
        participant: Participant,
        current_poll: Option<Poll>,
        chat_history: Vec<ChatMessage>,
    },

    #[serde(rename_all = "camelCase")]
    RosterChanged { students: Vec<Participant> },

    #[serde(rename_all = "camelCase")]
    PollCreated { poll: Poll },

    #[serde(rename_all = "camelCase")]
    PollTallyChanged {
        poll_id: PollId,
        tally: Tally,
        #[serde(skip_serializing_if = "Option::is_none")]
        student_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        answer: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    PollEnded {
        poll: Poll,
        tally: Tally,
        reason: EndReason,
    },

    #[serde(rename_all = "camelCase")]
    AnswerAccepted { poll_id: PollId, option: String },

    #[serde(rename_all = "camelCase")]
    ChatMessageAdded { message: ChatMessage },

    #[serde(rename_all = "camelCase")]
    ParticipantRemoved {
        participant_id: ParticipantId,
        name: String,
    },

    /// Sent only to the student a teacher removed
    #[serde(rename_all = "camelCase")]
    RemovedByTeacher { message: String },

    #[serde(rename_all = "camelCase")]
    ValidationError { kind: String, message: String },
}

impl ServerEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::ParticipantJoinedAck { .. } => "participant-joined-ack",
            ServerEvent::RosterChanged { .. } => "roster-changed",
            ServerEvent::PollCreated { .. } => "poll-created",
            ServerEvent::PollTallyChanged { .. } => "poll-tally-changed",
            ServerEvent::PollEnded { .. } => "poll-ended",
            ServerEvent::AnswerAccepted { .. } => "answer-accepted",
            ServerEvent::ChatMessageAdded { .. } => "chat-message-added",
            ServerEvent::ParticipantRemoved { .. } => "participant-removed",
            ServerEvent::RemovedByTeacher { .. } => "removed-by-teacher",
            ServerEvent::ValidationError { .. } => "validation-error",
        }
    }

    /// Final state of an ended poll
    pub fn poll_ended(poll: &Poll) -> Self {
        ServerEvent::PollEnded {
            tally: poll.results().clone(),
            reason: poll.end_reason().unwrap_or(EndReason::Manual),
            poll: poll.clone(),
        }
    }

    pub fn validation_error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        ServerEvent::ValidationError {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
