//! Client-to-server commands
//!
//! Each text frame carries one JSON object tagged on `"type"`:
//! `{"type": "submit-answer", "option": "Red"}`.

use serde::Deserialize;
use thiserror::Error;

use crate::polls::PollDraft;
use crate::session::roster::ParticipantId;

/// Closed set of commands a connection may send
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientCommand {
    TeacherJoin {
        name: String,
    },
    StudentJoin {
        name: String,
    },
    CreatePoll(PollDraft),
    SubmitAnswer {
        option: String,
    },
    EndPoll,
    SendMessage {
        content: String,
    },
    #[serde(rename_all = "camelCase")]
    RemoveStudent {
        participant_id: ParticipantId,
    },
}

impl ClientCommand {
    /// Wire name of the command
    pub fn name(&self) -> &'static str {
        match self {
            ClientCommand::TeacherJoin { .. } => "teacher-join",
            ClientCommand::StudentJoin { .. } => "student-join",
            ClientCommand::CreatePoll(_) => "create-poll",
            ClientCommand::SubmitAnswer { .. } => "submit-answer",
            ClientCommand::EndPoll => "end-poll",
            ClientCommand::SendMessage { .. } => "send-message",
            ClientCommand::RemoveStudent { .. } => "remove-student",
        }
    }
}

/// A frame that could not be decoded into a command
#[derive(Debug, Error)]
#[error("Malformed command: {0}")]
pub struct MalformedCommand(#[from] serde_json::Error);

impl MalformedCommand {
    pub const KIND: &'static str = "malformed-command";
}

/// Decode one text frame.
pub fn parse_command(frame: &str) -> Result<ClientCommand, MalformedCommand> {
    Ok(serde_json::from_str(frame)?)
}
