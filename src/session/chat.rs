//! Chat Log
//!
//! Append-only message list shared by everyone in the session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{SessionError, SessionResult};
use super::roster::{ParticipantId, Role, Roster};

/// A chat message; immutable once appended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender_id: ParticipantId,
    pub sender: String,
    pub sender_role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Ordered chat history
#[derive(Debug)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
    max_message_len: usize,
}

impl ChatLog {
    pub fn new(max_message_len: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_message_len,
        }
    }

    /// Append a message from a registered participant.
    pub fn append(
        &mut self,
        roster: &Roster,
        sender_id: ParticipantId,
        content: &str,
    ) -> SessionResult<ChatMessage> {
        let sender = roster
            .get(sender_id)
            .ok_or(SessionError::UnknownParticipant)?;

        let content = content.trim();
        if content.is_empty() {
            return Err(SessionError::invalid("Message cannot be empty"));
        }
        if content.chars().count() > self.max_message_len {
            return Err(SessionError::invalid(format!(
                "Message exceeds {} characters",
                self.max_message_len
            )));
        }

        let message = ChatMessage {
            id: Uuid::new_v4(),
            sender_id,
            sender: sender.name.clone(),
            sender_role: sender.role,
            content: content.to_string(),
            timestamp: Utc::now(),
        };
        self.messages.push(message.clone());
        Ok(message)
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
