//! Session error taxonomy
//!
//! Every variant is recoverable: the command that produced it is rejected,
//! the initiating connection gets a `validation-error`, and no shared state
//! changes.

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Reasons a session command can be rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Cannot create new poll: previous poll is still active and not all students have answered")]
    Precondition,

    #[error("No poll is currently active")]
    NotActive,

    #[error("You have already answered this question")]
    AlreadyAnswered,

    #[error("Participant is not registered")]
    UnknownParticipant,

    #[error("Only a teacher can {0}")]
    NotPermitted(&'static str),

    #[error("'{0}' is not one of the poll options")]
    UnknownOption(String),

    #[error("{0}")]
    InvalidInput(String),
}

impl SessionError {
    /// Stable machine-readable kind carried on `validation-error` events.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::Precondition => "precondition",
            SessionError::NotActive => "not-active",
            SessionError::AlreadyAnswered => "already-answered",
            SessionError::UnknownParticipant => "unknown-participant",
            SessionError::NotPermitted(_) => "not-permitted",
            SessionError::UnknownOption(_) => "unknown-option",
            SessionError::InvalidInput(_) => "invalid-input",
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        SessionError::InvalidInput(message.into())
    }
}
