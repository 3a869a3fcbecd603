//! Poll Configuration
//!
//! Incoming poll drafts, their validation limits, and poll identity.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::session::error::{SessionError, SessionResult};

/// Poll identity. Issued from a monotonic sequence, so ids order by creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PollId(u64);

impl PollId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for PollId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a poll stopped accepting answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndReason {
    /// Teacher ended it early
    Manual,
    /// Countdown ran out
    TimerExpired,
    /// Every registered student answered
    AllAnswered,
}

/// Limits applied to poll drafts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PollLimits {
    /// Time limit used when a draft omits one
    pub default_time_limit_secs: u64,
    pub max_time_limit_secs: u64,
    pub max_options: usize,
}

impl Default for PollLimits {
    fn default() -> Self {
        Self {
            default_time_limit_secs: 60,
            max_time_limit_secs: 3600,
            max_options: 10,
        }
    }
}

/// Poll as requested by the teacher, before validation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollDraft {
    pub question: String,
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_seconds: Option<u64>,
}

impl PollDraft {
    pub fn new<I, S>(question: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            question: question.into(),
            options: options.into_iter().map(Into::into).collect(),
            time_limit_seconds: None,
        }
    }

    pub fn with_time_limit(mut self, seconds: u64) -> Self {
        self.time_limit_seconds = Some(seconds);
        self
    }

    /// Trim and validate the draft against `limits`.
    pub fn validate(self, limits: &PollLimits) -> SessionResult<PollDefinition> {
        let question = self.question.trim();
        if question.is_empty() {
            return Err(SessionError::invalid("Question cannot be empty"));
        }

        let options: Vec<String> = self
            .options
            .iter()
            .map(|o| o.trim().to_string())
            .collect();
        if options.len() < 2 {
            return Err(SessionError::invalid("A poll needs at least 2 options"));
        }
        if options.len() > limits.max_options {
            return Err(SessionError::invalid(format!(
                "A poll can have at most {} options",
                limits.max_options
            )));
        }
        if options.iter().any(|o| o.is_empty()) {
            return Err(SessionError::invalid("Options cannot be empty"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = options.iter().find(|o| !seen.insert(o.as_str())) {
            return Err(SessionError::invalid(format!("Duplicate option '{}'", dup)));
        }

        let time_limit_seconds = self
            .time_limit_seconds
            .unwrap_or(limits.default_time_limit_secs);
        if time_limit_seconds == 0 || time_limit_seconds > limits.max_time_limit_secs {
            return Err(SessionError::invalid(format!(
                "Time limit must be between 1 and {} seconds",
                limits.max_time_limit_secs
            )));
        }

        Ok(PollDefinition {
            question: question.to_string(),
            options,
            time_limit_seconds,
        })
    }
}

/// A validated poll draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollDefinition {
    pub question: String,
    pub options: Vec<String>,
    pub time_limit_seconds: u64,
}
