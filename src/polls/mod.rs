//! Polls
//!
//! Poll drafts and validation, the poll record with its answer aggregator,
//! and the lifecycle that keeps at most one poll active.

pub mod config;
pub mod engine;
pub mod lifecycle;

pub use config::{EndReason, PollDefinition, PollDraft, PollId, PollLimits};
pub use engine::{submit_answer, Poll, Tally};
pub use lifecycle::{PollLifecycle, PollPhase};
