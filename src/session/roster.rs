//! Session Registry
//!
//! Tracks every joined participant and their role. Entries keep insertion
//! order so the teacher dashboard lists students in the order they arrived.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a participant; one per WebSocket connection.
pub type ParticipantId = Uuid;

/// Participant role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Student,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Teacher => f.write_str("teacher"),
            Role::Student => f.write_str("student"),
        }
    }
}

/// A joined participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub role: Role,
    /// Set once the participant answers the current poll; cleared only by a new poll
    pub has_answered: bool,
    pub current_answer: Option<String>,
    pub joined_at: DateTime<Utc>,
}

impl Participant {
    pub fn new(id: ParticipantId, role: Role, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            has_answered: false,
            current_answer: None,
            joined_at: Utc::now(),
        }
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }
}

/// Insertion-ordered participant registry
#[derive(Debug, Default)]
pub struct Roster {
    entries: Vec<Participant>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a participant, replacing any entry with the same id in place.
    ///
    /// Returns the replaced entry, if any.
    pub fn join(&mut self, participant: Participant) -> Option<Participant> {
        match self.position(participant.id) {
            Some(idx) => Some(std::mem::replace(&mut self.entries[idx], participant)),
            None => {
                self.entries.push(participant);
                None
            }
        }
    }

    /// Remove a participant. Removing an absent id is a no-op.
    pub fn remove(&mut self, id: ParticipantId) -> Option<Participant> {
        self.position(id).map(|idx| self.entries.remove(idx))
    }

    pub fn get(&self, id: ParticipantId) -> Option<&Participant> {
        self.entries.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: ParticipantId) -> Option<&mut Participant> {
        self.entries.iter_mut().find(|p| p.id == id)
    }

    pub fn role_of(&self, id: ParticipantId) -> Option<Role> {
        self.get(id).map(|p| p.role)
    }

    /// Snapshot of all students, in join order
    pub fn list_students(&self) -> Vec<Participant> {
        self.students().cloned().collect()
    }

    pub fn students(&self) -> impl Iterator<Item = &Participant> {
        self.entries.iter().filter(|p| p.is_student())
    }

    pub fn student_count(&self) -> usize {
        self.students().count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when every registered student has answered; vacuously true with no students.
    pub fn all_students_answered(&self) -> bool {
        self.students().all(|p| p.has_answered)
    }

    /// Clear every participant's answer state for a fresh poll.
    pub fn reset_answers(&mut self) {
        for participant in &mut self.entries {
            participant.has_answered = false;
            participant.current_answer = None;
        }
    }

    fn position(&self, id: ParticipantId) -> Option<usize> {
        self.entries.iter().position(|p| p.id == id)
    }
}
