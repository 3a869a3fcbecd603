//! Poll Engine
//!
//! The poll record itself and the answer aggregator that validates
//! submissions and derives tallies.

use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use super::config::{EndReason, PollDefinition, PollId};
use crate::session::error::{SessionError, SessionResult};
use crate::session::roster::{ParticipantId, Roster};

/// Per-option answer counts, kept in option order.
///
/// Serializes as a JSON object (`{"Red": 1, "Blue": 0}`) preserving that order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tally {
    counts: Vec<(String, u32)>,
}

impl Tally {
    /// All-zero tally for the given options
    pub fn zeroed(options: &[String]) -> Self {
        Self {
            counts: options.iter().map(|o| (o.clone(), 0)).collect(),
        }
    }

    /// Count, for every option, the answers equal to it. Answers outside the
    /// option set are not counted.
    pub fn from_answers<'a>(
        options: &[String],
        answers: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut tally = Self::zeroed(options);
        for answer in answers {
            if let Some((_, count)) = tally.counts.iter_mut().find(|(o, _)| o == answer) {
                *count += 1;
            }
        }
        tally
    }

    pub fn get(&self, option: &str) -> Option<u32> {
        self.counts
            .iter()
            .find(|(o, _)| o == option)
            .map(|(_, c)| *c)
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().map(|(_, c)| c).sum()
    }
}

impl Serialize for Tally {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.counts.iter().map(|(o, c)| (o, c)))
    }
}

/// A poll, active or ended
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    id: PollId,
    question: String,
    options: Vec<String>,
    time_limit_seconds: u64,
    created_at: DateTime<Utc>,
    /// Scheduled deadline; the countdown clients render
    ends_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    is_active: bool,
    end_reason: Option<EndReason>,
    answers: BTreeMap<ParticipantId, String>,
    results: Tally,
}

impl Poll {
    pub fn new(id: PollId, definition: PollDefinition, now: DateTime<Utc>) -> Self {
        let time_limit = std::time::Duration::from_secs(definition.time_limit_seconds);
        let ends_at = Duration::from_std(time_limit)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(now);
        Self {
            id,
            results: Tally::zeroed(&definition.options),
            question: definition.question,
            options: definition.options,
            time_limit_seconds: definition.time_limit_seconds,
            created_at: now,
            ends_at,
            ended_at: None,
            is_active: true,
            end_reason: None,
            answers: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> PollId {
        self.id
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn time_limit(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.time_limit_seconds)
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    pub fn answer_of(&self, participant: ParticipantId) -> Option<&str> {
        self.answers.get(&participant).map(String::as_str)
    }

    pub fn answer_count(&self) -> usize {
        self.answers.len()
    }

    pub fn results(&self) -> &Tally {
        &self.results
    }

    fn record(&mut self, participant: ParticipantId, option: &str) {
        self.answers.insert(participant, option.to_string());
        self.recompute();
    }

    fn recompute(&mut self) {
        self.results = Tally::from_answers(&self.options, self.answers.values().map(String::as_str));
    }

    /// Stop accepting answers. Returns false if the poll had already ended.
    pub(crate) fn finish(&mut self, reason: EndReason, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        self.is_active = false;
        self.ended_at = Some(now);
        self.end_reason = Some(reason);
        self.recompute();
        true
    }
}

/// Record a student's answer on the active poll and return the new tally.
///
/// Checks run in order: registered student, active poll, not yet answered,
/// known option. An answer already recorded on the poll counts as answered
/// even if the roster entry was recreated since. A rejected submission
/// leaves roster and poll untouched.
pub fn submit_answer(
    roster: &mut Roster,
    poll: Option<&mut Poll>,
    participant_id: ParticipantId,
    option: &str,
) -> SessionResult<Tally> {
    let participant = roster
        .get_mut(participant_id)
        .filter(|p| p.is_student())
        .ok_or(SessionError::UnknownParticipant)?;
    let poll = poll
        .filter(|p| p.is_active())
        .ok_or(SessionError::NotActive)?;
    if participant.has_answered || poll.answer_of(participant_id).is_some() {
        return Err(SessionError::AlreadyAnswered);
    }
    if !poll.has_option(option) {
        return Err(SessionError::UnknownOption(option.to_string()));
    }

    poll.record(participant_id, option);
    participant.has_answered = true;
    participant.current_answer = Some(option.to_string());
    Ok(poll.results().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::roster::{Participant, Role};
    use uuid::Uuid;

    fn definition() -> PollDefinition {
        PollDefinition {
            question: "Color?".to_string(),
            options: vec!["Red".to_string(), "Blue".to_string()],
            time_limit_seconds: 30,
        }
    }

    fn roster_with_students(n: usize) -> (Roster, Vec<ParticipantId>) {
        let mut roster = Roster::new();
        let ids = (0..n)
            .map(|i| {
                let p = Participant::new(Uuid::new_v4(), Role::Student, format!("S{}", i));
                let id = p.id;
                roster.join(p);
                id
            })
            .collect();
        (roster, ids)
    }

    #[test]
    fn test_tally_counts_only_known_options() {
        let options = vec!["Red".to_string(), "Blue".to_string()];
        let tally = Tally::from_answers(&options, ["Red", "Green", "Red", "Blue"]);
        assert_eq!(tally.get("Red"), Some(2));
        assert_eq!(tally.get("Blue"), Some(1));
        assert_eq!(tally.get("Green"), None);
        assert_eq!(tally.total(), 3);
    }

    #[test]
    fn test_tally_serializes_in_option_order() {
        let options = vec!["Zebra".to_string(), "Apple".to_string()];
        let tally = Tally::from_answers(&options, ["Apple"]);
        assert_eq!(
            serde_json::to_string(&tally).unwrap(),
            r#"{"Zebra":0,"Apple":1}"#
        );
    }

    #[test]
    fn test_new_poll_is_active_with_zero_tally() {
        let now = Utc::now();
        let poll = Poll::new(PollId::new(1), definition(), now);
        assert!(poll.is_active());
        assert_eq!(poll.results().total(), 0);
        assert_eq!(poll.results().get("Red"), Some(0));
        assert_eq!(poll.time_limit(), std::time::Duration::from_secs(30));
        assert_eq!(
            poll.ends_at,
            now + Duration::from_std(std::time::Duration::from_secs(30)).unwrap()
        );
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut poll = Poll::new(PollId::new(1), definition(), Utc::now());
        assert!(poll.finish(EndReason::Manual, Utc::now()));
        let ended_at = poll.ended_at();
        assert!(!poll.finish(EndReason::TimerExpired, Utc::now()));
        assert_eq!(poll.end_reason(), Some(EndReason::Manual));
        assert_eq!(poll.ended_at(), ended_at);
    }

    #[test]
    fn test_submit_answer_records_and_tallies() {
        let (mut roster, ids) = roster_with_students(2);
        let mut poll = Poll::new(PollId::new(1), definition(), Utc::now());

        let tally = submit_answer(&mut roster, Some(&mut poll), ids[0], "Red").unwrap();
        assert_eq!(tally.get("Red"), Some(1));
        assert_eq!(tally.get("Blue"), Some(0));
        assert_eq!(poll.answer_of(ids[0]), Some("Red"));

        let alice = roster.get(ids[0]).unwrap();
        assert!(alice.has_answered);
        assert_eq!(alice.current_answer.as_deref(), Some("Red"));
    }

    #[test]
    fn test_submit_answer_rejections() {
        let (mut roster, ids) = roster_with_students(1);
        let teacher = Participant::new(Uuid::new_v4(), Role::Teacher, "T");
        let teacher_id = teacher.id;
        roster.join(teacher);
        let mut poll = Poll::new(PollId::new(1), definition(), Utc::now());

        assert_eq!(
            submit_answer(&mut roster, Some(&mut poll), Uuid::new_v4(), "Red"),
            Err(SessionError::UnknownParticipant)
        );
        assert_eq!(
            submit_answer(&mut roster, Some(&mut poll), teacher_id, "Red"),
            Err(SessionError::UnknownParticipant)
        );
        assert_eq!(
            submit_answer(&mut roster, None, ids[0], "Red"),
            Err(SessionError::NotActive)
        );
        assert_eq!(
            submit_answer(&mut roster, Some(&mut poll), ids[0], "Green"),
            Err(SessionError::UnknownOption("Green".to_string()))
        );
        assert!(!roster.get(ids[0]).unwrap().has_answered);

        submit_answer(&mut roster, Some(&mut poll), ids[0], "Blue").unwrap();
        assert_eq!(
            submit_answer(&mut roster, Some(&mut poll), ids[0], "Red"),
            Err(SessionError::AlreadyAnswered)
        );
        assert_eq!(poll.results().get("Blue"), Some(1));
        assert_eq!(poll.results().get("Red"), Some(0));
    }

    #[test]
    fn test_recorded_answer_blocks_recreated_participant() {
        let (mut roster, ids) = roster_with_students(1);
        let mut poll = Poll::new(PollId::new(1), definition(), Utc::now());
        submit_answer(&mut roster, Some(&mut poll), ids[0], "Red").unwrap();

        roster.remove(ids[0]);
        roster.join(Participant::new(ids[0], Role::Student, "S0"));
        assert_eq!(
            submit_answer(&mut roster, Some(&mut poll), ids[0], "Blue"),
            Err(SessionError::AlreadyAnswered)
        );
        assert_eq!(poll.answer_of(ids[0]), Some("Red"));
        assert_eq!(poll.results().get("Red"), Some(1));
        assert_eq!(poll.results().get("Blue"), Some(0));
    }

    #[test]
    fn test_submit_to_ended_poll() {
        let (mut roster, ids) = roster_with_students(1);
        let mut poll = Poll::new(PollId::new(1), definition(), Utc::now());
        poll.finish(EndReason::Manual, Utc::now());
        assert_eq!(
            submit_answer(&mut roster, Some(&mut poll), ids[0], "Red"),
            Err(SessionError::NotActive)
        );
    }

    #[test]
    fn test_tally_sum_matches_recorded_answers() {
        let (mut roster, ids) = roster_with_students(5);
        let mut poll = Poll::new(PollId::new(1), definition(), Utc::now());
        for (i, id) in ids.iter().enumerate() {
            let option = if i % 2 == 0 { "Red" } else { "Blue" };
            submit_answer(&mut roster, Some(&mut poll), *id, option).unwrap();
            assert_eq!(poll.results().total() as usize, poll.answer_count());
        }
        assert_eq!(poll.results().get("Red"), Some(3));
        assert_eq!(poll.results().get("Blue"), Some(2));
    }
}
