//! Classroom scenarios driven through the session coordinator, observing the
//! events each connection receives.

use std::sync::Arc;
use std::time::Duration;

use classpoll::broadcast::ServerEvent;
use classpoll::polls::{EndReason, PollDraft};
use classpoll::session::roster::{ParticipantId, Role};
use classpoll::session::{SessionCoordinator, SessionError, SessionSettings};
use tokio::sync::mpsc;
use uuid::Uuid;

struct Client {
    id: ParticipantId,
    rx: mpsc::Receiver<ServerEvent>,
}

impl Client {
    fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn drain_names(&mut self) -> Vec<&'static str> {
        self.drain().iter().map(|e| e.name()).collect()
    }
}

struct Room {
    coordinator: Arc<SessionCoordinator>,
    teacher: Client,
}

impl Room {
    fn new() -> Self {
        let coordinator = SessionCoordinator::new(SessionSettings::default());
        let teacher = connect(&coordinator);
        coordinator
            .join(teacher.id, Role::Teacher, "Ms. Ada")
            .unwrap();
        let mut room = Self {
            coordinator,
            teacher,
        };
        room.teacher.drain();
        room
    }

    fn student(&mut self, name: &str) -> Client {
        let mut client = connect(&self.coordinator);
        self.coordinator
            .join(client.id, Role::Student, name)
            .unwrap();
        client.drain();
        self.teacher.drain();
        client
    }

    fn create(&self, time_limit: u64) -> Result<(), SessionError> {
        self.coordinator.create_poll(
            self.teacher.id,
            PollDraft::new("Color?", ["Red", "Blue"]).with_time_limit(time_limit),
        )
    }
}

fn connect(coordinator: &Arc<SessionCoordinator>) -> Client {
    let id = Uuid::new_v4();
    let (tx, rx) = mpsc::channel(64);
    coordinator.connect(id, tx);
    Client { id, rx }
}

fn tally_of(event: &ServerEvent) -> (u32, u32) {
    match event {
        ServerEvent::PollTallyChanged { tally, .. } | ServerEvent::PollEnded { tally, .. } => (
            tally.get("Red").unwrap_or_default(),
            tally.get("Blue").unwrap_or_default(),
        ),
        other => panic!("expected a tally event, got {:?}", other),
    }
}

#[tokio::test]
async fn test_scenario_a_zero_students_vacuous_end() {
    let mut room = Room::new();
    room.create(30).unwrap();

    let events = room.teacher.drain();
    let names: Vec<_> = events.iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["poll-created", "poll-tally-changed", "poll-ended"]);
    match &events[0] {
        ServerEvent::PollCreated { poll } => assert!(poll.is_active()),
        other => panic!("unexpected {:?}", other),
    }
    match &events[2] {
        ServerEvent::PollEnded { reason, .. } => assert_eq!(*reason, EndReason::AllAnswered),
        other => panic!("unexpected {:?}", other),
    }
    assert!(room.coordinator.stats().active_poll.is_none());
    assert!(!room.coordinator.timer_armed());
}

#[tokio::test]
async fn test_scenario_b_two_students_auto_complete() {
    let mut room = Room::new();
    let mut alice = room.student("Alice");
    let mut bob = room.student("Bob");
    room.create(30).unwrap();
    room.teacher.drain();
    alice.drain();
    bob.drain();

    room.coordinator.submit_answer(alice.id, "Red").unwrap();
    let events = room.teacher.drain();
    assert_eq!(events.len(), 1);
    assert_eq!(tally_of(&events[0]), (1, 0));
    match &events[0] {
        ServerEvent::PollTallyChanged {
            student_name,
            answer,
            ..
        } => {
            assert_eq!(student_name.as_deref(), Some("Alice"));
            assert_eq!(answer.as_deref(), Some("Red"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(room.coordinator.stats().active_poll.is_some());
    assert_eq!(
        alice.drain_names(),
        vec!["answer-accepted", "poll-tally-changed"]
    );

    room.coordinator.submit_answer(bob.id, "Blue").unwrap();
    let events = bob.drain();
    let names: Vec<_> = events.iter().map(|e| e.name()).collect();
    assert_eq!(
        names,
        vec!["poll-tally-changed", "answer-accepted", "poll-tally-changed", "poll-ended"]
    );
    assert_eq!(tally_of(&events[3]), (1, 1));
    assert!(room.coordinator.stats().active_poll.is_none());
    assert!(!room.coordinator.timer_armed());
}

#[tokio::test]
async fn test_scenario_c_double_submit_rejected() {
    let mut room = Room::new();
    let mut alice = room.student("Alice");
    let _bob = room.student("Bob");
    room.create(30).unwrap();
    room.coordinator.submit_answer(alice.id, "Red").unwrap();
    alice.drain();
    room.teacher.drain();

    let err = room.coordinator.submit_answer(alice.id, "Blue").unwrap_err();
    assert_eq!(err, SessionError::AlreadyAnswered);

    let events = alice.drain();
    assert_eq!(events.len(), 1);
    match &events[0] {
        ServerEvent::ValidationError { kind, message } => {
            assert_eq!(kind, "already-answered");
            assert_eq!(message, "You have already answered this question");
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(room.teacher.drain().is_empty());

    let poll = room.coordinator.current_poll().unwrap();
    assert_eq!(poll.results().get("Red"), Some(1));
    assert_eq!(poll.results().get("Blue"), Some(0));
}

#[tokio::test]
async fn test_scenario_d_create_while_pending_rejected() {
    let mut room = Room::new();
    let alice = room.student("Alice");
    let _bob = room.student("Bob");
    room.create(30).unwrap();
    room.coordinator.submit_answer(alice.id, "Red").unwrap();
    let before = room.coordinator.current_poll().unwrap();
    room.teacher.drain();

    let err = room.create(45).unwrap_err();
    assert_eq!(err, SessionError::Precondition);
    assert_eq!(room.teacher.drain_names(), vec!["validation-error"]);

    let after = room.coordinator.current_poll().unwrap();
    assert_eq!(after.id(), before.id());
    assert!(after.is_active());
    assert_eq!(after.results(), before.results());
    assert_eq!(room.coordinator.polls().len(), 1);
}

#[tokio::test]
async fn test_scenario_e_remove_answered_student() {
    let mut room = Room::new();
    let mut alice = room.student("Alice");
    let mut bob = room.student("Bob");
    let _carol = room.student("Carol");
    room.create(30).unwrap();
    room.coordinator.submit_answer(alice.id, "Red").unwrap();
    room.teacher.drain();
    alice.drain();
    bob.drain();

    room.coordinator
        .remove_student(room.teacher.id, alice.id)
        .unwrap();

    assert_eq!(alice.drain_names(), vec!["removed-by-teacher"]);
    let events = room.teacher.drain();
    match &events[..] {
        [ServerEvent::RosterChanged { students }] => {
            let names: Vec<_> = students.iter().map(|s| s.name.as_str()).collect();
            assert_eq!(names, vec!["Bob", "Carol"]);
        }
        other => panic!("unexpected {:?}", other),
    }
    match &bob.drain()[..] {
        [ServerEvent::ParticipantRemoved { participant_id, name }] => {
            assert_eq!(*participant_id, alice.id);
            assert_eq!(name, "Alice");
        }
        other => panic!("unexpected {:?}", other),
    }

    let poll = room.coordinator.current_poll().unwrap();
    assert_eq!(poll.results().get("Red"), Some(1));
    assert!(poll.is_active());

    let err = room.coordinator.submit_answer(alice.id, "Blue").unwrap_err();
    assert_eq!(err, SessionError::UnknownParticipant);
}

#[tokio::test]
async fn test_removed_student_cannot_vote_twice_after_rejoin() {
    let mut room = Room::new();
    let mut alice = room.student("Alice");
    let _bob = room.student("Bob");
    room.create(30).unwrap();
    room.coordinator.submit_answer(alice.id, "Red").unwrap();
    room.coordinator
        .remove_student(room.teacher.id, alice.id)
        .unwrap();

    room.coordinator
        .join(alice.id, Role::Student, "Alice")
        .unwrap();
    alice.drain();
    room.teacher.drain();

    let err = room.coordinator.submit_answer(alice.id, "Blue").unwrap_err();
    assert_eq!(err, SessionError::AlreadyAnswered);
    assert_eq!(alice.drain_names(), vec!["validation-error"]);
    assert!(room.teacher.drain().is_empty());

    let poll = room.coordinator.current_poll().unwrap();
    assert!(poll.is_active());
    assert_eq!(poll.results().get("Red"), Some(1));
    assert_eq!(poll.results().get("Blue"), Some(0));
    let rejoined = room
        .coordinator
        .students()
        .into_iter()
        .find(|s| s.id == alice.id)
        .unwrap();
    assert!(rejoined.has_answered);
}

#[tokio::test(start_paused = true)]
async fn test_timer_expiry_ends_poll_for_everyone() {
    let mut room = Room::new();
    let mut alice = room.student("Alice");
    room.create(10).unwrap();
    alice.drain();
    room.teacher.drain();

    tokio::time::sleep(Duration::from_secs(11)).await;

    for client in [&mut alice, &mut room.teacher] {
        let events = client.drain();
        match &events[..] {
            [ServerEvent::PollEnded { reason, poll, .. }] => {
                assert_eq!(*reason, EndReason::TimerExpired);
                assert!(!poll.is_active());
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_stale_timer_never_ends_later_poll() {
    let mut room = Room::new();
    let _alice = room.student("Alice");

    room.create(10).unwrap();
    let first = room.coordinator.current_poll().unwrap().id();
    room.coordinator.end_poll(room.teacher.id).unwrap();
    room.create(60).unwrap();
    let second = room.coordinator.current_poll().unwrap().id();
    assert_ne!(first, second);
    room.teacher.drain();

    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(room.coordinator.stats().active_poll, Some(second));
    assert!(room.teacher.drain().is_empty());

    // A late expiry delivered by hand for the old poll is discarded too.
    room.coordinator.on_timer_expiry(first);
    assert_eq!(room.coordinator.stats().active_poll, Some(second));

    tokio::time::sleep(Duration::from_secs(50)).await;
    assert!(room.coordinator.stats().active_poll.is_none());
    assert_eq!(room.teacher.drain_names(), vec!["poll-ended"]);
}

#[tokio::test(start_paused = true)]
async fn test_manual_end_cancels_timer() {
    let mut room = Room::new();
    let _alice = room.student("Alice");
    room.create(10).unwrap();
    room.coordinator.end_poll(room.teacher.id).unwrap();
    assert!(!room.coordinator.timer_armed());
    room.teacher.drain();

    room.coordinator.end_poll(room.teacher.id).unwrap();
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert!(room.teacher.drain().is_empty());

    let poll = room.coordinator.current_poll().unwrap();
    assert_eq!(poll.end_reason(), Some(EndReason::Manual));
}

#[tokio::test]
async fn test_late_joiner_gets_current_poll_and_chat() {
    let mut room = Room::new();
    let alice = room.student("Alice");
    room.coordinator
        .send_message(room.teacher.id, "Welcome!")
        .unwrap();
    room.coordinator.send_message(alice.id, "Hi").unwrap();
    room.create(30).unwrap();

    let mut late = connect(&room.coordinator);
    room.coordinator.join(late.id, Role::Student, "Dana").unwrap();
    match &late.drain()[..] {
        [ServerEvent::ParticipantJoinedAck {
            participant,
            current_poll,
            chat_history,
        }] => {
            assert_eq!(participant.name, "Dana");
            assert_eq!(participant.role, Role::Student);
            assert!(current_poll.as_ref().is_some_and(|p| p.is_active()));
            let contents: Vec<_> = chat_history.iter().map(|m| m.content.as_str()).collect();
            assert_eq!(contents, vec!["Welcome!", "Hi"]);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_students_cannot_run_the_poll() {
    let mut room = Room::new();
    let mut alice = room.student("Alice");

    let err = room
        .coordinator
        .create_poll(alice.id, PollDraft::new("Q", ["a", "b"]))
        .unwrap_err();
    assert_eq!(err, SessionError::NotPermitted("create a poll"));
    match &alice.drain()[..] {
        [ServerEvent::ValidationError { kind, message }] => {
            assert_eq!(kind, "not-permitted");
            assert_eq!(message, "Only a teacher can create a poll");
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(room.coordinator.polls().is_empty());
}
