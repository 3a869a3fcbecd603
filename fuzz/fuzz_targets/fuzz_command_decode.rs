#![no_main]

use libfuzzer_sys::fuzz_target;

use classpoll::server::ws::protocol::{parse_command, ClientCommand};
use classpoll::session::roster::Role;
use classpoll::session::{Session, SessionSettings};
use uuid::Uuid;

/// Decodes each line of the input as a command frame and applies the decoded
/// commands to a fresh session, alternating between a teacher and a student
/// connection.
///
/// This catches:
/// - Panics in command decoding on adversarial JSON
/// - Panics in the session state machine on arbitrary command sequences
/// - Tally sums drifting from the number of recorded answers
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let teacher = Uuid::from_u128(1);
    let student = Uuid::from_u128(2);
    let mut session = Session::new(SessionSettings::default());

    for (i, line) in text.lines().enumerate() {
        let Ok(command) = parse_command(line) else {
            continue;
        };
        let actor = if i % 2 == 0 { teacher } else { student };
        let _ = match command {
            ClientCommand::TeacherJoin { name } => session.join(actor, Role::Teacher, &name),
            ClientCommand::StudentJoin { name } => session.join(actor, Role::Student, &name),
            ClientCommand::CreatePoll(draft) => session.create_poll(actor, draft),
            ClientCommand::SubmitAnswer { option } => session.submit_answer(actor, &option),
            ClientCommand::EndPoll => session.end_poll(actor),
            ClientCommand::SendMessage { content } => session.send_message(actor, &content),
            ClientCommand::RemoveStudent { participant_id } => {
                session.remove_student(actor, participant_id)
            }
        };

        if let Some(poll) = session.polls().current() {
            assert_eq!(poll.results().total() as usize, poll.answer_count());
        }
    }
});
