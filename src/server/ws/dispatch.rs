//! Command dispatch
//!
//! Routes decoded commands to the session coordinator. Rejections are
//! reported to the sending connection by the coordinator itself.

use std::sync::Arc;
use tracing::debug;

use super::protocol::{parse_command, ClientCommand, MalformedCommand};
use crate::session::roster::{ParticipantId, Role};
use crate::session::{SessionCoordinator, SessionResult};

/// Handle one inbound text frame from `conn`.
pub fn handle_frame(coordinator: &Arc<SessionCoordinator>, conn: ParticipantId, frame: &str) {
    let command = match parse_command(frame) {
        Ok(command) => command,
        Err(err) => {
            coordinator.reject(conn, MalformedCommand::KIND, &err.to_string());
            return;
        }
    };
    let name = command.name();
    if let Err(err) = dispatch_command(coordinator, conn, command) {
        debug!(participant = %conn, command = name, kind = err.kind(), "command failed");
    }
}

pub(crate) fn dispatch_command(
    coordinator: &Arc<SessionCoordinator>,
    conn: ParticipantId,
    command: ClientCommand,
) -> SessionResult<()> {
    match command {
        ClientCommand::TeacherJoin { name } => coordinator.join(conn, Role::Teacher, &name),
        ClientCommand::StudentJoin { name } => coordinator.join(conn, Role::Student, &name),
        ClientCommand::CreatePoll(draft) => coordinator.create_poll(conn, draft),
        ClientCommand::SubmitAnswer { option } => coordinator.submit_answer(conn, &option),
        ClientCommand::EndPoll => coordinator.end_poll(conn),
        ClientCommand::SendMessage { content } => coordinator.send_message(conn, &content),
        ClientCommand::RemoveStudent { participant_id } => {
            coordinator.remove_student(conn, participant_id)
        }
    }
}
