//! Session state machine and the command legality validator (spec.md §4.4).
//!
//! No direct teacher analogue — the teacher's `AuthenticatedSession` enum
//! (`protocol/imap/client.rs`) only distinguishes plain vs. TLS transport,
//! not protocol phase. This generalizes that "state carries what's legal"
//! discipline into a pure function over (command, state).

use crate::command::Command;
use crate::error::ImapError;

/// A session's phase. Only a monotonic forward transition happens on
/// success; any I/O failure or server BYE collapses this to `Disconnected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Authenticated,
    Selected { mailbox: String, read_only: bool },
}

impl SessionState {
    pub fn is_selected(&self) -> bool {
        matches!(self, SessionState::Selected { .. })
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, SessionState::Selected { read_only: true, .. })
    }
}

/// Reject `command` in `state` without writing any bytes; returns `Ok(())`
/// when the command is legal to send.
pub fn validate(command: &Command, state: &SessionState) -> Result<(), ImapError> {
    use Command::*;
    use SessionState::*;

    // Always legal, in any state.
    if matches!(command, Capability | Noop | Logout) {
        return Ok(());
    }

    match state {
        Disconnected | Connecting => Err(ImapError::InvalidState(format!(
            "{} requires an open connection",
            command.label()
        ))),
        Connected => match command {
            StartTls | Authenticate(_) | Login { .. } => Ok(()),
            _ => Err(ImapError::InvalidState(format!(
                "{} is not legal before authentication",
                command.label()
            ))),
        },
        Authenticated => match command {
            Select(_) | Examine(_) | Create(_) | Delete(_) | Rename { .. } | Subscribe(_)
            | Unsubscribe(_) | List { .. } | Lsub { .. } | Status { .. } | Append(_) => Ok(()),
            _ => Err(ImapError::InvalidState(format!(
                "{} requires a selected mailbox",
                command.label()
            ))),
        },
        Selected { read_only, .. } => match command {
            Select(_) | Examine(_) | Create(_) | Delete(_) | Rename { .. } | Subscribe(_)
            | Unsubscribe(_) | List { .. } | Lsub { .. } | Status { .. } | Append(_) => Ok(()),
            Check | Close | Search { .. } | Fetch { .. } | Copy { .. } | Idle | Done => Ok(()),
            Expunge | UidExpunge(_) | Store { .. } | Move { .. } if *read_only => {
                Err(ImapError::InvalidState(format!(
                    "{} is not legal on a read-only mailbox",
                    command.label()
                )))
            }
            Expunge | UidExpunge(_) | Store { .. } | Move { .. } => Ok(()),
            _ => Err(ImapError::InvalidState(format!(
                "{} is not legal with a mailbox selected",
                command.label()
            ))),
        },
    }
}

/// Applies the state transition a tagged OK for `command` causes. Call only
/// after the tagged response for `command` arrives with status OK.
pub fn transition_on_ok(command: &Command, state: &SessionState) -> SessionState {
    match command {
        Command::Authenticate(_) | Command::Login { .. } => SessionState::Authenticated,
        Command::Select(mailbox) => SessionState::Selected {
            mailbox: mailbox.clone(),
            read_only: false,
        },
        Command::Examine(mailbox) => SessionState::Selected {
            mailbox: mailbox.clone(),
            read_only: true,
        },
        Command::Close => SessionState::Authenticated,
        Command::Logout => SessionState::Disconnected,
        _ => state.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_login_while_selected() {
        let state = SessionState::Selected {
            mailbox: "INBOX".into(),
            read_only: false,
        };
        let cmd = Command::Authenticate(crate::command::AuthCommand::External);
        assert!(validate(&cmd, &state).is_err());
    }

    #[test]
    fn rejects_store_on_read_only_mailbox() {
        let state = SessionState::Selected {
            mailbox: "INBOX".into(),
            read_only: true,
        };
        let cmd = Command::Store {
            sequence_set: crate::command::SequenceSet::single(1),
            uid: false,
            kind: crate::command::StoreKind::Add,
            silent: true,
            flags: vec!["\\Deleted".into()],
        };
        assert!(validate(&cmd, &state).is_err());
    }

    #[test]
    fn allows_fetch_on_read_only_mailbox() {
        let state = SessionState::Selected {
            mailbox: "INBOX".into(),
            read_only: true,
        };
        let cmd = Command::Fetch {
            sequence_set: crate::command::SequenceSet::single(1),
            uid: false,
            attributes: vec![crate::command::FetchItem::Flags],
        };
        assert!(validate(&cmd, &state).is_ok());
    }

    #[test]
    fn always_legal_commands_bypass_state() {
        assert!(validate(&Command::Capability, &SessionState::Disconnected).is_ok());
        assert!(validate(&Command::Logout, &SessionState::Connecting).is_ok());
    }
}
