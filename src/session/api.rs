//! Session API: thin dispatchers mapping user-visible verbs to `Command`
//! construction, plus the two capability-aware fallbacks spec.md calls out
//! by name — MOVE without the MOVE extension, and UID EXPUNGE without
//! UIDPLUS.
//!
//! Grounded on the teacher's `client.rs` convenience methods (`select`,
//! `list_folders`, `append`, ...), which wrap the same pipeline handle in
//! one-call-per-verb methods rather than making every caller hand-build a
//! command string.

use tokio::sync::{mpsc, oneshot};

use crate::command::{AppendArgs, Command, FetchItem, SearchKey, SequenceSet, StatusItem, StoreKind};
use crate::error::ImapError;
use crate::types::{MailboxAccess, MailboxStatus, ResponseCode, Untagged};

use super::{CommandOutcome, SessionHandle};

/// Streams untagged pushes for an open IDLE (RFC 2177) until `done` ends it.
pub struct IdleGuard {
    events: mpsc::UnboundedReceiver<Untagged>,
    done_tx: Option<oneshot::Sender<()>>,
    result: oneshot::Receiver<Result<CommandOutcome, ImapError>>,
}

impl IdleGuard {
    pub(super) fn new(
        events: mpsc::UnboundedReceiver<Untagged>,
        done_tx: oneshot::Sender<()>,
        result: oneshot::Receiver<Result<CommandOutcome, ImapError>>,
    ) -> Self {
        Self { events, done_tx: Some(done_tx), result }
    }

    /// Waits for the next mailbox push (EXISTS, EXPUNGE, FLAGS, ...). Returns
    /// `None` once the actor tears the channel down (e.g. disconnect).
    pub async fn next_event(&mut self) -> Option<Untagged> {
        self.events.recv().await
    }

    /// Sends DONE and awaits the tagged completion of the IDLE command.
    pub async fn done(mut self) -> Result<CommandOutcome, ImapError> {
        if let Some(tx) = self.done_tx.take() {
            let _ = tx.send(());
        }
        self.result.await.map_err(|_| ImapError::Disconnected)?
    }
}

impl SessionHandle {
    pub async fn capability(&self) -> Result<CommandOutcome, ImapError> {
        self.call(Command::Capability).await
    }

    pub async fn noop(&self) -> Result<CommandOutcome, ImapError> {
        self.call(Command::Noop).await
    }

    pub async fn logout(&self) -> Result<CommandOutcome, ImapError> {
        self.call(Command::Logout).await
    }

    /// Selects `mailbox` for read-write access and interprets the reply into
    /// a `MailboxStatus` (spec.md §2 "response interpretation"): `messages`
    /// and `recent` come from the untagged `EXISTS`/`RECENT`, `unseen`/
    /// `uid_next`/`uid_validity` from untagged `OK [...]` codes, and `access`
    /// from the tagged `[READ-WRITE]`/`[READ-ONLY]` code (defaulting to
    /// read-write if the server omits it, which RFC 3501 doesn't allow but
    /// some servers do anyway).
    pub async fn select(&self, mailbox: impl Into<String>) -> Result<MailboxStatus, ImapError> {
        let outcome = self.call(Command::Select(mailbox.into())).await?;
        Ok(mailbox_status_from_outcome(&outcome, MailboxAccess::ReadWrite))
    }

    /// Like `select`, but for `EXAMINE` (read-only by definition, so the
    /// default access mode is `ReadOnly` rather than `ReadWrite`).
    pub async fn examine(&self, mailbox: impl Into<String>) -> Result<MailboxStatus, ImapError> {
        let outcome = self.call(Command::Examine(mailbox.into())).await?;
        Ok(mailbox_status_from_outcome(&outcome, MailboxAccess::ReadOnly))
    }

    pub async fn create(&self, mailbox: impl Into<String>) -> Result<CommandOutcome, ImapError> {
        self.call(Command::Create(mailbox.into())).await
    }

    pub async fn delete(&self, mailbox: impl Into<String>) -> Result<CommandOutcome, ImapError> {
        self.call(Command::Delete(mailbox.into())).await
    }

    pub async fn rename(
        &self,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Result<CommandOutcome, ImapError> {
        self.call(Command::Rename { from: from.into(), to: to.into() }).await
    }

    pub async fn subscribe(&self, mailbox: impl Into<String>) -> Result<CommandOutcome, ImapError> {
        self.call(Command::Subscribe(mailbox.into())).await
    }

    pub async fn unsubscribe(&self, mailbox: impl Into<String>) -> Result<CommandOutcome, ImapError> {
        self.call(Command::Unsubscribe(mailbox.into())).await
    }

    pub async fn list(
        &self,
        reference: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Result<CommandOutcome, ImapError> {
        self.call(Command::List { reference: reference.into(), pattern: pattern.into() }).await
    }

    pub async fn lsub(
        &self,
        reference: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Result<CommandOutcome, ImapError> {
        self.call(Command::Lsub { reference: reference.into(), pattern: pattern.into() }).await
    }

    pub async fn status(
        &self,
        mailbox: impl Into<String>,
        items: Vec<StatusItem>,
    ) -> Result<CommandOutcome, ImapError> {
        self.call(Command::Status { mailbox: mailbox.into(), items }).await
    }

    pub async fn append(&self, args: AppendArgs) -> Result<CommandOutcome, ImapError> {
        self.call(Command::Append(args)).await
    }

    pub async fn check(&self) -> Result<CommandOutcome, ImapError> {
        self.call(Command::Check).await
    }

    pub async fn close(&self) -> Result<CommandOutcome, ImapError> {
        self.call(Command::Close).await
    }

    pub async fn search(&self, criteria: SearchKey, uid: bool) -> Result<CommandOutcome, ImapError> {
        self.call(Command::Search { charset: None, criteria, uid }).await
    }

    pub async fn fetch(
        &self,
        sequence_set: SequenceSet,
        uid: bool,
        attributes: Vec<FetchItem>,
    ) -> Result<CommandOutcome, ImapError> {
        self.call(Command::Fetch { sequence_set, uid, attributes }).await
    }

    pub async fn store(
        &self,
        sequence_set: SequenceSet,
        uid: bool,
        kind: StoreKind,
        silent: bool,
        flags: Vec<String>,
    ) -> Result<CommandOutcome, ImapError> {
        self.call(Command::Store { sequence_set, uid, kind, silent, flags }).await
    }

    pub async fn copy(
        &self,
        sequence_set: SequenceSet,
        uid: bool,
        mailbox: impl Into<String>,
    ) -> Result<CommandOutcome, ImapError> {
        self.call(Command::Copy { sequence_set, uid, mailbox: mailbox.into() }).await
    }

    /// Moves messages to `mailbox`. Issues `MOVE`/`UID MOVE` when the server
    /// advertises the extension; otherwise falls back to `COPY` followed by
    /// `STORE +FLAGS (\Deleted)`, with no MOVE verb ever on the wire
    /// (spec.md §8 scenario 8).
    pub async fn move_messages(
        &self,
        sequence_set: SequenceSet,
        uid: bool,
        mailbox: impl Into<String>,
    ) -> Result<CommandOutcome, ImapError> {
        let mailbox = mailbox.into();
        let caps = self.capabilities().await?;

        if caps.supports_move() {
            return self.call(Command::Move { sequence_set, uid, mailbox }).await;
        }

        self.copy(sequence_set.clone(), uid, mailbox).await?;
        self.store(
            sequence_set,
            uid,
            StoreKind::Add,
            false,
            vec!["\\Deleted".to_string()],
        )
        .await
    }

    /// Expunges `sequence_set`. Uses `UID EXPUNGE` when UIDPLUS is
    /// advertised; otherwise falls back to plain `EXPUNGE`, which removes
    /// every `\Deleted` message in the mailbox rather than only the given
    /// set (spec.md §6).
    pub async fn expunge_uids(&self, sequence_set: SequenceSet) -> Result<CommandOutcome, ImapError> {
        let caps = self.capabilities().await?;
        if caps.supports_uidplus() {
            self.call(Command::UidExpunge(sequence_set)).await
        } else {
            self.call(Command::Expunge).await
        }
    }

    /// Sends the classic `LOGIN user pass` command (spec.md §4.3/§4.5),
    /// never `AUTHENTICATE LOGIN` — LOGINDISABLED gates this verb
    /// specifically, not a SASL mechanism exchange.
    pub async fn login(&self, user: impl Into<String>, pass: impl Into<String>) -> Result<CommandOutcome, ImapError> {
        self.call(Command::Login { user: user.into(), pass: pass.into() }).await
    }
}

/// Folds a SELECT/EXAMINE `CommandOutcome` into a `MailboxStatus`, reading
/// `EXISTS`/`RECENT` off the collected untagged data and the UNSEEN/UIDNEXT/
/// UIDVALIDITY/READ-WRITE/READ-ONLY response codes off both the untagged `OK`
/// lines and the final tagged response.
fn mailbox_status_from_outcome(outcome: &CommandOutcome, default_access: MailboxAccess) -> MailboxStatus {
    let mut status = MailboxStatus::default();
    for u in &outcome.untagged {
        match u {
            Untagged::Exists(n) => status.messages = Some(*n),
            Untagged::Recent(n) => status.recent = Some(*n),
            Untagged::Status { code: Some(code), .. } => apply_response_code(&mut status, code),
            _ => {}
        }
    }
    if let Some(code) = &outcome.code {
        apply_response_code(&mut status, code);
    }
    if status.access.is_none() {
        status.access = Some(default_access);
    }
    status
}

fn apply_response_code(status: &mut MailboxStatus, code: &ResponseCode) {
    match code {
        ResponseCode::Unseen(n) => status.unseen = Some(*n),
        ResponseCode::UidNext(n) => status.uid_next = Some(*n),
        ResponseCode::UidValidity(n) => status.uid_validity = Some(*n),
        ResponseCode::ReadWrite => status.access = Some(MailboxAccess::ReadWrite),
        ResponseCode::ReadOnly => status.access = Some(MailboxAccess::ReadOnly),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Status;

    #[test]
    fn select_outcome_folds_into_mailbox_status() {
        let outcome = CommandOutcome {
            status: Status::Ok,
            code: Some(ResponseCode::ReadWrite),
            text: Some("SELECT completed".into()),
            untagged: vec![
                Untagged::Exists(5),
                Untagged::Recent(2),
                Untagged::Status { status: Status::Ok, code: Some(ResponseCode::Unseen(2)), text: None },
                Untagged::Status {
                    status: Status::Ok,
                    code: Some(ResponseCode::UidValidity(999)),
                    text: None,
                },
                Untagged::Status { status: Status::Ok, code: Some(ResponseCode::UidNext(6)), text: None },
            ],
        };

        let status = mailbox_status_from_outcome(&outcome, MailboxAccess::ReadWrite);
        assert_eq!(
            status,
            MailboxStatus {
                messages: Some(5),
                recent: Some(2),
                uid_next: Some(6),
                uid_validity: Some(999),
                unseen: Some(2),
                access: Some(MailboxAccess::ReadWrite),
            }
        );
    }

    #[test]
    fn examine_defaults_to_read_only_when_server_omits_the_code() {
        let outcome = CommandOutcome {
            status: Status::Ok,
            code: None,
            text: None,
            untagged: vec![Untagged::Exists(1)],
        };
        let status = mailbox_status_from_outcome(&outcome, MailboxAccess::ReadOnly);
        assert_eq!(status.access, Some(MailboxAccess::ReadOnly));
    }
}
