//! Parsed response model: the structured values the parser emits (spec.md §3).

use super::bodystructure::BodyStructure;
use super::envelope::Envelope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    No,
    Bad,
    PreAuth,
    Bye,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    Alert,
    BadCharset(Option<Vec<String>>),
    Capability(Vec<String>),
    Parse,
    PermanentFlags(Vec<String>),
    ReadOnly,
    ReadWrite,
    TryCreate,
    UidNext(u32),
    UidValidity(u32),
    Unseen(u32),
    Other(String, Option<String>),
}

/// One parsed BODY[...]/BODY.PEEK[...] or RFC822-form fetch payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodySection {
    /// e.g. "HEADER", "1.2", "TEXT", or None for BODY[].
    pub section: Option<String>,
    /// `<origin.size>` partial-fetch origin octet, when present.
    pub origin: Option<u32>,
    pub data: Vec<u8>,
}

/// One FETCH data item (spec.md §3 "Fetch attribute").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttributeValue {
    Uid(u32),
    Flags(Vec<String>),
    InternalDate(String),
    Rfc822Size(u32),
    Envelope(Envelope),
    BodyStructure(BodyStructure),
    Body(BodySection),
    Header(Vec<u8>),
    HeaderFields(Vec<String>, Vec<u8>),
    HeaderFieldsNot(Vec<String>, Vec<u8>),
    Text(Vec<u8>),
}

/// One `* LIST`/`* LSUB` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxListEntry {
    pub attributes: Vec<String>,
    pub delimiter: Option<char>,
    pub name: String,
    pub raw_name: Vec<u8>,
}

/// Whether a just-selected mailbox accepts `STORE`/`EXPUNGE`/`COPY`-style
/// mutation, carried by the tagged `[READ-WRITE]`/`[READ-ONLY]` response code
/// on a successful `SELECT`/`EXAMINE` (RFC 3501 §6.3.1/§6.3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxAccess {
    ReadWrite,
    ReadOnly,
}

/// Aggregated mailbox status: the `* STATUS mailbox (...)` payload, and also
/// the fields a `SELECT`/`EXAMINE` reports across its untagged `EXISTS`,
/// `RECENT`, and `OK [UNSEEN|UIDNEXT|UIDVALIDITY]` lines plus its tagged
/// `[READ-WRITE]`/`[READ-ONLY]` code. `access` is only ever populated for the
/// latter — `STATUS` carries no access mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailboxStatus {
    pub messages: Option<u32>,
    pub recent: Option<u32>,
    pub uid_next: Option<u32>,
    pub uid_validity: Option<u32>,
    pub unseen: Option<u32>,
    pub access: Option<MailboxAccess>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Untagged {
    Status {
        status: Status,
        code: Option<ResponseCode>,
        text: Option<String>,
    },
    Capability(Vec<String>),
    List(MailboxListEntry),
    Lsub(MailboxListEntry),
    Search(Vec<u32>),
    Flags(Vec<String>),
    Exists(u32),
    Recent(u32),
    Expunge(u32),
    Fetch(u32, Vec<FetchAttributeValue>),
    MailboxStatus(String, MailboxStatus),
    /// An untagged keyword this engine doesn't interpret (forward compatibility).
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Tagged {
        tag: String,
        status: Status,
        code: Option<ResponseCode>,
        text: Option<String>,
    },
    Untagged(Untagged),
    Continuation(String),
}
