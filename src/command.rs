//! Command-side data model: sequence sets, search criteria, and the full
//! command enum the encoder (src/encode) renders to wire bytes.

use crate::error::ImapError;
use chrono::{DateTime, FixedOffset, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeqEnd {
    Num(u32),
    Star,
}

impl SeqEnd {
    fn to_wire(self) -> String {
        match self {
            SeqEnd::Num(n) => n.to_string(),
            SeqEnd::Star => "*".to_string(),
        }
    }

    fn parse(s: &str) -> Option<Self> {
        if s == "*" {
            Some(SeqEnd::Star)
        } else {
            s.parse().ok().map(SeqEnd::Num)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeqItem {
    One(SeqEnd),
    Range(SeqEnd, SeqEnd),
}

impl SeqItem {
    fn to_wire(self) -> String {
        match self {
            SeqItem::One(e) => e.to_wire(),
            SeqItem::Range(a, b) => format!("{}:{}", a.to_wire(), b.to_wire()),
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.split_once(':') {
            Some((a, b)) => Some(SeqItem::Range(SeqEnd::parse(a)?, SeqEnd::parse(b)?)),
            None => Some(SeqItem::One(SeqEnd::parse(s)?)),
        }
    }

    /// Expand against the highest known id (for `*`), for set-membership comparisons in tests.
    fn contains(self, id: u32, highest: u32) -> bool {
        let resolve = |e: SeqEnd| match e {
            SeqEnd::Num(n) => n,
            SeqEnd::Star => highest,
        };
        match self {
            SeqItem::One(e) => resolve(e) == id,
            SeqItem::Range(a, b) => {
                let (lo, hi) = {
                    let (x, y) = (resolve(a), resolve(b));
                    if x <= y {
                        (x, y)
                    } else {
                        (y, x)
                    }
                };
                id >= lo && id <= hi
            }
        }
    }
}

/// A non-empty IMAP sequence set: `n`, `*`, `n:m`, `n:*`, `*:m`, or a comma-joined list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceSet(pub Vec<SeqItem>);

impl SequenceSet {
    pub fn single(n: u32) -> Self {
        SequenceSet(vec![SeqItem::One(SeqEnd::Num(n))])
    }

    pub fn highest() -> Self {
        SequenceSet(vec![SeqItem::One(SeqEnd::Star)])
    }

    pub fn range(a: u32, b: u32) -> Self {
        SequenceSet(vec![SeqItem::Range(SeqEnd::Num(a), SeqEnd::Num(b))])
    }

    pub fn range_to_highest(a: u32) -> Self {
        SequenceSet(vec![SeqItem::Range(SeqEnd::Num(a), SeqEnd::Star)])
    }

    pub fn from_ids(ids: &[u32]) -> Result<Self, ImapError> {
        if ids.is_empty() {
            return Err(ImapError::InvalidArgument(
                "sequence set must be nonempty".into(),
            ));
        }
        Ok(SequenceSet(
            ids.iter().map(|&n| SeqItem::One(SeqEnd::Num(n))).collect(),
        ))
    }

    pub fn to_wire_string(&self) -> String {
        self.0
            .iter()
            .map(|item| item.to_wire())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn parse(s: &str) -> Result<Self, ImapError> {
        if s.is_empty() {
            return Err(ImapError::ParsingError("empty sequence set".into()));
        }
        let items: Option<Vec<SeqItem>> = s.split(',').map(SeqItem::parse).collect();
        items
            .filter(|v| !v.is_empty())
            .map(SequenceSet)
            .ok_or_else(|| ImapError::ParsingError(format!("invalid sequence set: {s}")))
    }

    /// Whether `id` is a member of this set when `*` resolves to `highest`.
    pub fn contains(&self, id: u32, highest: u32) -> bool {
        self.0.iter().any(|item| item.contains(id, highest))
    }
}

/// STORE's sign: replace, add (`+FLAGS`), or remove (`-FLAGS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Replace,
    Add,
    Remove,
}

/// One FETCH data item to request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItem {
    Uid,
    Flags,
    InternalDate,
    Rfc822Size,
    Envelope,
    BodyStructure,
    /// BODY[section]<origin.size>; `peek` selects BODY.PEEK (no \Seen side effect).
    Body {
        section: Option<String>,
        peek: bool,
        partial: Option<(u32, u32)>,
    },
    HeaderFields {
        names: Vec<String>,
        peek: bool,
    },
    HeaderFieldsNot {
        names: Vec<String>,
        peek: bool,
    },
}

/// Recursive SEARCH criteria tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchKey {
    All,
    Answered,
    Deleted,
    Draft,
    Flagged,
    New,
    Old,
    Recent,
    Seen,
    Unanswered,
    Undeleted,
    Undraft,
    Unflagged,
    Unseen,
    Bcc(String),
    Cc(String),
    From(String),
    Subject(String),
    Text(String),
    To(String),
    Body(String),
    Keyword(String),
    Unkeyword(String),
    Header(String, String),
    Before(NaiveDate),
    On(NaiveDate),
    Since(NaiveDate),
    SentBefore(NaiveDate),
    SentOn(NaiveDate),
    SentSince(NaiveDate),
    Larger(u32),
    Smaller(u32),
    Uid(SequenceSet),
    SequenceSet(SequenceSet),
    And(Vec<SearchKey>),
    Or(Box<SearchKey>, Box<SearchKey>),
    Not(Box<SearchKey>),
}

/// Mechanism selector + caller-supplied extras for AUTHENTICATE (spec.md §4.5).
/// The classic `LOGIN` command is not a SASL mechanism and has no variant
/// here — see `Command::Login`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthCommand {
    Plain { authzid: String, user: String, pass: String },
    XOAuth2 { user: String, token: String },
    External,
    /// Caller-named SASL mechanism with an optional initial response; the
    /// session core drives subsequent challenges through a callback (never
    /// encoded here).
    Generic { mechanism: String, initial: Option<Vec<u8>> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendArgs {
    pub mailbox: String,
    pub flags: Option<Vec<String>>,
    pub date: Option<DateTime<FixedOffset>>,
    pub data: Vec<u8>,
}

/// Every command the engine can encode and send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Capability,
    Noop,
    Logout,
    StartTls,
    Authenticate(AuthCommand),
    /// The classic `LOGIN user pass` command (spec.md §4.3): two astrings,
    /// always force-quoted. Distinct from `AUTHENTICATE LOGIN`, which this
    /// engine never sends.
    Login { user: String, pass: String },
    Select(String),
    Examine(String),
    Create(String),
    Delete(String),
    Rename { from: String, to: String },
    Subscribe(String),
    Unsubscribe(String),
    List { reference: String, pattern: String },
    Lsub { reference: String, pattern: String },
    Status { mailbox: String, items: Vec<StatusItem> },
    Append(AppendArgs),
    Check,
    Close,
    Expunge,
    UidExpunge(SequenceSet),
    Search { charset: Option<String>, criteria: SearchKey, uid: bool },
    Fetch { sequence_set: SequenceSet, uid: bool, attributes: Vec<FetchItem> },
    Store { sequence_set: SequenceSet, uid: bool, kind: StoreKind, silent: bool, flags: Vec<String> },
    Copy { sequence_set: SequenceSet, uid: bool, mailbox: String },
    Move { sequence_set: SequenceSet, uid: bool, mailbox: String },
    Idle,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusItem {
    Messages,
    Recent,
    UidNext,
    UidValidity,
    Unseen,
}

impl StatusItem {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusItem::Messages => "MESSAGES",
            StatusItem::Recent => "RECENT",
            StatusItem::UidNext => "UIDNEXT",
            StatusItem::UidValidity => "UIDVALIDITY",
            StatusItem::Unseen => "UNSEEN",
        }
    }
}

/// The `kind` of a command: which verb-family untagged responses it may absorb
/// while in flight (spec.md §4.5/§9). Computed once at pending-command insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Capability,
    List,
    Lsub,
    Search,
    Fetch,
    Status,
    SelectOrExamine,
    Generic,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Capability => CommandKind::Capability,
            Command::List { .. } => CommandKind::List,
            Command::Lsub { .. } => CommandKind::Lsub,
            Command::Search { .. } => CommandKind::Search,
            Command::Fetch { .. } => CommandKind::Fetch,
            Command::Status { .. } => CommandKind::Status,
            Command::Select(_) | Command::Examine(_) => CommandKind::SelectOrExamine,
            _ => CommandKind::Generic,
        }
    }

    /// Short label used in error messages and `CommandFailed`.
    pub fn label(&self) -> &'static str {
        match self {
            Command::Capability => "CAPABILITY",
            Command::Noop => "NOOP",
            Command::Logout => "LOGOUT",
            Command::StartTls => "STARTTLS",
            Command::Authenticate(_) => "AUTHENTICATE",
            Command::Login { .. } => "LOGIN",
            Command::Select(_) => "SELECT",
            Command::Examine(_) => "EXAMINE",
            Command::Create(_) => "CREATE",
            Command::Delete(_) => "DELETE",
            Command::Rename { .. } => "RENAME",
            Command::Subscribe(_) => "SUBSCRIBE",
            Command::Unsubscribe(_) => "UNSUBSCRIBE",
            Command::List { .. } => "LIST",
            Command::Lsub { .. } => "LSUB",
            Command::Status { .. } => "STATUS",
            Command::Append(_) => "APPEND",
            Command::Check => "CHECK",
            Command::Close => "CLOSE",
            Command::Expunge => "EXPUNGE",
            Command::UidExpunge(_) => "UID EXPUNGE",
            Command::Search { .. } => "SEARCH",
            Command::Fetch { .. } => "FETCH",
            Command::Store { .. } => "STORE",
            Command::Copy { .. } => "COPY",
            Command::Move { .. } => "MOVE",
            Command::Idle => "IDLE",
            Command::Done => "DONE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_set_round_trips_through_wire_form() {
        for s in ["5", "*", "5:10", "5:*", "*:10", "1,3,5:7,9"] {
            let parsed = SequenceSet::parse(s).unwrap();
            let reparsed = SequenceSet::parse(&parsed.to_wire_string()).unwrap();
            assert_eq!(parsed, reparsed);
        }
    }

    #[test]
    fn sequence_set_range_includes_endpoints() {
        let set = SequenceSet::range(5, 10);
        assert!(set.contains(5, 100));
        assert!(set.contains(10, 100));
        assert!(!set.contains(11, 100));
    }

    #[test]
    fn star_matches_highest_id() {
        let set = SequenceSet::highest();
        assert!(set.contains(42, 42));
        assert!(!set.contains(41, 42));
    }
}
