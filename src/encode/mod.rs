//! Command encoder: turns a `Command` into wire bytes, choosing atom, quoted
//! string, or literal form for each argument (spec.md §4.3).
//!
//! No direct teacher analogue for the rendering policy itself — the teacher's
//! `client.rs` builds command strings ad hoc per call site. This generalizes
//! that into one policy function plus a segment builder so every command goes
//! through the same quoting/literal decision.

mod search;

use crate::capability::CapabilitySet;
use crate::codec::mutf7;
use crate::command::{AppendArgs, AuthCommand, Command, FetchItem, StoreKind};

/// A command ready to write to the socket. `initial` is sent first; the
/// session core then waits for a `+` continuation before sending each of
/// `continuations` in turn, except literals sent under LITERAL+ which are
/// already folded into `initial` (or an earlier continuation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCommand {
    pub initial: Vec<u8>,
    pub continuations: Vec<Vec<u8>>,
}

impl EncodedCommand {
    /// True when every byte is already in `initial` and no `+` handshake is needed.
    pub fn is_single_segment(&self) -> bool {
        self.continuations.is_empty()
    }
}

enum Piece {
    Text(String),
    Raw(Vec<u8>),
    /// Marks the end of the current buffer and the start of a new
    /// continuation segment beginning with these literal bytes.
    LiteralBoundary(Vec<u8>),
}

struct Builder {
    pieces: Vec<Piece>,
}

impl Builder {
    fn new() -> Self {
        Builder { pieces: Vec::new() }
    }

    fn text(&mut self, s: impl Into<String>) -> &mut Self {
        self.pieces.push(Piece::Text(s.into()));
        self
    }

    fn space(&mut self) -> &mut Self {
        self.text(" ")
    }

    /// Renders `value` by the tightest-first policy: literal if it carries
    /// disallowed octets, quoted if forced or it carries atom-specials,
    /// otherwise a bare atom.
    fn arg(&mut self, value: &[u8], force_quote: bool, literal_plus: bool) -> &mut Self {
        match classify(value, force_quote) {
            ArgForm::Atom(s) => self.text(s),
            ArgForm::Quoted(s) => self.text(quote(&s)),
            ArgForm::Literal(bytes) => self.literal(bytes, literal_plus),
        }
    }

    /// Forces literal form regardless of content (APPEND message data).
    fn literal(&mut self, bytes: Vec<u8>, literal_plus: bool) -> &mut Self {
        if literal_plus {
            self.text(format!("{{{}+}}\r\n", bytes.len()));
            self.pieces.push(Piece::Raw(bytes));
        } else {
            self.text(format!("{{{}}}", bytes.len()));
            self.pieces.push(Piece::LiteralBoundary(bytes));
        }
        self
    }

    /// Every `LiteralBoundary` starts a fresh segment; only the final segment
    /// is CRLF-terminated; earlier ones end right at a `{N}` marker, the
    /// socket write pausing there for the server's `+` continuation prompt.
    fn finish(self) -> EncodedCommand {
        let mut segments: Vec<Vec<u8>> = vec![Vec::new()];
        for piece in self.pieces {
            let active = segments.last_mut().expect("segments is never empty");
            match piece {
                Piece::Text(s) => active.extend_from_slice(s.as_bytes()),
                Piece::Raw(bytes) => active.extend_from_slice(&bytes),
                Piece::LiteralBoundary(bytes) => segments.push(bytes),
            }
        }
        segments.last_mut().unwrap().extend_from_slice(b"\r\n");

        let mut segments = segments.into_iter();
        let initial = segments.next().unwrap();
        let continuations = segments.collect();
        EncodedCommand { initial, continuations }
    }
}

enum ArgForm {
    Atom(String),
    Quoted(String),
    Literal(Vec<u8>),
}

fn is_atom_special(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'{' | b'%' | b'*' | b'"' | b'\\' | b']' | b' ' | b'@' | b'/'
    )
}

fn classify(value: &[u8], force_quote: bool) -> ArgForm {
    if value.is_empty() {
        return ArgForm::Quoted(String::new());
    }
    let needs_literal = value
        .iter()
        .any(|&b| b == 0 || b == b'\r' || b == b'\n' || b < 0x20 || b > 0x7e);
    if needs_literal {
        return ArgForm::Literal(value.to_vec());
    }
    // Safe to unwrap: we just ruled out any byte outside printable ASCII.
    let s = std::str::from_utf8(value).unwrap().to_string();
    if force_quote || value.iter().any(|&b| is_atom_special(b)) {
        ArgForm::Quoted(s)
    } else {
        ArgForm::Atom(s)
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '\\' || c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn mailbox_bytes(name: &str) -> Vec<u8> {
    mutf7::encode(name).into_bytes()
}

fn imap_date(date: chrono::NaiveDate) -> String {
    date.format("%d-%b-%Y").to_string()
}

fn imap_date_time(dt: chrono::DateTime<chrono::FixedOffset>) -> String {
    dt.format("%d-%b-%Y %H:%M:%S %z").to_string()
}

fn fetch_item(item: &FetchItem) -> String {
    match item {
        FetchItem::Uid => "UID".into(),
        FetchItem::Flags => "FLAGS".into(),
        FetchItem::InternalDate => "INTERNALDATE".into(),
        FetchItem::Rfc822Size => "RFC822.SIZE".into(),
        FetchItem::Envelope => "ENVELOPE".into(),
        FetchItem::BodyStructure => "BODYSTRUCTURE".into(),
        FetchItem::Body { section, peek, partial } => {
            let verb = if *peek { "BODY.PEEK" } else { "BODY" };
            let sect = section.clone().unwrap_or_default();
            let range = partial
                .map(|(origin, len)| format!("<{origin}.{len}>"))
                .unwrap_or_default();
            format!("{verb}[{sect}]{range}")
        }
        FetchItem::HeaderFields { names, peek } => {
            let verb = if *peek { "BODY.PEEK" } else { "BODY" };
            format!("{verb}[HEADER.FIELDS ({})]", names.join(" "))
        }
        FetchItem::HeaderFieldsNot { names, peek } => {
            let verb = if *peek { "BODY.PEEK" } else { "BODY" };
            format!("{verb}[HEADER.FIELDS.NOT ({})]", names.join(" "))
        }
    }
}

fn store_prefix(kind: StoreKind, silent: bool) -> String {
    let verb = match kind {
        StoreKind::Replace => "FLAGS",
        StoreKind::Add => "+FLAGS",
        StoreKind::Remove => "-FLAGS",
    };
    if silent {
        format!("{verb}.SILENT")
    } else {
        verb.to_string()
    }
}

/// Encodes `command` as `tag`, consulting `caps` for LITERAL+ eligibility.
pub fn encode(tag: &str, command: &Command, caps: &CapabilitySet) -> EncodedCommand {
    let literal_plus = caps.supports_literal_plus();
    let mut b = Builder::new();
    b.text(tag).space();

    match command {
        Command::Capability => {
            b.text("CAPABILITY");
        }
        Command::Noop => {
            b.text("NOOP");
        }
        Command::Logout => {
            b.text("LOGOUT");
        }
        Command::StartTls => {
            b.text("STARTTLS");
        }
        Command::Authenticate(auth) => encode_authenticate(&mut b, auth, caps, literal_plus),
        Command::Login { user, pass } => {
            b.text("LOGIN")
                .space()
                .arg(user.as_bytes(), true, literal_plus)
                .space()
                .arg(pass.as_bytes(), true, literal_plus);
        }
        Command::Select(mailbox) => {
            b.text("SELECT").space().arg(&mailbox_bytes(mailbox), true, literal_plus);
        }
        Command::Examine(mailbox) => {
            b.text("EXAMINE").space().arg(&mailbox_bytes(mailbox), true, literal_plus);
        }
        Command::Create(mailbox) => {
            b.text("CREATE").space().arg(&mailbox_bytes(mailbox), true, literal_plus);
        }
        Command::Delete(mailbox) => {
            b.text("DELETE").space().arg(&mailbox_bytes(mailbox), true, literal_plus);
        }
        Command::Rename { from, to } => {
            b.text("RENAME")
                .space()
                .arg(&mailbox_bytes(from), true, literal_plus)
                .space()
                .arg(&mailbox_bytes(to), true, literal_plus);
        }
        Command::Subscribe(mailbox) => {
            b.text("SUBSCRIBE").space().arg(&mailbox_bytes(mailbox), true, literal_plus);
        }
        Command::Unsubscribe(mailbox) => {
            b.text("UNSUBSCRIBE").space().arg(&mailbox_bytes(mailbox), true, literal_plus);
        }
        Command::List { reference, pattern } => {
            b.text("LIST")
                .space()
                .arg(reference.as_bytes(), true, literal_plus)
                .space();
            list_pattern(&mut b, pattern, literal_plus);
        }
        Command::Lsub { reference, pattern } => {
            b.text("LSUB")
                .space()
                .arg(reference.as_bytes(), false, literal_plus)
                .space();
            list_pattern(&mut b, pattern, literal_plus);
        }
        Command::Status { mailbox, items } => {
            let names: Vec<&str> = items.iter().map(|i| i.as_str()).collect();
            b.text("STATUS")
                .space()
                .arg(&mailbox_bytes(mailbox), true, literal_plus)
                .space()
                .text(format!("({})", names.join(" ")));
        }
        Command::Append(args) => encode_append(&mut b, args, literal_plus),
        Command::Check => {
            b.text("CHECK");
        }
        Command::Close => {
            b.text("CLOSE");
        }
        Command::Expunge => {
            b.text("EXPUNGE");
        }
        Command::UidExpunge(set) => {
            b.text("UID EXPUNGE").space().text(set.to_wire_string());
        }
        Command::Search { charset, criteria, uid } => {
            if *uid {
                b.text("UID ");
            }
            b.text("SEARCH").space();
            if let Some(cs) = charset {
                b.text(format!("CHARSET {cs}")).space();
            }
            search::render(&mut b, criteria, literal_plus);
        }
        Command::Fetch { sequence_set, uid, attributes } => {
            if *uid {
                b.text("UID ");
            }
            let items = attributes.iter().map(fetch_item).collect::<Vec<_>>().join(" ");
            b.text("FETCH")
                .space()
                .text(sequence_set.to_wire_string())
                .space()
                .text(format!("({items})"));
        }
        Command::Store { sequence_set, uid, kind, silent, flags } => {
            if *uid {
                b.text("UID ");
            }
            b.text("STORE")
                .space()
                .text(sequence_set.to_wire_string())
                .space()
                .text(store_prefix(*kind, *silent))
                .space()
                .text(format!("({})", flags.join(" ")));
        }
        Command::Copy { sequence_set, uid, mailbox } => {
            if *uid {
                b.text("UID ");
            }
            b.text("COPY")
                .space()
                .text(sequence_set.to_wire_string())
                .space()
                .arg(&mailbox_bytes(mailbox), true, literal_plus);
        }
        Command::Move { sequence_set, uid, mailbox } => {
            if *uid {
                b.text("UID ");
            }
            b.text("MOVE")
                .space()
                .text(sequence_set.to_wire_string())
                .space()
                .arg(&mailbox_bytes(mailbox), true, literal_plus);
        }
        Command::Idle => {
            b.text("IDLE");
        }
        Command::Done => {
            b.text("DONE");
        }
    }

    b.finish()
}

fn list_pattern(b: &mut Builder, pattern: &str, literal_plus: bool) {
    if pattern == "*" || pattern == "%" {
        b.text(pattern);
    } else {
        b.arg(pattern.as_bytes(), false, literal_plus);
    }
}

fn encode_authenticate(b: &mut Builder, auth: &AuthCommand, caps: &CapabilitySet, literal_plus: bool) {
    use base64::{engine::general_purpose::STANDARD, Engine};

    b.text("AUTHENTICATE").space();
    match auth {
        AuthCommand::Plain { authzid, user, pass } => {
            b.text("PLAIN");
            if caps.supports_sasl_ir() {
                let response = sasl_plain_response(authzid, user, pass);
                b.space().text(STANDARD.encode(response));
            }
        }
        AuthCommand::XOAuth2 { user, token } => {
            b.text("XOAUTH2");
            if caps.supports_sasl_ir() {
                let response = sasl_xoauth2_response(user, token);
                b.space().text(STANDARD.encode(response));
            }
        }
        AuthCommand::External => {
            b.text("EXTERNAL");
            if caps.supports_sasl_ir() {
                b.space().text("=");
            }
        }
        AuthCommand::Generic { mechanism, initial } => {
            b.text(mechanism.to_ascii_uppercase());
            if caps.supports_sasl_ir() {
                if let Some(resp) = initial {
                    b.space().text(STANDARD.encode(resp));
                }
            }
        }
    }
    let _ = literal_plus; // AUTHENTICATE never carries a literal argument.
}

/// `\0authzid\0user\0pass` per RFC 4616, used both by the encoder (when
/// SASL-IR lets us inline it) and by the session core's continuation reply.
pub fn sasl_plain_response(authzid: &str, user: &str, pass: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(authzid.as_bytes());
    out.push(0);
    out.extend_from_slice(user.as_bytes());
    out.push(0);
    out.extend_from_slice(pass.as_bytes());
    out
}

/// `user=...\x01auth=Bearer ...\x01\x01` per RFC XOAUTH2.
pub fn sasl_xoauth2_response(user: &str, token: &str) -> Vec<u8> {
    format!("user={user}\x01auth=Bearer {token}\x01\x01").into_bytes()
}

fn encode_append(b: &mut Builder, args: &AppendArgs, literal_plus: bool) {
    b.text("APPEND").space().arg(&mailbox_bytes(&args.mailbox), true, literal_plus);
    if let Some(flags) = &args.flags {
        b.space().text(format!("({})", flags.join(" ")));
    }
    if let Some(date) = args.date {
        b.space().text(quote(&imap_date_time(date)));
    }
    b.space();
    b.literal(args.data.clone(), literal_plus);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::SequenceSet;

    fn caps(tokens: &[&str]) -> CapabilitySet {
        CapabilitySet::from_tokens(tokens)
    }

    #[test]
    fn capability_encodes_as_single_line() {
        let encoded = encode("A001", &Command::Capability, &caps(&[]));
        assert_eq!(encoded.initial, b"A001 CAPABILITY\r\n");
        assert!(encoded.is_single_segment());
    }

    #[test]
    fn rename_force_quotes_both_mailbox_arguments() {
        let encoded = encode(
            "A001",
            &Command::Rename { from: "Drafts".into(), to: "Sent Items".into() },
            &caps(&[]),
        );
        assert_eq!(encoded.initial, b"A001 RENAME \"Drafts\" \"Sent Items\"\r\n");
    }

    #[test]
    fn login_force_quotes_both_astring_arguments() {
        let encoded = encode(
            "A005",
            &Command::Login { user: "user@example.com".into(), pass: "pass\"word".into() },
            &caps(&[]),
        );
        assert_eq!(
            encoded.initial,
            b"A005 LOGIN \"user@example.com\" \"pass\\\"word\"\r\n".to_vec()
        );
    }

    #[test]
    fn select_quotes_mailbox_with_space() {
        let encoded = encode("A002", &Command::Select("My Folder".into()), &caps(&[]));
        assert_eq!(encoded.initial, b"A002 SELECT \"My Folder\"\r\n");
    }

    #[test]
    fn select_quotes_mutf7_encoded_non_ascii_mailbox() {
        // Modified UTF-7 encoding already renders the name as safe ASCII, so
        // it is quoted rather than promoted to a literal.
        let encoded = encode("A003", &Command::Select("Envoyé".into()), &caps(&[]));
        let encoded_mailbox = mutf7::encode("Envoyé");
        assert!(encoded.is_single_segment());
        assert_eq!(
            encoded.initial,
            format!("A003 SELECT \"{encoded_mailbox}\"\r\n").into_bytes()
        );
    }

    #[test]
    fn list_reference_with_control_bytes_promotes_to_non_synchronizing_literal() {
        // Unlike mailbox-name arguments (always routed through mutf7::encode,
        // which escapes every control byte away), LIST's reference argument is
        // a plain byte string and can still carry one, driving `classify`
        // straight to literal form.
        let encoded = encode(
            "A004",
            &Command::List { reference: "weird\r\nref".into(), pattern: "*".into() },
            &caps(&["LITERAL+"]),
        );
        assert!(encoded.is_single_segment());
        assert!(encoded.initial.starts_with(b"A004 LIST {"));
        assert!(encoded.initial.ends_with(b"weird\r\nref *\r\n"));
    }

    #[test]
    fn fetch_renders_sequence_set_and_parenthesized_items() {
        let encoded = encode(
            "A005",
            &Command::Fetch {
                sequence_set: SequenceSet::range(1, 5),
                uid: false,
                attributes: vec![FetchItem::Uid, FetchItem::Flags],
            },
            &caps(&[]),
        );
        assert_eq!(encoded.initial, b"A005 FETCH 1:5 (UID FLAGS)\r\n");
    }

    #[test]
    fn uid_store_prefixes_with_uid_and_silent_suffix() {
        let encoded = encode(
            "A006",
            &Command::Store {
                sequence_set: SequenceSet::single(42),
                uid: true,
                kind: StoreKind::Add,
                silent: true,
                flags: vec!["\\Deleted".into()],
            },
            &caps(&[]),
        );
        assert_eq!(encoded.initial, b"A006 UID STORE 42 +FLAGS.SILENT (\\Deleted)\r\n");
    }

    #[test]
    fn append_always_emits_a_literal_for_message_data() {
        let encoded = encode(
            "A007",
            &Command::Append(AppendArgs {
                mailbox: "INBOX".into(),
                flags: Some(vec!["\\Seen".into()]),
                date: None,
                data: b"Subject: hi\r\n\r\nbody".to_vec(),
            }),
            &caps(&[]),
        );
        assert_eq!(
            encoded.initial,
            b"A007 APPEND \"INBOX\" (\\Seen) {19}".to_vec()
        );
        assert_eq!(encoded.continuations.len(), 1);
        assert_eq!(encoded.continuations[0], b"Subject: hi\r\n\r\nbody\r\n".to_vec());
    }

    #[test]
    fn list_pattern_wildcard_is_rendered_bare() {
        let encoded = encode(
            "A008",
            &Command::List { reference: String::new(), pattern: "*".into() },
            &caps(&[]),
        );
        assert_eq!(encoded.initial, b"A008 LIST \"\" *\r\n");
    }
}
