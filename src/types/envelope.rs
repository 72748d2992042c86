//! ENVELOPE and address-list structures (RFC 3501 §7.4.2, §9 "envelope").

/// One RFC 3501 address structure. Every nstring field keeps its raw octets
/// alongside the best-effort decoded string, so a caller can re-decode
/// non-UTF-8 header data itself if the engine's UTF-8/Latin-1 guess is wrong.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    pub name: Option<String>,
    pub name_raw: Option<Vec<u8>>,
    pub adl: Option<String>,
    pub adl_raw: Option<Vec<u8>>,
    pub mailbox: Option<String>,
    pub mailbox_raw: Option<Vec<u8>>,
    pub host: Option<String>,
    pub host_raw: Option<Vec<u8>>,
}

/// One entry in an address-list's grouped form: either a plain mailbox, or the
/// start of an RFC 3501 "group" (mailbox set, host NIL) that runs until the
/// matching end-of-group sentinel (mailbox NIL, host NIL).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressListEntry {
    Mailbox(Address),
    Group { name: String, members: Vec<Address> },
}

/// One ENVELOPE address field. Preserves both the grouped form the wire sent
/// and a flattened view (groups expanded, sentinels dropped) for callers that
/// don't care about RFC 3501 group structure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressList {
    pub entries: Vec<AddressListEntry>,
}

impl AddressList {
    pub fn flattened(&self) -> Vec<&Address> {
        let mut out = Vec::new();
        for entry in &self.entries {
            match entry {
                AddressListEntry::Mailbox(a) => out.push(a),
                AddressListEntry::Group { members, .. } => out.extend(members.iter()),
            }
        }
        out
    }
}

/// ENVELOPE: date, subject, six address-lists, in-reply-to, message-id (ten
/// fields total per RFC 3501's `envelope` grammar production).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    pub date: Option<String>,
    pub subject: Option<String>,
    pub from: AddressList,
    pub sender: AddressList,
    pub reply_to: AddressList,
    pub to: AddressList,
    pub cc: AddressList,
    pub bcc: AddressList,
    pub in_reply_to: Option<String>,
    pub message_id: Option<String>,
}
