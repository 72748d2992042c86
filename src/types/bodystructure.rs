//! BODYSTRUCTURE (RFC 3501 §7.4.2, §9 "body").

use super::envelope::Envelope;

/// Parameter list, disposition, or extension data shared across body part kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Disposition {
    pub kind: String,
    pub params: Vec<(String, String)>,
}

/// Fields common to every single (non-multipart) body part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicFields {
    pub type_: String,
    pub subtype: String,
    pub params: Vec<(String, String)>,
    pub id: Option<String>,
    pub description: Option<String>,
    pub encoding: String,
    pub size: u32,
    pub md5: Option<String>,
    pub disposition: Option<Disposition>,
    pub language: Vec<String>,
    pub location: Option<String>,
}

/// Recursive BODYSTRUCTURE tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyStructure {
    /// `multipart/*`: subparts followed by the multipart subtype and, when
    /// present, parameters/disposition/language/location extension data.
    Multipart {
        parts: Vec<BodyStructure>,
        subtype: String,
        params: Vec<(String, String)>,
        disposition: Option<Disposition>,
        language: Vec<String>,
        location: Option<String>,
    },
    /// `message/rfc822`: basic fields plus the embedded message's own
    /// envelope, body structure, and line count.
    Message {
        fields: BasicFields,
        envelope: Box<Envelope>,
        body: Box<BodyStructure>,
        lines: u32,
    },
    /// `text/*`: basic fields plus a line count.
    Text { fields: BasicFields, lines: u32 },
    /// Any other single part.
    Basic { fields: BasicFields },
}
