//! Structured data model produced by the parser and consumed by the session API.

pub mod bodystructure;
pub mod envelope;
pub mod response;

pub use bodystructure::{BasicFields, BodyStructure, Disposition};
pub use envelope::{Address, AddressList, AddressListEntry, Envelope};
pub use response::{
    BodySection, FetchAttributeValue, MailboxAccess, MailboxListEntry, MailboxStatus, Response,
    ResponseCode, Status, Untagged,
};
