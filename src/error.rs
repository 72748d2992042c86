//! Error taxonomy for the IMAP engine: connection, protocol, and command failures.
//!
//! Pattern follows the rest of the crate: a hand-rolled enum with manual
//! `Display`/`std::error::Error` impls rather than a derive-macro crate.

use std::fmt;

/// Every failure mode the engine can surface to a caller.
#[derive(Debug, Clone)]
pub enum ImapError {
    ConnectionFailed(String),
    ConnectionError(String),
    ConnectionClosed,
    AuthenticationFailed(String),
    TlsError(String),
    ProtocolError(String),
    ParsingError(String),
    CommandFailed { command: String, text: String },
    ServerError(String),
    Timeout,
    Disconnected,
    InvalidState(String),
    UnsupportedCapability(String),
    MailboxNotFound(String),
    MessageNotFound(u32),
    QuotaExceeded,
    PermissionDenied,
    InvalidArgument(String),
}

impl ImapError {
    /// True when the error's text mentions a network/connection/timeout condition,
    /// independent of its variant — used by the retry controller's catch-all class.
    pub fn mentions_network_issue(&self) -> bool {
        let text = self.to_string().to_ascii_lowercase();
        text.contains("network") || text.contains("connection") || text.contains("timed out")
    }

    /// True when the error's text looks like a TLS handshake/certificate failure.
    pub fn mentions_tls_issue(&self) -> bool {
        let text = self.to_string().to_ascii_lowercase();
        text.contains("tls") || text.contains("handshake") || text.contains("certificate")
    }

    /// True when a ServerError's text contains any of the given uppercase markers.
    pub fn server_text_contains_any(&self, markers: &[&str]) -> bool {
        match self {
            ImapError::ServerError(text) | ImapError::CommandFailed { text, .. } => {
                let upper = text.to_ascii_uppercase();
                markers.iter().any(|m| upper.contains(m))
            }
            _ => false,
        }
    }
}

impl fmt::Display for ImapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImapError::ConnectionFailed(m) => write!(f, "connection failed: {m}"),
            ImapError::ConnectionError(m) => write!(f, "connection error: {m}"),
            ImapError::ConnectionClosed => write!(f, "connection closed"),
            ImapError::AuthenticationFailed(m) => write!(f, "authentication failed: {m}"),
            ImapError::TlsError(m) => write!(f, "TLS error: {m}"),
            ImapError::ProtocolError(m) => write!(f, "protocol error: {m}"),
            ImapError::ParsingError(m) => write!(f, "parse error: {m}"),
            ImapError::CommandFailed { command, text } => {
                write!(f, "{command} failed: {text}")
            }
            ImapError::ServerError(m) => write!(f, "server error: {m}"),
            ImapError::Timeout => write!(f, "timed out"),
            ImapError::Disconnected => write!(f, "disconnected"),
            ImapError::InvalidState(m) => write!(f, "invalid state: {m}"),
            ImapError::UnsupportedCapability(c) => write!(f, "server does not support {c}"),
            ImapError::MailboxNotFound(m) => write!(f, "mailbox not found: {m}"),
            ImapError::MessageNotFound(uid) => write!(f, "message not found: uid {uid}"),
            ImapError::QuotaExceeded => write!(f, "quota exceeded"),
            ImapError::PermissionDenied => write!(f, "permission denied"),
            ImapError::InvalidArgument(m) => write!(f, "invalid argument: {m}"),
        }
    }
}

impl std::error::Error for ImapError {}

impl From<std::io::Error> for ImapError {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::TimedOut => ImapError::Timeout,
            ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe => {
                ImapError::ConnectionClosed
            }
            _ => ImapError::ConnectionError(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ImapError>;
