//! IMAP4rev1 client protocol engine: incremental response parser, command
//! encoder, session state machine, and retry controller.

pub mod capability;
pub mod codec;
pub mod command;
pub mod config;
pub mod encode;
pub mod error;
pub mod net;
pub mod parser;
pub mod retry;
pub mod sasl;
pub mod session;
pub mod state;
pub mod types;

pub use config::{AuthMethod, RetryConfig, SessionConfig, TlsConfig, TlsMode};
pub use error::{ImapError, Result};
pub use net::Stream;
pub use session::{
    connect, connect_with_sasl, connect_with_stream, CommandOutcome, SaslChallengeHandler, SessionHandle,
};
