//! Wire-level encodings used by the IMAP engine.

pub mod mutf7;
