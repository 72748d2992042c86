//! SASL client: mechanism metadata plus initial-response construction for the
//! mechanisms the session core drives directly (PLAIN, XOAUTH2). EXTERNAL
//! sends an empty initial response, and a caller-named `Generic` mechanism is
//! driven entirely through the session's SASL callback (see
//! `AuthCommand::Generic`) and never touches this module. The classic
//! `LOGIN` command isn't SASL at all — see `Command::Login`.

mod mechanism;
mod plain;
mod xoauth2;

pub use mechanism::SaslMechanism;
pub use plain::{encode_plain, initial_response_plain};
pub use xoauth2::xoauth2_initial_response;

#[derive(Debug)]
pub struct SaslError {
    pub message: String,
}

impl SaslError {
    pub fn invalid(msg: &str) -> Self {
        Self { message: msg.to_string() }
    }

    pub fn plain_invalid() -> Self {
        Self::invalid("invalid PLAIN credentials format")
    }
}

impl std::fmt::Display for SaslError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SaslError {}

/// Result of the first client step.
#[derive(Debug)]
pub enum SaslFirst {
    /// Single-round: send this as initial response (PLAIN, XOAUTH2, EXTERNAL).
    Done(Vec<u8>),
    /// More rounds follow (LOGIN's Username:/Password: challenges).
    Continue(Vec<u8>),
}

/// Build the initial client response for the given mechanism.
pub fn initial_client_response(
    mechanism: SaslMechanism,
    authzid: &str,
    authcid: &str,
    password: &str,
) -> Result<SaslFirst, SaslError> {
    match mechanism {
        SaslMechanism::Plain => {
            let bytes = initial_response_plain(authzid, authcid, password)?;
            Ok(SaslFirst::Done(bytes))
        }
        SaslMechanism::Login => Ok(SaslFirst::Continue(Vec::new())),
        SaslMechanism::XOAuth2 => {
            let bytes = xoauth2_initial_response(authcid, password);
            Ok(SaslFirst::Done(bytes))
        }
        SaslMechanism::External => Ok(SaslFirst::Done(Vec::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_mechanism_is_single_round() {
        let result = initial_client_response(SaslMechanism::Plain, "", "alice", "pw").unwrap();
        assert!(matches!(result, SaslFirst::Done(bytes) if bytes == b"\0alice\0pw"));
    }

    #[test]
    fn login_mechanism_starts_with_empty_initial_response_and_continues() {
        let result = initial_client_response(SaslMechanism::Login, "", "alice", "pw").unwrap();
        assert!(matches!(result, SaslFirst::Continue(bytes) if bytes.is_empty()));
    }

    #[test]
    fn external_mechanism_has_empty_initial_response() {
        let result = initial_client_response(SaslMechanism::External, "", "", "").unwrap();
        assert!(matches!(result, SaslFirst::Done(bytes) if bytes.is_empty()));
    }
}
