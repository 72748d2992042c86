//! SASL mechanism names and metadata.

/// Supported SASL mechanisms (client-side).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaslMechanism {
    /// PLAIN (RFC 4616) – requires TLS.
    Plain,
    /// Legacy LOGIN – requires TLS.
    Login,
    /// XOAUTH2 – OAuth2 bearer token (Gmail, Outlook). Single-shot, no challenge.
    XOAuth2,
    /// EXTERNAL (RFC 4422 appendix A) – credential taken from the TLS channel.
    External,
}

impl SaslMechanism {
    pub fn name(&self) -> &'static str {
        match self {
            SaslMechanism::Plain => "PLAIN",
            SaslMechanism::Login => "LOGIN",
            SaslMechanism::XOAuth2 => "XOAUTH2",
            SaslMechanism::External => "EXTERNAL",
        }
    }

    pub fn requires_tls(&self) -> bool {
        matches!(self, SaslMechanism::Plain | SaslMechanism::Login | SaslMechanism::XOAuth2)
    }

    pub fn is_challenge_response(&self) -> bool {
        matches!(self, SaslMechanism::Login)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_uppercase().as_str() {
            "PLAIN" => Some(SaslMechanism::Plain),
            "LOGIN" => Some(SaslMechanism::Login),
            "XOAUTH2" => Some(SaslMechanism::XOAuth2),
            "EXTERNAL" => Some(SaslMechanism::External),
            _ => None,
        }
    }
}

impl std::fmt::Display for SaslMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_name() {
        for m in [SaslMechanism::Plain, SaslMechanism::Login, SaslMechanism::XOAuth2, SaslMechanism::External] {
            assert_eq!(SaslMechanism::from_name(m.name()), Some(m));
        }
    }

    #[test]
    fn from_name_is_case_insensitive() {
        assert_eq!(SaslMechanism::from_name("plain"), Some(SaslMechanism::Plain));
    }
}
