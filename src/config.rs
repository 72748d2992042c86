//! Session configuration: connection target, TLS policy, authentication
//! method, and retry tuning (spec.md §6).

use std::time::Duration;

use crate::sasl::SaslMechanism;

/// How the session establishes transport security.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// TLS from the first byte (e.g. port 993).
    Implicit,
    /// Connect in cleartext, issue STARTTLS once the server advertises it.
    StartTls,
    /// No TLS at all. Only for test fixtures and local/relay setups the
    /// caller has already secured some other way.
    None,
}

#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub mode: TlsMode,
    /// Fail the connection if the server doesn't advertise STARTTLS when
    /// `mode` is `StartTls`, rather than silently falling back to cleartext.
    pub require_starttls: bool,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self { mode: TlsMode::Implicit, require_starttls: true }
    }
}

/// Caller-supplied credentials for one authentication attempt.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    Login { user: String, pass: String },
    Plain { authzid: String, user: String, pass: String },
    XOAuth2 { user: String, token: String },
    External,
    /// Caller drives the mechanism entirely through the session's SASL
    /// callback; this engine only relays continuation payloads.
    Generic { mechanism: String },
}

impl AuthMethod {
    pub fn mechanism_name(&self) -> String {
        match self {
            AuthMethod::Login { .. } => "LOGIN".to_string(),
            AuthMethod::Plain { .. } => SaslMechanism::Plain.name().to_string(),
            AuthMethod::XOAuth2 { .. } => SaslMechanism::XOAuth2.name().to_string(),
            AuthMethod::External => SaslMechanism::External.name().to_string(),
            AuthMethod::Generic { mechanism } => mechanism.clone(),
        }
    }
}

/// Which error categories the retry controller treats as worth retrying
/// (spec.md §4.6 classification rules (a)-(e)).
#[derive(Debug, Clone, Copy)]
pub struct RetryableErrors {
    /// `ConnectionError` / `ConnectionClosed`.
    pub connection_lost: bool,
    /// `Timeout`.
    pub timeout: bool,
    /// `ServerError`/`CommandFailed` text containing UNAVAILABLE, TRY AGAIN,
    /// TEMPORARY, or BUSY.
    pub temporary_failure: bool,
    /// Any other error whose description mentions network/connection/timed out.
    pub network_error: bool,
    /// Error description matching a TLS handshake/certificate failure.
    pub tls_handshake_failure: bool,
}

impl Default for RetryableErrors {
    fn default() -> Self {
        Self {
            connection_lost: true,
            timeout: true,
            temporary_failure: true,
            network_error: true,
            tls_handshake_failure: true,
        }
    }
}

/// Exponential backoff with jitter for the reconnect controller (spec.md §4.6).
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
    /// Fractional jitter applied to each computed delay, e.g. 0.2 means
    /// the actual delay is drawn from `[delay * (1 - jitter), delay * (1 + jitter)]`.
    pub jitter: f64,
    /// `None` means retry indefinitely.
    pub max_attempts: Option<u32>,
    pub retryable: RetryableErrors,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: 0.2,
            max_attempts: None,
            retryable: RetryableErrors::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub tls: TlsConfig,
    pub auth: Option<AuthMethod>,
    pub retry: RetryConfig,
    /// How long to wait for a tagged response before the command fails with
    /// `ImapError::Timeout`.
    pub command_timeout: Duration,
    /// How long to wait for a continuation (`+`) before failing a command
    /// that requires one.
    pub continuation_timeout: Duration,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            tls: TlsConfig::default(),
            auth: None,
            retry: RetryConfig::default(),
            command_timeout: Duration::from_secs(30),
            continuation_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_auth(mut self, auth: AuthMethod) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tls_mode_is_implicit() {
        let cfg = SessionConfig::new("imap.example.com", 993);
        assert_eq!(cfg.tls.mode, TlsMode::Implicit);
    }

    #[test]
    fn builder_methods_override_defaults() {
        let cfg = SessionConfig::new("imap.example.com", 143)
            .with_tls(TlsConfig { mode: TlsMode::StartTls, require_starttls: true })
            .with_auth(AuthMethod::Login { user: "a".into(), pass: "b".into() });
        assert_eq!(cfg.tls.mode, TlsMode::StartTls);
        assert!(matches!(cfg.auth, Some(AuthMethod::Login { .. })));
    }
}
