//! Capability set: uppercase ASCII tokens advertised by the server, refreshed
//! on every `CAPABILITY` data/response code (spec.md §3).

use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet(HashSet<String>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self(HashSet::new())
    }

    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(tokens.into_iter().map(|s| s.as_ref().to_ascii_uppercase()).collect())
    }

    pub fn replace<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.0 = tokens.into_iter().map(|s| s.as_ref().to_ascii_uppercase()).collect();
    }

    pub fn has(&self, token: &str) -> bool {
        self.0.contains(&token.to_ascii_uppercase())
    }

    pub fn has_auth_mechanism(&self, mechanism: &str) -> bool {
        self.has(&format!("AUTH={mechanism}"))
    }

    pub fn supports_literal_plus(&self) -> bool {
        self.has("LITERAL+")
    }

    pub fn supports_move(&self) -> bool {
        self.has("MOVE")
    }

    pub fn supports_uidplus(&self) -> bool {
        self.has("UIDPLUS")
    }

    pub fn supports_sasl_ir(&self) -> bool {
        self.has("SASL-IR")
    }

    pub fn supports_starttls(&self) -> bool {
        self.has("STARTTLS")
    }

    pub fn supports_login_disabled(&self) -> bool {
        self.has("LOGINDISABLED")
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }
}
