//! XOAUTH2 SASL mechanism for Gmail and Outlook IMAP/SMTP.
//!
//! The XOAUTH2 mechanism is a single-shot SASL mechanism (no challenge-response rounds).
//! The initial client response is:
//!
//! ```text
//! base64("user=" {user} "\x01" "auth=Bearer " {access_token} "\x01\x01")
//! ```
//!
//! See <https://developers.google.com/gmail/imap/xoauth2-protocol>

/// Build the raw XOAUTH2 initial response (before base64 encoding).
///
/// Format: `user={user}\x01auth=Bearer {access_token}\x01\x01`
pub fn xoauth2_initial_response(user: &str, access_token: &str) -> Vec<u8> {
    format!("user={}\x01auth=Bearer {}\x01\x01", user, access_token).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xoauth2_initial_response() {
        let raw = xoauth2_initial_response("user@example.com", "ya29.token123");
        let expected = b"user=user@example.com\x01auth=Bearer ya29.token123\x01\x01";
        assert_eq!(raw, expected.to_vec());
    }
}
