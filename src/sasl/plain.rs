//! PLAIN SASL (RFC 4616). Requires TLS.

use super::SaslError;

/// Build PLAIN initial response: NUL authzid NUL authcid NUL password (UTF-8).
pub fn encode_plain(authzid: &str, authcid: &str, password: &str) -> Vec<u8> {
    format!("\0{}\0{}\0{}", authzid, authcid, password).into_bytes()
}

pub fn initial_response_plain(authzid: &str, authcid: &str, password: &str) -> Result<Vec<u8>, SaslError> {
    Ok(encode_plain(authzid, authcid, password))
}

/// Splits authzid/authcid/password out of a raw PLAIN payload. Not used on the
/// client path, kept for symmetry with the server-side parser this engine's
/// test doubles exercise.
#[allow(dead_code)]
pub fn parse_plain_credentials(credentials: &[u8]) -> Result<(String, String, String), SaslError> {
    let mut first = None;
    let mut second = None;
    for (i, &b) in credentials.iter().enumerate() {
        if b == 0 {
            if first.is_none() {
                first = Some(i);
            } else {
                second = Some(i);
                break;
            }
        }
    }
    let (f, s) = first.and_then(|f| second.map(|s| (f, s))).ok_or_else(SaslError::plain_invalid)?;
    let authzid = String::from_utf8(credentials[..f].to_vec()).map_err(|_| SaslError::plain_invalid())?;
    let authcid = String::from_utf8(credentials[f + 1..s].to_vec()).map_err(|_| SaslError::plain_invalid())?;
    let password = String::from_utf8(credentials[s + 1..].to_vec()).map_err(|_| SaslError::plain_invalid())?;
    Ok((authzid, authcid, password))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_authzid_user_pass_separated_by_nul() {
        let bytes = encode_plain("", "alice", "hunter2");
        assert_eq!(bytes, b"\0alice\0hunter2");
    }

    #[test]
    fn round_trips_through_parse_plain_credentials() {
        let bytes = encode_plain("zid", "alice", "hunter2");
        let (authzid, authcid, password) = parse_plain_credentials(&bytes).unwrap();
        assert_eq!(authzid, "zid");
        assert_eq!(authcid, "alice");
        assert_eq!(password, "hunter2");
    }
}
