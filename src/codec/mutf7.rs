//! Modified UTF-7 (RFC 3501 §5.1.3): the mailbox-name encoding IMAP uses on the wire.
//!
//! Same shape as the teacher's filesystem mailbox-name codec
//! (`localstorage/mailbox_name_codec.rs`): a "needs escaping" scan over the
//! input, a shift-in/shift-out escape form, and a permissive decoder that
//! degrades instead of failing on malformed input. The escape alphabet here
//! is RFC 3501's `&...-` UTF-16BE/base64 shift, not the teacher's `=XX` hex
//! escape.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;

/// Encode an application-level (UTF-8) mailbox name to its modified UTF-7 wire form.
pub fn encode(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut shifted: Vec<u16> = Vec::new();

    fn flush_shifted(shifted: &mut Vec<u16>, out: &mut String) {
        if shifted.is_empty() {
            return;
        }
        let mut bytes = Vec::with_capacity(shifted.len() * 2);
        for unit in shifted.drain(..) {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        let b64 = STANDARD_NO_PAD.encode(&bytes).replace('/', ",");
        out.push('&');
        out.push_str(&b64);
        out.push('-');
    }

    for c in name.chars() {
        let cp = c as u32;
        if c == '&' {
            flush_shifted(&mut shifted, &mut out);
            out.push_str("&-");
        } else if (0x20..=0x7e).contains(&cp) {
            flush_shifted(&mut shifted, &mut out);
            out.push(c);
        } else {
            let mut buf = [0u16; 2];
            shifted.extend_from_slice(c.encode_utf16(&mut buf));
        }
    }
    flush_shifted(&mut shifted, &mut out);
    out
}

/// Decode a wire-form mailbox name back to UTF-8. Malformed shift sequences
/// degrade to literal passthrough rather than failing (per RFC 3501 client
/// leniency and spec property P-CODEC).
pub fn decode(encoded: &str) -> String {
    let chars: Vec<char> = encoded.chars().collect();
    let mut out = String::with_capacity(encoded.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '&' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        // Look for "&-" (literal ampersand).
        if chars.get(i + 1) == Some(&'-') {
            out.push('&');
            i += 2;
            continue;
        }
        // Otherwise scan for the terminating '-'.
        let start = i + 1;
        let mut j = start;
        while j < chars.len() && chars[j] != '-' {
            j += 1;
        }
        if j >= chars.len() {
            // No terminator: malformed, pass the rest through literally.
            out.extend(&chars[i..]);
            break;
        }
        let shifted: String = chars[start..j].iter().collect();
        match decode_shifted(&shifted) {
            Some(decoded) => {
                out.push_str(&decoded);
                i = j + 1;
            }
            None => {
                // Malformed base64/UTF-16: pass the whole shift sequence through as-is.
                out.push('&');
                out.push_str(&shifted);
                out.push('-');
                i = j + 1;
            }
        }
    }
    out
}

fn decode_shifted(shifted: &str) -> Option<String> {
    let unsubstituted = shifted.replace(',', "/");
    let padded = pad_to_multiple_of_4(&unsubstituted);
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(padded.as_bytes())
        .ok()?;
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16(&units).ok()
}

fn pad_to_multiple_of_4(s: &str) -> String {
    let rem = s.len() % 4;
    if rem == 0 {
        s.to_string()
    } else {
        let mut padded = s.to_string();
        for _ in 0..(4 - rem) {
            padded.push('=');
        }
        padded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_ascii() {
        let s = "INBOX/Sent Items";
        assert_eq!(decode(&encode(s)), s);
    }

    #[test]
    fn round_trips_non_ascii() {
        for s in ["Projects/日本語", "Envoyé", "Отправленные"] {
            assert_eq!(decode(&encode(s)), s);
        }
    }

    #[test]
    fn literal_ampersand() {
        assert_eq!(encode("A&B"), "A&-B");
        assert_eq!(decode("A&-B"), "A&B");
    }

    #[test]
    fn decodes_known_vector() {
        assert_eq!(decode("Envoy&AOk-"), "Envoyé");
    }

    #[test]
    fn malformed_shift_degrades_to_passthrough() {
        // unterminated shift sequence: no trailing '-'
        let input = "A&AOk";
        assert_eq!(decode(input), "A&AOk");
    }
}
