//! Incremental response parser: reassembles a byte stream into logical
//! response lines (carrying literal-blob boundaries across `append()` calls)
//! and hands each complete line to the tokenizer and grammar parser.

mod response;
mod tokenize;

use crate::error::ImapError;
use crate::types::Response;
use tokenize::{tokenize, LineSegment};

/// Stateful, incremental IMAP response parser. Feed it raw socket bytes via
/// `append`, then drain whatever complete responses are now parseable via
/// `parse_responses`. Safe to call with partial reads, including reads that
/// split a literal's octets across multiple `append` calls.
#[derive(Debug, Default)]
pub struct ResponseParser {
    buf: Vec<u8>,
    segments: Vec<LineSegment>,
    awaiting_literal: Option<usize>,
    literal_acc: Vec<u8>,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Drains every response that can be fully reconstructed from bytes seen
    /// so far, leaving any partial trailing line buffered for next time.
    pub fn parse_responses(&mut self) -> Result<Vec<Response>, ImapError> {
        let mut out = Vec::new();
        loop {
            if let Some(remaining) = self.awaiting_literal {
                if self.buf.len() < remaining {
                    self.literal_acc.extend_from_slice(&self.buf);
                    self.awaiting_literal = Some(remaining - self.buf.len());
                    self.buf.clear();
                    break;
                }
                let literal_bytes = self.buf[..remaining].to_vec();
                let rest = self.buf[remaining..].to_vec();
                self.literal_acc.extend_from_slice(&literal_bytes);
                self.buf = rest;
                self.segments.push(LineSegment::Literal(std::mem::take(&mut self.literal_acc)));
                self.awaiting_literal = None;
                continue;
            }

            match find_crlf(&self.buf) {
                None => break,
                Some(idx) => {
                    let line_chunk = self.buf[..idx].to_vec();
                    let remainder = self.buf[idx + 2..].to_vec();
                    self.buf = remainder;
                    if let Some((text, literal_len)) = strip_literal_marker(&line_chunk) {
                        self.segments.push(LineSegment::Bytes(text));
                        self.awaiting_literal = Some(literal_len);
                        continue;
                    }
                    self.segments.push(LineSegment::Bytes(line_chunk));
                    let segments = std::mem::take(&mut self.segments);
                    out.push(parse_complete_line(&segments)?);
                }
            }
        }
        Ok(out)
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// If `line` ends in a literal marker (`{N}` or `{N+}`), returns the text
/// preceding it and the literal's declared length. `{N+}` (non-synchronizing,
/// RFC 2088) is accepted on read the same as `{N}`: the distinction only
/// matters to the writer deciding whether to wait for a continuation.
fn strip_literal_marker(line: &[u8]) -> Option<(Vec<u8>, usize)> {
    let open = line.iter().rposition(|&b| b == b'{')?;
    let rest = &line[open + 1..];
    if rest.last() != Some(&b'}') {
        return None;
    }
    let digits_part = &rest[..rest.len() - 1];
    let digits = if digits_part.last() == Some(&b'+') {
        &digits_part[..digits_part.len() - 1]
    } else {
        digits_part
    };
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let n: usize = std::str::from_utf8(digits).ok()?.parse().ok()?;
    Some((line[..open].to_vec(), n))
}

fn parse_complete_line(segments: &[LineSegment]) -> Result<Response, ImapError> {
    if let [LineSegment::Bytes(bytes)] = segments {
        if bytes.first() == Some(&b'+') {
            let text = String::from_utf8_lossy(&bytes[1..]).trim().to_string();
            return Ok(Response::Continuation(text));
        }
    }
    let tokens = tokenize(segments)?;
    response::parse(&tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FetchAttributeValue, Status, Untagged};

    #[test]
    fn parses_fetch_with_inline_literal_and_following_tagged_ok() {
        let mut parser = ResponseParser::new();
        parser.append(b"* 1 FETCH (BODY[] {5}\r\nHello)\r\nA001 OK\r\n");
        let responses = parser.parse_responses().unwrap();
        assert_eq!(responses.len(), 2);
        match &responses[0] {
            Response::Untagged(Untagged::Fetch(num, attrs)) => {
                assert_eq!(*num, 1);
                assert_eq!(attrs.len(), 1);
                match &attrs[0] {
                    FetchAttributeValue::Body(section) => {
                        assert_eq!(section.section, None);
                        assert_eq!(section.data, b"Hello");
                    }
                    other => panic!("unexpected attribute {other:?}"),
                }
            }
            other => panic!("unexpected response {other:?}"),
        }
        match &responses[1] {
            Response::Tagged { tag, status, .. } => {
                assert_eq!(tag, "A001");
                assert_eq!(*status, Status::Ok);
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn literal_split_across_two_appends_still_parses() {
        let mut parser = ResponseParser::new();
        parser.append(b"* 1 FETCH (BODY[] {5}\r\nHel");
        assert!(parser.parse_responses().unwrap().is_empty());
        parser.append(b"lo)\r\n");
        let responses = parser.parse_responses().unwrap();
        assert_eq!(responses.len(), 1);
        match &responses[0] {
            Response::Untagged(Untagged::Fetch(_, attrs)) => match &attrs[0] {
                FetchAttributeValue::Body(section) => assert_eq!(section.data, b"Hello"),
                other => panic!("unexpected attribute {other:?}"),
            },
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn parses_continuation_request() {
        let mut parser = ResponseParser::new();
        parser.append(b"+ idling\r\n");
        let responses = parser.parse_responses().unwrap();
        assert_eq!(responses, vec![Response::Continuation("idling".to_string())]);
    }

    #[test]
    fn parses_capability_and_tagged_ok_with_response_code() {
        let mut parser = ResponseParser::new();
        parser.append(b"* CAPABILITY IMAP4rev1 LITERAL+ SASL-IR\r\n");
        parser.append(b"A002 OK [READ-WRITE] SELECT completed\r\n");
        let responses = parser.parse_responses().unwrap();
        assert_eq!(
            responses[0],
            Response::Untagged(Untagged::Capability(vec![
                "IMAP4rev1".to_string(),
                "LITERAL+".to_string(),
                "SASL-IR".to_string(),
            ]))
        );
        match &responses[1] {
            Response::Tagged { tag, status, code, text } => {
                assert_eq!(tag, "A002");
                assert_eq!(*status, Status::Ok);
                assert!(code.is_some());
                assert_eq!(text.as_deref(), Some("SELECT completed"));
            }
            other => panic!("unexpected response {other:?}"),
        }
    }
}
