//! Grammar layer: walks the token stream from `tokenize.rs` and builds a
//! `Response`. One call per fully-assembled logical line.

use crate::codec::mutf7;
use crate::error::ImapError;
use crate::types::{
    Address, AddressList, AddressListEntry, BasicFields, BodySection, BodyStructure, Disposition,
    Envelope, FetchAttributeValue, MailboxListEntry, MailboxStatus, Response, ResponseCode, Status,
    Untagged,
};

use super::tokenize::{Cursor, Token};

pub fn parse(tokens: &[Token]) -> Result<Response, ImapError> {
    let mut c = Cursor::new(tokens);
    let head = c.expect_atom()?;
    if head == "*" {
        parse_untagged(&mut c)
    } else {
        let (status, code, text) = parse_status_tail(&mut c)?;
        Ok(Response::Tagged { tag: head, status, code, text })
    }
}

fn parse_status_tail(
    c: &mut Cursor,
) -> Result<(Status, Option<ResponseCode>, Option<String>), ImapError> {
    let keyword = c.expect_atom()?;
    let status = parse_status_keyword(&keyword)?;
    let code = parse_response_code(c)?;
    let text = collect_text(c);
    Ok((status, code, text))
}

fn parse_status_keyword(s: &str) -> Result<Status, ImapError> {
    match s.to_ascii_uppercase().as_str() {
        "OK" => Ok(Status::Ok),
        "NO" => Ok(Status::No),
        "BAD" => Ok(Status::Bad),
        "BYE" => Ok(Status::Bye),
        "PREAUTH" => Ok(Status::PreAuth),
        other => Err(ImapError::ParsingError(format!("unknown response status {other}"))),
    }
}

fn collect_text(c: &mut Cursor) -> Option<String> {
    let mut words = Vec::new();
    while !c.at_end() {
        match c.next() {
            Some(Token::Atom(s)) => words.push(s.clone()),
            Some(Token::QuotedString(b)) | Some(Token::Literal(b)) => {
                words.push(String::from_utf8_lossy(b).into_owned())
            }
            _ => {}
        }
    }
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

fn parse_response_code(c: &mut Cursor) -> Result<Option<ResponseCode>, ImapError> {
    if !matches!(c.peek(), Some(Token::LBracket)) {
        return Ok(None);
    }
    c.next();
    let name = c.expect_atom()?;
    let code = match name.to_ascii_uppercase().as_str() {
        "ALERT" => ResponseCode::Alert,
        "PARSE" => ResponseCode::Parse,
        "READ-ONLY" => ResponseCode::ReadOnly,
        "READ-WRITE" => ResponseCode::ReadWrite,
        "TRYCREATE" => ResponseCode::TryCreate,
        "UIDNEXT" => ResponseCode::UidNext(c.expect_number()?),
        "UIDVALIDITY" => ResponseCode::UidValidity(c.expect_number()?),
        "UNSEEN" => ResponseCode::Unseen(c.expect_number()?),
        "CAPABILITY" => {
            let mut caps = Vec::new();
            while !matches!(c.peek(), Some(Token::RBracket)) {
                caps.push(c.expect_atom()?);
            }
            ResponseCode::Capability(caps)
        }
        "PERMANENTFLAGS" => ResponseCode::PermanentFlags(parse_atom_list(c)?),
        "BADCHARSET" => {
            let charsets = if matches!(c.peek(), Some(Token::LParen)) {
                Some(parse_atom_list(c)?)
            } else {
                None
            };
            ResponseCode::BadCharset(charsets)
        }
        other => {
            let mut extra = Vec::new();
            while !matches!(c.peek(), Some(Token::RBracket)) {
                match c.next() {
                    Some(Token::Atom(s)) => extra.push(s.clone()),
                    Some(Token::QuotedString(b)) => extra.push(String::from_utf8_lossy(b).into_owned()),
                    Some(_) => {}
                    None => break,
                }
            }
            ResponseCode::Other(other.to_string(), (!extra.is_empty()).then(|| extra.join(" ")))
        }
    };
    match c.next() {
        Some(Token::RBracket) => Ok(Some(code)),
        other => Err(ImapError::ParsingError(format!("expected ']', got {other:?}"))),
    }
}

fn parse_untagged(c: &mut Cursor) -> Result<Response, ImapError> {
    let starts_with_digit = matches!(c.peek(), Some(Token::Atom(s)) if s.chars().all(|ch| ch.is_ascii_digit()) && !s.is_empty());
    if starts_with_digit {
        let num = c.expect_number()?;
        let keyword = c.expect_atom()?;
        return match keyword.to_ascii_uppercase().as_str() {
            "EXISTS" => Ok(Response::Untagged(Untagged::Exists(num))),
            "RECENT" => Ok(Response::Untagged(Untagged::Recent(num))),
            "EXPUNGE" => Ok(Response::Untagged(Untagged::Expunge(num))),
            "FETCH" => parse_fetch(num, c).map(Response::Untagged),
            other => Err(ImapError::ParsingError(format!("unexpected numeric untagged response {other}"))),
        };
    }

    let keyword = c.expect_atom()?;
    match keyword.to_ascii_uppercase().as_str() {
        "OK" | "NO" | "BAD" | "BYE" | "PREAUTH" => {
            let status = parse_status_keyword(&keyword)?;
            let code = parse_response_code(c)?;
            let text = collect_text(c);
            Ok(Response::Untagged(Untagged::Status { status, code, text }))
        }
        "CAPABILITY" => Ok(Response::Untagged(Untagged::Capability(collect_atoms(c)?))),
        "FLAGS" => Ok(Response::Untagged(Untagged::Flags(parse_atom_list(c)?))),
        "LIST" => Ok(Response::Untagged(Untagged::List(parse_mailbox_list_entry(c)?))),
        "LSUB" => Ok(Response::Untagged(Untagged::Lsub(parse_mailbox_list_entry(c)?))),
        "SEARCH" => Ok(Response::Untagged(Untagged::Search(collect_numbers(c)?))),
        "STATUS" => {
            let (name, status) = parse_mailbox_status(c)?;
            Ok(Response::Untagged(Untagged::MailboxStatus(name, status)))
        }
        other => Ok(Response::Untagged(Untagged::Other(other.to_string()))),
    }
}

fn collect_atoms(c: &mut Cursor) -> Result<Vec<String>, ImapError> {
    let mut out = Vec::new();
    while !c.at_end() {
        out.push(c.expect_atom()?);
    }
    Ok(out)
}

fn collect_numbers(c: &mut Cursor) -> Result<Vec<u32>, ImapError> {
    let mut out = Vec::new();
    while !c.at_end() {
        out.push(c.expect_number()?);
    }
    Ok(out)
}

fn parse_atom_list(c: &mut Cursor) -> Result<Vec<String>, ImapError> {
    c.expect_lparen()?;
    let mut out = Vec::new();
    while !matches!(c.peek(), Some(Token::RParen)) {
        match c.next() {
            Some(Token::Atom(s)) => out.push(s.clone()),
            Some(Token::QuotedString(b)) => out.push(String::from_utf8_lossy(b).into_owned()),
            other => return Err(ImapError::ParsingError(format!("expected flag/atom, got {other:?}"))),
        }
    }
    c.expect_rparen()?;
    Ok(out)
}

fn parse_mailbox_list_entry(c: &mut Cursor) -> Result<MailboxListEntry, ImapError> {
    c.expect_lparen()?;
    let mut attributes = Vec::new();
    while !matches!(c.peek(), Some(Token::RParen)) {
        attributes.push(c.expect_atom()?);
    }
    c.expect_rparen()?;
    let delimiter = match c.next() {
        Some(Token::Nil) => None,
        Some(Token::QuotedString(b)) => b.first().map(|&byte| byte as char),
        other => return Err(ImapError::ParsingError(format!("expected delimiter, got {other:?}"))),
    };
    let raw_name = c.expect_astring()?;
    let name = mutf7::decode(&String::from_utf8_lossy(&raw_name));
    Ok(MailboxListEntry { attributes, delimiter, name, raw_name })
}

fn parse_mailbox_status(c: &mut Cursor) -> Result<(String, MailboxStatus), ImapError> {
    let raw = c.expect_astring()?;
    let name = mutf7::decode(&String::from_utf8_lossy(&raw));
    c.expect_lparen()?;
    let mut status = MailboxStatus::default();
    while !matches!(c.peek(), Some(Token::RParen)) {
        let key = c.expect_atom()?.to_ascii_uppercase();
        let value = c.expect_number()?;
        match key.as_str() {
            "MESSAGES" => status.messages = Some(value),
            "RECENT" => status.recent = Some(value),
            "UIDNEXT" => status.uid_next = Some(value),
            "UIDVALIDITY" => status.uid_validity = Some(value),
            "UNSEEN" => status.unseen = Some(value),
            _ => {}
        }
    }
    c.expect_rparen()?;
    Ok((name, status))
}

fn parse_fetch(num: u32, c: &mut Cursor) -> Result<Untagged, ImapError> {
    c.expect_lparen()?;
    let mut attrs = Vec::new();
    while !matches!(c.peek(), Some(Token::RParen)) {
        let name = c.expect_atom()?;
        match name.to_ascii_uppercase().as_str() {
            "UID" => attrs.push(FetchAttributeValue::Uid(c.expect_number()?)),
            "RFC822.SIZE" => attrs.push(FetchAttributeValue::Rfc822Size(c.expect_number()?)),
            "FLAGS" => attrs.push(FetchAttributeValue::Flags(parse_atom_list(c)?)),
            "INTERNALDATE" => {
                let raw = c.expect_nstring()?.unwrap_or_default();
                attrs.push(FetchAttributeValue::InternalDate(String::from_utf8_lossy(&raw).into_owned()));
            }
            "ENVELOPE" => attrs.push(FetchAttributeValue::Envelope(parse_envelope(c)?)),
            "BODYSTRUCTURE" => attrs.push(FetchAttributeValue::BodyStructure(parse_body_structure(c)?)),
            "RFC822" => {
                let data = c.expect_nstring()?.unwrap_or_default();
                attrs.push(FetchAttributeValue::Body(BodySection { section: None, origin: None, data }));
            }
            "RFC822.HEADER" => {
                let data = c.expect_nstring()?.unwrap_or_default();
                attrs.push(FetchAttributeValue::Header(data));
            }
            "RFC822.TEXT" => {
                let data = c.expect_nstring()?.unwrap_or_default();
                attrs.push(FetchAttributeValue::Text(data));
            }
            "BODY" if matches!(c.peek(), Some(Token::LBracket)) => {
                let section = parse_section(c)?;
                let origin = parse_partial_origin(c)?;
                let data = c.expect_nstring()?.unwrap_or_default();
                attrs.push(build_body_value(section, origin, data));
            }
            "BODY" => attrs.push(FetchAttributeValue::BodyStructure(parse_body_structure(c)?)),
            _ => skip_unknown_attribute_value(c)?,
        }
    }
    c.expect_rparen()?;
    Ok(Untagged::Fetch(num, attrs))
}

/// Unknown FETCH attribute: best-effort skip its value (atom, string, number,
/// or one balanced parenthesized/bracketed group) without failing the response.
fn skip_unknown_attribute_value(c: &mut Cursor) -> Result<(), ImapError> {
    match c.peek() {
        Some(Token::LParen) => skip_balanced(c, Token::LParen, Token::RParen),
        Some(Token::LBracket) => {
            skip_balanced(c, Token::LBracket, Token::RBracket)?;
            // a bracketed section may be followed by <origin> and a value
            let _ = parse_partial_origin(c)?;
            if matches!(c.peek(), Some(Token::QuotedString(_)) | Some(Token::Literal(_)) | Some(Token::Nil)) {
                c.next();
            }
            Ok(())
        }
        Some(_) => {
            c.next();
            Ok(())
        }
        None => Err(ImapError::ParsingError("unexpected end of FETCH response".into())),
    }
}

fn skip_balanced(c: &mut Cursor, open: Token, close: Token) -> Result<(), ImapError> {
    match c.next() {
        Some(t) if *t == open => {}
        other => return Err(ImapError::ParsingError(format!("expected opener, got {other:?}"))),
    }
    let mut depth = 1;
    while depth > 0 {
        match c.next() {
            Some(t) if *t == open => depth += 1,
            Some(t) if *t == close => depth -= 1,
            Some(_) => {}
            None => return Err(ImapError::ParsingError("unbalanced group in FETCH response".into())),
        }
    }
    Ok(())
}

enum SectionSpec {
    Header,
    HeaderFields(Vec<String>),
    HeaderFieldsNot(Vec<String>),
    Text,
    Other(String),
}

fn parse_section(c: &mut Cursor) -> Result<SectionSpec, ImapError> {
    match c.next() {
        Some(Token::LBracket) => {}
        other => return Err(ImapError::ParsingError(format!("expected '[', got {other:?}"))),
    }
    let spec = if matches!(c.peek(), Some(Token::RBracket)) {
        SectionSpec::Other(String::new())
    } else {
        let first = c.expect_atom()?;
        match first.to_ascii_uppercase().as_str() {
            "HEADER" => SectionSpec::Header,
            "HEADER.FIELDS" => SectionSpec::HeaderFields(parse_atom_list(c)?),
            "HEADER.FIELDS.NOT" => SectionSpec::HeaderFieldsNot(parse_atom_list(c)?),
            "TEXT" => SectionSpec::Text,
            _ => SectionSpec::Other(first),
        }
    };
    match c.next() {
        Some(Token::RBracket) => Ok(spec),
        other => Err(ImapError::ParsingError(format!("expected ']', got {other:?}"))),
    }
}

fn build_body_value(spec: SectionSpec, origin: Option<u32>, data: Vec<u8>) -> FetchAttributeValue {
    match spec {
        SectionSpec::Header => FetchAttributeValue::Header(data),
        SectionSpec::HeaderFields(names) => FetchAttributeValue::HeaderFields(names, data),
        SectionSpec::HeaderFieldsNot(names) => FetchAttributeValue::HeaderFieldsNot(names, data),
        SectionSpec::Text => FetchAttributeValue::Text(data),
        SectionSpec::Other(section) => FetchAttributeValue::Body(BodySection {
            section: (!section.is_empty()).then_some(section),
            origin,
            data,
        }),
    }
}

fn parse_partial_origin(c: &mut Cursor) -> Result<Option<u32>, ImapError> {
    if let Some(Token::Atom(s)) = c.peek() {
        if s.len() > 2 && s.starts_with('<') && s.ends_with('>') {
            if let Ok(n) = s[1..s.len() - 1].parse() {
                c.next();
                return Ok(Some(n));
            }
        }
    }
    Ok(None)
}

fn string_token(c: &mut Cursor) -> Result<String, ImapError> {
    match c.next() {
        Some(Token::QuotedString(b)) | Some(Token::Literal(b)) => Ok(String::from_utf8_lossy(b).into_owned()),
        Some(Token::Atom(s)) => Ok(s.clone()),
        other => Err(ImapError::ParsingError(format!("expected string, got {other:?}"))),
    }
}

fn nstring_to_string(v: Option<Vec<u8>>) -> Option<String> {
    v.map(|b| String::from_utf8_lossy(&b).into_owned())
}

fn parse_envelope(c: &mut Cursor) -> Result<Envelope, ImapError> {
    c.expect_lparen()?;
    let date = nstring_to_string(c.expect_nstring()?);
    let subject = nstring_to_string(c.expect_nstring()?);
    let from = parse_address_list(c)?;
    let sender = parse_address_list(c)?;
    let reply_to = parse_address_list(c)?;
    let to = parse_address_list(c)?;
    let cc = parse_address_list(c)?;
    let bcc = parse_address_list(c)?;
    let in_reply_to = nstring_to_string(c.expect_nstring()?);
    let message_id = nstring_to_string(c.expect_nstring()?);
    c.expect_rparen()?;
    Ok(Envelope { date, subject, from, sender, reply_to, to, cc, bcc, in_reply_to, message_id })
}

fn parse_address_list(c: &mut Cursor) -> Result<AddressList, ImapError> {
    if matches!(c.peek(), Some(Token::Nil)) {
        c.next();
        return Ok(AddressList::default());
    }
    c.expect_lparen()?;
    let mut entries = Vec::new();
    let mut current_group: Option<(String, Vec<Address>)> = None;
    while !matches!(c.peek(), Some(Token::RParen)) {
        let addr = parse_address(c)?;
        if addr.mailbox.is_none() && addr.host.is_none() {
            if let Some((name, members)) = current_group.take() {
                entries.push(AddressListEntry::Group { name, members });
            }
        } else if addr.host.is_none() {
            if let Some((name, members)) = current_group.take() {
                entries.push(AddressListEntry::Group { name, members });
            }
            current_group = Some((addr.mailbox.clone().unwrap_or_default(), Vec::new()));
        } else if let Some((_, members)) = current_group.as_mut() {
            members.push(addr);
        } else {
            entries.push(AddressListEntry::Mailbox(addr));
        }
    }
    if let Some((name, members)) = current_group.take() {
        entries.push(AddressListEntry::Group { name, members });
    }
    c.expect_rparen()?;
    Ok(AddressList { entries })
}

fn parse_address(c: &mut Cursor) -> Result<Address, ImapError> {
    c.expect_lparen()?;
    let name_raw = c.expect_nstring()?;
    let adl_raw = c.expect_nstring()?;
    let mailbox_raw = c.expect_nstring()?;
    let host_raw = c.expect_nstring()?;
    c.expect_rparen()?;
    Ok(Address {
        name: name_raw.as_ref().map(|b| String::from_utf8_lossy(b).into_owned()),
        name_raw,
        adl: adl_raw.as_ref().map(|b| String::from_utf8_lossy(b).into_owned()),
        adl_raw,
        mailbox: mailbox_raw.as_ref().map(|b| String::from_utf8_lossy(b).into_owned()),
        mailbox_raw,
        host: host_raw.as_ref().map(|b| String::from_utf8_lossy(b).into_owned()),
        host_raw,
    })
}

fn parse_param_list(c: &mut Cursor) -> Result<Vec<(String, String)>, ImapError> {
    if matches!(c.peek(), Some(Token::Nil)) {
        c.next();
        return Ok(Vec::new());
    }
    c.expect_lparen()?;
    let mut out = Vec::new();
    while !matches!(c.peek(), Some(Token::RParen)) {
        let key = string_token(c)?;
        let value = string_token(c)?;
        out.push((key, value));
    }
    c.expect_rparen()?;
    Ok(out)
}

fn parse_disposition(c: &mut Cursor) -> Result<Option<Disposition>, ImapError> {
    if matches!(c.peek(), Some(Token::Nil)) {
        c.next();
        return Ok(None);
    }
    c.expect_lparen()?;
    let kind = string_token(c)?;
    let params = parse_param_list(c)?;
    c.expect_rparen()?;
    Ok(Some(Disposition { kind, params }))
}

fn parse_language(c: &mut Cursor) -> Result<Vec<String>, ImapError> {
    match c.peek() {
        Some(Token::Nil) => {
            c.next();
            Ok(Vec::new())
        }
        Some(Token::LParen) => {
            c.next();
            let mut out = Vec::new();
            while !matches!(c.peek(), Some(Token::RParen)) {
                out.push(string_token(c)?);
            }
            c.expect_rparen()?;
            Ok(out)
        }
        _ => Ok(vec![string_token(c)?]),
    }
}

fn parse_single_part_extension(c: &mut Cursor, fields: &mut BasicFields) -> Result<(), ImapError> {
    if matches!(c.peek(), Some(Token::RParen)) {
        return Ok(());
    }
    fields.md5 = nstring_to_string(c.expect_nstring()?);
    if matches!(c.peek(), Some(Token::RParen)) {
        return Ok(());
    }
    fields.disposition = parse_disposition(c)?;
    if matches!(c.peek(), Some(Token::RParen)) {
        return Ok(());
    }
    fields.language = parse_language(c)?;
    if matches!(c.peek(), Some(Token::RParen)) {
        return Ok(());
    }
    fields.location = nstring_to_string(c.expect_nstring()?);
    skip_remaining_extension(c)
}

fn parse_multipart_extension(
    c: &mut Cursor,
) -> Result<(Vec<(String, String)>, Option<Disposition>, Vec<String>, Option<String>), ImapError> {
    if matches!(c.peek(), Some(Token::RParen)) {
        return Ok((Vec::new(), None, Vec::new(), None));
    }
    let params = parse_param_list(c)?;
    if matches!(c.peek(), Some(Token::RParen)) {
        return Ok((params, None, Vec::new(), None));
    }
    let disposition = parse_disposition(c)?;
    if matches!(c.peek(), Some(Token::RParen)) {
        return Ok((params, disposition, Vec::new(), None));
    }
    let language = parse_language(c)?;
    if matches!(c.peek(), Some(Token::RParen)) {
        return Ok((params, disposition, language, None));
    }
    let location = nstring_to_string(c.expect_nstring()?);
    skip_remaining_extension(c)?;
    Ok((params, disposition, language, location))
}

fn skip_remaining_extension(c: &mut Cursor) -> Result<(), ImapError> {
    let mut depth = 0;
    loop {
        match c.peek() {
            Some(Token::RParen) if depth == 0 => return Ok(()),
            Some(Token::LParen) => {
                depth += 1;
                c.next();
            }
            Some(Token::RParen) => {
                depth -= 1;
                c.next();
            }
            Some(_) => {
                c.next();
            }
            None => return Err(ImapError::ParsingError("unexpected end of body extension data".into())),
        }
    }
}

fn parse_body_structure(c: &mut Cursor) -> Result<BodyStructure, ImapError> {
    c.expect_lparen()?;
    if matches!(c.peek(), Some(Token::LParen)) {
        let mut parts = Vec::new();
        while matches!(c.peek(), Some(Token::LParen)) {
            parts.push(parse_body_structure(c)?);
        }
        let subtype = string_token(c)?;
        let (params, disposition, language, location) = parse_multipart_extension(c)?;
        c.expect_rparen()?;
        return Ok(BodyStructure::Multipart { parts, subtype, params, disposition, language, location });
    }

    let type_ = string_token(c)?;
    let subtype = string_token(c)?;
    let params = parse_param_list(c)?;
    let id = nstring_to_string(c.expect_nstring()?);
    let description = nstring_to_string(c.expect_nstring()?);
    let encoding = string_token(c)?;
    let size = c.expect_number()?;
    let mut fields = BasicFields {
        type_: type_.clone(),
        subtype: subtype.clone(),
        params,
        id,
        description,
        encoding,
        size,
        md5: None,
        disposition: None,
        language: Vec::new(),
        location: None,
    };

    if type_.eq_ignore_ascii_case("message") && subtype.eq_ignore_ascii_case("rfc822") {
        let envelope = Box::new(parse_envelope(c)?);
        let body = Box::new(parse_body_structure(c)?);
        let lines = c.expect_number()?;
        parse_single_part_extension(c, &mut fields)?;
        c.expect_rparen()?;
        return Ok(BodyStructure::Message { fields, envelope, body, lines });
    }
    if type_.eq_ignore_ascii_case("text") {
        let lines = c.expect_number()?;
        parse_single_part_extension(c, &mut fields)?;
        c.expect_rparen()?;
        return Ok(BodyStructure::Text { fields, lines });
    }
    parse_single_part_extension(c, &mut fields)?;
    c.expect_rparen()?;
    Ok(BodyStructure::Basic { fields })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tokenize::tokenize;
    use crate::types::{AddressListEntry, Response};

    fn parse_line(line: &[u8]) -> Response {
        let segments = vec![super::super::tokenize::LineSegment::Bytes(line.to_vec())];
        let tokens = tokenize(&segments).unwrap();
        parse(&tokens).unwrap()
    }

    #[test]
    fn parses_list_entry_with_quoted_delimiter_and_bare_name() {
        let resp = parse_line(br#"* LIST (\HasNoChildren) "/" INBOX"#);
        match resp {
            Response::Untagged(Untagged::List(entry)) => {
                assert_eq!(entry.attributes, vec!["\\HasNoChildren"]);
                assert_eq!(entry.delimiter, Some('/'));
                assert_eq!(entry.name, "INBOX");
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn parses_search_response_numbers() {
        let resp = parse_line(b"* SEARCH 1 2 3 42");
        assert_eq!(resp, Response::Untagged(Untagged::Search(vec![1, 2, 3, 42])));
    }

    #[test]
    fn parses_status_response_fields() {
        let resp = parse_line(br#"* STATUS "INBOX" (MESSAGES 17 UIDNEXT 5112 UNSEEN 2)"#);
        match resp {
            Response::Untagged(Untagged::MailboxStatus(name, status)) => {
                assert_eq!(name, "INBOX");
                assert_eq!(status.messages, Some(17));
                assert_eq!(status.uid_next, Some(5112));
                assert_eq!(status.unseen, Some(2));
                assert_eq!(status.recent, None);
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn parses_tagged_no_with_trycreate_code_and_text() {
        let resp = parse_line(b"A003 NO [TRYCREATE] mailbox does not exist");
        match resp {
            Response::Tagged { tag, status, code, text } => {
                assert_eq!(tag, "A003");
                assert_eq!(status, Status::No);
                assert_eq!(code, Some(ResponseCode::TryCreate));
                assert_eq!(text.as_deref(), Some("mailbox does not exist"));
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn parses_envelope_with_grouped_address_list() {
        let line = br#"* 1 FETCH (ENVELOPE ("Mon, 1 Jan 2024 00:00:00 +0000" "hi" (("A" NIL "a" "x.com")) (("A" NIL "a" "x.com")) NIL ((NIL NIL "grp" NIL)("B" NIL "b" "x.com")(NIL NIL NIL NIL)) NIL NIL NIL "<id@x>"))"#;
        let resp = parse_line(line);
        match resp {
            Response::Untagged(Untagged::Fetch(num, attrs)) => {
                assert_eq!(num, 1);
                match &attrs[0] {
                    FetchAttributeValue::Envelope(env) => {
                        assert_eq!(env.subject.as_deref(), Some("hi"));
                        assert_eq!(env.message_id.as_deref(), Some("<id@x>"));
                        assert_eq!(env.to.entries.len(), 1);
                        match &env.to.entries[0] {
                            AddressListEntry::Group { name, members } => {
                                assert_eq!(name, "grp");
                                assert_eq!(members.len(), 1);
                                assert_eq!(members[0].mailbox.as_deref(), Some("b"));
                            }
                            other => panic!("unexpected entry {other:?}"),
                        }
                    }
                    other => panic!("unexpected attribute {other:?}"),
                }
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn parses_multipart_bodystructure() {
        let line = br#"* 1 FETCH (BODYSTRUCTURE (("TEXT" "PLAIN" ("CHARSET" "us-ascii") NIL NIL "7BIT" 12 1)("TEXT" "HTML" ("CHARSET" "us-ascii") NIL NIL "7BIT" 20 2) "ALTERNATIVE"))"#;
        let resp = parse_line(line);
        match resp {
            Response::Untagged(Untagged::Fetch(_, attrs)) => match &attrs[0] {
                FetchAttributeValue::BodyStructure(BodyStructure::Multipart { parts, subtype, .. }) => {
                    assert_eq!(subtype, "ALTERNATIVE");
                    assert_eq!(parts.len(), 2);
                    match &parts[0] {
                        BodyStructure::Text { fields, lines } => {
                            assert_eq!(fields.subtype, "PLAIN");
                            assert_eq!(*lines, 1);
                        }
                        other => panic!("unexpected part {other:?}"),
                    }
                }
                other => panic!("unexpected attribute {other:?}"),
            },
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn parses_body_section_with_partial_origin() {
        let segments = vec![
            super::super::tokenize::LineSegment::Bytes(b"* 4 FETCH (BODY[TEXT]<0> ".to_vec()),
            super::super::tokenize::LineSegment::Literal(b"Hello".to_vec()),
            super::super::tokenize::LineSegment::Bytes(b")".to_vec()),
        ];
        let tokens = tokenize(&segments).unwrap();
        let resp = parse(&tokens).unwrap();
        match resp {
            Response::Untagged(Untagged::Fetch(num, attrs)) => {
                assert_eq!(num, 4);
                match &attrs[0] {
                    FetchAttributeValue::Text(data) => assert_eq!(data, b"Hello"),
                    other => panic!("unexpected attribute {other:?}"),
                }
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn tolerates_unknown_fetch_attribute() {
        let resp = parse_line(b"* 5 FETCH (X-CUSTOM 123 UID 9)");
        match resp {
            Response::Untagged(Untagged::Fetch(num, attrs)) => {
                assert_eq!(num, 5);
                assert_eq!(attrs, vec![FetchAttributeValue::Uid(9)]);
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn legacy_rfc822_alias_maps_to_body_section() {
        let resp = parse_line(b"* 6 FETCH (RFC822.TEXT \"hi there\")");
        match resp {
            Response::Untagged(Untagged::Fetch(_, attrs)) => {
                assert_eq!(attrs, vec![FetchAttributeValue::Text(b"hi there".to_vec())]);
            }
            other => panic!("unexpected response {other:?}"),
        }
    }
}
