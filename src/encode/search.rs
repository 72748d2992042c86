//! SEARCH criteria rendering: the recursive `SearchKey` tree flattened to the
//! juxtaposed-AND / prefixed-OR / prefixed-NOT grammar RFC 3501 uses.

use super::Builder;
use crate::command::SearchKey;

pub(super) fn render(b: &mut Builder, key: &SearchKey, literal_plus: bool) {
    match key {
        SearchKey::All => {
            b.text("ALL");
        }
        SearchKey::Answered => {
            b.text("ANSWERED");
        }
        SearchKey::Deleted => {
            b.text("DELETED");
        }
        SearchKey::Draft => {
            b.text("DRAFT");
        }
        SearchKey::Flagged => {
            b.text("FLAGGED");
        }
        SearchKey::New => {
            b.text("NEW");
        }
        SearchKey::Old => {
            b.text("OLD");
        }
        SearchKey::Recent => {
            b.text("RECENT");
        }
        SearchKey::Seen => {
            b.text("SEEN");
        }
        SearchKey::Unanswered => {
            b.text("UNANSWERED");
        }
        SearchKey::Undeleted => {
            b.text("UNDELETED");
        }
        SearchKey::Undraft => {
            b.text("UNDRAFT");
        }
        SearchKey::Unflagged => {
            b.text("UNFLAGGED");
        }
        SearchKey::Unseen => {
            b.text("UNSEEN");
        }
        SearchKey::Bcc(v) => keyword_arg(b, "BCC", v, literal_plus),
        SearchKey::Cc(v) => keyword_arg(b, "CC", v, literal_plus),
        SearchKey::From(v) => keyword_arg(b, "FROM", v, literal_plus),
        SearchKey::Subject(v) => keyword_arg(b, "SUBJECT", v, literal_plus),
        SearchKey::Text(v) => keyword_arg(b, "TEXT", v, literal_plus),
        SearchKey::To(v) => keyword_arg(b, "TO", v, literal_plus),
        SearchKey::Body(v) => keyword_arg(b, "BODY", v, literal_plus),
        SearchKey::Keyword(v) => {
            b.text("KEYWORD").space().text(v.clone());
        }
        SearchKey::Unkeyword(v) => {
            b.text("UNKEYWORD").space().text(v.clone());
        }
        SearchKey::Header(field, v) => {
            b.text("HEADER")
                .space()
                .arg(field.as_bytes(), false, literal_plus)
                .space()
                .arg(v.as_bytes(), false, literal_plus);
        }
        SearchKey::Before(d) => date_arg(b, "BEFORE", *d),
        SearchKey::On(d) => date_arg(b, "ON", *d),
        SearchKey::Since(d) => date_arg(b, "SINCE", *d),
        SearchKey::SentBefore(d) => date_arg(b, "SENTBEFORE", *d),
        SearchKey::SentOn(d) => date_arg(b, "SENTON", *d),
        SearchKey::SentSince(d) => date_arg(b, "SENTSINCE", *d),
        SearchKey::Larger(n) => {
            b.text("LARGER").space().text(n.to_string());
        }
        SearchKey::Smaller(n) => {
            b.text("SMALLER").space().text(n.to_string());
        }
        SearchKey::Uid(set) => {
            b.text("UID").space().text(set.to_wire_string());
        }
        SearchKey::SequenceSet(set) => {
            b.text(set.to_wire_string());
        }
        SearchKey::And(keys) => {
            for (i, k) in keys.iter().enumerate() {
                if i > 0 {
                    b.space();
                }
                render(b, k, literal_plus);
            }
        }
        SearchKey::Or(a, c) => {
            b.text("OR").space();
            render(b, a, literal_plus);
            b.space();
            render(b, c, literal_plus);
        }
        SearchKey::Not(k) => {
            b.text("NOT").space();
            render(b, k, literal_plus);
        }
    }
}

fn keyword_arg(b: &mut Builder, keyword: &str, value: &str, literal_plus: bool) {
    b.text(keyword).space().arg(value.as_bytes(), false, literal_plus);
}

fn date_arg(b: &mut Builder, keyword: &str, date: chrono::NaiveDate) {
    b.text(keyword).space().text(super::quote(&super::imap_date(date)));
}
