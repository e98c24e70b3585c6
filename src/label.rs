//! Reply-type vocabulary and the documentation-phrase matcher.

/// A Redis reply shape, rendered as the alias used in `redis/typing.py`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyLabel {
    Array,
    Ok,
    Integer,
    Null,
    BulkString,
    SimpleString,
    Any,
}

impl ReplyLabel {
    pub fn type_name(self) -> &'static str {
        match self {
            ReplyLabel::Array => "ArrayResponseT",
            ReplyLabel::Ok => "OKT",
            ReplyLabel::Integer => "IntegerResponseT",
            ReplyLabel::Null => "NullResponseT",
            ReplyLabel::BulkString => "BulkStringResponseT",
            ReplyLabel::SimpleString => "str",
            ReplyLabel::Any => "Any",
        }
    }
}

impl std::fmt::Display for ReplyLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelMatch {
    Label(ReplyLabel),
    Unrecognized(String),
}

/// Phrase prefixes checked top to bottom; the first hit wins, so the `OK`
/// forms must stay ahead of the plain simple-string entry.
const PHRASES: &[(&str, ReplyLabel)] = &[
    ("Array reply", ReplyLabel::Array),
    ("Simple string reply: OK", ReplyLabel::Ok),
    ("Simple string reply:OK", ReplyLabel::Ok),
    ("Integer reply", ReplyLabel::Integer),
    ("Nil reply", ReplyLabel::Null),
    ("Null reply", ReplyLabel::Null),
    ("Bulk string reply", ReplyLabel::BulkString),
    ("Simple string reply", ReplyLabel::SimpleString),
];

pub fn match_reply_phrase(text: &str) -> LabelMatch {
    let text = text.trim_start();
    PHRASES
        .iter()
        .find(|(prefix, _)| text.starts_with(prefix))
        .map(|(_, label)| LabelMatch::Label(*label))
        .unwrap_or_else(|| LabelMatch::Unrecognized(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_takes_precedence_over_simple_string() {
        assert_eq!(
            match_reply_phrase("Simple string reply: OK."),
            LabelMatch::Label(ReplyLabel::Ok)
        );
        assert_eq!(
            match_reply_phrase("Simple string reply:OK"),
            LabelMatch::Label(ReplyLabel::Ok)
        );
        assert_eq!(
            match_reply_phrase("Simple string reply: PONG"),
            LabelMatch::Label(ReplyLabel::SimpleString)
        );
    }

    #[test]
    fn every_phrase_has_a_label() {
        let cases = [
            ("Array reply: a list of members", ReplyLabel::Array),
            ("Integer reply: the length", ReplyLabel::Integer),
            ("Nil reply: if the key does not exist", ReplyLabel::Null),
            ("Null reply: key missing", ReplyLabel::Null),
            ("Bulk string reply: the value", ReplyLabel::BulkString),
        ];
        for (text, label) in cases {
            assert_eq!(match_reply_phrase(text), LabelMatch::Label(label), "{text}");
        }
    }

    #[test]
    fn leading_whitespace_is_ignored() {
        assert_eq!(
            match_reply_phrase("\n  Integer reply"),
            LabelMatch::Label(ReplyLabel::Integer)
        );
    }

    #[test]
    fn unknown_phrase_is_unrecognized() {
        assert_eq!(
            match_reply_phrase("Map reply: field-value pairs"),
            LabelMatch::Unrecognized("Map reply: field-value pairs".to_string())
        );
    }
}
