//! Lexical checks on names and text
//!
//! Grammars name elements and attributes with QNames in `name` attributes and
//! `<name>` elements; instance text is tested for whitespace and normalized
//! for `token` comparisons.

use once_cell::sync::Lazy;
use regex::Regex;

static NCNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z_a-z\u{C0}-\u{D6}\u{D8}-\u{F6}\u{F8}-\u{2FF}\u{370}-\u{37D}\u{37F}-\u{1FFF}][A-Z_a-z\u{C0}-\u{D6}\u{D8}-\u{F6}\u{F8}-\u{2FF}\u{370}-\u{37D}\u{37F}-\u{1FFF}\-\.0-9\u{B7}]*$")
        .expect("NCName pattern is valid")
});

static WHITESPACE_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t\r\n]*$").expect("whitespace pattern is valid"));

/// True for a name without a colon that XML allows as an element name
pub fn is_valid_ncname(name: &str) -> bool {
    NCNAME.is_match(name)
}

/// True for `local` or `prefix:local` where both parts are NCNames
pub fn is_valid_qname(name: &str) -> bool {
    match name.split_once(':') {
        Some((prefix, local)) => is_valid_ncname(prefix) && is_valid_ncname(local),
        None => is_valid_ncname(name),
    }
}

/// Split at the first colon; unprefixed names yield `None`
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    }
}

/// True for the empty string and strings made only of XML whitespace
pub fn is_whitespace(text: &str) -> bool {
    WHITESPACE_ONLY.is_match(text)
}

/// Collapse whitespace runs and trim, as the `token` datatype does
pub fn normalize_token(text: &str) -> String {
    text.split(is_xml_space)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// XML's four whitespace characters; Unicode spaces such as U+00A0 are content
pub fn is_xml_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}
