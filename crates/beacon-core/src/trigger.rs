//! Trigger payload parsing.
//!
//! A trigger payload is `prefix`, optional whitespace, then a signed integer,
//! e.g. `end=5`, `END= -3`. The prefix match is case-insensitive and runs
//! against the trimmed text. Anything else is "no match", never an error.

/// Extract the integer from a trigger payload.
///
/// Returns `None` when either input is absent or empty, when the trimmed
/// text does not start with `prefix` (ignoring case), when no digits follow
/// the prefix, or when the digits do not fit in an `i64`.
pub fn parse_trigger(text: Option<&str>, prefix: Option<&str>) -> Option<i64> {
    let text = text?.trim();
    let prefix = prefix?;
    if text.is_empty() || prefix.is_empty() {
        return None;
    }
    let rest = strip_prefix_ignore_case(text, prefix)?;
    leading_integer(rest.trim_start())
}

/// Case-insensitive `str::strip_prefix`, compared char by char so that
/// non-ASCII case folding never splits a code point.
fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let mut chars = text.char_indices();
    for p in prefix.chars() {
        let (_, t) = chars.next()?;
        if !t.to_lowercase().eq(p.to_lowercase()) {
            return None;
        }
    }
    Some(&text[chars.offset()..])
}

/// Longest `[+-]?[0-9]+` match at the start of `s`.
fn leading_integer(s: &str) -> Option<i64> {
    let bytes = s.as_bytes();
    let sign_len = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let digits = bytes[sign_len..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return None;
    }
    s[..sign_len + digits].parse().ok()
}
