//! Key naming convention.
//!
//! Keys are dot-separated segments. Two segment shapes carry meaning:
//! * `{id}` – one entity out of a collection, addressed by an arbitrary id
//!   (everything between the braces, no escaping).
//! * `[n]` – one element of an array, `n` being a non-negative decimal index.
//!
//! The repository never validates keys against this grammar; it is only
//! interpreted by the helpers here and by the search operations.

pub const SEPARATOR: char = '.';
/// Suffix marking "the array under this key", as in `orders.[]`.
pub const ARRAY_MARKER: &str = ".[]";
/// Placeholder for "the next element" inside an array key template, as in `orders.[].qty`.
pub const ARRAY_TEMPLATE: &str = "[].";

/// `base.{id}`, followed by a dot when `trailing_dot` is set.
pub fn append_entity_segment(base: &str, id: &str, trailing_dot: bool) -> String {
    let mut key = format!("{}.{{{}}}", base, id);
    if trailing_dot {
        key.push(SEPARATOR);
    }
    key
}

/// `base.[index]`, followed by a dot when `trailing_dot` is set.
pub fn append_array_segment(base: &str, index: usize, trailing_dot: bool) -> String {
    let mut key = format!("{}.[{}]", base, index);
    if trailing_dot {
        key.push(SEPARATOR);
    }
    key
}

/// Child key `base.member`, or just `member` at the top level.
pub fn join(base: &str, member: &str) -> String {
    if base.is_empty() {
        member.to_string()
    } else {
        format!("{}{}{}", base, SEPARATOR, member)
    }
}

pub fn segments(key: &str) -> impl Iterator<Item = &str> {
    key.split(SEPARATOR)
}

/// The id of an entity segment such as `{A1}`.
pub fn entity_id(segment: &str) -> Option<&str> {
    segment.strip_prefix('{')?.strip_suffix('}')
}

/// The index of an array segment such as `[3]`.
pub fn array_index(segment: &str) -> Option<u64> {
    segment
        .strip_prefix('[')?
        .strip_suffix(']')
        .and_then(parse_index)
}

/// Decimal digits only, no sign and no whitespace.
pub(crate) fn parse_index(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Splits `rest` into the index of a leading `[n]` and what follows it.
pub(crate) fn leading_array_index(rest: &str) -> Option<(u64, &str)> {
    let inner = rest.strip_prefix('[')?;
    let close = inner.find(']')?;
    let index = parse_index(&inner[..close])?;
    Some((index, &inner[close + 1..]))
}
