use std::sync::LazyLock;

use regex::Regex;

/// Name used when a bracketed address has no display name in front of it.
pub const UNKNOWN_NAME: &str = "Unknown";

static NAME_ADDR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.*)<(.*)>").expect("sender pattern compiles"));

/// Turns a `From` header value into `"Name | address"`.
///
/// `"Jane Doe" <jane@x.com>` gives `Jane Doe | jane@x.com`; a value without
/// angle brackets is used verbatim on both sides.
pub fn parse_sender(raw: &str) -> String {
    let Some(caps) = NAME_ADDR.captures(raw) else {
        return format!("{raw} | {raw}");
    };

    let name = unquote(caps[1].trim());
    let name = if name.is_empty() { UNKNOWN_NAME } else { name };
    let address = caps[2].trim();

    format!("{name} | {address}")
}

/// Removes one pair of surrounding double quotes; a lone quote on either
/// side is left in place.
fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(s)
}
