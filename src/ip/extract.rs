use std::borrow::Cow;
use std::net::Ipv4Addr;
use std::sync::OnceLock;

use regex::Regex;

/// One octet in canonical form, 0-255 without leading zeros.
const OCTET: &str = r"(?:25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9]?[0-9])";

fn ipv4_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let quad = format!(r"{o}\.{o}\.{o}\.{o}", o = OCTET);
        // The address must not be glued to other digits, so "300.1.2.3" is
        // skipped instead of yielding "00.1.2.3".
        Regex::new(&format!(r"(?:^|[^0-9])({quad})(?:[^0-9]|$)"))
            .expect("IPv4 pattern is valid")
    })
}

/// Returns the leftmost valid dotted-quad address found anywhere in `text`.
pub fn extract_ipv4(text: &str) -> Option<Ipv4Addr> {
    ipv4_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Decodes a response body as UTF-8, falling back to Latin-1.
pub fn decode_body(body: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(body) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(body.iter().map(|&b| char::from(b)).collect()),
    }
}
