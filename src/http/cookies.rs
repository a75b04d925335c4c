//! `Set-Cookie` response header parsing.

use std::collections::HashMap;

use reqwest::header::{HeaderMap, SET_COOKIE};

/// Extract a name → value map from every `Set-Cookie` header.
///
/// A header contributes the token before its first `=` and the value up to
/// the first `;` or whitespace; attributes (`Path`, `Expires`, ...) are
/// dropped. Fragments that do not match are skipped. When several headers
/// set the same name, the last one in header order wins.
pub fn parse_set_cookie(headers: &HeaderMap) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for value in headers.get_all(SET_COOKIE) {
        let Ok(raw) = value.to_str() else {
            continue;
        };
        if let Some((name, value)) = parse_pair(raw) {
            cookies.insert(name.to_string(), value.to_string());
        }
    }
    cookies
}

fn parse_pair(raw: &str) -> Option<(&str, &str)> {
    let (name, rest) = raw.split_once('=')?;
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    let end = rest
        .find(|c: char| c == ';' || c.is_whitespace())
        .unwrap_or(rest.len());
    Some((name, &rest[..end]))
}
