//! Content-encoding validation.
//!
//! A response may only use encodings the request advertised in
//! `Accept-Encoding` (HTTP/1.1 RFC 7231 §5.3.4). Mirrors
//! `HttpUtil::ParseAcceptEncoding` / `ParseContentEncoding`.

use std::collections::BTreeSet;

use super::responseheaders::HttpResponseHeaders;

const LWS: [char; 2] = [' ', '\t'];

/// Decoders the stack knows how to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    Brotli,
    Deflate,
    Gzip,
    Zstd,
    Unknown,
}

impl SourceType {
    pub fn parse(encoding: &str) -> Self {
        match encoding.to_ascii_lowercase().as_str() {
            "br" => SourceType::Brotli,
            "deflate" => SourceType::Deflate,
            "gzip" | "x-gzip" => SourceType::Gzip,
            "zstd" => SourceType::Zstd,
            _ => SourceType::Unknown,
        }
    }
}

fn trim_lws(s: &str) -> &str {
    s.trim_matches(LWS)
}

/// Parse an `Accept-Encoding` value into the set of allowed codings.
///
/// Returns `None` for malformed values. A value that allows nothing yields
/// `{"*"}`; otherwise `identity` is always allowed and the `gzip`/`compress`
/// aliases are mirrored.
pub fn parse_accept_encoding(accept_encoding: &str) -> Option<BTreeSet<String>> {
    if accept_encoding.contains('"') {
        return None;
    }

    let mut allowed = BTreeSet::new();
    for entry in accept_encoding.split(',') {
        let entry = trim_lws(entry);
        if entry.is_empty() {
            continue;
        }
        let Some((encoding, params)) = entry.split_once(';') else {
            if entry.contains(LWS) {
                return None;
            }
            allowed.insert(entry.to_ascii_lowercase());
            continue;
        };

        let encoding = trim_lws(encoding);
        if encoding.contains(LWS) {
            return None;
        }
        let (name, qvalue) = trim_lws(params).split_once('=')?;
        if !trim_lws(name).eq_ignore_ascii_case("q") {
            return None;
        }
        let qvalue = trim_lws(qvalue);
        match qvalue.as_bytes().first().copied()? {
            b'1' => {
                if "1.000".starts_with(qvalue) {
                    allowed.insert(encoding.to_ascii_lowercase());
                    continue;
                }
                return None;
            }
            b'0' => {}
            _ => return None,
        }
        if qvalue.len() == 1 {
            continue;
        }
        if qvalue.len() <= 2 || qvalue.len() > 5 || qvalue.as_bytes()[1] != b'.' {
            return None;
        }
        let fraction = &qvalue[2..];
        if !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if fraction.bytes().any(|b| b != b'0') {
            allowed.insert(encoding.to_ascii_lowercase());
        }
    }

    if allowed.is_empty() {
        allowed.insert("*".to_string());
        return Some(allowed);
    }

    allowed.insert("identity".to_string());
    for (a, b) in [("gzip", "x-gzip"), ("compress", "x-compress")] {
        if allowed.contains(a) || allowed.contains(b) {
            allowed.insert(a.to_string());
            allowed.insert(b.to_string());
        }
    }
    Some(allowed)
}

/// Parse a `Content-Encoding` value into the set of codings used.
pub fn parse_content_encoding(content_encoding: &str) -> Option<BTreeSet<String>> {
    if content_encoding.contains(['"', '=', ';', '*']) {
        return None;
    }
    let mut used = BTreeSet::new();
    for encoding in content_encoding.split(',') {
        let encoding = trim_lws(encoding);
        if encoding.contains(LWS) {
            return None;
        }
        used.insert(encoding.to_ascii_lowercase());
    }
    Some(used)
}

/// Whether `headers` only uses codings allowed by the request's
/// `Accept-Encoding` (`None` or empty means anything goes).
///
/// Unknown codings are passed through for the caller to reject. Redirects
/// are never rejected on this basis since their bodies are not consumed.
pub fn content_encodings_valid(
    accept_encoding: Option<&str>,
    headers: &HttpResponseHeaders,
) -> bool {
    let Some(allowed) = parse_accept_encoding(accept_encoding.unwrap_or_default()) else {
        return false;
    };
    let content_encoding = headers
        .get_normalized_header("content-encoding")
        .unwrap_or_default();
    let Some(used) = parse_content_encoding(&content_encoding) else {
        return false;
    };

    if allowed.contains("*") {
        return true;
    }
    if headers.is_redirect().is_some() {
        return true;
    }

    used.iter().all(|encoding| {
        SourceType::parse(encoding) == SourceType::Unknown || allowed.contains(encoding)
    })
}
