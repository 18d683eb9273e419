//! Parsed response headers.
//!
//! Based on Chromium's `HttpResponseHeaders`: the status line is normalized
//! to one of HTTP/0.9, 1.0, 1.1 or 2.0, header names keep their original
//! casing, and lookups are case-insensitive.

use crate::base::neterror::NetError;
use http::StatusCode;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HttpVersion {
    major: u16,
    minor: u16,
}

impl HttpVersion {
    pub const HTTP_0_9: HttpVersion = HttpVersion::new(0, 9);
    pub const HTTP_1_0: HttpVersion = HttpVersion::new(1, 0);
    pub const HTTP_1_1: HttpVersion = HttpVersion::new(1, 1);
    pub const HTTP_2_0: HttpVersion = HttpVersion::new(2, 0);

    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    pub fn major(&self) -> u16 {
        self.major
    }

    pub fn minor(&self) -> u16 {
        self.minor
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpResponseHeaders {
    version: HttpVersion,
    /// Zero for the empty placeholder left behind by an interim response.
    response_code: u16,
    status_text: String,
    headers: Vec<(String, String)>,
}

impl HttpResponseHeaders {
    pub fn new(version: HttpVersion, response_code: u16) -> Self {
        let status_text = StatusCode::from_u16(response_code)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string();
        Self {
            version,
            response_code,
            status_text,
            headers: Vec::new(),
        }
    }

    /// Headers with no status line, used to overwrite interim responses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builder-style header append.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers
            .push((name.trim().to_string(), value.trim().to_string()));
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// Parse a raw header block (`HTTP/1.1 200 OK\r\nName: value\r\n\r\n`).
    pub fn parse(raw: &str) -> Result<Self, NetError> {
        let mut lines = raw.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));
        let status_line = lines.next().ok_or(NetError::InvalidResponse)?;

        let mut headers: Vec<(String, String)> = Vec::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            if line.starts_with([' ', '\t']) {
                // obs-fold continuation
                if let Some((_, value)) = headers.last_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            if name.is_empty() || name.contains([' ', '\t']) {
                continue;
            }
            headers.push((name.to_string(), value.trim().to_string()));
        }

        let (version, response_code, status_text) =
            Self::parse_status_line(status_line, !headers.is_empty());
        Ok(Self {
            version,
            response_code,
            status_text,
            headers,
        })
    }

    fn parse_version(line: &str) -> Option<HttpVersion> {
        let rest = line
            .get(..4)
            .filter(|p| p.eq_ignore_ascii_case("http"))
            .map(|_| &line[4..])?;
        let rest = rest.strip_prefix('/')?;
        let bytes = rest.as_bytes();
        let dot = rest.find('.')?;
        let major = *bytes.first()?;
        let minor = *bytes.get(dot + 1)?;
        if !major.is_ascii_digit() || !minor.is_ascii_digit() {
            return None;
        }
        Some(HttpVersion::new(
            u16::from(major - b'0'),
            u16::from(minor - b'0'),
        ))
    }

    fn parse_status_line(line: &str, has_headers: bool) -> (HttpVersion, u16, String) {
        let parsed = Self::parse_version(line);
        let version = match parsed {
            Some(v) if v == HttpVersion::HTTP_0_9 && !has_headers => HttpVersion::HTTP_0_9,
            Some(v) if v == HttpVersion::HTTP_2_0 => HttpVersion::HTTP_2_0,
            Some(v) if v >= HttpVersion::HTTP_1_1 => HttpVersion::HTTP_1_1,
            _ => HttpVersion::HTTP_1_0,
        };

        let Some((_, status)) = line.split_once(' ') else {
            return (version, 200, "OK".to_string());
        };
        let status = status.trim_start();
        let digits: String = status.chars().take_while(|c| c.is_ascii_digit()).collect();
        let code = digits.parse::<u16>().unwrap_or(200);
        let text = status[digits.len()..].trim().to_string();
        (version, code, text)
    }

    pub fn response_code(&self) -> u16 {
        self.response_code
    }

    pub fn http_version(&self) -> HttpVersion {
        self.version
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn status_line(&self) -> String {
        if self.status_text.is_empty() {
            format!("{} {}", self.version, self.response_code)
        } else {
            format!("{} {} {}", self.version, self.response_code, self.status_text)
        }
    }

    /// Each line's value for `name`, in order.
    pub fn enumerate_header<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values of `name` joined with ", ".
    pub fn get_normalized_header(&self, name: &str) -> Option<String> {
        let values: Vec<&str> = self.enumerate_header(name).collect();
        if values.is_empty() {
            None
        } else {
            Some(values.join(", "))
        }
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.enumerate_header(name).next().is_some()
    }

    /// Whether any comma-separated value of `name` equals `value` (ASCII case-insensitive).
    pub fn has_header_value(&self, name: &str, value: &str) -> bool {
        self.enumerate_header(name)
            .flat_map(|v| v.split(','))
            .any(|v| v.trim().eq_ignore_ascii_case(value))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn is_redirect_response_code(code: u16) -> bool {
        matches!(code, 301 | 302 | 303 | 307 | 308)
    }

    /// The redirect target, if this is a redirect with a non-empty Location.
    pub fn is_redirect(&self) -> Option<&str> {
        if !Self::is_redirect_response_code(self.response_code) {
            return None;
        }
        self.enumerate_header("location").find(|v| !v.is_empty())
    }

    pub fn is_keep_alive(&self) -> bool {
        if self.version < HttpVersion::HTTP_1_0 {
            return false;
        }
        for name in ["connection", "proxy-connection"] {
            if self.has_header_value(name, "close") {
                return false;
            }
            if self.has_header_value(name, "keep-alive") {
                return true;
            }
        }
        self.version >= HttpVersion::HTTP_1_1
    }

    pub fn get_content_length(&self) -> Option<u64> {
        self.enumerate_header("content-length")
            .next()
            .and_then(|v| v.parse().ok())
    }
}
