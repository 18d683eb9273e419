use crate::base::neterror::NetError;
use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use std::str::FromStr;

/// Request headers that strictly preserve insertion order.
///
/// Chromium behavior: setting an existing header updates it in place, so the
/// original position is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequestHeaders {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl HttpRequestHeaders {
    pub const PROXY_CONNECTION: &'static str = "proxy-connection";

    pub fn new() -> Self {
        Self {
            headers: Vec::new(),
        }
    }

    /// Set a header from already-validated parts.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        if let Some((_, v)) = self.headers.iter_mut().find(|(n, _)| *n == name) {
            *v = value;
        } else {
            self.headers.push((name, value));
        }
    }

    /// Set a header from strings, validating both parts.
    pub fn set_header_str(&mut self, name: &str, value: &str) -> Result<(), NetError> {
        let name = HeaderName::from_str(name).map_err(|_| NetError::InvalidArgument)?;
        let value = HeaderValue::from_str(value).map_err(|_| NetError::InvalidArgument)?;
        self.set_header(name, value);
        Ok(())
    }

    /// Set a header only if it is not already present.
    pub fn set_header_if_missing(&mut self, name: HeaderName, value: HeaderValue) {
        if !self.headers.iter().any(|(n, _)| *n == name) {
            self.headers.push((name, value));
        }
    }

    pub fn remove_header(&mut self, name: &str) {
        if let Ok(target) = HeaderName::from_str(name) {
            self.headers.retain(|(n, _)| *n != target);
        }
    }

    pub fn get_header(&self, name: &str) -> Option<&HeaderValue> {
        let target = HeaderName::from_str(name).ok()?;
        self.headers
            .iter()
            .find(|(n, _)| *n == target)
            .map(|(_, v)| v)
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// Copy every header of `other` into `self`, overwriting duplicates.
    pub fn merge_from(&mut self, other: &HttpRequestHeaders) {
        for (name, value) in &other.headers {
            self.set_header(name.clone(), value.clone());
        }
    }

    pub fn clear(&mut self) {
        self.headers.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.headers.iter().map(|(n, v)| (n, v))
    }

    /// Serialized size as it would appear in an HTTP/1.1 request.
    pub fn wire_len(&self) -> usize {
        self.headers
            .iter()
            .map(|(n, v)| n.as_str().len() + 2 + v.len() + 2)
            .sum()
    }

    /// Returns a standard `http::HeaderMap` (which also preserves insertion order).
    pub fn to_header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            map.append(name.clone(), value.clone());
        }
        map
    }
}
