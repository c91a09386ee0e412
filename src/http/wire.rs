//! Wire-level response shape handed to the transport.

use std::fmt;

use bytes::Bytes;
use serde::Serialize;

use crate::http::headers::HeaderPair;

/// `{status, headers, body}` as the transport writes it.
///
/// Header names are lower case. An empty body is `None`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct WireResponse {
    pub status: u16,
    pub headers: Vec<HeaderPair>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Bytes>,
}

impl WireResponse {
    pub fn new(status: u16, headers: Vec<HeaderPair>, body: Option<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.filter(|b| !b.is_empty()),
        }
    }

    /// Plain-text response with the given status.
    pub fn text(status: u16, body: &str) -> Self {
        Self::new(
            status,
            vec![HeaderPair::new("content-type", "text/plain")],
            Some(Bytes::copy_from_slice(body.as_bytes())),
        )
    }

    /// Synthetic 500 sent when a `respond_with` future fails.
    pub fn internal_error(message: &str) -> Self {
        Self::text(500, &format!("Internal Server Error: {}", message))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|pair| pair.name.eq_ignore_ascii_case(name))
            .map(|pair| pair.value.as_str())
    }

    /// Body decoded as UTF-8, `""` when absent.
    pub fn body_text(&self) -> String {
        self.body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default()
    }
}

impl fmt::Debug for WireResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WireResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &self.body.as_ref().map(|b| format!("<{} bytes>", b.len())))
            .finish()
    }
}
