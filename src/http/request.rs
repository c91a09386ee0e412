//! Immutable-metadata HTTP request.
//!
//! # Responsibilities
//! - Validate the absolute URL and normalize the method at construction
//! - Own a header collection and one body capsule
//! - Derive a new request from an existing one (`from_request`)
//!
//! # Design Decisions
//! - Method and URL are fixed once built; only headers can be edited in place
//! - Deriving from another request copies its bytes, not its consumed flag

use bytes::Bytes;
use url::Url;

use crate::http::body::{Body, BodyError, BodyInit, BodyMixin};
use crate::http::headers::{HeaderPair, Headers};
use crate::http::MessageError;

/// Methods the platform upper-cases when given in any casing.
const NORMALIZED_METHODS: [&str; 7] = ["DELETE", "GET", "HEAD", "OPTIONS", "PATCH", "POST", "PUT"];

fn normalize_method(method: &str) -> String {
    NORMALIZED_METHODS
        .iter()
        .find(|known| known.eq_ignore_ascii_case(method))
        .map(|known| known.to_string())
        .unwrap_or_else(|| method.to_string())
}

/// Options for [`Request::new`]. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct RequestInit {
    pub method: Option<String>,
    pub headers: Option<Headers>,
    pub body: Option<BodyInit>,
}

impl RequestInit {
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn headers(mut self, headers: impl Into<Headers>) -> Self {
        self.headers = Some(headers.into());
        self
    }

    pub fn body(mut self, body: impl Into<BodyInit>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// An inbound (or synthesized) HTTP request.
#[derive(Debug)]
pub struct Request {
    method: String,
    url: Url,
    headers: Headers,
    body: Body,
}

impl Request {
    /// Build a request for an absolute `url`.
    pub fn new(url: &str, init: RequestInit) -> Result<Self, MessageError> {
        let parsed = Url::parse(url).map_err(|source| MessageError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        Ok(Self {
            method: normalize_method(init.method.as_deref().unwrap_or("GET")),
            url: parsed,
            headers: init.headers.unwrap_or_default(),
            body: Body::new(init.body.unwrap_or_default()),
        })
    }

    /// Derive a request from `other`, overriding whatever `init` supplies.
    ///
    /// The body bytes are copied even if `other` has already been read.
    pub fn from_request(other: &Request, init: RequestInit) -> Self {
        Self {
            method: init
                .method
                .as_deref()
                .map(normalize_method)
                .unwrap_or_else(|| other.method.clone()),
            url: other.url.clone(),
            headers: init.headers.unwrap_or_else(|| other.headers.clone()),
            body: match init.body {
                Some(body) => Body::new(body),
                None => other.body.copy_bytes(),
            },
        }
    }

    /// Translate the parts of a transport exchange into a request.
    ///
    /// Repeated wire headers are appended, so they end up joined with `", "`.
    pub(crate) fn from_exchange_parts(
        method: &str,
        url: &str,
        header_pairs: &[HeaderPair],
        body: Option<Bytes>,
    ) -> Result<Self, MessageError> {
        let mut headers = Headers::new();
        for pair in header_pairs {
            headers.append(&pair.name, &pair.value);
        }
        let mut request = Request::new(url, RequestInit::default().method(method).headers(headers))?;
        request.body = Body::from_raw(body.filter(|b| !b.is_empty()));
        Ok(request)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Serialized absolute URL.
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn parsed_url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Structured copy. Fails once the body has been read.
    pub fn clone_request(&self) -> Result<Request, BodyError> {
        Ok(Self {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: self.body.try_clone()?,
        })
    }
}

impl BodyMixin for Request {
    fn body_capsule(&self) -> &Body {
        &self.body
    }

    fn content_type(&self) -> &str {
        self.headers.get("content-type").unwrap_or("")
    }
}
