//! Immutable-metadata HTTP response and its named constructors.
//!
//! # Responsibilities
//! - Validate status codes at construction
//! - Build JSON, redirect and network-error responses
//! - Convert to the wire shape without consuming the body
//!
//! # Design Decisions
//! - `json()` assigns `content-type` after merging caller headers, so it always wins
//! - `redirect()` validates before building anything
//! - `error()` is the only way to get status 0

use bytes::Bytes;
use serde::Serialize;
use url::Url;

use crate::http::body::{Body, BodyError, BodyInit, BodyMixin};
use crate::http::headers::Headers;
use crate::http::wire::WireResponse;
use crate::http::MessageError;

/// Statuses accepted by [`Response::redirect`].
pub const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

/// Status used by [`Response::redirect`] when none is given.
pub const DEFAULT_REDIRECT_STATUS: u16 = 302;

/// How the response came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    Default,
    Redirect,
    Error,
}

/// Options for [`Response::new`].
#[derive(Debug, Clone)]
pub struct ResponseInit {
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
}

impl Default for ResponseInit {
    fn default() -> Self {
        Self {
            status: 200,
            status_text: "OK".to_string(),
            headers: Headers::new(),
        }
    }
}

impl ResponseInit {
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self
    }

    pub fn headers(mut self, headers: impl Into<Headers>) -> Self {
        self.headers = headers.into();
        self
    }
}

/// An outbound HTTP response.
#[derive(Debug)]
pub struct Response {
    status: u16,
    status_text: String,
    headers: Headers,
    body: Body,
    response_type: ResponseType,
}

impl Response {
    /// Build a response. `status` must be in `200..=599`.
    pub fn new(body: impl Into<BodyInit>, init: ResponseInit) -> Result<Self, MessageError> {
        if !(200..=599).contains(&init.status) {
            return Err(MessageError::InvalidStatus(init.status));
        }
        Ok(Self {
            status: init.status,
            status_text: init.status_text,
            headers: init.headers,
            body: Body::new(body),
            response_type: ResponseType::Default,
        })
    }

    /// Serialize `data` as the body and force `content-type: application/json`.
    pub fn json<T: Serialize + ?Sized>(data: &T, init: ResponseInit) -> Result<Self, MessageError> {
        let payload = serde_json::to_vec(data).map_err(MessageError::Serialize)?;
        let mut response = Self::new(payload, init)?;
        response.headers.set("content-type", "application/json");
        Ok(response)
    }

    /// Redirect to `url` with one of [`REDIRECT_STATUSES`] (302 by default).
    ///
    /// `location` carries `url` exactly as given. Absolute URLs must parse;
    /// relative references such as `/login` are passed through.
    pub fn redirect(url: &str, status: Option<u16>) -> Result<Self, MessageError> {
        let status = status.unwrap_or(DEFAULT_REDIRECT_STATUS);
        if !REDIRECT_STATUSES.contains(&status) {
            return Err(MessageError::InvalidRedirectStatus(status));
        }
        match Url::parse(url) {
            Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => {}
            Err(source) => {
                return Err(MessageError::InvalidUrl {
                    url: url.to_string(),
                    source,
                })
            }
        }

        let mut headers = Headers::new();
        headers.set("location", url);
        Ok(Self {
            status,
            status_text: String::new(),
            headers,
            body: Body::default(),
            response_type: ResponseType::Redirect,
        })
    }

    /// Network-error sentinel: status 0, no body, no headers.
    pub fn error() -> Self {
        Self {
            status: 0,
            status_text: String::new(),
            headers: Headers::new(),
            body: Body::default(),
            response_type: ResponseType::Error,
        }
    }

    /// `text/plain` response with the given status.
    pub fn text(body: impl Into<String>, status: u16) -> Result<Self, MessageError> {
        let mut response = Self::new(body.into(), ResponseInit::default().status(status))?;
        response.headers.set("content-type", "text/plain");
        Ok(response)
    }

    /// Bodiless response with the given status.
    pub fn empty(status: u16) -> Result<Self, MessageError> {
        Self::new(BodyInit::Empty, ResponseInit::default().status(status))
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// `true` for statuses in `200..300`.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn response_type(&self) -> ResponseType {
        self.response_type
    }

    /// Structured copy. Fails once the body has been read.
    pub fn clone_response(&self) -> Result<Response, BodyError> {
        Ok(Self {
            status: self.status,
            status_text: self.status_text.clone(),
            headers: self.headers.clone(),
            body: self.body.try_clone()?,
            response_type: self.response_type,
        })
    }

    /// The only path across the transport boundary. Leaves the body unread.
    pub fn to_wire_response(&self) -> WireResponse {
        WireResponse::new(
            self.status,
            self.headers.to_ordered_pairs(),
            self.body.raw().map(Bytes::clone),
        )
    }
}

impl BodyMixin for Response {
    fn body_capsule(&self) -> &Body {
        &self.body
    }

    fn content_type(&self) -> &str {
        self.headers.get("content-type").unwrap_or("")
    }
}
