//! Consume-once message body shared by `Request` and `Response`.
//!
//! # Responsibilities
//! - Hold the immutable, fully buffered payload of a message
//! - Allow exactly one materializing read (`text`, `array_buffer`, `blob`, `json`)
//! - Hand out an independent copy for `clone`
//!
//! # Design Decisions
//! - The consumed flag is an `AtomicBool` flipped with `swap`, so reads work
//!   through `&self` (an event shares its request) and two readers can never
//!   both win
//! - `body()` exposes a single-chunk stream and does not count as a read
//! - The wire conversion reads `raw()` directly and never consumes

use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors raised by body accessors.
#[derive(Debug, Error)]
pub enum BodyError {
    /// A materializing accessor already ran on this message.
    #[error("body has already been consumed")]
    AlreadyConsumed,

    /// `clone` was called after the body was read.
    #[error("cannot clone a message whose body has already been consumed")]
    CloneAfterConsumed,

    /// The accessor exists for API compatibility but is not supported.
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),

    /// The body text was not valid JSON.
    #[error("body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Lazy byte stream over a buffered body.
pub type BodyStream = BoxStream<'static, Bytes>;

/// Accepted payload shapes at construction time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BodyInit {
    #[default]
    Empty,
    Text(String),
    Bytes(Bytes),
}

impl BodyInit {
    fn into_bytes(self) -> Option<Bytes> {
        match self {
            BodyInit::Empty => None,
            BodyInit::Text(text) => Some(Bytes::from(text)),
            BodyInit::Bytes(bytes) => Some(bytes),
        }
    }
}

impl From<&str> for BodyInit {
    fn from(text: &str) -> Self {
        BodyInit::Text(text.to_string())
    }
}

impl From<String> for BodyInit {
    fn from(text: String) -> Self {
        BodyInit::Text(text)
    }
}

impl From<Vec<u8>> for BodyInit {
    fn from(bytes: Vec<u8>) -> Self {
        BodyInit::Bytes(Bytes::from(bytes))
    }
}

impl From<&[u8]> for BodyInit {
    fn from(bytes: &[u8]) -> Self {
        BodyInit::Bytes(Bytes::copy_from_slice(bytes))
    }
}

impl<const N: usize> From<[u8; N]> for BodyInit {
    fn from(bytes: [u8; N]) -> Self {
        BodyInit::Bytes(Bytes::copy_from_slice(&bytes))
    }
}

impl From<Bytes> for BodyInit {
    fn from(bytes: Bytes) -> Self {
        BodyInit::Bytes(bytes)
    }
}

impl<T: Into<BodyInit>> From<Option<T>> for BodyInit {
    fn from(body: Option<T>) -> Self {
        body.map(Into::into).unwrap_or_default()
    }
}

/// Opaque binary object returned by `blob()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    bytes: Bytes,
    content_type: String,
}

impl Blob {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// MIME type taken from the message's `content-type`, or `""`.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

/// The body capsule: optional bytes plus a one-way consumed flag.
#[derive(Debug, Default)]
pub struct Body {
    raw: Option<Bytes>,
    consumed: AtomicBool,
}

impl Body {
    pub fn new(init: impl Into<BodyInit>) -> Self {
        Self {
            raw: init.into().into_bytes(),
            consumed: AtomicBool::new(false),
        }
    }

    pub(crate) fn from_raw(raw: Option<Bytes>) -> Self {
        Self {
            raw,
            consumed: AtomicBool::new(false),
        }
    }

    /// Raw bytes without touching the consumed flag.
    pub(crate) fn raw(&self) -> Option<&Bytes> {
        self.raw.as_ref()
    }

    pub fn is_used(&self) -> bool {
        self.consumed.load(Ordering::Acquire)
    }

    fn take(&self) -> Result<Bytes, BodyError> {
        if self.consumed.swap(true, Ordering::AcqRel) {
            return Err(BodyError::AlreadyConsumed);
        }
        Ok(self.raw.clone().unwrap_or_default())
    }

    pub fn text(&self) -> Result<String, BodyError> {
        let bytes = self.take()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn array_buffer(&self) -> Result<Vec<u8>, BodyError> {
        Ok(self.take()?.to_vec())
    }

    pub fn blob(&self, content_type: &str) -> Result<Blob, BodyError> {
        Ok(Blob {
            bytes: self.take()?,
            content_type: content_type.to_string(),
        })
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, BodyError> {
        let text = self.text()?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn form_data(&self) -> Result<(), BodyError> {
        Err(BodyError::NotImplemented("formData"))
    }

    pub fn stream(&self) -> Option<BodyStream> {
        let chunk = self.raw.clone()?;
        Some(stream::once(async move { chunk }).boxed())
    }

    /// Independent copy with a fresh consumed flag.
    pub fn try_clone(&self) -> Result<Body, BodyError> {
        if self.is_used() {
            return Err(BodyError::CloneAfterConsumed);
        }
        Ok(self.copy_bytes())
    }

    /// Copy of the bytes regardless of the source's consumed flag.
    pub(crate) fn copy_bytes(&self) -> Body {
        Body::from_raw(self.raw.as_ref().map(|b| Bytes::copy_from_slice(b)))
    }
}

/// Accessors shared by every message type that owns a [`Body`].
pub trait BodyMixin {
    fn body_capsule(&self) -> &Body;

    /// Value used as the blob MIME type.
    fn content_type(&self) -> &str;

    /// Single-chunk stream over the payload, `None` when there is no body.
    fn body(&self) -> Option<BodyStream> {
        self.body_capsule().stream()
    }

    fn body_used(&self) -> bool {
        self.body_capsule().is_used()
    }

    fn text(&self) -> Result<String, BodyError> {
        self.body_capsule().text()
    }

    fn array_buffer(&self) -> Result<Vec<u8>, BodyError> {
        self.body_capsule().array_buffer()
    }

    fn blob(&self) -> Result<Blob, BodyError> {
        self.body_capsule().blob(self.content_type())
    }

    fn json<T: DeserializeOwned>(&self) -> Result<T, BodyError>
    where
        Self: Sized,
    {
        self.body_capsule().json()
    }

    fn form_data(&self) -> Result<(), BodyError> {
        self.body_capsule().form_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_read_wins() {
        let body = Body::new("hello");
        assert_eq!(body.text().unwrap(), "hello");
        assert!(body.is_used());
        assert!(matches!(body.text(), Err(BodyError::AlreadyConsumed)));
        assert!(matches!(body.array_buffer(), Err(BodyError::AlreadyConsumed)));
        assert!(matches!(body.blob(""), Err(BodyError::AlreadyConsumed)));
        assert!(matches!(body.json::<serde_json::Value>(), Err(BodyError::AlreadyConsumed)));
    }

    const PAYLOAD: &str = r#"{"a":1}"#;

    #[derive(Debug, Clone, Copy)]
    enum Read {
        Text,
        ArrayBuffer,
        Blob,
        Json,
    }

    const READS: [Read; 4] = [Read::Text, Read::ArrayBuffer, Read::Blob, Read::Json];

    fn read_once<M: BodyMixin>(message: &M, read: Read) {
        match read {
            Read::Text => assert_eq!(message.text().unwrap(), PAYLOAD),
            Read::ArrayBuffer => assert_eq!(message.array_buffer().unwrap(), PAYLOAD.as_bytes()),
            Read::Blob => assert_eq!(message.blob().unwrap().size(), PAYLOAD.len()),
            Read::Json => assert_eq!(message.json::<serde_json::Value>().unwrap()["a"], 1),
        }
    }

    fn assert_spent<M: BodyMixin>(message: &M, first: Read) {
        assert!(message.body_used(), "{:?} did not mark the body used", first);
        assert!(matches!(message.text(), Err(BodyError::AlreadyConsumed)));
        assert!(matches!(message.array_buffer(), Err(BodyError::AlreadyConsumed)));
        assert!(matches!(message.blob(), Err(BodyError::AlreadyConsumed)));
        assert!(matches!(
            message.json::<serde_json::Value>(),
            Err(BodyError::AlreadyConsumed)
        ));
    }

    #[test]
    fn any_first_read_spends_the_body() {
        for first in READS {
            let body = Body::new(PAYLOAD);
            match first {
                Read::Text => assert_eq!(body.text().unwrap(), PAYLOAD),
                Read::ArrayBuffer => assert_eq!(body.array_buffer().unwrap(), PAYLOAD.as_bytes()),
                Read::Blob => assert_eq!(body.blob("application/json").unwrap().size(), PAYLOAD.len()),
                Read::Json => assert_eq!(body.json::<serde_json::Value>().unwrap()["a"], 1),
            }
            assert!(body.is_used(), "{:?} did not mark the body used", first);
            assert!(matches!(body.text(), Err(BodyError::AlreadyConsumed)));
            assert!(matches!(body.array_buffer(), Err(BodyError::AlreadyConsumed)));
            assert!(matches!(body.blob(""), Err(BodyError::AlreadyConsumed)));
            assert!(matches!(body.json::<serde_json::Value>(), Err(BodyError::AlreadyConsumed)));
        }
    }

    #[test]
    fn request_reads_are_single_use_whichever_comes_first() {
        use crate::http::{Request, RequestInit};

        for first in READS {
            let request = Request::new(
                "http://localhost/",
                RequestInit::default().method("POST").body(PAYLOAD),
            )
            .unwrap();
            assert!(!request.body_used());
            read_once(&request, first);
            assert_spent(&request, first);
        }
    }

    #[test]
    fn response_reads_are_single_use_whichever_comes_first() {
        use crate::http::{Response, ResponseInit};

        for first in READS {
            let response = Response::new(PAYLOAD, ResponseInit::default()).unwrap();
            assert!(!response.body_used());
            read_once(&response, first);
            assert_spent(&response, first);
        }
    }

    #[test]
    fn absent_body_reads_empty() {
        let body = Body::new(BodyInit::Empty);
        assert_eq!(body.text().unwrap(), "");

        let body = Body::new(None::<String>);
        assert!(body.array_buffer().unwrap().is_empty());

        let body = Body::default();
        assert_eq!(body.blob("text/plain").unwrap().size(), 0);
    }

    #[test]
    fn array_buffer_is_independent_copy() {
        let body = Body::new([1u8, 2, 3]);
        let mut buf = body.array_buffer().unwrap();
        buf[0] = 9;
        assert_eq!(body.raw().unwrap().as_ref(), &[1, 2, 3]);
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let body = Body::new("{not json");
        let err = body.json::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, BodyError::Json(_)));
        // the text read still happened
        assert!(body.is_used());
    }

    #[test]
    fn form_data_does_not_consume() {
        let body = Body::new("a=1");
        assert!(matches!(body.form_data(), Err(BodyError::NotImplemented("formData"))));
        assert!(!body.is_used());
        assert_eq!(body.text().unwrap(), "a=1");
    }

    #[test]
    fn clone_requires_unread_body() {
        let body = Body::new(b"data".to_vec());
        let copy = body.try_clone().unwrap();
        assert!(!body.is_used());
        assert_eq!(copy.text().unwrap(), "data");
        assert_eq!(body.text().unwrap(), "data");
        assert!(matches!(body.try_clone(), Err(BodyError::CloneAfterConsumed)));
    }

    #[tokio::test]
    async fn stream_yields_one_chunk_without_consuming() {
        let body = Body::new("chunk");
        let chunks: Vec<Bytes> = body.stream().unwrap().collect().await;
        assert_eq!(chunks, vec![Bytes::from_static(b"chunk")]);
        assert!(!body.is_used());

        assert!(Body::default().stream().is_none());
    }
}
