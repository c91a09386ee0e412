//! Transport-level exchange descriptor.

use bytes::Bytes;

use crate::event::ReplySink;
use crate::http::HeaderPair;

/// One inbound HTTP exchange as a transport hands it over.
#[derive(Debug)]
pub struct Exchange {
    pub method: String,
    /// Absolute URL including scheme, host, path and query.
    pub url: String,
    pub headers: Vec<HeaderPair>,
    /// `None` when the request carried no body.
    pub body: Option<Bytes>,
    pub client_address: String,
    pub reply: ReplySink,
}

/// Rebuild an absolute URL from the pieces of a parsed request line.
///
/// A missing host becomes `localhost`; a missing path becomes `/`.
pub fn build_url(scheme: &str, host: Option<&str>, path_and_query: Option<&str>) -> String {
    let host = host.filter(|h| !h.is_empty()).unwrap_or("localhost");
    let path = match path_and_query {
        Some(p) if p.starts_with('/') => p.to_string(),
        Some(p) if !p.is_empty() => format!("/{}", p),
        _ => "/".to_string(),
    };
    format!("{}://{}{}", scheme, host, path)
}
