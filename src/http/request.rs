//! Request buffering and re-targeting.
//!
//! The body is read once up front so the same request can be replayed
//! against a backend on every retry and failover.

use axum::body::{Body, Bytes};
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::header::{self, HeaderName};
use axum::http::{HeaderMap, Method, Request, Uri, Version};
use http_body_util::LengthLimitError;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Connection-scoped headers that must not be passed on to a backend.
const HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// True when a body read failed because it went over the size limit.
pub fn is_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

/// Copy `headers`, leaving out hop-by-hop headers and any header named in
/// a `Connection` value.
fn end_to_end_headers(headers: &HeaderMap) -> HeaderMap {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|token| HeaderName::try_from(token.trim()).ok())
        .collect();

    headers
        .iter()
        .filter(|(name, _)| !HOP_BY_HOP.contains(name) && !listed.contains(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// An inbound request with its body fully read.
#[derive(Debug, Clone)]
pub struct BufferedRequest {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl BufferedRequest {
    /// Read the body of `request`, failing if it exceeds `limit` bytes.
    pub async fn from_request(request: Request<Body>, limit: usize) -> Result<Self, axum::Error> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, limit).await?;
        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body,
        })
    }

    pub fn request_id(&self) -> &str {
        self.headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }

    /// Build a fresh request aimed at `authority`, keeping method, path,
    /// query, end-to-end headers and body.
    pub fn to_upstream(&self, authority: &Authority) -> Result<Request<Body>, axum::http::Error> {
        let path = self
            .uri
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/"));
        let uri = Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(authority.clone())
            .path_and_query(path)
            .build()?;

        let mut builder = Request::builder()
            .method(self.method.clone())
            .uri(uri)
            .version(self.version);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(end_to_end_headers(&self.headers));
        }
        builder.body(Body::from(self.body.clone()))
    }
}
