// Body-preserving capture - freeze a message for inspection without
// changing what gets forwarded
//
// Bodies are read fully into `Bytes`. The same buffer then serves both the
// sniffers and the forwarded message, so the bytes that leave the process
// are exactly the bytes that came in. `Bytes` clones are reference counted,
// so capture adds no copies. Arbitrarily large bodies are buffered whole;
// that is accepted scope for a debugging proxy, not something to bound here.

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{HeaderMap, Method, StatusCode, Uri, Version};
use bytes::Bytes;

use crate::correlate::RequestId;

/// An inbound request frozen for inspection, already rewritten to target
/// the upstream.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: Method,
    /// Path and query exactly as received from the caller.
    pub uri: Uri,
    pub version: Version,
    /// Authority of the upstream this request is being forwarded to.
    pub host: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub user_agent: Option<String>,
    pub remote_addr: Option<SocketAddr>,
}

/// An upstream response frozen for inspection before it is relayed.
///
/// `method` and `path` identify the forwarded request that produced this
/// response, so sniffers can correlate without extra bookkeeping.
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub method: Method,
    pub path: String,
}

impl CapturedResponse {
    /// Content-Length header value, if the upstream sent one.
    pub fn content_length(&self) -> Option<&str> {
        self.headers
            .get("content-length")
            .and_then(|v| v.to_str().ok())
    }
}

/// Read an inbound body to completion.
///
/// A read failure yields empty bytes and a warning. Observability must
/// never turn a proxyable request into an error, so the request continues
/// with whatever the transport delivered.
pub async fn read_body(body: Body, id: RequestId) -> Bytes {
    match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(id, error = %e, "Failed to read body, continuing with empty body");
            Bytes::new()
        }
    }
}

/// Protocol string for start lines and logs, e.g. "HTTP/1.1".
pub fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}
