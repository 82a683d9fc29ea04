// Proxy module - forwards every inbound request to the configured upstream
//
// The handler buffers the inbound body, freezes the request for the
// sniffers, forwards it, freezes the response, runs the sniffers again,
// and relays the upstream answer. Exactly one "completed" event is logged
// per request, carrying the final status, on the success and failure
// paths alike.

pub mod error;
pub mod server;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderName, HeaderValue, Request, Response, StatusCode, Uri, Version},
    response::IntoResponse,
};
use bytes::Bytes;

use crate::capture::{read_body, CapturedRequest, CapturedResponse};
use crate::correlate::{RequestCorrelator, RequestId};
use crate::sniff::Sniffer;
use error::ProxyError;

/// Shared state for the proxy server
#[derive(Clone)]
pub struct ProxyState {
    /// HTTP client for forwarding requests
    pub(crate) client: reqwest::Client,
    /// Upstream base URL, normalized without a trailing slash
    pub(crate) target_url: String,
    /// Upstream authority, written as the Host line of request bones
    pub(crate) target_host: String,
    /// Correlation ID source, one instance per server
    pub(crate) correlator: Arc<RequestCorrelator>,
    /// Observers invoked at the pre-forward and post-response hook points
    pub(crate) sniffers: Arc<Vec<Box<dyn Sniffer>>>,
}

/// Main proxy handler - one invocation per inbound request
pub(crate) async fn proxy_handler(
    State(state): State<ProxyState>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    req: Request<Body>,
) -> Response<Body> {
    let start = Instant::now();
    let id = state.correlator.next_id();

    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match forward(&state, req, remote_addr, id).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };

    let duration = start.elapsed();
    tracing::info!(
        phase = "completed",
        method = %method,
        url = %path,
        status_code = response.status().as_u16(),
        duration_ms = duration.as_millis() as u64,
        id,
        "Completed"
    );

    response
}

/// Forward one request to the upstream and build the relayed response.
async fn forward(
    state: &ProxyState,
    req: Request<Body>,
    remote_addr: SocketAddr,
    id: RequestId,
) -> Result<Response<Body>, ProxyError> {
    let (parts, body) = req.into_parts();
    let body_bytes = read_body(body, id).await;

    let user_agent = parts
        .headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let captured = CapturedRequest {
        method: parts.method.clone(),
        uri: parts.uri.clone(),
        version: parts.version,
        host: state.target_host.clone(),
        headers: parts.headers.clone(),
        body: body_bytes.clone(),
        user_agent,
        remote_addr: Some(remote_addr),
    };

    for sniffer in state.sniffers.iter() {
        sniffer.on_forward(&captured, id);
    }

    let forward_method = reqwest::Method::from_bytes(parts.method.as_str().as_bytes())
        .map_err(|e| ProxyError::Upstream(format!("Invalid HTTP method: {}", e)))?;

    let mut forward_req = state
        .client
        .request(forward_method, forward_url(&state.target_url, &parts.uri))
        .body(body_bytes.to_vec());

    // Pass headers through, minus the ones the client must own: Host and
    // Content-Length are recomputed for the rewritten request,
    // Connection/Transfer-Encoding are hop-by-hop, and X-Forwarded-For is
    // re-emitted below with the caller appended.
    for (key, value) in parts.headers.iter() {
        if key == "host"
            || key == "connection"
            || key == "transfer-encoding"
            || key == "content-length"
            || key == "x-forwarded-for"
        {
            continue;
        }
        forward_req = forward_req.header(key.as_str(), value.as_bytes().to_vec());
    }

    let forwarded_for = match parts
        .headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        Some(prior) => format!("{}, {}", prior, remote_addr.ip()),
        None => remote_addr.ip().to_string(),
    };
    forward_req = forward_req.header("x-forwarded-for", forwarded_for);

    // Forward. Connectivity failures become a gateway error; no retries.
    let upstream = forward_req
        .send()
        .await
        .map_err(|e| ProxyError::Upstream(e.to_string()))?;

    let status = StatusCode::from_u16(upstream.status().as_u16())
        .map_err(|e| ProxyError::ResponseBuild(e.to_string()))?;
    let version = relay_version(upstream.version());

    let mut headers = HeaderMap::new();
    for (key, value) in upstream.headers().iter() {
        // Hop-by-hop headers do not survive the relay
        if key == "transfer-encoding" || key == "connection" {
            continue;
        }
        if let (Ok(name), Ok(val)) = (
            HeaderName::from_bytes(key.as_str().as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            headers.append(name, val);
        }
    }

    // Same never-block policy as the request side: an unreadable upstream
    // body is relayed as empty rather than failing the whole exchange.
    let response_body = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(id, error = %e, "Failed to read upstream body, relaying empty body");
            Bytes::new()
        }
    };

    let captured_response = CapturedResponse {
        status,
        version,
        headers: headers.clone(),
        body: response_body.clone(),
        method: parts.method,
        path: parts.uri.path().to_string(),
    };

    for sniffer in state.sniffers.iter() {
        sniffer
            .on_response(&captured_response, id)
            .map_err(|e| ProxyError::Sniff(e.to_string()))?;
    }

    let mut response = Response::builder()
        .status(status)
        .version(version)
        .body(Body::from(response_body))
        .map_err(|e| ProxyError::ResponseBuild(e.to_string()))?;
    *response.headers_mut() = headers;

    Ok(response)
}

/// Join the upstream base with the inbound path and query.
pub(crate) fn forward_url(target: &str, uri: &Uri) -> String {
    let base = target.trim_end_matches('/');
    match uri.query() {
        Some(query) => format!("{}{}?{}", base, uri.path(), query),
        None => format!("{}{}", base, uri.path()),
    }
}

/// Map the client's reported protocol version onto the server's http types.
/// Written as comparisons so it holds even when the two crates pin
/// different http versions.
fn relay_version(version: reqwest::Version) -> Version {
    if version == reqwest::Version::HTTP_09 {
        Version::HTTP_09
    } else if version == reqwest::Version::HTTP_10 {
        Version::HTTP_10
    } else if version == reqwest::Version::HTTP_2 {
        Version::HTTP_2
    } else if version == reqwest::Version::HTTP_3 {
        Version::HTTP_3
    } else {
        Version::HTTP_11
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_url_joins_path_and_query() {
        let uri: Uri = "/anything?q=1".parse().unwrap();
        assert_eq!(
            forward_url("https://httpbin.org", &uri),
            "https://httpbin.org/anything?q=1"
        );
    }

    #[test]
    fn forward_url_trims_trailing_slash_on_the_base() {
        let uri: Uri = "/status/200".parse().unwrap();
        assert_eq!(
            forward_url("http://localhost:3000/", &uri),
            "http://localhost:3000/status/200"
        );
    }

    #[test]
    fn forward_url_handles_the_root_path() {
        let uri: Uri = "/".parse().unwrap();
        assert_eq!(forward_url("https://httpbin.org", &uri), "https://httpbin.org/");
    }

    #[test]
    fn relay_version_maps_common_protocols() {
        assert_eq!(relay_version(reqwest::Version::HTTP_11), Version::HTTP_11);
        assert_eq!(relay_version(reqwest::Version::HTTP_2), Version::HTTP_2);
        assert_eq!(relay_version(reqwest::Version::HTTP_10), Version::HTTP_10);
    }
}
