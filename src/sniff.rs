// Sniffing hooks - the observation points around request forwarding
//
// The proxy core exposes two hook points: just before a rewritten request
// leaves the process, and just after the upstream response arrives but
// before it is relayed. Sniffers are independent implementations composed
// at construction time; the stock set is structured logging plus, when a
// bone directory is configured, the bone writer.

use anyhow::Result;

use crate::capture::{version_str, CapturedRequest, CapturedResponse};
use crate::correlate::RequestId;

/// Observer of proxied traffic.
pub trait Sniffer: Send + Sync {
    /// Called after request rewriting, before the request leaves the process.
    fn on_forward(&self, req: &CapturedRequest, id: RequestId);

    /// Called after the upstream response arrives, before it is relayed.
    /// Returning an error aborts the relay; the stock sniffers never do.
    fn on_response(&self, resp: &CapturedResponse, id: RequestId) -> Result<()>;
}

/// Emits one structured log event per hook.
pub struct LogSniffer;

impl Sniffer for LogSniffer {
    fn on_forward(&self, req: &CapturedRequest, id: RequestId) {
        let remote_addr = req.remote_addr.map(|a| a.to_string()).unwrap_or_default();
        tracing::info!(
            phase = "request",
            method = %req.method,
            url = req.uri.path(),
            proto = version_str(req.version),
            user_agent = req.user_agent.as_deref().unwrap_or(""),
            remote_addr = %remote_addr,
            id,
            "Request"
        );
    }

    fn on_response(&self, resp: &CapturedResponse, id: RequestId) -> Result<()> {
        tracing::info!(
            phase = "response",
            method = %resp.method,
            url = %resp.path,
            status_code = resp.status.as_u16(),
            status = %resp.status,
            content_length = resp.content_length().unwrap_or(""),
            id,
            "Response"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, Method, StatusCode, Uri, Version};
    use bytes::Bytes;

    #[test]
    fn log_sniffer_never_aborts_relay() {
        let resp = CapturedResponse {
            status: StatusCode::OK,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"ok"),
            method: Method::GET,
            path: "/".to_string(),
        };
        assert!(LogSniffer.on_response(&resp, 1).is_ok());
    }

    #[test]
    fn sniffers_compose_as_trait_objects() {
        let sniffers: Vec<Box<dyn Sniffer>> = vec![Box::new(LogSniffer)];
        let req = CapturedRequest {
            method: Method::GET,
            uri: Uri::from_static("/"),
            version: Version::HTTP_11,
            host: "example.test".to_string(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            user_agent: None,
            remote_addr: None,
        };
        for sniffer in &sniffers {
            sniffer.on_forward(&req, 1);
        }
    }
}
