// Bone writer - persisted dumps of proxied traffic
//
// A "bone" is one HTTP message written to disk: start line, headers, a
// blank separator line, then the raw body bytes. Each request produces
// `<id>-request.txt` and, once the upstream answers, `<id>-response.txt`.
// Correlation IDs are unique, so filenames never collide across concurrent
// requests. Every failure in here is logged and swallowed: losing a dump
// must never cost the caller their response.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::capture::{version_str, CapturedRequest, CapturedResponse};
use crate::correlate::RequestId;
use crate::sniff::Sniffer;

/// Writes one dump file per captured message into a configured directory.
pub struct BoneWriter {
    dir: PathBuf,
}

impl BoneWriter {
    /// Create a writer rooted at `dir`, creating the directory if missing.
    /// A directory that cannot be created is logged here; the individual
    /// writes will then log their own failures.
    pub fn new(dir: PathBuf) -> Self {
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "Could not create bone directory");
        }
        Self { dir }
    }

    fn request_path(&self, id: RequestId) -> PathBuf {
        self.dir.join(format!("{id}-request.txt"))
    }

    fn response_path(&self, id: RequestId) -> PathBuf {
        self.dir.join(format!("{id}-response.txt"))
    }

    /// Request line, Host, one line per header value, blank line, raw body.
    fn render_request(req: &CapturedRequest) -> Vec<u8> {
        let mut buf = Vec::with_capacity(req.body.len() + 256);
        // write! into a Vec cannot fail
        let _ = writeln!(buf, "{} {} {}", req.method, req.uri, version_str(req.version));
        let _ = writeln!(buf, "Host: {}", req.host);
        Self::render_headers_and_body(&mut buf, &req.headers, &req.body);
        buf
    }

    /// Status line, one line per header value, blank line, raw body.
    fn render_response(resp: &CapturedResponse) -> Vec<u8> {
        let mut buf = Vec::with_capacity(resp.body.len() + 256);
        let _ = writeln!(buf, "{} {}", version_str(resp.version), resp.status);
        Self::render_headers_and_body(&mut buf, &resp.headers, &resp.body);
        buf
    }

    fn render_headers_and_body(buf: &mut Vec<u8>, headers: &axum::http::HeaderMap, body: &[u8]) {
        for (name, value) in headers.iter() {
            let _ = write!(buf, "{}: ", name);
            buf.extend_from_slice(value.as_bytes());
            buf.push(b'\n');
        }
        buf.push(b'\n');
        buf.extend_from_slice(body);
    }

    fn write_bone(&self, path: &Path, contents: &[u8], id: RequestId) {
        if let Err(e) = std::fs::write(path, contents) {
            tracing::error!(id, file = %path.display(), error = %e, "Failed to write bone");
        }
    }
}

impl Sniffer for BoneWriter {
    fn on_forward(&self, req: &CapturedRequest, id: RequestId) {
        self.write_bone(&self.request_path(id), &Self::render_request(req), id);
    }

    fn on_response(&self, resp: &CapturedResponse, id: RequestId) -> Result<()> {
        self.write_bone(&self.response_path(id), &Self::render_response(resp), id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, Method, StatusCode, Uri, Version};
    use bytes::Bytes;

    fn sample_request() -> CapturedRequest {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "application/json".parse().unwrap());
        headers.append("x-trace", "a".parse().unwrap());
        headers.append("x-trace", "b".parse().unwrap());
        CapturedRequest {
            method: Method::POST,
            uri: Uri::from_static("/anything?q=1"),
            version: Version::HTTP_11,
            host: "httpbin.org".to_string(),
            headers,
            body: Bytes::from_static(br#"{"a":1}"#),
            user_agent: None,
            remote_addr: None,
        }
    }

    fn sample_response() -> CapturedResponse {
        let mut headers = HeaderMap::new();
        headers.insert("content-length", "2".parse().unwrap());
        CapturedResponse {
            status: StatusCode::OK,
            version: Version::HTTP_11,
            headers,
            body: Bytes::from_static(b"ok"),
            method: Method::GET,
            path: "/".to_string(),
        }
    }

    #[test]
    fn request_bone_has_start_line_host_headers_and_body() {
        let text = String::from_utf8(BoneWriter::render_request(&sample_request())).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("POST /anything?q=1 HTTP/1.1"));
        assert_eq!(lines.next(), Some("Host: httpbin.org"));
        assert!(text.contains("content-type: application/json\n"));
        // Repeated header values stay as repeated adjacent lines
        assert!(text.contains("x-trace: a\nx-trace: b\n"));
        assert!(text.ends_with("\n\n{\"a\":1}"));
    }

    #[test]
    fn response_bone_has_status_line_headers_and_body() {
        let text = String::from_utf8(BoneWriter::render_response(&sample_response())).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\n"));
        assert!(text.contains("content-length: 2\n"));
        assert!(text.ends_with("\n\nok"));
    }

    #[test]
    fn bones_are_named_by_id_and_direction() {
        let dir = std::env::temp_dir().join(format!("bloodhound-bones-unit-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let writer = BoneWriter::new(dir.clone());

        writer.on_forward(&sample_request(), 7);
        writer.on_response(&sample_response(), 7).unwrap();

        let request_bone = std::fs::read_to_string(dir.join("7-request.txt")).unwrap();
        assert!(request_bone.starts_with("POST /anything?q=1 HTTP/1.1"));
        let response_bone = std::fs::read_to_string(dir.join("7-response.txt")).unwrap();
        assert!(response_bone.starts_with("HTTP/1.1 200 OK"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unwritable_directory_is_logged_not_fatal() {
        // /dev/null is not a directory, so both creation and writes fail
        let writer = BoneWriter::new(PathBuf::from("/dev/null/bones"));
        writer.on_forward(&sample_request(), 1);
        assert!(writer.on_response(&sample_response(), 1).is_ok());
    }
}
