//! HTTP/1.1 control server: accept loop, request framing, routing.
//!
//! Only what the three endpoints need is implemented:
//!
//! - one request per connection (`Connection: close` on every response),
//! - bodies framed by `Content-Length`; chunked uploads get `411`,
//! - `Expect: 100-continue` answered before the body is read,
//! - JSON in, JSON out.
//!
//! Shutdown follows the same pattern as the agent: the accept loop polls a
//! shared `AtomicBool` that `main.rs` clears on Ctrl+C.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::application::{ControlError, ControlService};
use crate::domain::config::ControlConfig;
use crate::domain::messages::CommandResponse;

/// Longest request line or header line accepted.
const MAX_LINE: usize = 8 * 1024;

/// Time allowed for a client to send its whole request.
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Interim response for `Expect: 100-continue`.
const CONTINUE: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

/// Body sent if a response cannot be serialized.
const FALLBACK_BODY: &str = r#"{"success":false,"error":"internal error"}"#;

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds `config.bind_addr` and serves until `running` is cleared.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound.
pub async fn run_server(
    config: ControlConfig,
    service: Arc<ControlService>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind control server on {}", config.bind_addr))?;
    info!("control server listening on {}", config.bind_addr);
    serve(listener, service, config.max_body_bytes, running).await;
    Ok(())
}

/// Accept loop over an already-bound listener.
pub async fn serve(
    listener: TcpListener,
    service: Arc<ControlService>,
    max_body_bytes: usize,
    running: Arc<AtomicBool>,
) {
    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // Short timeout so the flag is rechecked when nobody connects.
        match timeout(Duration::from_millis(200), listener.accept()).await {
            Ok(Ok((stream, peer))) => {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    handle_connection(stream, peer, service, max_body_bytes).await;
                });
            }
            Ok(Err(e)) => error!("accept error: {e}"),
            Err(_) => {}
        }
    }
}

// ── Request framing ───────────────────────────────────────────────────────────

/// A parsed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    /// Path without the query string.
    pub path: String,
    pub body: Vec<u8>,
}

/// Failure to read a request off the socket.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("request body of {0} bytes is too large")]
    TooLarge(usize),

    #[error("Transfer-Encoding {0:?} is not supported, send a Content-Length body")]
    LengthRequired(String),

    #[error("timed out reading request")]
    Timeout,
}

impl RequestError {
    /// Status to answer with, or `None` if the connection is unusable.
    fn status_code(&self) -> Option<u16> {
        match self {
            RequestError::Io(_) | RequestError::Timeout => None,
            RequestError::Malformed(_) => Some(400),
            RequestError::TooLarge(_) => Some(413),
            RequestError::LengthRequired(_) => Some(411),
        }
    }
}

/// Parses `"POST /type?x=1 HTTP/1.1"` into method and path.
pub fn parse_request_line(line: &str) -> Result<(String, String), RequestError> {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(target), Some(version)) if version.starts_with("HTTP/1.") => {
            let path = target.split('?').next().unwrap_or(target);
            Ok((method.to_ascii_uppercase(), path.to_string()))
        }
        _ => Err(RequestError::Malformed(format!("bad request line {line:?}"))),
    }
}

/// Splits `"Name: value"` into trimmed name and value.
pub fn parse_header(line: &str) -> Result<(&str, &str), RequestError> {
    match line.split_once(':') {
        Some((name, value)) => Ok((name.trim(), value.trim())),
        None => Err(RequestError::Malformed(format!("bad header {line:?}"))),
    }
}

/// Returns the `Content-Length` value if `line` is that header.
pub fn parse_content_length(line: &str) -> Result<Option<usize>, RequestError> {
    let (name, value) = parse_header(line)?;
    if !name.eq_ignore_ascii_case("content-length") {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| RequestError::Malformed(format!("bad Content-Length {value:?}")))
}

async fn read_line<R>(reader: &mut R) -> Result<String, RequestError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let n = (&mut *reader)
        .take(MAX_LINE as u64)
        .read_line(&mut line)
        .await?;
    if n == 0 {
        return Err(RequestError::Malformed("connection closed mid-request".into()));
    }
    if !line.ends_with('\n') {
        return Err(RequestError::Malformed("header line too long".into()));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Reads one request: request line, headers, then `Content-Length` bytes.
///
/// `stream` is written to only to send `100 Continue` when the client asks
/// for it and the body will be accepted.
pub async fn read_request<S>(stream: &mut S, max_body_bytes: usize) -> Result<HttpRequest, RequestError>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    let (method, path) = parse_request_line(&read_line(stream).await?)?;

    let mut content_length = 0;
    let mut expect_continue = false;
    loop {
        let line = read_line(stream).await?;
        if line.is_empty() {
            break;
        }
        if let Some(len) = parse_content_length(&line)? {
            content_length = len;
            continue;
        }
        let (name, value) = parse_header(&line)?;
        if name.eq_ignore_ascii_case("transfer-encoding") && !value.eq_ignore_ascii_case("identity") {
            return Err(RequestError::LengthRequired(value.to_string()));
        }
        if name.eq_ignore_ascii_case("expect") {
            expect_continue = value.eq_ignore_ascii_case("100-continue");
        }
    }

    if content_length > max_body_bytes {
        return Err(RequestError::TooLarge(content_length));
    }
    if expect_continue && content_length > 0 {
        stream.write_all(CONTINUE).await?;
        stream.flush().await?;
    }
    let mut body = vec![0; content_length];
    stream.read_exact(&mut body).await?;

    Ok(HttpRequest { method, path, body })
}

// ── Routing ───────────────────────────────────────────────────────────────────

/// Dispatches a request and returns the status code and JSON body.
pub async fn route(service: &ControlService, request: &HttpRequest) -> (u16, String) {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/status") => (200, to_json(&service.status())),
        ("POST", "/type") => match parse_body(&request.body) {
            Ok(req) => command_result(service.type_text(req).await),
            Err(e) => command_result(Err(e)),
        },
        ("POST", "/keypress") => match parse_body(&request.body) {
            Ok(req) => command_result(service.press_key(req).await),
            Err(e) => command_result(Err(e)),
        },
        (_, "/status" | "/type" | "/keypress") => {
            (405, to_json(&CommandResponse::failed("Method not allowed")))
        }
        _ => (404, to_json(&CommandResponse::failed("Not found"))),
    }
}

/// An empty body decodes as the request's default (every field missing).
fn parse_body<T>(body: &[u8]) -> Result<T, ControlError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ControlError::MalformedBody(e.to_string()))
}

fn command_result(result: Result<CommandResponse, ControlError>) -> (u16, String) {
    match result {
        Ok(resp) => (200, to_json(&resp)),
        Err(e) => {
            let status = e.status_code();
            if status >= 500 {
                error!("command failed: {e}");
            } else {
                debug!("rejected request: {e}");
            }
            (status, to_json(&CommandResponse::failed(e.to_string())))
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| FALLBACK_BODY.to_string())
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        411 => "Length Required",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Serializes a complete response.
pub fn format_response(status: u16, body: &str) -> String {
    format!(
        "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        reason_phrase(status),
        body.len()
    )
}

// ── Per-connection handler ────────────────────────────────────────────────────

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    service: Arc<ControlService>,
    max_body_bytes: usize,
) {
    match serve_connection(stream, &service, max_body_bytes).await {
        Ok((method, path, status)) => info!("{peer} {method} {path} -> {status}"),
        Err(e) => warn!("{peer}: {e:#}"),
    }
}

async fn serve_connection(
    stream: TcpStream,
    service: &ControlService,
    max_body_bytes: usize,
) -> anyhow::Result<(String, String, u16)> {
    let mut reader = BufReader::new(stream);

    let request = match timeout(READ_TIMEOUT, read_request(&mut reader, max_body_bytes)).await {
        Ok(result) => result,
        Err(_) => Err(RequestError::Timeout),
    };

    let (method, path, status, body) = match request {
        Ok(request) => {
            let (status, body) = route(service, &request).await;
            (request.method, request.path, status, body)
        }
        Err(e) => {
            let Some(status) = e.status_code() else {
                return Err(e.into());
            };
            let body = to_json(&CommandResponse::failed(e.to_string()));
            ("-".to_string(), "-".to_string(), status, body)
        }
    };

    let mut stream = reader.into_inner();
    stream
        .write_all(format_response(status, &body).as_bytes())
        .await
        .context("writing response")?;
    stream.shutdown().await.context("closing connection")?;
    Ok((method, path, status))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use typist_agent::application::typist::Typist;
    use typist_agent::infrastructure::recording::RecordingSink;
    use typist_agent::infrastructure::sleeper::RecordingSleeper;

    /// A socket that yields `raw` and expects no writes.
    fn incoming(raw: &[u8]) -> BufReader<tokio_test::io::Mock> {
        BufReader::new(tokio_test::io::Builder::new().read(raw).build())
    }

    fn service() -> (ControlService, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let typist = Typist::new(sink.clone(), Arc::new(RecordingSleeper::new()));
        (ControlService::new(typist, Duration::ZERO), sink)
    }

    fn request(method: &str, path: &str, body: &str) -> HttpRequest {
        HttpRequest {
            method: method.to_string(),
            path: path.to_string(),
            body: body.as_bytes().to_vec(),
        }
    }

    // ── Framing ───────────────────────────────────────────────────────────────

    #[test]
    fn test_request_line_strips_query() {
        let (method, path) = parse_request_line("post /type?debug=1 HTTP/1.1").unwrap();
        assert_eq!(method, "POST");
        assert_eq!(path, "/type");
    }

    #[test]
    fn test_request_line_without_version_is_malformed() {
        assert!(matches!(
            parse_request_line("GET /status"),
            Err(RequestError::Malformed(_))
        ));
    }

    #[test]
    fn test_content_length_is_case_insensitive() {
        assert_eq!(parse_content_length("content-LENGTH: 42").unwrap(), Some(42));
        assert_eq!(parse_content_length("Host: pi.local:5000").unwrap(), None);
        assert!(parse_content_length("Content-Length: lots").is_err());
    }

    #[tokio::test]
    async fn test_read_request_reads_exact_body() {
        // Arrange
        let raw = b"POST /type HTTP/1.1\r\nHost: x\r\nContent-Length: 13\r\n\r\n{\"text\":\"a\"}\n";
        let mut reader = incoming(raw);

        // Act
        let req = read_request(&mut reader, 1024).await.unwrap();

        // Assert
        assert_eq!(req.method, "POST");
        assert_eq!(req.path, "/type");
        assert_eq!(req.body, b"{\"text\":\"a\"}\n");
    }

    #[tokio::test]
    async fn test_read_request_rejects_oversized_body() {
        let raw = b"POST /type HTTP/1.1\r\nContent-Length: 999999\r\n\r\n";
        let mut reader = incoming(raw);
        let err = read_request(&mut reader, 1024).await.unwrap_err();
        assert!(matches!(err, RequestError::TooLarge(999999)));
        assert_eq!(err.status_code(), Some(413));
    }

    #[tokio::test]
    async fn test_read_request_without_body_has_empty_body() {
        let raw = b"GET /status HTTP/1.1\r\n\r\n";
        let mut reader = incoming(raw);
        let req = read_request(&mut reader, 1024).await.unwrap();
        assert!(req.body.is_empty());
    }

    #[tokio::test]
    async fn test_chunked_body_is_length_required() {
        let raw = b"POST /type HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n";
        let mut reader = incoming(raw);

        let err = read_request(&mut reader, 1024).await.unwrap_err();

        assert!(matches!(err, RequestError::LengthRequired(ref te) if te == "chunked"));
        assert_eq!(err.status_code(), Some(411));
        assert!(err.to_string().contains("Content-Length"));
    }

    #[tokio::test]
    async fn test_expect_continue_is_answered_before_body() {
        // Arrange: the client holds the body back until it sees 100 Continue.
        let head = b"POST /type HTTP/1.1\r\nContent-Length: 12\r\nExpect: 100-continue\r\n\r\n";
        let socket = tokio_test::io::Builder::new()
            .read(head)
            .write(b"HTTP/1.1 100 Continue\r\n\r\n")
            .read(br#"{"text":"a"}"#)
            .build();
        let mut stream = BufReader::new(socket);

        // Act
        let req = read_request(&mut stream, 1024).await.unwrap();

        // Assert
        assert_eq!(req.body, br#"{"text":"a"}"#);
    }

    #[tokio::test]
    async fn test_expect_continue_with_oversized_body_is_refused_without_continue() {
        let raw = b"POST /type HTTP/1.1\r\nContent-Length: 999999\r\nExpect: 100-continue\r\n\r\n";
        let mut reader = incoming(raw);
        let err = read_request(&mut reader, 1024).await.unwrap_err();
        assert!(matches!(err, RequestError::TooLarge(_)));
    }

    #[test]
    fn test_header_is_split_and_trimmed() {
        assert_eq!(parse_header("Expect:  100-continue ").unwrap(), ("Expect", "100-continue"));
        assert!(parse_header("no colon here").is_err());
    }

    #[test]
    fn test_response_has_length_and_close() {
        let resp = format_response(404, r#"{"success":false}"#);
        assert!(resp.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(resp.contains("Content-Length: 17\r\n"));
        assert!(resp.contains("Connection: close\r\n"));
        assert!(resp.ends_with("\r\n\r\n{\"success\":false}"));
    }

    // ── Routing ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_route_type_types_text() {
        let (svc, sink) = service();

        let (status, body) = route(&svc, &request("POST", "/type", r#"{"text":"ok"}"#)).await;

        assert_eq!(status, 200);
        assert_eq!(body, r#"{"success":true}"#);
        assert_eq!(sink.rendered(), "ok");
    }

    #[tokio::test]
    async fn test_route_type_without_body_is_400() {
        let (svc, _) = service();

        let (status, body) = route(&svc, &request("POST", "/type", "")).await;

        assert_eq!(status, 400);
        assert_eq!(body, r#"{"success":false,"error":"No text provided"}"#);
    }

    #[tokio::test]
    async fn test_route_keypress_without_key_is_400() {
        let (svc, _) = service();
        let (status, body) = route(&svc, &request("POST", "/keypress", "{}")).await;
        assert_eq!(status, 400);
        assert_eq!(body, r#"{"success":false,"error":"No key provided"}"#);
    }

    #[tokio::test]
    async fn test_route_malformed_json_is_400() {
        let (svc, _) = service();
        let (status, _) = route(&svc, &request("POST", "/keypress", "{key:")).await;
        assert_eq!(status, 400);
    }

    #[tokio::test]
    async fn test_route_typing_failure_is_500() {
        let (svc, sink) = service();
        sink.set_should_fail(true);

        let (status, body) = route(&svc, &request("POST", "/keypress", r#"{"key":"enter"}"#)).await;

        assert_eq!(status, 500);
        let resp: CommandResponse = serde_json::from_str(&body).unwrap();
        assert!(!resp.success);
        assert!(resp.error.is_some());
    }

    #[tokio::test]
    async fn test_route_unknown_path_is_404() {
        let (svc, _) = service();
        let (status, _) = route(&svc, &request("GET", "/reboot", "")).await;
        assert_eq!(status, 404);
    }

    #[tokio::test]
    async fn test_route_wrong_method_is_405() {
        let (svc, _) = service();
        let (status, _) = route(&svc, &request("GET", "/type", "")).await;
        assert_eq!(status, 405);
    }

    #[tokio::test]
    async fn test_route_status_reports_online() {
        let (svc, _) = service();
        let (status, body) = route(&svc, &request("GET", "/status", "")).await;
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(status, 200);
        assert_eq!(value["status"], "online");
        assert_eq!(value["commands_executed"], 0);
    }
}
