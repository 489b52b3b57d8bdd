use crate::bootstrap::worker_script;
use crate::cfg::Config;
use crate::notification::model::Payload;

use anyhow::{Context, Result};
use request_http_parser::parser::{Method, Request};
use std::path::{Component, Path};
use tokio::io::AsyncWrite;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    sync::oneshot::Receiver,
};

pub const BAD_REQUEST: &str = "HTTP/1.1 400 Bad Request\r\nConnection: close\r\n\r\n";
pub const NOT_FOUND: &str = "HTTP/1.1 404 Not Found\r\nConnection: close\r\n\r\n";
pub const OPTIONS_CORS: &str = "HTTP/1.1 204 No Content\r\n\
            Access-Control-Allow-Origin: *\r\n\
            Access-Control-Allow-Methods: POST, GET, OPTIONS\r\n\
            Access-Control-Allow-Headers: Content-Type\r\n\
            Access-Control-Max-Age: 86400\r\n\
            \r\n";

/// Stem of the wasm-bindgen output, `push_relay.js` / `push_relay_bg.wasm`.
pub const PKG_STEM: &str = "push_relay";
const PKG_ROUTE: &str = "/pkg/";
const MAX_REQUEST: usize = 4096;

fn ok_response(content_type: &str, extra_headers: &str, len: usize) -> String {
    format!(
        "HTTP/1.1 200 OK\r\n\
        Access-Control-Allow-Origin: *\r\n\
        Content-Type: {content_type}\r\n\
        Content-Length: {len}\r\n\
        {extra_headers}\
        Connection: close\r\n\
        \r\n"
    )
}

fn content_type(file: &str) -> &'static str {
    match Path::new(file).extension().and_then(|ext| ext.to_str()) {
        Some("js") => "application/javascript",
        Some("wasm") => "application/wasm",
        Some("json") => "application/json",
        Some("ts") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Only plain relative paths below the package directory are served.
fn is_safe_relative(file: &str) -> bool {
    !file.is_empty()
        && !file.ends_with('/')
        && Path::new(file)
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}

/// Total length of the request once its head is complete: head plus
/// `Content-Length` bytes of body.
fn request_len(buf: &[u8]) -> Option<usize> {
    let head_end = buf.windows(4).position(|w| w == b"\r\n\r\n")? + 4;
    let head = String::from_utf8_lossy(&buf[..head_end]);
    let body_len = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    Some(head_end + body_len)
}

pub struct Server {}
impl Server {
    /// Development host for the worker: serves the glue script, the compiled
    /// package, and a payload preview endpoint.
    pub async fn start(config: &'static Config, mut shutdown_rx: Receiver<()>) -> Result<()> {
        let listener = TcpListener::bind(&config.server.bind_addr)
            .await
            .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;
        tracing::info!(
            addr = %config.server.bind_addr,
            pkg_dir = %config.server.pkg_dir,
            "dev host running"
        );

        loop {
            tokio::select! {
                conn = listener.accept() => {
                    let (mut stream, peer) = conn?;
                    tokio::spawn(async move {
                        let (reader, writer) = stream.split();
                        if let Err(e) = Self::handle_client(reader, writer, config).await {
                            tracing::warn!(%peer, error = %e, "connection error");
                        }
                    });
                }
                _ = &mut shutdown_rx => {
                    tracing::info!("shutting down dev host");
                    break;
                }
            }
        }

        Ok(())
    }

    pub async fn handle_client<Reader, Writer>(
        mut reader: Reader,
        mut writer: Writer,
        config: &Config,
    ) -> Result<()>
    where
        Reader: AsyncRead + Unpin,
        Writer: AsyncWrite + Unpin,
    {
        let mut buffer = [0; MAX_REQUEST];
        let mut size = 0;
        // a body may arrive in later segments than the head
        while size < MAX_REQUEST {
            let n = reader
                .read(&mut buffer[size..])
                .await
                .context("Failed to read stream")?;
            size += n;
            if n == 0 || request_len(&buffer[..size]).is_some_and(|len| size >= len) {
                break;
            }
        }

        let (head, body) = if size >= MAX_REQUEST {
            tracing::warn!(size, "request too large");
            (BAD_REQUEST.to_string(), b"Request too large".to_vec())
        } else {
            let request = String::from_utf8_lossy(&buffer[..size]);
            match Request::new(&request) {
                Ok(request) => Self::route(&request, config).await,
                Err(e) => {
                    tracing::warn!(error = %e, "malformed request");
                    (BAD_REQUEST.to_string(), e.to_string().into_bytes())
                }
            }
        };

        writer
            .write_all(head.as_bytes())
            .await
            .context("Failed to write")?;
        writer.write_all(&body).await.context("Failed to write")?;
        writer.flush().await.context("Failed to flush")?;
        Ok(())
    }

    async fn route(request: &Request, config: &Config) -> (String, Vec<u8>) {
        tracing::debug!(path = %request.path, "request");
        match (&request.method, request.path.as_str()) {
            (Method::OPTIONS, _) => (OPTIONS_CORS.to_string(), Vec::new()),
            (Method::GET, "/service-worker.js") => {
                let script = worker_script(PKG_ROUTE, PKG_STEM);
                let head = ok_response(
                    "application/javascript",
                    "Service-Worker-Allowed: /\r\nCache-Control: no-cache\r\n",
                    script.len(),
                );
                (head, script.into_bytes())
            }
            (Method::GET, path) if path.starts_with(PKG_ROUTE) => {
                Self::serve_pkg(&path[PKG_ROUTE.len()..], config).await
            }
            (Method::POST, "/preview") => Self::preview(request, config),
            _ => (NOT_FOUND.to_string(), b"404 Not Found".to_vec()),
        }
    }

    async fn serve_pkg(file: &str, config: &Config) -> (String, Vec<u8>) {
        if !is_safe_relative(file) {
            return (NOT_FOUND.to_string(), b"404 Not Found".to_vec());
        }
        let path = Path::new(&config.server.pkg_dir).join(file);
        match tokio::fs::read(&path).await {
            Ok(bytes) => (ok_response(content_type(file), "", bytes.len()), bytes),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "package file unavailable");
                (NOT_FOUND.to_string(), b"404 Not Found".to_vec())
            }
        }
    }

    /// Resolves a request body exactly as the worker would resolve a push payload.
    fn preview(request: &Request, config: &Config) -> (String, Vec<u8>) {
        let payload = request
            .body
            .as_deref()
            .filter(|body| !body.is_empty())
            .map(str::as_bytes);
        let resolved = Payload::decode(payload).resolve(&config.relay);
        match serde_json::to_vec(&resolved) {
            Ok(json) => (ok_response("application/json", "", json.len()), json),
            Err(e) => (BAD_REQUEST.to_string(), e.to_string().into_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::model::NotificationRequest;

    async fn roundtrip(raw: &str, config: &Config) -> (String, Vec<u8>) {
        let mut out = Vec::new();
        Server::handle_client(raw.as_bytes(), &mut out, config)
            .await
            .unwrap();
        let split = out
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("response head")
            + 4;
        let body = out.split_off(split);
        (String::from_utf8(out).unwrap(), body)
    }

    fn post(path: &str, body: &str) -> String {
        format!(
            "POST {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        )
    }

    #[tokio::test]
    async fn serves_worker_script() {
        let config = Config::default();
        let (head, body) = roundtrip(
            "GET /service-worker.js HTTP/1.1\r\nHost: localhost\r\n\r\n",
            &config,
        )
        .await;

        assert!(head.starts_with("HTTP/1.1 200 OK"));
        assert!(head.contains("Content-Type: application/javascript"));
        assert!(head.contains("Service-Worker-Allowed: /"));
        assert_eq!(body, worker_script(PKG_ROUTE, PKG_STEM).into_bytes());
    }

    #[tokio::test]
    async fn preview_resolves_payload() {
        let config = Config::default();
        let (head, body) = roundtrip(
            &post("/preview", r#"{"title":"Order filled","data":{"url":"/orders"}}"#),
            &config,
        )
        .await;

        assert!(head.starts_with("HTTP/1.1 200 OK"));
        let resolved: NotificationRequest = serde_json::from_slice(&body).unwrap();
        assert_eq!(resolved.title, "Order filled");
        assert_eq!(resolved.options.body, "Default body message.");
        assert_eq!(resolved.options.data.url, "/orders");
    }

    #[tokio::test]
    async fn preview_of_plain_text_uses_fallback_title() {
        let config = Config::default();
        let (_, body) = roundtrip(&post("/preview", "Hello"), &config).await;

        let resolved: NotificationRequest = serde_json::from_slice(&body).unwrap();
        assert_eq!(resolved.title, "New Notification");
        assert_eq!(resolved.options.body, "Hello");
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let config = Config::default();
        let (head, _) = roundtrip("GET /nope HTTP/1.1\r\nHost: localhost\r\n\r\n", &config).await;
        assert!(head.starts_with("HTTP/1.1 404 Not Found"));
    }

    #[tokio::test]
    async fn pkg_files_are_served_from_configured_dir() {
        let dir = std::env::temp_dir().join(format!("push-relay-pkg-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("push_relay_bg.wasm"), b"\0asm")
            .await
            .unwrap();

        let mut config = Config::default();
        config.server.pkg_dir = dir.to_string_lossy().into_owned();

        let (head, body) = roundtrip(
            "GET /pkg/push_relay_bg.wasm HTTP/1.1\r\nHost: localhost\r\n\r\n",
            &config,
        )
        .await;
        assert!(head.contains("Content-Type: application/wasm"));
        assert!(head.contains("Content-Length: 4"));
        assert_eq!(body, b"\0asm");

        let (head, _) = roundtrip(
            "GET /pkg/missing.js HTTP/1.1\r\nHost: localhost\r\n\r\n",
            &config,
        )
        .await;
        assert!(head.starts_with("HTTP/1.1 404"));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn preflight_gets_cors_headers() {
        let config = Config::default();
        let (head, body) = roundtrip(
            "OPTIONS /preview HTTP/1.1\r\nHost: localhost\r\n\r\n",
            &config,
        )
        .await;

        assert!(head.starts_with("HTTP/1.1 204 No Content"));
        assert!(head.contains("Access-Control-Allow-Origin: *"));
        assert!(head.contains("Access-Control-Allow-Methods: POST, GET, OPTIONS"));
        assert!(head.contains("Access-Control-Allow-Headers: Content-Type"));
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn malformed_request_is_bad_request() {
        let config = Config::default();
        let (head, _) = roundtrip("garbage", &config).await;
        assert!(head.starts_with("HTTP/1.1 400 Bad Request"));
    }

    #[tokio::test]
    async fn oversized_request_is_bad_request() {
        let config = Config::default();
        let raw = post("/preview", &"x".repeat(5000));
        let (head, body) = roundtrip(&raw, &config).await;

        assert!(head.starts_with("HTTP/1.1 400 Bad Request"));
        assert_eq!(body, b"Request too large");
    }

    #[tokio::test]
    async fn traversal_through_pkg_route_is_not_found() {
        let config = Config::default();
        let (head, body) = roundtrip(
            "GET /pkg/../Cargo.toml HTTP/1.1\r\nHost: localhost\r\n\r\n",
            &config,
        )
        .await;

        assert!(head.starts_with("HTTP/1.1 404 Not Found"));
        assert_eq!(body, b"404 Not Found");
    }

    #[tokio::test]
    async fn preview_body_split_across_reads() {
        let config = Config::default();
        let raw = post("/preview", r#"{"title":"Split","body":"second segment"}"#);
        let (first, second) = raw.split_at(raw.find("\r\n\r\n").unwrap() + 4);

        let mut out = Vec::new();
        let reader = first.as_bytes().chain(second.as_bytes());
        Server::handle_client(reader, &mut out, &config)
            .await
            .unwrap();

        let response = String::from_utf8(out).unwrap();
        let (head, body) = response.split_once("\r\n\r\n").unwrap();
        assert!(head.starts_with("HTTP/1.1 200 OK"));
        let resolved: NotificationRequest = serde_json::from_str(body).unwrap();
        assert_eq!(resolved.title, "Split");
        assert_eq!(resolved.options.body, "second segment");
    }

    #[test]
    fn request_len_waits_for_declared_body() {
        assert_eq!(request_len(b"GET / HTTP/1.1\r\nHost: a"), None);
        assert_eq!(request_len(b"GET / HTTP/1.1\r\n\r\n"), Some(18));
        assert_eq!(
            request_len(b"POST / HTTP/1.1\r\ncontent-length: 5\r\n\r\nab"),
            Some(43)
        );
    }

    #[test]
    fn rejects_paths_outside_package_dir() {
        assert!(is_safe_relative("push_relay.js"));
        assert!(is_safe_relative("snippets/inline0.js"));
        assert!(!is_safe_relative(""));
        assert!(!is_safe_relative("../Cargo.toml"));
        assert!(!is_safe_relative("snippets/../../secret"));
        assert!(!is_safe_relative("/etc/passwd"));
        assert!(!is_safe_relative("snippets/"));
    }

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(content_type("push_relay.js"), "application/javascript");
        assert_eq!(content_type("push_relay_bg.wasm"), "application/wasm");
        assert_eq!(content_type("README"), "application/octet-stream");
    }
}
