//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use fragment_gateway::config::loader::parse_config;
use fragment_gateway::HttpServer;

/// A canned upstream response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

#[allow(dead_code)]
impl MockResponse {
    pub fn html(body: &str) -> Self {
        Self {
            status: 200,
            headers: vec![("Content-Type".into(), "text/html; charset=utf-8".into())],
            body: body.to_string(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: vec![],
            body: String::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    fn to_wire(&self) -> String {
        let reason = StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown");
        let mut wire = format!("HTTP/1.1 {} {}\r\n", self.status, reason);
        for (name, value) in &self.headers {
            wire.push_str(&format!("{}: {}\r\n", name, value));
        }
        wire.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.body.len(),
            self.body
        ));
        wire
    }
}

/// Request heads received by a mock upstream, in arrival order.
pub type RequestLog = Arc<Mutex<Vec<String>>>;

/// Start a mock upstream that always answers with `response`.
pub async fn start_upstream(response: MockResponse) -> SocketAddr {
    start_recording_upstream(response).await.0
}

/// Start a mock upstream that also records every request head it receives.
pub async fn start_recording_upstream(response: MockResponse) -> (SocketAddr, RequestLog) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: RequestLog = Arc::default();
    let wire = response.to_wire();

    let requests = log.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let wire = wire.clone();
            let requests = requests.clone();
            tokio::spawn(async move {
                serve_once(socket, &wire, &requests).await;
            });
        }
    });

    (addr, log)
}

async fn serve_once(mut socket: TcpStream, wire: &str, requests: &RequestLog) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    requests.lock().unwrap().push(String::from_utf8_lossy(&head).into_owned());

    let _ = socket.write_all(wire.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Start the gateway from TOML configuration on an ephemeral port.
pub async fn start_gateway(config: &str) -> SocketAddr {
    let config = parse_config(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config);
    tokio::spawn(async move {
        server.run(listener, std::future::pending()).await.unwrap();
    });

    addr
}

/// Client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
