//! Shared fixtures for unit tests.
//!
//! A minimal HTTP stub on `127.0.0.1` that answers each connection with a
//! canned JSON body chosen by request path, plus client helpers.

use crate::api::StatsClient;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, Notify};

/// A canned response for requests whose path (without query) equals `path`.
#[derive(Clone)]
pub struct Route {
    pub path: &'static str,
    pub status: &'static str,
    pub body: String,
}

impl Route {
    pub fn ok(path: &'static str, body: serde_json::Value) -> Self {
        Self {
            path,
            status: "200 OK",
            body: body.to_string(),
        }
    }

    pub fn status(path: &'static str, status: &'static str, body: serde_json::Value) -> Self {
        Self {
            path,
            status,
            body: body.to_string(),
        }
    }
}

/// Running stub server.
pub struct StubServer {
    pub base_url: String,
    /// Request lines seen so far, in arrival order.
    pub requests: Arc<Mutex<Vec<String>>>,
}

/// Serve `routes` until the test ends. Unknown paths get a 404 envelope.
pub async fn serve_routes(routes: Vec<Route>) -> StubServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = requests.clone();
    let routes = Arc::new(routes);

    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            let routes = routes.clone();
            let seen = seen.clone();
            tokio::spawn(async move {
                let mut socket = socket;
                let line = read_request_line(&mut socket).await;
                seen.lock().unwrap().push(line.clone());
                let path = request_path(&line);
                let (status, body) = routes
                    .iter()
                    .find(|r| r.path == path)
                    .map(|r| (r.status, r.body.clone()))
                    .unwrap_or((
                        "404 Not Found",
                        r#"{"success": false, "error": "not found"}"#.to_string(),
                    ));
                write_response(&mut socket, status, &body).await;
            });
        }
    });

    StubServer {
        base_url: format!("http://{}/api", addr),
        requests,
    }
}

/// Serve a single response, holding it back until `release` is notified.
/// `arrived` fires once the request has been read.
pub async fn serve_gated(
    body: serde_json::Value,
    release: Arc<Notify>,
) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let line = read_request_line(&mut socket).await;
        let _ = tx.send(line);
        release.notified().await;
        write_response(&mut socket, "200 OK", &body.to_string()).await;
    });

    (format!("http://{}/api", addr), rx)
}

/// Hold back the first response until `release` is notified; answer every
/// later request with `rest` right away. `arrived` carries the first request line.
pub async fn serve_gated_first(
    first: serde_json::Value,
    rest: serde_json::Value,
    release: Arc<Notify>,
) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let line = read_request_line(&mut socket).await;
        let _ = tx.send(line);
        tokio::spawn(async move {
            release.notified().await;
            write_response(&mut socket, "200 OK", &first.to_string()).await;
        });

        let rest = rest.to_string();
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            read_request_line(&mut socket).await;
            write_response(&mut socket, "200 OK", &rest).await;
        }
    });

    (format!("http://{}/api", addr), rx)
}

/// Base URL of a port nothing listens on.
pub async fn dead_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/api", addr)
}

/// Client that ignores proxy environment variables.
pub fn test_client(base_url: &str) -> StatsClient {
    let http = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    StatsClient::with_http_client(base_url, http)
}

async fn read_request_line(socket: &mut TcpStream) -> String {
    let mut buf = vec![0u8; 16 * 1024];
    let mut read = 0;
    loop {
        let n = socket.read(&mut buf[read..]).await.unwrap();
        read += n;
        if n == 0 || buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    String::from_utf8_lossy(&buf[..read])
        .lines()
        .next()
        .unwrap_or_default()
        .to_string()
}

fn request_path(request_line: &str) -> &str {
    let target = request_line.split_whitespace().nth(1).unwrap_or("");
    target.split('?').next().unwrap_or("")
}

async fn write_response(socket: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}
