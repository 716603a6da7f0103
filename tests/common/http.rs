//! Minimal HTTP/1.1 responder for module tests.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// A canned response for one path.
#[derive(Debug, Clone)]
pub struct Route {
    pub path: &'static str,
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

#[allow(dead_code)]
impl Route {
    pub fn html(path: &'static str, body: impl Into<String>) -> Self {
        Self {
            path,
            status: 200,
            content_type: "text/html; charset=utf-8",
            body: body.into(),
        }
    }

    pub fn json(path: &'static str, body: impl Into<String>) -> Self {
        Self {
            path,
            status: 200,
            content_type: "application/json",
            body: body.into(),
        }
    }
}

/// Serve `routes` on a local port; unknown paths get a 404.
/// Returns the base URL, e.g. `http://127.0.0.1:40123`.
pub async fn serve_http(routes: Vec<Route>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind http");
    let base = format!("http://{}", listener.local_addr().expect("local addr"));

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let routes = routes.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&request);
                let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();

                let (status, content_type, body) = match routes.iter().find(|r| r.path == path) {
                    Some(r) => (r.status, r.content_type, r.body.clone()),
                    None => (404, "text/plain", "not found".to_string()),
                };
                let response = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    content_type,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    base
}
