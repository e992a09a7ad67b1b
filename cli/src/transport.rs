//! HTTP seam between the generation client and the network.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Method, Url};
use serde_json::Value;
use tracing::{debug, instrument};

/// A fully prepared request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub bearer: String,
    pub body: Option<Value>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Why a request produced no response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    Timeout,
    Connect(String),
    Other(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure>;
}

/// [`Transport`] backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportFailure> {
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .user_agent(concat!("tunecraft/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| TransportFailure::Other(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip_all, fields(method = %request.method, path = request.url.path()))]
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure> {
        let mut builder = self
            .http
            .request(request.method, request.url)
            .bearer_auth(&request.bearer)
            .header(header::CONTENT_TYPE, "application/json")
            .timeout(request.timeout);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;
        debug!(status, bytes = body.len(), "response received");
        Ok(HttpResponse { status, body })
    }
}

fn classify(err: reqwest::Error) -> TransportFailure {
    if err.is_timeout() {
        TransportFailure::Timeout
    } else if err.is_connect() {
        TransportFailure::Connect(err.to_string())
    } else {
        TransportFailure::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    /// Serves one connection: reads the request head, waits `delay`, then writes `reply`.
    async fn serve_once(reply: &'static str, delay: Duration) -> (Url, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let mut read = 0;
            loop {
                let n = socket.read(&mut buf[read..]).await.unwrap();
                read += n;
                let text = String::from_utf8_lossy(&buf[..read]).to_string();
                if n == 0 || request_complete(&text) {
                    break;
                }
            }
            tokio::time::sleep(delay).await;
            let _ = socket.write_all(reply.as_bytes()).await;
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&buf[..read]).to_string()
        });
        (Url::parse(&format!("http://{addr}/generate")).unwrap(), handle)
    }

    fn request_complete(text: &str) -> bool {
        let Some(head_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..head_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if !name.trim().eq_ignore_ascii_case("content-length") {
                    return None;
                }
                value.trim().parse::<usize>().ok()
            })
            .unwrap_or(0);
        text.len() >= head_end + 4 + length
    }

    fn request(url: Url, timeout: Duration) -> HttpRequest {
        HttpRequest {
            method: Method::POST,
            url,
            bearer: "secret-token".into(),
            body: Some(serde_json::json!({ "prompt": "hi" })),
            timeout,
        }
    }

    #[tokio::test]
    async fn sends_bearer_and_json_body() {
        let reply = "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 11\r\nconnection: close\r\n\r\n{\"id\":\"t\"}\n";
        let (url, server) = serve_once(reply, Duration::ZERO).await;
        let transport = ReqwestTransport::new().unwrap();

        let response = transport.execute(request(url, Duration::from_secs(5))).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "{\"id\":\"t\"}\n");

        let raw = server.await.unwrap().to_lowercase();
        assert!(raw.starts_with("post /generate"));
        assert!(raw.contains("authorization: bearer secret-token"));
        assert!(raw.contains("content-type: application/json"));
        assert!(raw.contains("{\"prompt\":\"hi\"}"));
    }

    #[tokio::test]
    async fn non_success_status_is_still_a_response() {
        let reply = "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 12\r\nconnection: close\r\n\r\nserver error";
        let (url, _server) = serve_once(reply, Duration::ZERO).await;
        let transport = ReqwestTransport::new().unwrap();

        let response = transport.execute(request(url, Duration::from_secs(5))).await.unwrap();
        assert!(!response.is_success());
        assert_eq!(response, HttpResponse { status: 500, body: "server error".into() });
    }

    #[tokio::test]
    async fn slow_server_maps_to_timeout() {
        let reply = "HTTP/1.1 200 OK\r\ncontent-length: 2\r\n\r\n{}";
        let (url, _server) = serve_once(reply, Duration::from_secs(2)).await;
        let transport = ReqwestTransport::new().unwrap();

        let failure =
            transport.execute(request(url, Duration::from_millis(100))).await.unwrap_err();
        assert_eq!(failure, TransportFailure::Timeout);
    }

    #[tokio::test]
    async fn refused_connection_maps_to_connect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let url = Url::parse(&format!("http://{addr}/generate")).unwrap();
        let transport = ReqwestTransport::new().unwrap();

        let failure = transport.execute(request(url, Duration::from_secs(5))).await.unwrap_err();
        assert!(matches!(failure, TransportFailure::Connect(_)), "{failure:?}");
    }
}
