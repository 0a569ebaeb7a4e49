use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Client;
use tracing::trace;

use super::{HttpRequest, HttpResponse, HttpTransport, Method};
use crate::error::{Error, Result};

/// [`HttpTransport`] backed by a shared reqwest client.
///
/// The client carries no timeout of its own; deadlines are enforced by
/// [`super::fetch_with_timeout`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestTransport {
    /// Create a transport with a fresh connection pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .user_agent(concat!("peopledesk/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }

    fn classify(label: &str, err: &reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::timeout(label)
        } else {
            Error::network(format!("{label}: {err}"))
        }
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let label = request.label();
        let mut builder = self
            .client
            .request(Self::method(request.method), &request.url);

        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::network(format!("{label}: bad header name: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::network(format!("{label}: bad header value: {e}")))?;
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::classify(&label, &e))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| Self::classify(&label, &e))?;

        trace!(request = %label, status, bytes = text.len(), "Response received");
        Ok(HttpResponse { status, text })
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;
    use crate::person::Person;

    /// A transport that ignores proxy variables, so loopback stays local.
    fn direct() -> ReqwestTransport {
        ReqwestTransport {
            client: Client::builder().no_proxy().build().unwrap(),
        }
    }

    /// Serve one canned response on a loopback port; yields the raw request.
    async fn serve_once(response: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/people", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if raw.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&raw).to_string()
        });
        (url, handle)
    }

    #[test]
    fn test_method_mapping() {
        assert_eq!(ReqwestTransport::method(Method::Get), reqwest::Method::GET);
        assert_eq!(ReqwestTransport::method(Method::Post), reqwest::Method::POST);
        assert_eq!(ReqwestTransport::method(Method::Put), reqwest::Method::PUT);
        assert_eq!(
            ReqwestTransport::method(Method::Delete),
            reqwest::Method::DELETE
        );
    }

    #[tokio::test]
    async fn test_post_reaches_the_wire() {
        let (url, server) = serve_once(
            "HTTP/1.1 201 Created\r\nContent-Length: 33\r\nConnection: close\r\n\r\n{\"name\":\"Ana\",\"dni\":\"1\",\"age\":30}",
        )
        .await;

        let request =
            HttpRequest::json(Method::Post, &url, &Person::new("Ana", "1", 30)).unwrap();
        let response = direct().send(request).await.unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(response.body().person(), Some(Person::new("Ana", "1", 30)));

        let raw = server.await.unwrap();
        let lower = raw.to_lowercase();
        assert!(raw.starts_with("POST /people HTTP/1.1\r\n"));
        assert!(lower.contains("content-type: application/json\r\n"));
        assert!(raw.ends_with(r#"{"name":"Ana","dni":"1","age":30}"#));
    }

    #[tokio::test]
    async fn test_get_sends_accept_and_keeps_error_status() {
        let (url, server) = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 16\r\nConnection: close\r\n\r\n{\"error\":\"nope\"}",
        )
        .await;

        let response = direct()
            .send(HttpRequest::get(format!("{url}/a%20b")))
            .await
            .unwrap();
        assert_eq!(response.status, 404);
        assert!(!response.is_success());
        assert_eq!(response.body().error_message(), Some("nope".to_string()));

        let raw = server.await.unwrap();
        assert!(raw.starts_with("GET /people/a%20b HTTP/1.1\r\n"));
        assert!(raw.to_lowercase().contains("accept: application/json\r\n"));
    }

    #[tokio::test]
    async fn test_refused_connection_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/people", listener.local_addr().unwrap());
        drop(listener);

        let err = direct()
            .send(HttpRequest::get(url))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Network { .. }));
        assert!(!err.is_timeout());
    }
}
