use std::time::Duration;

use reqwest::{header::CONTENT_TYPE, Client, ClientBuilder, Proxy, Response, StatusCode};
use tracing::debug;
use url::Url;

use crate::config::{Limits, ProxySettings};
use crate::error::{AppError, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("post-summarizer/", env!("CARGO_PKG_VERSION"));

/// Response of a proxied page fetch.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub url: Url,
    pub status_code: u16,
    pub content_type: String,
    /// Body decoded as UTF-8, invalid sequences replaced.
    pub body: String,
    /// Size of the body as received, before decoding.
    pub byte_len: usize,
}

/// Builds a client that sends every request through the upstream proxy.
pub(crate) fn proxied_client(proxy: &ProxySettings, timeout: Duration) -> Result<Client> {
    let upstream = Proxy::all(proxy.endpoint())
        .map_err(|e| AppError::ConfigError(format!("Invalid proxy address: {}", e)))?
        .basic_auth(&proxy.username, &proxy.password);

    ClientBuilder::new()
        .proxy(upstream)
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))
}

/// Maps a response status onto the error taxonomy. 407 comes from the
/// proxy itself, so it is a network failure rather than an upstream one.
pub(crate) fn check_status(status: StatusCode, url: &Url) -> Result<()> {
    if status == StatusCode::PROXY_AUTHENTICATION_REQUIRED {
        return Err(AppError::NetworkError(
            "proxy rejected the credentials (HTTP 407)".to_string(),
        ));
    }
    if !status.is_success() {
        return Err(AppError::UpstreamError {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn content_type_of(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Reads a response body into memory, failing with `PayloadTooLarge` once
/// it grows past `max_bytes`. A declared Content-Length over the bound fails
/// before any chunk is read.
pub(crate) async fn read_bounded(mut response: Response, max_bytes: u64) -> Result<Vec<u8>> {
    let too_large = AppError::PayloadTooLarge { limit: max_bytes };
    if response.content_length().is_some_and(|len| len > max_bytes) {
        return Err(too_large);
    }

    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if (bytes.len() + chunk.len()) as u64 > max_bytes {
            return Err(too_large);
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

#[derive(Clone)]
pub struct ProxyFetcher {
    client: Client,
    max_bytes: u64,
}

impl ProxyFetcher {
    pub fn new(proxy: &ProxySettings, limits: &Limits) -> Result<Self> {
        Ok(Self {
            client: proxied_client(proxy, limits.fetch_timeout)?,
            max_bytes: limits.max_page_bytes,
        })
    }

    pub async fn fetch(&self, url: &Url) -> Result<FetchResult> {
        let response = self.client.get(url.as_str()).send().await?;
        check_status(response.status(), url)?;

        let status_code = response.status().as_u16();
        let final_url = response.url().clone();
        let content_type = content_type_of(&response);
        let raw = read_bounded(response, self.max_bytes).await?;
        let byte_len = raw.len();
        let body = String::from_utf8_lossy(&raw).into_owned();

        debug!(
            url = %final_url,
            status_code,
            content_type = %content_type,
            bytes = byte_len,
            "page fetched"
        );

        Ok(FetchResult {
            url: final_url,
            status_code,
            content_type,
            body,
            byte_len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use std::io::Write;
    use tokio::net::TcpListener;

    fn proxy_at(addr: std::net::SocketAddr) -> ProxySettings {
        ProxySettings {
            host: addr.ip().to_string(),
            port: addr.port(),
            username: "user".to_string(),
            password: "pass".to_string(),
        }
    }

    fn post_url() -> Url {
        Url::parse("http://social.example/post/42").unwrap()
    }

    #[tokio::test]
    async fn routes_request_through_proxy_with_credentials() {
        let mut proxy = Server::new_async().await;
        let mock = proxy
            .mock("GET", Matcher::Any)
            // base64("user:pass")
            .match_header("proxy-authorization", "Basic dXNlcjpwYXNz")
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body("<html><body>hello</body></html>")
            .create_async()
            .await;

        let fetcher = ProxyFetcher::new(&proxy_at(proxy.socket_address()), &Limits::default()).unwrap();
        let result = fetcher.fetch(&post_url()).await.unwrap();

        assert_eq!(result.status_code, 200);
        assert_eq!(result.content_type, "text/html; charset=utf-8");
        assert!(result.body.contains("hello"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn binary_body_keeps_its_received_size() {
        let mut proxy = Server::new_async().await;
        let _mock = proxy
            .mock("GET", Matcher::Any)
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(vec![0xFFu8; 10])
            .create_async()
            .await;

        let fetcher = ProxyFetcher::new(&proxy_at(proxy.socket_address()), &Limits::default()).unwrap();
        let result = fetcher.fetch(&post_url()).await.unwrap();

        assert_eq!(result.byte_len, 10);
        assert_eq!(result.body.chars().count(), 10);
    }

    #[tokio::test]
    async fn oversize_page_is_rejected() {
        let mut proxy = Server::new_async().await;
        let _mock = proxy
            .mock("GET", Matcher::Any)
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("x".repeat(2048))
            .create_async()
            .await;

        let limits = Limits {
            max_page_bytes: 1024,
            ..Limits::default()
        };
        let fetcher = ProxyFetcher::new(&proxy_at(proxy.socket_address()), &limits).unwrap();

        assert!(matches!(
            fetcher.fetch(&post_url()).await,
            Err(AppError::PayloadTooLarge { limit: 1024 })
        ));
    }

    #[tokio::test]
    async fn streamed_oversize_page_is_rejected() {
        let mut proxy = Server::new_async().await;
        let _mock = proxy
            .mock("GET", Matcher::Any)
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_chunked_body(|writer| {
                for _ in 0..4 {
                    writer.write_all(b"<p>padding padding padding</p>")?;
                }
                Ok(())
            })
            .create_async()
            .await;

        let limits = Limits {
            max_page_bytes: 64,
            ..Limits::default()
        };
        let fetcher = ProxyFetcher::new(&proxy_at(proxy.socket_address()), &limits).unwrap();

        assert!(matches!(
            fetcher.fetch(&post_url()).await,
            Err(AppError::PayloadTooLarge { limit: 64 })
        ));
    }

    #[tokio::test]
    async fn non_success_status_is_upstream_error() {
        let mut proxy = Server::new_async().await;
        let _mock = proxy
            .mock("GET", Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let fetcher = ProxyFetcher::new(&proxy_at(proxy.socket_address()), &Limits::default()).unwrap();
        match fetcher.fetch(&post_url()).await {
            Err(AppError::UpstreamError { status, url }) => {
                assert_eq!(status, 404);
                assert_eq!(url, "http://social.example/post/42");
            }
            other => panic!("expected UpstreamError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn proxy_auth_rejection_is_network_error() {
        let mut proxy = Server::new_async().await;
        let _mock = proxy
            .mock("GET", Matcher::Any)
            .with_status(407)
            .create_async()
            .await;

        let fetcher = ProxyFetcher::new(&proxy_at(proxy.socket_address()), &Limits::default()).unwrap();
        assert!(matches!(
            fetcher.fetch(&post_url()).await,
            Err(AppError::NetworkError(_))
        ));
    }

    #[tokio::test]
    async fn silent_proxy_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept and hold connections without ever answering.
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let limits = Limits {
            fetch_timeout: Duration::from_millis(200),
            ..Limits::default()
        };
        let fetcher = ProxyFetcher::new(&proxy_at(addr), &limits).unwrap();

        match fetcher.fetch(&post_url()).await {
            Err(AppError::NetworkError(msg)) => assert!(msg.contains("timed out")),
            other => panic!("expected NetworkError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unreachable_proxy_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = ProxyFetcher::new(&proxy_at(addr), &Limits::default()).unwrap();
        assert!(matches!(
            fetcher.fetch(&post_url()).await,
            Err(AppError::NetworkError(_))
        ));
    }
}
