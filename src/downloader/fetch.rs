// Page fetch over HTTP

use async_trait::async_trait;
use reqwest::header::REFERER;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::errors::DownloadError;
use super::models::{NetworkConfig, PageDocument};
use super::traits::PageFetcher;

pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(config: &NetworkConfig) -> Result<Self, DownloadError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.as_str());

        if let Some(secs) = config.timeout {
            builder = builder.timeout(Duration::from_secs(u64::from(secs)));
        }

        if let Some(proxy_url) = config.proxy.as_deref() {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
                DownloadError::FetchFailed(format!("invalid proxy {}: {}", proxy_url, e))
            })?;
            builder = builder.proxy(proxy);
        } else if !config.use_system_proxy {
            builder = builder.no_proxy();
        }

        let client = builder
            .build()
            .map_err(|e| DownloadError::FetchFailed(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, page_url: &Url) -> Result<PageDocument, DownloadError> {
        let response = self
            .client
            .get(page_url.clone())
            .header(REFERER, page_url.as_str())
            .send()
            .await?
            .error_for_status()?;

        let url = response.url().clone();
        let html = response.text().await?;
        debug!(url = %url, bytes = html.len(), "page fetched");

        Ok(PageDocument { url, html })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and hand back the raw request head.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (Url, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "{}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&request).to_string()
        });

        let url = Url::parse(&format!("http://{}/video/58422-11.html", addr)).unwrap();
        (url, handle)
    }

    fn local_config() -> NetworkConfig {
        NetworkConfig {
            use_system_proxy: false,
            timeout: Some(5),
            ..NetworkConfig::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_sends_referer_and_user_agent() {
        let (url, server) = serve_once("HTTP/1.1 200 OK", "<script>source: '/x/index.m3u8'</script>").await;
        let fetcher = HttpPageFetcher::new(&local_config()).unwrap();

        let page = fetcher.fetch(&url).await.unwrap();
        assert_eq!(page.html, "<script>source: '/x/index.m3u8'</script>");
        assert_eq!(page.url, url);

        let request = server.await.unwrap().to_ascii_lowercase();
        assert!(request.starts_with("get /video/58422-11.html"));
        assert!(request.contains(&format!("referer: {}", url.as_str().to_ascii_lowercase())));
        assert!(request.contains("user-agent: mozilla/5.0"));
    }

    #[tokio::test]
    async fn test_fetch_non_success_status_fails() {
        let (url, server) = serve_once("HTTP/1.1 404 Not Found", "gone").await;
        let fetcher = HttpPageFetcher::new(&local_config()).unwrap();

        let result = fetcher.fetch(&url).await;
        assert!(matches!(result, Err(DownloadError::FetchFailed(ref msg)) if msg.contains("404")));
        server.await.unwrap();
    }
}
