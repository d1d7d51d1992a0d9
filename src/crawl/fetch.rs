// src/crawl/fetch.rs
// =============================================================================
// Downloading pages.
//
// The engine only needs "give me the bytes behind this URL", so that is
// all the Fetcher trait asks for. HttpFetcher is the real implementation on
// top of reqwest; tests swap in an in-memory site.
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::error::{CrawlError, Result};

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches the body of `url`
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetches pages over HTTP(S) with reqwest
pub struct HttpFetcher {
    client: Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    // Builds the shared client
    //
    // - `timeout` bounds each request so one slow server can't stall a worker
    // - idle connections are not kept around: a crawl rarely hits the same
    //   host twice in a row, and hundreds of workers would otherwise each
    //   keep sockets open
    // - bodies over `max_body_bytes` are abandoned, so memory per worker
    //   stays bounded
    pub fn new(timeout: Duration, user_agent: &str, max_body_bytes: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .pool_max_idle_per_host(0)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(CrawlError::Client)?;

        Ok(Self {
            client,
            max_body_bytes,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let fetch_error = |source| CrawlError::Fetch {
            url: url.to_string(),
            source,
        };

        let mut response = self.client.get(url).send().await.map_err(fetch_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let too_large = || CrawlError::BodyTooLarge {
            url: url.to_string(),
            limit: self.max_body_bytes,
        };

        // Content-Length is only a hint; the streamed length is what counts
        let announced = response.content_length().unwrap_or(0);
        if announced > self.max_body_bytes as u64 {
            return Err(too_large());
        }

        let mut body = Vec::with_capacity(announced as usize);
        while let Some(chunk) = response.chunk().await.map_err(fetch_error)? {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

// Short label for a fetch failure, used in diagnostics
pub fn failure_kind(error: &CrawlError) -> &'static str {
    match error {
        CrawlError::Fetch { source, .. } if source.is_timeout() => "timeout",
        CrawlError::Fetch { source, .. } if source.is_redirect() => "too many redirects",
        CrawlError::Fetch { source, .. } if source.is_connect() => "connection failed",
        CrawlError::Fetch { .. } => "transport error",
        CrawlError::Status { .. } => "bad status",
        CrawlError::BodyTooLarge { .. } => "body too large",
        CrawlError::Parse { .. } => "unparseable body",
        _ => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(5), "link-crawler-test", 1024).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<a href=\"https://a.com\">"))
            .mount(&server)
            .await;

        let body = fetcher()
            .fetch(&format!("{}/page", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, b"<a href=\"https://a.com\">".to_vec());
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::Status { status: 404, .. }));
        assert_eq!(failure_kind(&err), "bad status");
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/big"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(2048)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/exact"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(1024)))
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch(&format!("{}/big", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::BodyTooLarge { limit: 1024, .. }));
        assert_eq!(failure_kind(&err), "body too large");

        let body = fetcher()
            .fetch(&format!("{}/exact", server.uri()))
            .await
            .unwrap();
        assert_eq!(body.len(), 1024);
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let fetcher =
            HttpFetcher::new(Duration::from_millis(200), "link-crawler-test", 1024).unwrap();
        let err = fetcher.fetch(&server.uri()).await.unwrap_err();
        assert_eq!(failure_kind(&err), "timeout");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_fetch_error() {
        // Port 9 (discard) on localhost is essentially never listening
        let err = fetcher().fetch("http://127.0.0.1:9/").await.unwrap_err();
        assert!(matches!(err, CrawlError::Fetch { .. }));
    }
}
