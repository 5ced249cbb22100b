//! Network transport for the offline engine.
//!
//! ### Failure model
//! - Any HTTP status, including 4xx/5xx, is a *response* and returned as-is.
//! - Connection, DNS, TLS, timeout and oversize failures are errors
//!   ([`Error::is_network`]) that the engine's fallback tiers react to.
//!
//! ### Cache bypass
//! - `CacheMode::Reload` sends `Cache-Control: no-cache` and `Pragma: no-cache`
//!   so intermediaries revalidate with the origin.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, header};

use stowaway_core::{AppConfig, CacheMode, Error, Request, ResponseSnapshot};

/// Anything able to answer a request from the network.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<ResponseSnapshot, Error>;
}

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "stowaway/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "stowaway/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
        }
    }
}

/// reqwest-backed [`Fetcher`].
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn build(&self, request: &Request) -> Result<reqwest::RequestBuilder, Error> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {e}", request.method)))?;

        let mut builder = self.http.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if request.cache == CacheMode::Reload {
            builder = builder
                .header(header::CACHE_CONTROL, "no-cache")
                .header(header::PRAGMA, "no-cache");
        }

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        Ok(builder)
    }
}

fn transport_error(url: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(format!("{url}: {err}"))
    } else {
        Error::Network(format!("{url}: {err}"))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<ResponseSnapshot, Error> {
        let start = Instant::now();
        let url = request.url.as_str();

        let response = self
            .build(request)?
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let bytes = response.bytes().await.map_err(|e| transport_error(url, e))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} {} -> {} [{}] in {}ms ({} bytes)",
            request.method,
            url,
            final_url,
            status,
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(ResponseSnapshot {
            url: final_url,
            status,
            headers,
            body: bytes,
            fetched_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowaway_core::Method;
    use wiremock::matchers::{header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(FetchConfig { timeout: Duration::from_secs(5), ..Default::default() }).unwrap()
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "stowaway/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "test-agent".into(), timeout_ms: 1500, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.timeout, Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_fetch_ok_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app/app.css"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/css")
                    .set_body_string("body{}"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let request = Request::get(&format!("{}/app/app.css", server.uri())).unwrap();
        let response = fetcher().fetch(&request).await.unwrap();

        assert_eq!(response.status, 200);
        assert!(response.is_ok());
        assert_eq!(&response.body[..], b"body{}");
        assert_eq!(response.content_type(), Some("text/css"));
    }

    #[tokio::test]
    async fn test_fetch_non_ok_is_a_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.css"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let request = Request::get(&format!("{}/missing.css", server.uri())).unwrap();
        let response = fetcher().fetch(&request).await.unwrap();
        assert_eq!(response.status, 404);
        assert!(!response.is_ok());
    }

    #[tokio::test]
    async fn test_reload_sends_no_cache_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index.html"))
            .and(header_eq("cache-control", "no-cache"))
            .and(header_eq("pragma", "no-cache"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .expect(1)
            .mount(&server)
            .await;

        let request = Request::get(&format!("{}/index.html", server.uri()))
            .unwrap()
            .with_cache(CacheMode::Reload);
        let response = fetcher().fetch(&request).await.unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_forwards_method_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/media"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let request = Request::new(Method::Post, &format!("{}/v1/media", server.uri()))
            .unwrap()
            .with_body(b"{}".to_vec());
        let response = fetcher().fetch(&request).await.unwrap();
        assert_eq!(response.status, 201);
    }

    #[tokio::test]
    async fn test_body_too_large() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64]))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(FetchConfig { max_bytes: 16, ..Default::default() }).unwrap();
        let request = Request::get(&format!("{}/big.bin", server.uri())).unwrap();
        let err = fetcher.fetch(&request).await.unwrap_err();
        assert!(matches!(err, Error::FetchTooLarge(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let request = Request::get(&format!("{uri}/index.html")).unwrap();
        let err = fetcher().fetch(&request).await.unwrap_err();
        assert!(err.is_network());
    }
}
