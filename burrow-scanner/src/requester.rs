use crate::error::{Result, ScanError};
use crate::record::ResponseRecord;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_USER_AGENT: &str = "Burrow/0.1 (https://github.com/trapdoorsec/burrow)";

/// Anything able to turn a URL into a [`ResponseRecord`].
///
/// The scheduler only ever talks to this trait, so tests and alternative
/// transports can stand in for the reqwest client.
#[async_trait]
pub trait Requester: Send + Sync {
    async fn execute(&self, url: &str) -> Result<ResponseRecord>;
}

/// Options for building an [`HttpRequester`]
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub headers: Vec<(String, String)>,
    pub follow_redirects: bool,
    pub keep_body: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: Vec::new(),
            follow_redirects: false,
            keep_body: false,
        }
    }
}

impl RequestOptions {
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    pub fn with_keep_body(mut self, keep_body: bool) -> Self {
        self.keep_body = keep_body;
        self
    }
}

/// reqwest-backed [`Requester`]
pub struct HttpRequester {
    client: Client,
    keep_body: bool,
}

impl HttpRequester {
    pub fn new(options: RequestOptions) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ScanError::InvalidHeader(format!("{}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ScanError::InvalidHeader(format!("{}: {}", value, e)))?;
            default_headers.insert(name, value);
        }

        let redirect = if options.follow_redirects {
            reqwest::redirect::Policy::limited(5)
        } else {
            reqwest::redirect::Policy::none()
        };

        let timeout = Duration::from_secs(options.timeout_secs.max(1));
        let client = Client::builder()
            .user_agent(options.user_agent.as_str())
            .default_headers(default_headers)
            .timeout(timeout)
            .connect_timeout(timeout / 2)
            .pool_max_idle_per_host(50) // Connection pooling
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(redirect)
            .build()
            .map_err(|e| ScanError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            keep_body: options.keep_body,
        })
    }
}

#[async_trait]
impl Requester for HttpRequester {
    async fn execute(&self, url: &str) -> Result<ResponseRecord> {
        debug!("Requesting {}", url);

        let start = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ScanError::from_request(url, e))?;

        let status_code = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| ScanError::from_request(url, e))?;
        let elapsed = start.elapsed();

        Ok(ResponseRecord::new(
            url,
            status_code,
            &body,
            elapsed,
            headers,
            self.keep_body,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    #[tokio::test]
    async fn test_execute_fills_record() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/admin"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .insert_header("X-Custom", "yes")
                    .set_body_bytes(b"<html><body>Admin panel</body></html>".as_slice()),
            )
            .mount(&mock_server)
            .await;

        let requester =
            HttpRequester::new(RequestOptions::default().with_keep_body(true)).unwrap();
        let url = format!("{}/admin", mock_server.uri());
        let record = requester.execute(&url).await.unwrap();

        assert_eq!(record.url, url);
        assert_eq!(record.status_code, 200);
        assert_eq!(record.content_length, 37);
        assert_eq!(record.header("x-custom"), Some("yes"));
        assert_eq!(record.content_type(), Some("text/html"));
        assert!(record.body_text().contains("Admin panel"));
    }

    #[tokio::test]
    async fn test_execute_without_body_retention() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/secret"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&mock_server)
            .await;

        let requester = HttpRequester::new(RequestOptions::default()).unwrap();
        let record = requester
            .execute(&format!("{}/secret", mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(record.status_code, 403);
        assert!(record.body.is_none());
        assert_eq!(record.content_length, 9);
    }

    #[tokio::test]
    async fn test_unmatched_path_is_a_response_not_an_error() {
        let mock_server = MockServer::start().await;

        let requester = HttpRequester::new(RequestOptions::default()).unwrap();
        let record = requester
            .execute(&format!("{}/missing", mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(record.status_code, 404);
    }

    #[tokio::test]
    async fn test_default_headers_are_sent() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api"))
            .and(header("authorization", "Bearer token"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let requester = HttpRequester::new(
            RequestOptions::default().with_header("Authorization", "Bearer token"),
        )
        .unwrap();
        let record = requester
            .execute(&format!("{}/api", mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(record.status_code, 200);
    }

    #[tokio::test]
    async fn test_timeout_maps_to_timeout_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&mock_server)
            .await;

        let requester = HttpRequester::new(RequestOptions::default().with_timeout(1)).unwrap();
        let result = requester
            .execute(&format!("{}/slow", mock_server.uri()))
            .await;

        assert!(matches!(result, Err(ScanError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_connection_refused_is_an_error() {
        let requester = HttpRequester::new(RequestOptions::default().with_timeout(2)).unwrap();
        let result = requester.execute("http://127.0.0.1:1/nothing").await;
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_header_rejected() {
        let result = HttpRequester::new(RequestOptions::default().with_header("bad header", "x"));
        assert!(matches!(result, Err(ScanError::InvalidHeader(_))));
    }

    #[tokio::test]
    async fn test_unparseable_url_is_invalid_url() {
        let requester = HttpRequester::new(RequestOptions::default()).unwrap();
        let result = requester.execute("not a url").await;
        assert!(matches!(result, Err(ScanError::InvalidUrl(_))));
    }
}
