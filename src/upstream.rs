//! Client for the internal intel upstream.
//!
//! One authenticated route proxies to this service. The contract is strict:
//! a single attempt bounded by a 2 second timeout, no redirect following,
//! no retries. Service-to-service trust is a shared-secret header.

use std::fmt;
use std::time::Duration;

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, warn};

/// Hard timeout for the upstream call.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(2);

/// Header carrying the shared secret to the upstream.
pub const SECRET_HEADER: &str = "X-Internal-Secret";

/// Sub-path appended to the configured base URL.
const INTEL_PATH: &str = "/internal/intel";

/// Payload field the upstream must return.
const INTEL_FIELD: &str = "intel";

/// Upstream call failures. All of them surface to the caller as 502.
#[derive(Debug, Clone)]
pub enum UpstreamError {
    /// Network failure or timeout before a response arrived
    Unavailable(String),
    /// Upstream answered with a non-200 status
    Status(u16),
    /// 200 response whose body is not JSON with a string `intel` field
    MalformedResponse,
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "Upstream unavailable: {}", msg),
            Self::Status(code) => write!(f, "Upstream returned HTTP {}", code),
            Self::MalformedResponse => write!(f, "Upstream response missing intel payload"),
        }
    }
}

impl std::error::Error for UpstreamError {}

/// HTTP client for the intel upstream.
pub struct UpstreamClient {
    intel_url: String,
    secret: String,
    client: reqwest::Client,
}

impl UpstreamClient {
    /// Build a client for the given base URL and shared secret.
    pub fn new(base_url: &str, secret: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            intel_url: format!("{}{}", base_url.trim_end_matches('/'), INTEL_PATH),
            secret: secret.to_string(),
            client,
        })
    }

    /// Fetch the intel payload. Exactly one attempt; the timeout is the
    /// whole failure budget.
    pub async fn fetch_intel(&self) -> Result<String, UpstreamError> {
        debug!(url = %self.intel_url, "Calling intel upstream");

        let response = self
            .client
            .get(&self.intel_url)
            .header(SECRET_HEADER, &self.secret)
            .send()
            .await
            .map_err(|e| {
                warn!("Intel upstream unreachable: {}", e);
                UpstreamError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            warn!(status = %status, "Intel upstream returned an error status");
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|_| UpstreamError::MalformedResponse)?;

        body.get(INTEL_FIELD)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(UpstreamError::MalformedResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Json, Redirect};
    use axum::routing::get;
    use axum::Router;

    /// Serve a router on an ephemeral local port, returning its base URL.
    async fn spawn_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_fetch_intel_success_sends_secret() {
        let router = Router::new().route(
            "/internal/intel",
            get(|headers: HeaderMap| async move {
                if headers.get(SECRET_HEADER).map(|v| v.as_bytes()) != Some(b"hush") {
                    return StatusCode::FORBIDDEN.into_response();
                }
                Json(serde_json::json!({"intel": "the eagle flies at midnight"}))
                    .into_response()
            }),
        );
        let base = spawn_upstream(router).await;

        let client = UpstreamClient::new(&base, "hush").unwrap();
        let intel = client.fetch_intel().await.unwrap();
        assert_eq!(intel, "the eagle flies at midnight");
    }

    #[tokio::test]
    async fn test_non_200_status_is_an_error() {
        let router = Router::new().route(
            "/internal/intel",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let base = spawn_upstream(router).await;

        let client = UpstreamClient::new(&base, "hush").unwrap();
        assert!(matches!(
            client.fetch_intel().await,
            Err(UpstreamError::Status(500))
        ));
    }

    #[tokio::test]
    async fn test_redirects_are_not_followed() {
        let router = Router::new().route(
            "/internal/intel",
            get(|| async { Redirect::temporary("/elsewhere") }),
        );
        let base = spawn_upstream(router).await;

        let client = UpstreamClient::new(&base, "hush").unwrap();
        assert!(matches!(
            client.fetch_intel().await,
            Err(UpstreamError::Status(307))
        ));
    }

    #[tokio::test]
    async fn test_missing_intel_field_is_malformed() {
        let router = Router::new().route(
            "/internal/intel",
            get(|| async { Json(serde_json::json!({"data": "wrong shape"})) }),
        );
        let base = spawn_upstream(router).await;

        let client = UpstreamClient::new(&base, "hush").unwrap();
        assert!(matches!(
            client.fetch_intel().await,
            Err(UpstreamError::MalformedResponse)
        ));
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let router = Router::new().route("/internal/intel", get(|| async { "plain text" }));
        let base = spawn_upstream(router).await;

        let client = UpstreamClient::new(&base, "hush").unwrap();
        assert!(matches!(
            client.fetch_intel().await,
            Err(UpstreamError::MalformedResponse)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_unavailable() {
        // Nothing listens here; connection is refused immediately
        let client = UpstreamClient::new("http://127.0.0.1:1", "hush").unwrap();
        assert!(matches!(
            client.fetch_intel().await,
            Err(UpstreamError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let router = Router::new().route(
            "/internal/intel",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(serde_json::json!({"intel": "too late"}))
            }),
        );
        let base = spawn_upstream(router).await;

        let client = UpstreamClient::new(&base, "hush").unwrap();
        let start = std::time::Instant::now();
        assert!(matches!(
            client.fetch_intel().await,
            Err(UpstreamError::Unavailable(_))
        ));
        assert!(start.elapsed() < Duration::from_secs(4));
    }
}
