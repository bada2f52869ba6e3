//! Gateway configuration.

/// Settings the gateway cannot run without.
///
/// Both values normally arrive through the environment
/// (`UPSTREAM_BASE_URL`, `PROXY_SHARED_SECRET`); the CLI refuses to start
/// when either is absent.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the internal intel upstream, e.g. `http://intel.internal:9000`.
    pub upstream_base_url: String,
    /// Shared secret attached to every upstream call for service-to-service
    /// trust.
    pub proxy_secret: String,
}

impl GatewayConfig {
    pub fn new(upstream_base_url: impl Into<String>, proxy_secret: impl Into<String>) -> Self {
        Self {
            upstream_base_url: upstream_base_url.into(),
            proxy_secret: proxy_secret.into(),
        }
    }
}
