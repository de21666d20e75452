//! Application configuration loaded from environment variables.

use resilience::ResiliencePolicy;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `7000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `SERVICE_ADDRESS` — address reported in aggregates (default: `"$HOSTNAME:$PORT"`)
/// - `PRODUCT_SERVICE_URL`, `RECOMMENDATION_SERVICE_URL`, `REVIEW_SERVICE_URL`
///   — base URLs of the owning services
/// - `COMMAND_CHANNEL_CAPACITY` — buffered commands per channel (default: `1024`)
/// - `IN_MEMORY_SERVICES` — serve from in-process owning services instead of
///   the service URLs (default: `false`)
///
/// Resilience settings are read per dependency with the `PRODUCT_`,
/// `RECOMMENDATION_` and `REVIEW_` prefixes, see [`ResiliencePolicy::from_env`].
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub service_address: String,
    pub product_url: String,
    pub recommendation_url: String,
    pub review_url: String,
    pub command_channel_capacity: usize,
    pub in_memory_services: bool,
    pub product_policy: ResiliencePolicy,
    pub recommendation_policy: ResiliencePolicy,
    pub review_policy: ResiliencePolicy,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |name: &str, default: String| std::env::var(name).unwrap_or(default);

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);
        let service_address = std::env::var("SERVICE_ADDRESS").unwrap_or_else(|_| {
            let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
            format!("{hostname}:{port}")
        });

        Self {
            host: var("HOST", defaults.host.clone()),
            port,
            log_level: var("RUST_LOG", defaults.log_level.clone()),
            service_address,
            product_url: var("PRODUCT_SERVICE_URL", defaults.product_url.clone()),
            recommendation_url: var("RECOMMENDATION_SERVICE_URL", defaults.recommendation_url.clone()),
            review_url: var("REVIEW_SERVICE_URL", defaults.review_url.clone()),
            command_channel_capacity: std::env::var("COMMAND_CHANNEL_CAPACITY")
                .ok()
                .and_then(|c| c.parse().ok())
                .unwrap_or(defaults.command_channel_capacity),
            in_memory_services: std::env::var("IN_MEMORY_SERVICES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.in_memory_services),
            product_policy: ResiliencePolicy::from_env("PRODUCT_"),
            recommendation_policy: ResiliencePolicy::from_env("RECOMMENDATION_"),
            review_policy: ResiliencePolicy::from_env("REVIEW_"),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7000,
            log_level: "info".to_string(),
            service_address: "localhost:7000".to_string(),
            product_url: "http://product".to_string(),
            recommendation_url: "http://recommendation".to_string(),
            review_url: "http://review".to_string(),
            command_channel_capacity: 1024,
            in_memory_services: false,
            product_policy: ResiliencePolicy::default(),
            recommendation_policy: ResiliencePolicy::default(),
            review_policy: ResiliencePolicy::default(),
        }
    }
}
