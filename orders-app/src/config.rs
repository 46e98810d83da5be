//! Configuration loading from environment.

use std::env;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub pay_app_id: String,
    pub pay_merchant_key: String,
    pub pay_notify_secret: String,
    pub rate_limit_per_minute: u32,
    pub store_timeout: Duration,
    pub node_id: u16,
    /// OTLP collector; tracing export is off when unset.
    pub otlp_endpoint: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("{} environment variable is required", key))
        };

        let port = lookup("PORT").unwrap_or_else(|| "3000".to_string()).parse()?;
        let rate_limit_per_minute = lookup("RATE_LIMIT_PER_MINUTE")
            .unwrap_or_else(|| "100".to_string())
            .parse()?;
        let timeout_ms: u64 = lookup("STORE_TIMEOUT_MS")
            .unwrap_or_else(|| "5000".to_string())
            .parse()?;
        let node_id = lookup("NODE_ID").unwrap_or_else(|| "1".to_string()).parse()?;

        Ok(Self {
            port,
            database_url: required("DATABASE_URL")?,
            pay_app_id: required("PAY_APP_ID")?,
            pay_merchant_key: required("PAY_MERCHANT_KEY")?,
            pay_notify_secret: required("PAY_NOTIFY_SECRET")?,
            rate_limit_per_minute,
            store_timeout: Duration::from_millis(timeout_ms),
            node_id,
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|v| !v.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("DATABASE_URL", "sqlite::memory:"),
        ("PAY_APP_ID", "wx_app"),
        ("PAY_MERCHANT_KEY", "merchant"),
        ("PAY_NOTIFY_SECRET", "notify"),
    ];

    #[test]
    fn test_defaults() {
        let config = load(&REQUIRED).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.rate_limit_per_minute, 100);
        assert_eq!(config.store_timeout, Duration::from_millis(5000));
        assert_eq!(config.node_id, 1);
        assert!(config.otlp_endpoint.is_none());
    }

    #[test]
    fn test_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("PORT", "8080"),
            ("STORE_TIMEOUT_MS", "250"),
            ("NODE_ID", "7"),
            ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://collector:4317"),
        ]);
        let config = load(&vars).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.store_timeout, Duration::from_millis(250));
        assert_eq!(config.node_id, 7);
        assert_eq!(config.otlp_endpoint.as_deref(), Some("http://collector:4317"));
    }

    #[test]
    fn test_missing_secret_is_an_error() {
        let vars: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "PAY_NOTIFY_SECRET")
            .collect();

        let err = load(&vars).unwrap_err();
        assert!(err.to_string().contains("PAY_NOTIFY_SECRET"));
    }

    #[test]
    fn test_bad_port_is_an_error() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("PORT", "not-a-port"));

        assert!(load(&vars).is_err());
    }
}
