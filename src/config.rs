//! Panel configuration and tracing setup
//!
//! ```rust
//! use motionctl::PanelConfig;
//!
//! let config = PanelConfig::from_yaml_str("base_url: http://cam.local:8080\nsettle_delay_ms: 5000\n")?;
//! assert_eq!(config.settle_delay.as_secs(), 5);
//! # Ok::<(), motionctl::PanelError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::debounce::DEFAULT_DEBOUNCE;
use crate::orchestrator::DEFAULT_SETTLE_DELAY;
use crate::{PanelError, Result};

/// Environment variable overriding [`PanelConfig::base_url`].
pub const BASE_URL_ENV: &str = "MOTIONCTL_BASE_URL";

/// Connection and timing settings for a configuration session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Root URL of the daemon's web control, without a trailing slash
    pub base_url: String,
    #[serde(rename = "request_timeout_ms", with = "millis")]
    pub request_timeout: Duration,
    #[serde(rename = "connect_timeout_ms", with = "millis")]
    pub connect_timeout: Duration,
    /// Wait between a restart and the follow-up snapshot refresh
    #[serde(rename = "settle_delay_ms", with = "millis")]
    pub settle_delay: Duration,
    /// Quiet period for debounced edits
    #[serde(rename = "debounce_ms", with = "millis")]
    pub debounce: Duration,
    /// Session token from a previous login
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            settle_delay: DEFAULT_SETTLE_DELAY,
            debounce: DEFAULT_DEBOUNCE,
            session_token: None,
        }
    }
}

impl PanelConfig {
    /// Config for `base_url` with every other setting defaulted.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }.normalized()
    }

    /// Parse YAML, then apply environment overrides.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: PanelConfig = serde_yaml_ng::from_str(yaml)?;
        config.with_env_overrides().validated()
    }

    /// Read and parse a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            PanelError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        debug!("Loading panel config from {}", path.display());
        Self::from_yaml_str(&yaml)
    }

    /// Apply `MOTIONCTL_BASE_URL` if set.
    pub fn with_env_overrides(self) -> Self {
        match std::env::var(BASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => self.with_base_url(url),
            _ => self,
        }
    }

    fn with_base_url(self, base_url: String) -> Self {
        debug!("base_url overridden by {}", BASE_URL_ENV);
        Self { base_url, ..self }.normalized()
    }

    fn normalized(mut self) -> Self {
        self.base_url = self.base_url.trim().trim_end_matches('/').to_string();
        self
    }

    /// Normalize the base URL and check the settings are usable.
    pub fn validated(self) -> Result<Self> {
        let config = self.normalized();
        if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
            return Err(PanelError::config(format!(
                "base_url must start with http:// or https://, got '{}'",
                config.base_url
            )));
        }
        if config.request_timeout.is_zero() {
            return Err(PanelError::config("request_timeout_ms must be greater than zero"));
        }
        Ok(config)
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Install a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (e.g. `"motionctl=info"`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing(default_directive: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
