//! Configuration for the rate monitor
//!
//! Defaults are usable as-is apart from API keys, which come from the
//! environment (`FRED_API_KEY`, `ECOS_API_KEY`, `DART_API_KEY`) or a JSON file.

use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{RateError, RateResult};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Upstream credentials and timeouts
    pub providers: ProviderConfig,
    /// Cache lifetimes
    pub cache: CacheTtlConfig,
    /// Request parameter bounds for rate payloads
    pub rates: RatesConfig,
    /// Rolling correlation settings
    pub correlation: CorrelationConfig,
    /// Insurer duration analysis settings
    pub insurer: InsurerConfig,
}

impl MonitorConfig {
    /// Defaults overlaid with environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Load from a JSON file; missing fields fall back to defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> RateResult<Self> {
        let file = File::open(path.as_ref())?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| RateError::config(format!("{}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay API keys and timeout from the environment
    pub fn apply_env(&mut self) {
        if let Some(key) = env_str("FRED_API_KEY") {
            self.providers.fred_api_key = key;
        }
        if let Some(key) = env_str("ECOS_API_KEY") {
            self.providers.ecos_api_key = key;
        }
        if let Some(key) = env_str("DART_API_KEY") {
            self.providers.dart_api_key = key;
        }
        if let Some(secs) = env_str("RATE_MONITOR_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.providers.request_timeout_secs = secs;
        }
    }

    /// Reject settings that would make the service misbehave
    pub fn validate(&self) -> RateResult<()> {
        let c = &self.cache;
        if c.rates_ttl_secs == 0 || c.correlation_ttl_secs == 0 || c.insurer_ttl_secs == 0 {
            return Err(RateError::config("cache TTLs must be positive"));
        }
        if self.providers.request_timeout_secs == 0 {
            return Err(RateError::config("request timeout must be positive"));
        }

        let r = &self.rates;
        if r.max_days == 0 || r.default_days == 0 || r.default_days > r.max_days {
            return Err(RateError::config("rates.default_days must be in 1..=max_days"));
        }
        if r.context_max_points == 0 {
            return Err(RateError::config("rates.context_max_points must be positive"));
        }

        let k = &self.correlation;
        if k.step_days == 0 || k.min_window_days == 0 {
            return Err(RateError::config("correlation step and window must be positive"));
        }
        if k.default_window_days < k.min_window_days {
            return Err(RateError::config("correlation.default_window_days below min_window_days"));
        }
        if k.step_days > k.default_window_days {
            return Err(RateError::config("correlation.step_days exceeds default_window_days"));
        }

        if self.insurer.max_year_count == 0 {
            return Err(RateError::config("insurer.max_year_count must be positive"));
        }
        Ok(())
    }
}

/// Upstream API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    #[serde(skip_serializing)]
    pub fred_api_key: String,
    #[serde(skip_serializing)]
    pub ecos_api_key: String,
    #[serde(skip_serializing)]
    pub dart_api_key: String,
    /// Per-request timeout; upstream calls fail rather than hang past it
    /// Default: 15
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            fred_api_key: String::new(),
            ecos_api_key: String::new(),
            dart_api_key: String::new(),
            request_timeout_secs: 15,
        }
    }
}

/// Cache lifetimes, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheTtlConfig {
    /// Default: 3600
    pub rates_ttl_secs: u64,
    /// Default: 3600
    pub correlation_ttl_secs: u64,
    /// Filings change quarterly. Default: 21600
    pub insurer_ttl_secs: u64,
    /// How long past expiry a payload may still be served when the
    /// upstream is down. Default: 21600
    pub stale_grace_secs: u64,
}

impl CacheTtlConfig {
    /// Short lifetimes and no stale fallback, for near-live dashboards
    pub fn aggressive() -> Self {
        Self {
            rates_ttl_secs: 300,
            correlation_ttl_secs: 300,
            insurer_ttl_secs: 3600,
            stale_grace_secs: 0,
        }
    }

    /// Long lifetimes for rate-limited API keys
    pub fn conservative() -> Self {
        Self {
            rates_ttl_secs: 6 * 3600,
            correlation_ttl_secs: 6 * 3600,
            insurer_ttl_secs: 24 * 3600,
            stale_grace_secs: 24 * 3600,
        }
    }
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            rates_ttl_secs: 3600,
            correlation_ttl_secs: 3600,
            insurer_ttl_secs: 6 * 3600,
            stale_grace_secs: 6 * 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatesConfig {
    /// Lookback when none is given. Default: 90
    pub default_days: u32,
    /// Requests are clamped to 1..=max_days. Default: 365
    pub max_days: u32,
    /// Lookback used to find the latest quotes. Default: 14
    pub latest_lookback_days: u32,
    /// Lookback for the summarizer context. Default: 30
    pub context_days: u32,
    /// Max rows handed to the summarizer. Default: 30
    pub context_max_points: usize,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            default_days: 90,
            max_days: 365,
            latest_lookback_days: 14,
            context_days: 30,
            context_max_points: 30,
        }
    }
}

impl RatesConfig {
    pub fn clamp_days(&self, days: u32) -> u32 {
        days.clamp(1, self.max_days)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Distance between consecutive window ends. Default: 30
    pub step_days: u32,
    /// Smallest accepted window. Default: 5
    pub min_window_days: u32,
    /// Default: 60
    pub default_window_days: u32,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            step_days: 30,
            min_window_days: 5,
            default_window_days: 60,
        }
    }
}

impl CorrelationConfig {
    /// Window clamped to `min_window_days..=days`
    pub fn clamp_window(&self, window_days: u32, days: u32) -> u32 {
        window_days.clamp(self.min_window_days.min(days), days.max(1))
    }

    /// Steps never exceed the window, so windows always touch or overlap
    pub fn step_for(&self, window_days: u32) -> u32 {
        self.step_days.min(window_days).max(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsurerConfig {
    /// Default: 3
    pub default_year_count: u32,
    /// Default: 5
    pub max_year_count: u32,
    /// Quarter-end rate is the last quote within this many days. Default: 10
    pub quarter_rate_lookback_days: u32,
}

impl Default for InsurerConfig {
    fn default() -> Self {
        Self {
            default_year_count: 3,
            max_year_count: 5,
            quarter_rate_lookback_days: 10,
        }
    }
}

fn env_str(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_is_valid() {
        assert!(MonitorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let mut config = MonitorConfig::default();
        config.cache.rates_ttl_secs = 0;
        assert!(matches!(config.validate(), Err(RateError::Config(_))));
    }

    #[test]
    fn test_presets_are_valid() {
        for cache in [CacheTtlConfig::aggressive(), CacheTtlConfig::conservative()] {
            let config = MonitorConfig {
                cache,
                ..Default::default()
            };
            assert!(config.validate().is_ok());
        }
        assert_eq!(CacheTtlConfig::aggressive().stale_grace_secs, 0);
    }

    #[test]
    fn test_validate_rejects_step_over_window() {
        let mut config = MonitorConfig::default();
        config.correlation.step_days = 90;
        assert!(matches!(config.validate(), Err(RateError::Config(_))));
    }

    #[test]
    fn test_clamping() {
        let config = MonitorConfig::default();
        assert_eq!(config.rates.clamp_days(0), 1);
        assert_eq!(config.rates.clamp_days(9999), 365);

        assert_eq!(config.correlation.clamp_window(1, 90), 5);
        assert_eq!(config.correlation.clamp_window(200, 90), 90);
        assert_eq!(config.correlation.clamp_window(30, 3), 3);
        assert_eq!(config.correlation.step_for(10), 10);
        assert_eq!(config.correlation.step_for(90), 30);
    }

    #[test]
    fn test_from_json_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"cache": {{"rates_ttl_secs": 60}}, "correlation": {{"step_days": 7}}}}"#).unwrap();

        let config = MonitorConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.cache.rates_ttl_secs, 60);
        assert_eq!(config.cache.correlation_ttl_secs, 3600);
        assert_eq!(config.correlation.step_days, 7);
        assert_eq!(config.rates.max_days, 365);
    }

    #[test]
    fn test_keys_not_serialized() {
        let mut config = MonitorConfig::default();
        config.providers.fred_api_key = "secret".to_string();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
