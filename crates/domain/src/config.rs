use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::family::Family;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Upstream API
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "d_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Per-family requests-per-second overrides, keyed by family tag.
    #[serde(default)]
    pub endpoint_rate_limits: HashMap<Family, f64>,
    /// Per-family (connect, read) timeouts, keyed by family tag.
    #[serde(default)]
    pub timeout_config: HashMap<Family, TimeoutConfig>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            rate_limit: RateLimitConfig::default(),
            endpoint_rate_limits: HashMap::new(),
            timeout_config: HashMap::new(),
        }
    }
}

impl ApiConfig {
    /// Effective requests/second for a family (override or global default).
    pub fn rate_for(&self, family: Family) -> f64 {
        self.endpoint_rate_limits
            .get(&family)
            .copied()
            .unwrap_or(self.rate_limit.requests_per_second)
    }

    /// Effective (connect, read) timeouts for a family.
    pub fn timeouts_for(&self, family: Family) -> TimeoutConfig {
        self.timeout_config
            .get(&family)
            .copied()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Default pacing for every family without an override.
    #[serde(default = "d_rps")]
    pub requests_per_second: f64,
    /// Per-page retry cap for the traversal engine and the batch writer.
    #[serde(default = "d_max_retries")]
    pub max_retries: u32,
    /// Base backoff in seconds for the writer's retry engine.
    #[serde(default = "d_retry_delay")]
    pub retry_delay: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: d_rps(),
            max_retries: d_max_retries(),
            retry_delay: d_retry_delay(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Connect timeout, seconds.
    #[serde(default = "d_connect_timeout")]
    pub connect: f64,
    /// Read (full-response) timeout, seconds.
    #[serde(default = "d_read_timeout")]
    pub read: f64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: d_connect_timeout(),
            read: d_read_timeout(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "d_table_name")]
    pub table_name: String,
    #[serde(default = "d_region")]
    pub region: String,
    #[serde(default)]
    pub deduplication: DedupConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table_name: d_table_name(),
            region: d_region(),
            deduplication: DedupConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    #[serde(default)]
    pub reset_frequency: ResetFrequency,
    /// Advisory cap on the processed-ID set; exceeding it forces a reset.
    #[serde(default = "d_memory_threshold_mb")]
    pub memory_threshold_mb: u64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reset_frequency: ResetFrequency::default(),
            memory_threshold_mb: d_memory_threshold_mb(),
        }
    }
}

/// When the processed-ID set is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResetFrequency {
    /// Before each date inside a sub-window.
    #[default]
    PerDate,
    /// Before each sub-window.
    PerRange,
    /// Only at run start.
    PerSession,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Ingest
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Writer batch cap. Batches are further split to the store adapter's
    /// 25-item `batch_put` limit when issued.
    #[serde(default = "d_batch_size")]
    pub batch_size: usize,
    /// Incremental-mode window when the run request does not carry one.
    #[serde(default = "d_lookback_days")]
    pub default_lookback_days: i64,
    /// Upstream page size for list endpoints.
    #[serde(default = "d_page_size")]
    pub page_size: u64,
    #[serde(default)]
    pub date_ranges: DateRangeConfig,
    #[serde(default)]
    pub parallel: ParallelConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: d_batch_size(),
            default_lookback_days: d_lookback_days(),
            page_size: d_page_size(),
            date_ranges: DateRangeConfig::default(),
            parallel: ParallelConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRangeConfig {
    /// Sub-window chunk size in days.
    #[serde(default = "d_max_range_days")]
    pub max_range_days: i64,
    /// Lower bound on requested dates.
    #[serde(default = "d_min_date")]
    pub min_date: NaiveDate,
}

impl Default for DateRangeConfig {
    fn default() -> Self {
        Self {
            max_range_days: d_max_range_days(),
            min_date: d_min_date(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Concurrent sub-window workers.
    #[serde(default = "d_max_workers")]
    pub max_workers: usize,
    /// Sub-windows a worker claims per queue pull.
    #[serde(default = "d_chunk_size")]
    pub chunk_size: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            max_workers: d_max_workers(),
            chunk_size: d_chunk_size(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Serde default helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn d_base_url() -> String {
    "https://api.congress.gov/v3".into()
}
fn d_rps() -> f64 {
    1.0
}
fn d_max_retries() -> u32 {
    3
}
fn d_retry_delay() -> f64 {
    1.0
}
fn d_connect_timeout() -> f64 {
    10.0
}
fn d_read_timeout() -> f64 {
    30.0
}
fn d_table_name() -> String {
    "congress-data".into()
}
fn d_region() -> String {
    "us-east-1".into()
}
fn d_true() -> bool {
    true
}
fn d_memory_threshold_mb() -> u64 {
    256
}
fn d_batch_size() -> usize {
    100
}
fn d_lookback_days() -> i64 {
    7
}
fn d_page_size() -> u64 {
    250
}
fn d_max_range_days() -> i64 {
    365
}
fn d_min_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1789, 3, 4).expect("corpus floor is a valid date")
}
fn d_max_workers() -> usize {
    3
}
fn d_chunk_size() -> usize {
    1
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.api.base_url.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "api.base_url".into(),
                message: "base_url must not be empty".into(),
            });
        } else if !self.api.base_url.starts_with("http://")
            && !self.api.base_url.starts_with("https://")
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "api.base_url".into(),
                message: "base_url must start with http:// or https://".into(),
            });
        }

        if self.api.rate_limit.requests_per_second <= 0.0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "api.rate_limit.requests_per_second".into(),
                message: "must be greater than 0".into(),
            });
        }

        for (family, rate) in &self.api.endpoint_rate_limits {
            if *rate <= 0.0 {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("api.endpoint_rate_limits.{family}"),
                    message: "must be greater than 0".into(),
                });
            }
        }

        for (family, timeouts) in &self.api.timeout_config {
            if timeouts.connect <= 0.0 || timeouts.read <= 0.0 {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("api.timeout_config.{family}"),
                    message: "connect and read timeouts must be greater than 0".into(),
                });
            }
        }

        if self.store.table_name.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "store.table_name".into(),
                message: "table_name must not be empty".into(),
            });
        }

        if self.ingest.batch_size == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "ingest.batch_size".into(),
                message: "batch_size must be greater than 0".into(),
            });
        }

        if self.ingest.page_size == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "ingest.page_size".into(),
                message: "page_size must be greater than 0".into(),
            });
        }

        if self.ingest.date_ranges.max_range_days <= 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "ingest.date_ranges.max_range_days".into(),
                message: "must be at least 1 day".into(),
            });
        }

        if self.ingest.parallel.max_workers == 0 || self.ingest.parallel.max_workers > 10 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "ingest.parallel.max_workers".into(),
                message: "must be between 1 and 10".into(),
            });
        }

        if self.ingest.parallel.chunk_size == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "ingest.parallel.chunk_size".into(),
                message: "must be greater than 0".into(),
            });
        }

        if self.store.deduplication.memory_threshold_mb < 16 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "store.deduplication.memory_threshold_mb".into(),
                message: "very small threshold will force frequent dedup resets".into(),
            });
        }

        if self.api.rate_limit.requests_per_second > 10.0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "api.rate_limit.requests_per_second".into(),
                message: "rates above 10 req/s routinely trip upstream quotas".into(),
            });
        }

        errors
    }

    /// True when no `Error`-severity issue is present.
    pub fn is_valid(&self) -> bool {
        !self
            .validate()
            .iter()
            .any(|e| e.severity == ConfigSeverity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        let errors: Vec<_> = config
            .validate()
            .into_iter()
            .filter(|e| e.severity == ConfigSeverity::Error)
            .collect();
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn zero_rate_is_rejected() {
        let mut config = Config::default();
        config.api.rate_limit.requests_per_second = 0.0;
        assert!(!config.is_valid());
    }

    #[test]
    fn worker_bounds_enforced() {
        let mut config = Config::default();
        config.ingest.parallel.max_workers = 11;
        assert!(!config.is_valid());
        config.ingest.parallel.max_workers = 0;
        assert!(!config.is_valid());
        config.ingest.parallel.max_workers = 10;
        assert!(config.is_valid());
    }

    #[test]
    fn per_family_rate_override_resolves() {
        let mut config = Config::default();
        config
            .api
            .endpoint_rate_limits
            .insert(Family::Amendment, 0.5);
        assert_eq!(config.api.rate_for(Family::Amendment), 0.5);
        assert_eq!(config.api.rate_for(Family::Bill), 1.0);
    }

    #[test]
    fn issue_display_carries_severity_tag() {
        let mut config = Config::default();
        config.ingest.batch_size = 0;
        let msgs: Vec<String> = config.validate().iter().map(|e| e.to_string()).collect();
        assert!(msgs.iter().any(|m| m.starts_with("[ERROR] ingest.batch_size")));
    }
}
