//! Configuration management for dbmedicd.
//!
//! Loads settings from an explicit path, /etc/dbmedic/config.toml, or uses
//! defaults. Every threshold and the scenario catalog live here.

use anyhow::{Context, Result};
use dbmedic_common::{AlarmState, MedicError, MetricDomain};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// System config file path
pub const CONFIG_PATH: &str = "/etc/dbmedic/config.toml";

/// Probe execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Per-probe timeout in milliseconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,

    /// Overall batch deadline in milliseconds
    #[serde(default = "default_batch_deadline")]
    pub batch_deadline_ms: u64,

    /// Observation window handed to probes
    #[serde(default = "default_time_window")]
    pub time_window_minutes: i64,
}

fn default_probe_timeout() -> u64 {
    4_000
}

fn default_batch_deadline() -> u64 {
    10_000
}

fn default_time_window() -> i64 {
    60
}

impl ExecutorConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn batch_deadline(&self) -> Duration {
        Duration::from_millis(self.batch_deadline_ms)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: default_probe_timeout(),
            batch_deadline_ms: default_batch_deadline(),
            time_window_minutes: default_time_window(),
        }
    }
}

/// Health score deduction table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_cpu_threshold")]
    pub cpu_threshold_pct: f64,
    #[serde(default = "default_cpu_deduction")]
    pub cpu_deduction: u8,

    #[serde(default = "default_connection_threshold")]
    pub connection_threshold: f64,
    #[serde(default = "default_connection_deduction")]
    pub connection_deduction: u8,

    /// Deduct when the hit ratio is strictly below this
    #[serde(default = "default_cache_hit_threshold")]
    pub cache_hit_threshold_pct: f64,
    #[serde(default = "default_cache_deduction")]
    pub cache_deduction: u8,

    #[serde(default = "default_alarm_deduction")]
    pub active_alarm_deduction: u8,

    #[serde(default = "default_missing_domain_deduction")]
    pub missing_domain_deduction: u8,
    #[serde(default = "default_missing_domain_cap")]
    pub missing_domain_cap: u8,

    /// Domains whose absence from an attempted run costs points
    #[serde(default = "default_required_domains")]
    pub required_domains: Vec<MetricDomain>,
}

fn default_cpu_threshold() -> f64 {
    80.0
}

fn default_cpu_deduction() -> u8 {
    20
}

fn default_connection_threshold() -> f64 {
    100.0
}

fn default_connection_deduction() -> u8 {
    15
}

fn default_cache_hit_threshold() -> f64 {
    90.0
}

fn default_cache_deduction() -> u8 {
    10
}

fn default_alarm_deduction() -> u8 {
    15
}

fn default_missing_domain_deduction() -> u8 {
    5
}

fn default_missing_domain_cap() -> u8 {
    20
}

fn default_required_domains() -> Vec<MetricDomain> {
    vec![
        MetricDomain::Cpu,
        MetricDomain::Connections,
        MetricDomain::BufferCache,
        MetricDomain::Alarms,
    ]
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            cpu_threshold_pct: default_cpu_threshold(),
            cpu_deduction: default_cpu_deduction(),
            connection_threshold: default_connection_threshold(),
            connection_deduction: default_connection_deduction(),
            cache_hit_threshold_pct: default_cache_hit_threshold(),
            cache_deduction: default_cache_deduction(),
            active_alarm_deduction: default_alarm_deduction(),
            missing_domain_deduction: default_missing_domain_deduction(),
            missing_domain_cap: default_missing_domain_cap(),
            required_domains: default_required_domains(),
        }
    }
}

/// Recommendation thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendConfig {
    #[serde(default = "default_seq_scan_threshold")]
    pub seq_scan_threshold: u64,
    #[serde(default = "default_row_threshold")]
    pub row_threshold: u64,
    /// Max candidate columns per table
    #[serde(default = "default_max_columns")]
    pub max_columns: usize,
    #[serde(default = "default_column_types")]
    pub column_type_allow_list: Vec<String>,

    /// seq_scans at or above this is High priority
    #[serde(default = "default_create_high")]
    pub create_high_seq_scans: u64,
    /// seq_scans at or above this is Medium priority
    #[serde(default = "default_create_medium")]
    pub create_medium_seq_scans: u64,

    #[serde(default = "default_unused_scan_threshold")]
    pub unused_scan_threshold: u64,
    #[serde(default = "default_drop_high")]
    pub drop_high_bytes: u64,
    #[serde(default = "default_drop_medium")]
    pub drop_medium_bytes: u64,

    /// Mean execution time that earns a query hint
    #[serde(default = "default_slow_query_ms")]
    pub slow_query_ms: f64,
    #[serde(default = "default_slow_query_high_ms")]
    pub slow_query_high_ms: f64,
    #[serde(default = "default_max_query_hints")]
    pub max_query_hints: usize,
}

fn default_seq_scan_threshold() -> u64 {
    100
}

fn default_row_threshold() -> u64 {
    1_000
}

fn default_max_columns() -> usize {
    5
}

fn default_column_types() -> Vec<String> {
    ["integer", "bigint", "character varying", "text", "timestamp", "date"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_create_high() -> u64 {
    10_000
}

fn default_create_medium() -> u64 {
    1_000
}

fn default_unused_scan_threshold() -> u64 {
    10
}

fn default_drop_high() -> u64 {
    1024 * 1024 * 1024
}

fn default_drop_medium() -> u64 {
    100 * 1024 * 1024
}

fn default_slow_query_ms() -> f64 {
    1_000.0
}

fn default_slow_query_high_ms() -> f64 {
    5_000.0
}

fn default_max_query_hints() -> usize {
    5
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            seq_scan_threshold: default_seq_scan_threshold(),
            row_threshold: default_row_threshold(),
            max_columns: default_max_columns(),
            column_type_allow_list: default_column_types(),
            create_high_seq_scans: default_create_high(),
            create_medium_seq_scans: default_create_medium(),
            unused_scan_threshold: default_unused_scan_threshold(),
            drop_high_bytes: default_drop_high(),
            drop_medium_bytes: default_drop_medium(),
            slow_query_ms: default_slow_query_ms(),
            slow_query_high_ms: default_slow_query_high_ms(),
            max_query_hints: default_max_query_hints(),
        }
    }
}

/// Keyword combination for free-text rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    Any,
    All,
}

/// Alarm rule: metric pattern (regex, case-insensitive) and optional state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmRuleConfig {
    pub metric_pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<AlarmState>,
    pub scenario: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRuleConfig {
    pub keywords: Vec<String>,
    #[serde(default = "default_match_mode")]
    pub mode: MatchMode,
    pub scenario: String,
}

fn default_match_mode() -> MatchMode {
    MatchMode::Any
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub id: String,
    pub probes: Vec<String>,
}

/// Scenario catalog and classification tables, in evaluation order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_alarm_rules")]
    pub alarm_rules: Vec<AlarmRuleConfig>,
    #[serde(default = "default_text_rules")]
    pub text_rules: Vec<TextRuleConfig>,
    #[serde(default = "default_scenarios")]
    pub scenarios: Vec<ScenarioConfig>,
}

fn alarm_rule(pattern: &str, scenario: &str) -> AlarmRuleConfig {
    AlarmRuleConfig {
        metric_pattern: pattern.to_string(),
        state: None,
        scenario: scenario.to_string(),
    }
}

fn text_rule(keywords: &[&str], scenario: &str) -> TextRuleConfig {
    TextRuleConfig {
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        mode: MatchMode::Any,
        scenario: scenario.to_string(),
    }
}

fn scenario(id: &str, probes: &[&str]) -> ScenarioConfig {
    ScenarioConfig {
        id: id.to_string(),
        probes: probes.iter().map(|p| p.to_string()).collect(),
    }
}

fn default_alarm_rules() -> Vec<AlarmRuleConfig> {
    vec![
        alarm_rule("CPU", "cpu"),
        alarm_rule("DatabaseConnections|connection", "connections"),
        alarm_rule("DatabaseLoad|load", "db_load"),
        alarm_rule("FreeableMemory|BufferCacheHitRatio|memory", "memory"),
        alarm_rule("ReadLatency|WriteLatency|latency", "io_latency"),
    ]
}

fn default_text_rules() -> Vec<TextRuleConfig> {
    vec![
        text_rule(&["index"], "index_optimization"),
        text_rule(&["slow", "query"], "slow_queries"),
        text_rule(&["bloat", "disk", "storage", "size"], "storage"),
        text_rule(&["cpu"], "cpu"),
        text_rule(&["connection"], "connections"),
        text_rule(&["lock", "blocking", "wait"], "db_load"),
        text_rule(&["alarm", "alert"], "alarm_review"),
        text_rule(&["memory", "cache"], "memory"),
        text_rule(&["latency", "iops"], "io_latency"),
    ]
}

fn default_scenarios() -> Vec<ScenarioConfig> {
    vec![
        scenario("cpu", &["cpu", "slow_queries", "active_sessions"]),
        scenario("connections", &["connections", "active_sessions", "connection_pool"]),
        scenario("db_load", &["db_load", "wait_events", "blocking_queries"]),
        scenario(
            "memory",
            &["buffer_cache", "freeable_memory", "slow_queries", "active_sessions"],
        ),
        scenario("io_latency", &["io_latency", "slow_queries", "buffer_cache"]),
        scenario(
            "slow_queries",
            &["slow_queries", "active_sessions", "table_stats", "index_usage", "buffer_cache"],
        ),
        scenario(
            "index_optimization",
            &["index_usage", "table_stats", "schema_columns", "slow_queries", "buffer_cache"],
        ),
        scenario("storage", &["largest_tables", "table_bloat", "index_usage"]),
        scenario("alarm_review", &["alarms", "cpu", "connections"]),
    ]
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            alarm_rules: default_alarm_rules(),
            text_rules: default_text_rules(),
            scenarios: default_scenarios(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedicConfig {
    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub recommend: RecommendConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl MedicConfig {
    /// Load config: explicit path (must parse), then the system path, then defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()));
        }

        let system = Path::new(CONFIG_PATH);
        if !system.exists() {
            info!("No config at {}, using defaults", CONFIG_PATH);
            return Ok(Self::default());
        }

        Ok(Self::load_from_path(system).unwrap_or_else(|e| {
            warn!("Invalid config at {}, using defaults: {:#}", CONFIG_PATH, e);
            Self::default()
        }))
    }

    /// Load config from specific path
    pub fn load_from_path(path: &Path) -> Result<Self, MedicError> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, MedicError> {
        let config: MedicConfig = toml::from_str(content)?;
        if config.executor.probe_timeout_ms == 0 || config.executor.batch_deadline_ms == 0 {
            return Err(MedicError::Config(
                "executor timeouts must be greater than zero".to_string(),
            ));
        }
        if config.executor.probe_timeout_ms > config.executor.batch_deadline_ms {
            warn!(
                "probe_timeout_ms ({}) exceeds batch_deadline_ms ({}); the batch deadline wins",
                config.executor.probe_timeout_ms, config.executor.batch_deadline_ms
            );
        }
        Ok(config)
    }
}
