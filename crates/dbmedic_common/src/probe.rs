//! Probe metadata and probe results.
//!
//! A probe is a single read-only diagnostic operation against one data plane.
//! Its result is produced once per invocation and never mutated afterwards.

use crate::error::MedicError;
use crate::metrics::MetricDomain;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Probe identifier (e.g. "cpu", "slow_queries")
pub type ProbeId = String;

/// Telemetry source a probe reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataPlane {
    /// The live data-store engine
    Store,
    /// The metrics/alerting plane
    MetricsPlane,
}

impl DataPlane {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataPlane::Store => "store",
            DataPlane::MetricsPlane => "metrics_plane",
        }
    }
}

/// Probe cost estimation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostTier {
    /// Single catalog/metric lookup
    Light,
    /// Scans statistics views or pulls long metric windows
    Heavy,
}

impl CostTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostTier::Light => "light",
            CostTier::Heavy => "heavy",
        }
    }
}

/// Probe definition held by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeSpec {
    /// Unique probe identifier
    pub id: ProbeId,
    /// Human-readable description
    pub description: String,
    /// Which telemetry source is queried
    pub data_plane: DataPlane,
    /// Estimated cost
    pub cost_tier: CostTier,
    /// Output schema tag
    pub domain: MetricDomain,
}

impl ProbeSpec {
    pub fn new(
        id: &str,
        description: &str,
        data_plane: DataPlane,
        cost_tier: CostTier,
        domain: MetricDomain,
    ) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            data_plane,
            cost_tier,
            domain,
        }
    }
}

/// Observation window handed to every probe of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Window ending now and reaching `minutes` back
    pub fn last_minutes(minutes: i64) -> Self {
        let end = Utc::now();
        Self {
            start: end - Duration::minutes(minutes),
            end,
        }
    }

    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Probe execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Ok,
    Error,
    TimedOut,
}

impl ProbeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeStatus::Ok => "ok",
            ProbeStatus::Error => "error",
            ProbeStatus::TimedOut => "timed_out",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ProbeStatus::Ok)
    }
}

/// Result of one probe invocation within one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Probe identifier
    pub probe_id: ProbeId,
    /// Output schema tag of the probe
    pub domain: MetricDomain,
    /// Execution status
    pub status: ProbeStatus,
    /// Payload (null unless status is ok)
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Error or timeout description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall time spent on the probe
    pub latency_ms: u64,
    /// When the probe was launched
    pub timestamp: DateTime<Utc>,
}

impl ProbeResult {
    pub fn ok(
        spec: &ProbeSpec,
        payload: serde_json::Value,
        latency_ms: u64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            probe_id: spec.id.clone(),
            domain: spec.domain,
            status: ProbeStatus::Ok,
            payload,
            error: None,
            latency_ms,
            timestamp,
        }
    }

    pub fn error(spec: &ProbeSpec, message: String, latency_ms: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            probe_id: spec.id.clone(),
            domain: spec.domain,
            status: ProbeStatus::Error,
            payload: serde_json::Value::Null,
            error: Some(message),
            latency_ms,
            timestamp,
        }
    }

    pub fn timed_out(spec: &ProbeSpec, message: String, latency_ms: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            probe_id: spec.id.clone(),
            domain: spec.domain,
            status: ProbeStatus::TimedOut,
            payload: serde_json::Value::Null,
            error: Some(message),
            latency_ms,
            timestamp,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    /// Run-level error view of a failed result
    pub fn failure(&self) -> Option<MedicError> {
        match self.status {
            ProbeStatus::Ok => None,
            ProbeStatus::Error => Some(MedicError::ProbeExecution {
                probe_id: self.probe_id.clone(),
                message: self.error.clone().unwrap_or_default(),
            }),
            ProbeStatus::TimedOut => Some(MedicError::ProbeTimedOut {
                probe_id: self.probe_id.clone(),
                after_ms: self.latency_ms,
            }),
        }
    }
}
