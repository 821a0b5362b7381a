//! Health score with explicit deductions.
//!
//! The score is derived from report content only; see `dbmedicd::scoring`.

use crate::metrics::MetricDomain;
use serde::{Deserialize, Serialize};

/// Deduction rule identifiers, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeductionRule {
    HighCpu,
    ConnectionPressure,
    LowCacheHitRatio,
    ActiveAlarm,
    MissingMetricDomain,
}

impl DeductionRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeductionRule::HighCpu => "high_cpu",
            DeductionRule::ConnectionPressure => "connection_pressure",
            DeductionRule::LowCacheHitRatio => "low_cache_hit_ratio",
            DeductionRule::ActiveAlarm => "active_alarm",
            DeductionRule::MissingMetricDomain => "missing_metric_domain",
        }
    }

    pub fn explanation(&self) -> &'static str {
        match self {
            DeductionRule::HighCpu => "CPU utilization above threshold",
            DeductionRule::ConnectionPressure => "Active connections above threshold",
            DeductionRule::LowCacheHitRatio => "Buffer cache hit ratio below threshold",
            DeductionRule::ActiveAlarm => "At least one alarm in ALARM state",
            DeductionRule::MissingMetricDomain => "Required metric domain produced no usable data",
        }
    }
}

impl std::fmt::Display for DeductionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A triggered rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deduction {
    pub rule: DeductionRule,
    pub amount: u8,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthScore {
    /// 0-100
    pub value: u8,
    /// Triggered rules only, in table order
    pub deductions: Vec<Deduction>,
    /// Required domains no probe in this run covered
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unassessed_domains: Vec<MetricDomain>,
}

impl HealthScore {
    pub fn total_deducted(&self) -> u32 {
        self.deductions.iter().map(|d| d.amount as u32).sum()
    }

    pub fn band(&self) -> &'static str {
        match self.value {
            90..=100 => "healthy",
            70..=89 => "warning",
            40..=69 => "degraded",
            _ => "critical",
        }
    }
}
