//! Aggregated per-run report.

use crate::error::SelectionIssue;
use crate::metrics::MetricDomain;
use crate::probe::{ProbeId, ProbeResult, ProbeStatus};
use crate::trigger::ScenarioId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Why the full registry was substituted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FallbackReason {
    /// Selection produced an empty or invalid probe set
    SelectionInvalid { issue: SelectionIssue },
    /// Every selected probe failed or timed out
    TotalFailure { attempted: usize },
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackReason::SelectionInvalid { issue } => write!(f, "selection invalid: {}", issue),
            FallbackReason::TotalFailure { attempted } => {
                write!(f, "all {} selected probes failed", attempted)
            }
        }
    }
}

/// One probe's contribution to a metric domain, with provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEntry {
    pub probe_id: ProbeId,
    pub status: ProbeStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl DomainEntry {
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}

/// Results of one run grouped by metric domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedReport {
    pub scenario: ScenarioId,
    pub results: BTreeMap<ProbeId, ProbeResult>,
    pub domains: BTreeMap<MetricDomain, Vec<DomainEntry>>,
    pub degraded: bool,
    pub fallback_used: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
}

impl AggregatedReport {
    /// Whether any probe of this domain was attempted
    pub fn attempted(&self, domain: MetricDomain) -> bool {
        self.domains.get(&domain).is_some_and(|e| !e.is_empty())
    }

    /// Usable entries for a domain, in probe-id order
    pub fn ok_entries(&self, domain: MetricDomain) -> impl Iterator<Item = &DomainEntry> {
        self.domains
            .get(&domain)
            .into_iter()
            .flatten()
            .filter(|e| e.is_ok())
    }

    /// First usable payload for a domain
    pub fn payload(&self, domain: MetricDomain) -> Option<&serde_json::Value> {
        self.ok_entries(domain).next().map(|e| &e.payload)
    }

    pub fn ok_count(&self) -> usize {
        self.results.values().filter(|r| r.is_ok()).count()
    }

    pub fn count_with(&self, status: ProbeStatus) -> usize {
        self.results.values().filter(|r| r.status == status).count()
    }
}
