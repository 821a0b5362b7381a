//! Result aggregator - groups probe results by metric domain.

use dbmedic_common::{AggregatedReport, DomainEntry, FallbackReason, ProbeId, ProbeResult, ScenarioId};
use std::collections::BTreeMap;
use tracing::debug;

/// Build the run report. Pure: same inputs, same report.
pub fn aggregate(
    scenario: ScenarioId,
    results: BTreeMap<ProbeId, ProbeResult>,
    fallback_reason: Option<FallbackReason>,
) -> AggregatedReport {
    let mut domains: BTreeMap<_, Vec<DomainEntry>> = BTreeMap::new();
    for result in results.values() {
        domains.entry(result.domain).or_default().push(DomainEntry {
            probe_id: result.probe_id.clone(),
            status: result.status,
            timestamp: result.timestamp,
            payload: result.payload.clone(),
        });
    }

    let fallback_used = fallback_reason.is_some();
    let degraded = fallback_used || results.values().any(|r| !r.is_ok());
    debug!(
        "Aggregated {} results into {} domains (degraded: {})",
        results.len(),
        domains.len(),
        degraded
    );

    AggregatedReport {
        scenario,
        results,
        domains,
        degraded,
        fallback_used,
        fallback_reason,
    }
}
