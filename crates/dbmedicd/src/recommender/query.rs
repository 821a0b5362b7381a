//! Query plan hints for slow statements.

use crate::config::RecommendConfig;
use dbmedic_common::{
    parse_rows, AggregatedReport, MetricDomain, Priority, Recommendation, RecommendationKind, SlowQueryRow,
};
use tracing::warn;

const TARGET_CHARS: usize = 80;

/// EXPLAIN hints for statements whose mean time crosses the threshold,
/// heaviest total time first
pub fn query_hint_recommendations(report: &AggregatedReport, config: &RecommendConfig) -> Vec<Recommendation> {
    let mut slow: Vec<SlowQueryRow> = report
        .ok_entries(MetricDomain::SlowQueries)
        .flat_map(|entry| {
            parse_rows::<SlowQueryRow>(&entry.payload).unwrap_or_else(|e| {
                warn!("  Skipping slow query rows from '{}': {}", entry.probe_id, e);
                Vec::new()
            })
        })
        .filter(|q| q.mean_ms >= config.slow_query_ms)
        .collect();
    slow.sort_by(|a, b| b.total_ms.total_cmp(&a.total_ms));

    slow.into_iter()
        .take(config.max_query_hints)
        .map(|q| {
            let priority = if q.mean_ms >= config.slow_query_high_ms {
                Priority::High
            } else {
                Priority::Medium
            };
            let query = q.query.split_whitespace().collect::<Vec<_>>().join(" ");
            Recommendation {
                kind: RecommendationKind::QueryHint,
                target: truncate(&query, TARGET_CHARS),
                rationale: format!(
                    "mean {:.0} ms over {} calls ({:.0} ms total); inspect the plan for scans and sorts",
                    q.mean_ms, q.calls, q.total_ms
                ),
                priority,
                statement: format!("EXPLAIN (ANALYZE, BUFFERS) {}", query),
                estimated_impact: q.total_ms.max(0.0) as u64,
                source_domain: MetricDomain::SlowQueries,
            }
        })
        .collect()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
