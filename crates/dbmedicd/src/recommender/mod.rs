//! Recommendation engine - rule functions over an aggregated report.
//!
//! Each rule family reads only its own domains. A missing or failed domain
//! yields no recommendations of that kind.

mod index;
mod query;

pub use index::{create_index_recommendations, drop_index_recommendations, normalize_type};
pub use query::query_hint_recommendations;

use crate::config::RecommendConfig;
use dbmedic_common::{sort_recommendations, AggregatedReport, Recommendation};
use tracing::debug;

/// Generate and order all recommendations for a report
pub fn recommend(report: &AggregatedReport, config: &RecommendConfig) -> Vec<Recommendation> {
    let mut recs = Vec::new();

    recs.extend(create_index_recommendations(report, config));
    recs.extend(drop_index_recommendations(report, config));
    recs.extend(query_hint_recommendations(report, config));

    sort_recommendations(&mut recs);
    debug!("Generated {} recommendations", recs.len());
    recs
}

/// Human-readable byte size
pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
