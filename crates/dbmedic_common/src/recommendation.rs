//! Actionable recommendations derived from a report.

use crate::metrics::MetricDomain;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    CreateIndex,
    DropIndex,
    QueryHint,
}

impl RecommendationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationKind::CreateIndex => "create_index",
            RecommendationKind::DropIndex => "drop_index",
            RecommendationKind::QueryHint => "query_hint",
        }
    }
}

/// Recommendation priority, ordered Low < Medium < High
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Priority::Low => 0,
            Priority::Medium => 1,
            Priority::High => 2,
        }
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    /// Table, index or query the recommendation is about
    pub target: String,
    pub rationale: String,
    pub priority: Priority,
    /// Ready-to-run statement
    pub statement: String,
    /// Sort key within a priority (scans, bytes or milliseconds)
    pub estimated_impact: u64,
    pub source_domain: MetricDomain,
}

/// Priority desc, then estimated impact desc; ties keep input order
pub fn sort_recommendations(recs: &mut [Recommendation]) {
    recs.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.estimated_impact.cmp(&a.estimated_impact))
    });
}
