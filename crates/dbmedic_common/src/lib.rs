//! dbmedic common - shared, serializable data model for investigations.
//!
//! Everything handed across the engine boundary lives here: probe metadata,
//! metric domains and their typed rows, triggers, probe results, aggregated
//! reports, health scores and recommendations.

pub mod error;
pub mod health;
pub mod metrics;
pub mod probe;
pub mod recommendation;
pub mod report;
pub mod trigger;

pub use error::{MedicError, ProbeError, SelectionIssue};
pub use health::{Deduction, DeductionRule, HealthScore};
pub use metrics::{
    parse_rows, AlarmRecord, ColumnInfo, IndexUsageRow, MetricDomain, PayloadShape, SlowQueryRow,
    TableStatRow,
};
pub use probe::{CostTier, DataPlane, ProbeId, ProbeResult, ProbeSpec, ProbeStatus, TimeWindow};
pub use recommendation::{sort_recommendations, Priority, Recommendation, RecommendationKind};
pub use report::{AggregatedReport, DomainEntry, FallbackReason};
pub use trigger::{AlarmState, ScenarioId, Trigger};
