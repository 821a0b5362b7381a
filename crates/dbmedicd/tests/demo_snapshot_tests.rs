//! Runs the shipped demo config and snapshots through the engine.

use dbmedic_common::{AlarmState, MedicError, Priority, RecommendationKind, Trigger};
use dbmedicd::probe::registry::ProbeRegistry;
use dbmedicd::probe::snapshot::{SnapshotProbe, TelemetrySnapshot};
use dbmedicd::{Investigator, MedicConfig};
use std::path::PathBuf;
use std::sync::Arc;

fn demos() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos")
}

fn investigator(snapshot: &str) -> Investigator {
    let config = MedicConfig::load(Some(demos().join("dbmedic.toml").as_path())).unwrap();
    let snapshot = TelemetrySnapshot::load(&demos().join("snapshots").join(snapshot)).unwrap();
    let registry = ProbeRegistry::standard(SnapshotProbe::factory(Arc::new(snapshot)));
    Investigator::new(config, Arc::new(registry))
}

#[test]
fn test_demo_config_is_clean() {
    let inv = investigator("cpu_spike.json");
    assert!(inv.catalog_issues().is_empty(), "{:?}", inv.catalog_issues());
    assert_eq!(inv.catalog().len(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_cpu_spike() {
    let inv = investigator("cpu_spike.json");
    let result = inv
        .investigate(Trigger::alarm("CPUUtilization", AlarmState::Alarm).with_alarm_name("prod-db-cpu-high"))
        .await
        .unwrap();

    assert_eq!(result.selection.probes, vec!["active_sessions", "cpu", "slow_queries"]);
    assert!(!result.report.degraded);
    assert_eq!(result.health.value, 80);

    let hints: Vec<_> = result
        .recommendations
        .iter()
        .map(|r| (r.kind, r.priority))
        .collect();
    assert_eq!(
        hints,
        vec![
            (RecommendationKind::QueryHint, Priority::High),
            (RecommendationKind::QueryHint, Priority::Medium),
        ]
    );
}

#[tokio::test]
async fn test_index_review() {
    let inv = investigator("index_review.json");
    let result = inv.investigate(Trigger::text("index review for orders")).await.unwrap();

    assert_eq!(result.classification.scenario.as_str(), "index_optimization");
    // Cache hit 88.1% is the only deduction
    assert_eq!(result.health.value, 90);

    let targets: Vec<_> = result.recommendations.iter().map(|r| r.target.as_str()).collect();
    assert_eq!(
        targets,
        vec![
            "public.idx_orders_legacy_ref",
            "public.orders.customer_id",
            "public.orders.status",
            "public.orders.created_at",
            "public.idx_orders_note",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_outage_is_total_failure() {
    let inv = investigator("outage.json");
    let err = inv
        .investigate(Trigger::alarm("CPUUtilization", AlarmState::Alarm))
        .await
        .unwrap_err();
    assert!(matches!(err, MedicError::TotalFailure { attempted: 17, fallback_used: true }));
    assert_eq!(err.code(), 400);
}
