//! Recommendation engine tests over hand-built reports.

use chrono::Utc;
use dbmedic_common::{
    AggregatedReport, MetricDomain, Priority, ProbeResult, RecommendationKind, ScenarioId,
};
use dbmedicd::aggregator::aggregate;
use dbmedicd::config::RecommendConfig;
use dbmedicd::probe::registry::standard_specs;
use dbmedicd::recommender::recommend;
use serde_json::{json, Value};
use std::collections::BTreeMap;

const MB: u64 = 1024 * 1024;

fn report(entries: &[(&str, Option<Value>)]) -> AggregatedReport {
    let specs = standard_specs();
    let now = Utc::now();
    let results = entries
        .iter()
        .map(|(id, payload)| {
            let spec = specs.iter().find(|s| s.id == *id).unwrap();
            let result = match payload {
                Some(p) => ProbeResult::ok(spec, p.clone(), 1, now),
                None => ProbeResult::error(spec, "unavailable".to_string(), 1, now),
            };
            (id.to_string(), result)
        })
        .collect::<BTreeMap<_, _>>();
    aggregate(ScenarioId::new("index_optimization"), results, None)
}

#[test]
fn test_three_create_index_in_declaration_order() {
    let r = report(&[
        (
            "table_stats",
            Some(json!([{"table": "orders", "seq_scans": 500, "idx_scans": 10, "live_rows": 5000}])),
        ),
        (
            "schema_columns",
            Some(json!([
                {"table": "orders", "column": "id", "data_type": "int"},
                {"table": "orders", "column": "name", "data_type": "text"},
                {"table": "orders", "column": "created_at", "data_type": "timestamp"}
            ])),
        ),
    ]);

    let recs = recommend(&r, &RecommendConfig::default());

    assert_eq!(recs.len(), 3);
    assert!(recs.iter().all(|r| r.kind == RecommendationKind::CreateIndex));
    let columns: Vec<_> = recs.iter().map(|r| r.target.as_str()).collect();
    assert_eq!(
        columns,
        vec!["public.orders.id", "public.orders.name", "public.orders.created_at"]
    );
    assert!(recs.iter().all(|r| r.statement.starts_with("CREATE INDEX CONCURRENTLY")));
    assert!(recs.iter().all(|r| r.source_domain == MetricDomain::TableStats));
}

#[test]
fn test_single_unused_index() {
    let r = report(&[(
        "index_usage",
        Some(json!([
            {"table": "t", "index": "idx_a", "scans": 2, "size_bytes": 100 * MB},
            {"table": "t", "index": "idx_b", "scans": 50, "size_bytes": 10 * MB},
            {"table": "t", "index": "pkey", "scans": 0, "size_bytes": 5 * MB}
        ])),
    )]);

    let recs = recommend(&r, &RecommendConfig::default());

    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].kind, RecommendationKind::DropIndex);
    assert_eq!(recs[0].target, "public.idx_a");
    assert_eq!(recs[0].priority, Priority::Medium);
    assert!(recs[0].rationale.contains("100.0 MB"));
}

#[test]
fn test_missing_domains_yield_nothing() {
    let r = report(&[
        ("table_stats", None),
        ("schema_columns", None),
        ("index_usage", None),
        ("slow_queries", None),
    ]);
    assert!(recommend(&r, &RecommendConfig::default()).is_empty());

    let empty = report(&[]);
    assert!(recommend(&empty, &RecommendConfig::default()).is_empty());
}

#[test]
fn test_mixed_kinds_sorted_by_priority_then_impact() {
    let r = report(&[
        (
            "table_stats",
            Some(json!([{"table": "events", "seq_scans": 25000, "idx_scans": 3, "live_rows": 2000000}])),
        ),
        (
            "schema_columns",
            Some(json!([{"table": "events", "column": "user_id", "data_type": "bigint"}])),
        ),
        (
            "index_usage",
            Some(json!([
                {"table": "events", "index": "idx_events_old", "scans": 0, "size_bytes": 300 * MB},
                {"table": "events", "index": "idx_events_tmp", "scans": 1, "size_bytes": 120 * MB}
            ])),
        ),
        (
            "slow_queries",
            Some(json!([
                {"query": "SELECT * FROM events WHERE user_id = $1", "calls": 40, "mean_ms": 6200.0, "total_ms": 248000.0}
            ])),
        ),
    ]);

    let recs = recommend(&r, &RecommendConfig::default());
    let order: Vec<_> = recs.iter().map(|r| (r.kind, r.priority)).collect();

    // High: query hint (impact 248000) before create index (impact 25000)
    // Medium: larger index first
    assert_eq!(
        order,
        vec![
            (RecommendationKind::QueryHint, Priority::High),
            (RecommendationKind::CreateIndex, Priority::High),
            (RecommendationKind::DropIndex, Priority::Medium),
            (RecommendationKind::DropIndex, Priority::Medium),
        ]
    );
    assert_eq!(recs[2].target, "public.idx_events_old");
}

#[test]
fn test_thresholds_are_configurable() {
    let r = report(&[(
        "index_usage",
        Some(json!([{"table": "t", "index": "idx_rare", "scans": 25, "size_bytes": MB}])),
    )]);
    assert!(recommend(&r, &RecommendConfig::default()).is_empty());

    let cfg = RecommendConfig {
        unused_scan_threshold: 50,
        ..RecommendConfig::default()
    };
    assert_eq!(recommend(&r, &cfg).len(), 1);
}
