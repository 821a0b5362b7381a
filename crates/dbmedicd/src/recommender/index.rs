//! Index creation and unused-index removal rules.

use super::format_bytes;
use crate::config::RecommendConfig;
use dbmedic_common::{
    parse_rows, AggregatedReport, ColumnInfo, IndexUsageRow, MetricDomain, Priority, Recommendation,
    RecommendationKind, TableStatRow,
};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use tracing::warn;

/// Canonical type name for allow-list matching
pub fn normalize_type(data_type: &str) -> String {
    let t = data_type.trim().to_lowercase();
    let base = t.split('(').next().unwrap_or("").trim();
    match base {
        "int" | "int4" | "integer" | "serial" => "integer".to_string(),
        "int8" | "bigint" | "bigserial" => "bigint".to_string(),
        "varchar" | "character varying" => "character varying".to_string(),
        "timestamptz" => "timestamp".to_string(),
        other if other.starts_with("timestamp") => "timestamp".to_string(),
        other => other.to_string(),
    }
}

/// Rows of every usable payload in a domain
fn rows<T: DeserializeOwned>(report: &AggregatedReport, domain: MetricDomain) -> Vec<T> {
    report
        .ok_entries(domain)
        .flat_map(|entry| match parse_rows::<T>(&entry.payload) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("  Skipping {} rows from '{}': {}", domain, entry.probe_id, e);
                Vec::new()
            }
        })
        .collect()
}

/// Tables scanned sequentially far more than by index: one CreateIndex per
/// candidate column, in declaration order
pub fn create_index_recommendations(report: &AggregatedReport, config: &RecommendConfig) -> Vec<Recommendation> {
    let tables: Vec<TableStatRow> = rows(report, MetricDomain::TableStats);
    let columns: Vec<ColumnInfo> = rows(report, MetricDomain::SchemaColumns);
    if tables.is_empty() || columns.is_empty() {
        return Vec::new();
    }

    let allowed: HashSet<String> = config
        .column_type_allow_list
        .iter()
        .map(|t| normalize_type(t))
        .collect();
    let existing: HashSet<(String, String)> = rows::<IndexUsageRow>(report, MetricDomain::IndexUsage)
        .into_iter()
        .map(|i| (i.schema, i.index))
        .collect();

    let mut recs = Vec::new();
    for table in tables.iter().filter(|t| {
        t.seq_scans > t.idx_scans && t.seq_scans > config.seq_scan_threshold && t.live_rows > config.row_threshold
    }) {
        let priority = if table.seq_scans >= config.create_high_seq_scans {
            Priority::High
        } else if table.seq_scans >= config.create_medium_seq_scans {
            Priority::Medium
        } else {
            Priority::Low
        };

        let candidates = columns
            .iter()
            .filter(|c| c.schema == table.schema && c.table == table.table)
            .filter(|c| allowed.contains(&normalize_type(&c.data_type)))
            .take(config.max_columns);

        for column in candidates {
            let index_name = format!("idx_{}_{}", table.table, column.column);
            if existing.contains(&(table.schema.clone(), index_name.clone())) {
                continue;
            }
            recs.push(Recommendation {
                kind: RecommendationKind::CreateIndex,
                target: format!("{}.{}.{}", table.schema, table.table, column.column),
                rationale: format!(
                    "{} has {} sequential scans vs {} index scans over {} live rows",
                    table.table, table.seq_scans, table.idx_scans, table.live_rows
                ),
                priority,
                statement: format!(
                    "CREATE INDEX CONCURRENTLY IF NOT EXISTS {} ON {}.{} ({});",
                    index_name, table.schema, table.table, column.column
                ),
                estimated_impact: table.seq_scans,
                source_domain: MetricDomain::TableStats,
            });
        }
    }
    recs
}

/// Rarely scanned, non-primary indexes, largest first
pub fn drop_index_recommendations(report: &AggregatedReport, config: &RecommendConfig) -> Vec<Recommendation> {
    let mut unused: Vec<IndexUsageRow> = rows::<IndexUsageRow>(report, MetricDomain::IndexUsage)
        .into_iter()
        .filter(|i| i.scans < config.unused_scan_threshold && !i.is_primary_key())
        .collect();
    unused.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));

    unused
        .into_iter()
        .map(|index| {
            let priority = if index.size_bytes >= config.drop_high_bytes {
                Priority::High
            } else if index.size_bytes >= config.drop_medium_bytes {
                Priority::Medium
            } else {
                Priority::Low
            };
            Recommendation {
                kind: RecommendationKind::DropIndex,
                target: format!("{}.{}", index.schema, index.index),
                rationale: format!(
                    "{} on {} has {} scans; dropping reclaims {}",
                    index.index,
                    index.table,
                    index.scans,
                    format_bytes(index.size_bytes)
                ),
                priority,
                statement: format!("DROP INDEX CONCURRENTLY IF EXISTS {}.{};", index.schema, index.index),
                estimated_impact: index.size_bytes,
                source_domain: MetricDomain::IndexUsage,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::aggregate;
    use crate::probe::registry::standard_specs;
    use chrono::Utc;
    use dbmedic_common::{ProbeResult, ScenarioId};
    use serde_json::{json, Value};
    use std::collections::BTreeMap;

    const MB: u64 = 1024 * 1024;

    fn report(entries: Vec<(&str, Value)>) -> AggregatedReport {
        let specs = standard_specs();
        let results = entries
            .into_iter()
            .map(|(id, payload)| {
                let spec = specs.iter().find(|s| s.id == id).unwrap();
                (id.to_string(), ProbeResult::ok(spec, payload, 1, Utc::now()))
            })
            .collect::<BTreeMap<_, _>>();
        aggregate(ScenarioId::new("index_optimization"), results, None)
    }

    #[test]
    fn test_normalize_type() {
        assert_eq!(normalize_type("int"), "integer");
        assert_eq!(normalize_type("INT4"), "integer");
        assert_eq!(normalize_type("varchar(255)"), "character varying");
        assert_eq!(normalize_type("timestamp without time zone"), "timestamp");
        assert_eq!(normalize_type("timestamptz"), "timestamp");
        assert_eq!(normalize_type("jsonb"), "jsonb");
    }

    #[test]
    fn test_create_index_respects_thresholds_and_types() {
        let r = report(vec![
            (
                "table_stats",
                json!([
                    {"table": "orders", "seq_scans": 20000, "idx_scans": 5, "live_rows": 90000},
                    {"table": "tiny", "seq_scans": 5000, "idx_scans": 1, "live_rows": 200},
                    {"table": "indexed", "seq_scans": 500, "idx_scans": 9000, "live_rows": 90000}
                ]),
            ),
            (
                "schema_columns",
                json!([
                    {"table": "orders", "column": "id", "data_type": "bigint"},
                    {"table": "orders", "column": "payload", "data_type": "jsonb"},
                    {"table": "orders", "column": "status", "data_type": "varchar(16)"},
                    {"table": "tiny", "column": "id", "data_type": "integer"},
                    {"table": "indexed", "column": "id", "data_type": "integer"}
                ]),
            ),
            (
                "index_usage",
                json!([{"table": "orders", "index": "idx_orders_id", "scans": 400, "size_bytes": 1024}]),
            ),
        ]);
        let recs = create_index_recommendations(&r, &RecommendConfig::default());
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].target, "public.orders.status");
        assert_eq!(recs[0].priority, Priority::High);
        assert_eq!(
            recs[0].statement,
            "CREATE INDEX CONCURRENTLY IF NOT EXISTS idx_orders_status ON public.orders (status);"
        );
    }

    #[test]
    fn test_column_cap() {
        let columns: Vec<Value> = (0..8)
            .map(|i| json!({"table": "wide", "column": format!("c{}", i), "data_type": "text"}))
            .collect();
        let r = report(vec![
            (
                "table_stats",
                json!([{"table": "wide", "seq_scans": 1500, "idx_scans": 0, "live_rows": 5000}]),
            ),
            ("schema_columns", Value::Array(columns)),
        ]);
        let recs = create_index_recommendations(&r, &RecommendConfig::default());
        assert_eq!(recs.len(), 5);
        assert!(recs.iter().all(|r| r.priority == Priority::Medium));
        assert_eq!(recs[4].target, "public.wide.c4");
    }

    #[test]
    fn test_columns_match_their_own_schema() {
        let r = report(vec![
            (
                "table_stats",
                json!([
                    {"schema": "public", "table": "orders", "seq_scans": 2000, "idx_scans": 1, "live_rows": 5000},
                    {"schema": "sales", "table": "orders", "seq_scans": 3000, "idx_scans": 1, "live_rows": 5000}
                ]),
            ),
            (
                "schema_columns",
                json!([
                    {"table": "orders", "column": "status", "data_type": "text"},
                    {"schema": "sales", "table": "orders", "column": "region", "data_type": "text"}
                ]),
            ),
            (
                "index_usage",
                json!([{"schema": "sales", "table": "orders", "index": "idx_orders_status", "scans": 90, "size_bytes": 1024}]),
            ),
        ]);
        let recs = create_index_recommendations(&r, &RecommendConfig::default());
        let statements: Vec<_> = recs.iter().map(|r| r.statement.as_str()).collect();
        assert_eq!(
            statements,
            vec![
                "CREATE INDEX CONCURRENTLY IF NOT EXISTS idx_orders_status ON public.orders (status);",
                "CREATE INDEX CONCURRENTLY IF NOT EXISTS idx_orders_region ON sales.orders (region);",
            ]
        );
    }

    #[test]
    fn test_missing_schema_columns_yields_nothing() {
        let r = report(vec![(
            "table_stats",
            json!([{"table": "orders", "seq_scans": 500, "idx_scans": 10, "live_rows": 5000}]),
        )]);
        assert!(create_index_recommendations(&r, &RecommendConfig::default()).is_empty());
    }

    #[test]
    fn test_drop_sorted_by_size() {
        let r = report(vec![(
            "index_usage",
            json!([
                {"table": "t", "index": "idx_small", "scans": 0, "size_bytes": 2 * MB},
                {"table": "t", "index": "idx_huge", "scans": 1, "size_bytes": 2048 * MB},
                {"table": "t", "index": "t_pkey", "scans": 0, "size_bytes": 4096 * MB},
                {"table": "t", "index": "idx_busy", "scans": 10, "size_bytes": 512 * MB}
            ]),
        )]);
        let recs = drop_index_recommendations(&r, &RecommendConfig::default());
        let targets: Vec<_> = recs.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(targets, vec!["public.idx_huge", "public.idx_small"]);
        assert_eq!(recs[0].priority, Priority::High);
        assert_eq!(recs[1].priority, Priority::Low);
        assert!(recs[0].rationale.contains("2.0 GB"));
        assert_eq!(recs[0].statement, "DROP INDEX CONCURRENTLY IF EXISTS public.idx_huge;");
    }
}
