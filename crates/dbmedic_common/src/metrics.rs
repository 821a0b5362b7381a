//! Metric domains (probe output schema tags) and their typed rows.
//!
//! Every probe declares one domain. Scalar domains carry a JSON object with a
//! required numeric key, row domains carry a JSON array of objects. Row domains
//! with a typed row must decode row by row.

use crate::trigger::AlarmState;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Probe output schema tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricDomain {
    Cpu,
    Connections,
    Alarms,
    DbLoad,
    IoLatency,
    Memory,
    Sessions,
    SlowQueries,
    TableStats,
    SchemaColumns,
    IndexUsage,
    Blocking,
    BufferCache,
    WaitEvents,
    ConnectionPool,
    TableSizes,
    TableBloat,
}

/// Expected payload layout for a domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// JSON object with this numeric key present
    Scalar { key: &'static str },
    /// JSON array of objects
    Rows,
}

impl MetricDomain {
    pub const ALL: [MetricDomain; 17] = [
        MetricDomain::Cpu,
        MetricDomain::Connections,
        MetricDomain::Alarms,
        MetricDomain::DbLoad,
        MetricDomain::IoLatency,
        MetricDomain::Memory,
        MetricDomain::Sessions,
        MetricDomain::SlowQueries,
        MetricDomain::TableStats,
        MetricDomain::SchemaColumns,
        MetricDomain::IndexUsage,
        MetricDomain::Blocking,
        MetricDomain::BufferCache,
        MetricDomain::WaitEvents,
        MetricDomain::ConnectionPool,
        MetricDomain::TableSizes,
        MetricDomain::TableBloat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricDomain::Cpu => "cpu",
            MetricDomain::Connections => "connections",
            MetricDomain::Alarms => "alarms",
            MetricDomain::DbLoad => "db-load",
            MetricDomain::IoLatency => "io-latency",
            MetricDomain::Memory => "memory",
            MetricDomain::Sessions => "sessions",
            MetricDomain::SlowQueries => "slow-queries",
            MetricDomain::TableStats => "table-stats",
            MetricDomain::SchemaColumns => "schema-columns",
            MetricDomain::IndexUsage => "index-usage",
            MetricDomain::Blocking => "blocking",
            MetricDomain::BufferCache => "buffer-cache",
            MetricDomain::WaitEvents => "wait-events",
            MetricDomain::ConnectionPool => "connection-pool",
            MetricDomain::TableSizes => "table-sizes",
            MetricDomain::TableBloat => "table-bloat",
        }
    }

    /// Parse from the kebab-case tag
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|d| d.as_str() == s)
    }

    pub fn shape(&self) -> PayloadShape {
        match self {
            MetricDomain::Cpu => PayloadShape::Scalar {
                key: "cpu_utilization_pct",
            },
            MetricDomain::Connections => PayloadShape::Scalar {
                key: "active_connections",
            },
            MetricDomain::BufferCache => PayloadShape::Scalar {
                key: "buffer_cache_hit_pct",
            },
            MetricDomain::DbLoad => PayloadShape::Scalar { key: "db_load" },
            MetricDomain::IoLatency => PayloadShape::Scalar {
                key: "read_latency_ms",
            },
            MetricDomain::Memory => PayloadShape::Scalar {
                key: "freeable_memory_bytes",
            },
            _ => PayloadShape::Rows,
        }
    }

    /// Check a payload against this domain's declared shape
    pub fn validate(&self, payload: &Value) -> Result<(), String> {
        match self.shape() {
            PayloadShape::Scalar { key } => match payload.get(key) {
                Some(v) if v.is_number() => Ok(()),
                Some(_) => Err(format!("{}: '{}' is not numeric", self, key)),
                None => Err(format!("{}: missing required key '{}'", self, key)),
            },
            PayloadShape::Rows => {
                let rows = payload
                    .as_array()
                    .ok_or_else(|| format!("{}: expected an array of rows", self))?;
                if let Some(i) = rows.iter().position(|r| !r.is_object()) {
                    return Err(format!("{}: row {} is not an object", self, i));
                }
                match self {
                    MetricDomain::TableStats => self.check_rows::<TableStatRow>(rows),
                    MetricDomain::SchemaColumns => self.check_rows::<ColumnInfo>(rows),
                    MetricDomain::IndexUsage => self.check_rows::<IndexUsageRow>(rows),
                    MetricDomain::SlowQueries => self.check_rows::<SlowQueryRow>(rows),
                    MetricDomain::Alarms => self.check_rows::<AlarmRecord>(rows),
                    _ => Ok(()),
                }
            }
        }
    }

    /// Every row must decode into the domain's typed row
    fn check_rows<T: DeserializeOwned>(&self, rows: &[Value]) -> Result<(), String> {
        for (i, row) in rows.iter().enumerate() {
            T::deserialize(row).map_err(|e| format!("{}: row {}: {}", self, i, e))?;
        }
        Ok(())
    }

    /// Numeric value of a scalar payload
    pub fn scalar(&self, payload: &Value) -> Option<f64> {
        match self.shape() {
            PayloadShape::Scalar { key } => payload.get(key).and_then(Value::as_f64),
            PayloadShape::Rows => None,
        }
    }
}

impl fmt::Display for MetricDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decode a row payload into typed rows
pub fn parse_rows<T: DeserializeOwned>(payload: &Value) -> Result<Vec<T>, serde_json::Error> {
    serde_json::from_value(payload.clone())
}

/// One row of the `table-stats` domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStatRow {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub table: String,
    #[serde(alias = "seq_scan")]
    pub seq_scans: u64,
    #[serde(alias = "idx_scan", default)]
    pub idx_scans: u64,
    #[serde(alias = "n_live_tup")]
    pub live_rows: u64,
}

/// One row of the `schema-columns` domain, in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    #[serde(default = "default_schema", alias = "table_schema")]
    pub schema: String,
    #[serde(alias = "table_name")]
    pub table: String,
    #[serde(alias = "column_name")]
    pub column: String,
    pub data_type: String,
}

/// One row of the `index-usage` domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexUsageRow {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub table: String,
    #[serde(alias = "indexname")]
    pub index: String,
    #[serde(alias = "idx_scan")]
    pub scans: u64,
    pub size_bytes: u64,
    #[serde(default)]
    pub is_primary: bool,
}

impl IndexUsageRow {
    pub fn is_primary_key(&self) -> bool {
        self.is_primary || self.index == "pkey" || self.index.ends_with("_pkey")
    }
}

/// One row of the `slow-queries` domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlowQueryRow {
    pub query: String,
    #[serde(default)]
    pub calls: u64,
    #[serde(alias = "mean_exec_time")]
    pub mean_ms: f64,
    #[serde(alias = "total_exec_time", default)]
    pub total_ms: f64,
}

/// One row of the `alarms` domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmRecord {
    pub name: String,
    #[serde(default)]
    pub metric_name: String,
    pub state: AlarmState,
}

fn default_schema() -> String {
    "public".to_string()
}
