//! Probe registry - the fixed set of probes known to the engine

use super::Probe;
use dbmedic_common::{CostTier, DataPlane, MetricDomain, ProbeId, ProbeSpec};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Registry of available probes, keyed by id (sorted for stable output)
pub struct ProbeRegistry {
    probes: BTreeMap<ProbeId, Arc<dyn Probe>>,
}

impl ProbeRegistry {
    /// Create empty registry
    pub fn new() -> Self {
        Self {
            probes: BTreeMap::new(),
        }
    }

    /// Build a registry over the standard probe set
    pub fn standard<F>(make: F) -> Self
    where
        F: Fn(ProbeSpec) -> Arc<dyn Probe>,
    {
        let mut registry = Self::new();
        for spec in standard_specs() {
            registry.register(make(spec));
        }
        debug!("Standard registry built with {} probes", registry.count());
        registry
    }

    /// Register a probe, replacing any probe with the same id
    pub fn register(&mut self, probe: Arc<dyn Probe>) {
        let id = probe.spec().id.clone();
        if self.probes.insert(id.clone(), probe).is_some() {
            warn!("  Probe '{}' registered twice, keeping the latest", id);
        }
    }

    /// Get probe by ID
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Probe>> {
        self.probes.get(id)
    }

    pub fn spec(&self, id: &str) -> Option<&ProbeSpec> {
        self.probes.get(id).map(|p| p.spec())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.probes.contains_key(id)
    }

    /// All probe specs in id order
    pub fn list(&self) -> Vec<&ProbeSpec> {
        self.probes.values().map(|p| p.spec()).collect()
    }

    /// All probe ids in id order
    pub fn ids(&self) -> Vec<ProbeId> {
        self.probes.keys().cloned().collect()
    }

    /// Count probes
    pub fn count(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}

impl Default for ProbeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The standard probe set across both data planes
pub fn standard_specs() -> Vec<ProbeSpec> {
    use CostTier::{Heavy, Light};
    use DataPlane::{MetricsPlane, Store};

    vec![
        // Metrics plane
        ProbeSpec::new("cpu", "CPU utilization over the window", MetricsPlane, Light, MetricDomain::Cpu),
        ProbeSpec::new(
            "connections",
            "Database connection count",
            MetricsPlane,
            Light,
            MetricDomain::Connections,
        ),
        ProbeSpec::new("alarms", "Configured alarms and their state", MetricsPlane, Light, MetricDomain::Alarms),
        ProbeSpec::new("db_load", "Average active sessions (DB load)", MetricsPlane, Heavy, MetricDomain::DbLoad),
        ProbeSpec::new(
            "io_latency",
            "Read/write latency and IOPS",
            MetricsPlane,
            Light,
            MetricDomain::IoLatency,
        ),
        ProbeSpec::new(
            "freeable_memory",
            "Freeable memory on the instance",
            MetricsPlane,
            Light,
            MetricDomain::Memory,
        ),
        // Store
        ProbeSpec::new("active_sessions", "Non-idle backend sessions", Store, Light, MetricDomain::Sessions),
        ProbeSpec::new(
            "slow_queries",
            "Statements by mean execution time",
            Store,
            Heavy,
            MetricDomain::SlowQueries,
        ),
        ProbeSpec::new(
            "table_stats",
            "Sequential vs index scans per table",
            Store,
            Light,
            MetricDomain::TableStats,
        ),
        ProbeSpec::new(
            "schema_columns",
            "Column names and types in declaration order",
            Store,
            Light,
            MetricDomain::SchemaColumns,
        ),
        ProbeSpec::new("index_usage", "Index scan counts and sizes", Store, Light, MetricDomain::IndexUsage),
        ProbeSpec::new(
            "blocking_queries",
            "Sessions blocked by lock holders",
            Store,
            Light,
            MetricDomain::Blocking,
        ),
        ProbeSpec::new(
            "buffer_cache",
            "Buffer cache hit ratio",
            Store,
            Light,
            MetricDomain::BufferCache,
        ),
        ProbeSpec::new("wait_events", "Current wait events by type", Store, Light, MetricDomain::WaitEvents),
        ProbeSpec::new(
            "connection_pool",
            "Connections by state and application",
            Store,
            Light,
            MetricDomain::ConnectionPool,
        ),
        ProbeSpec::new("largest_tables", "Largest relations on disk", Store, Heavy, MetricDomain::TableSizes),
        ProbeSpec::new("table_bloat", "Dead tuple ratios per table", Store, Heavy, MetricDomain::TableBloat),
    ]
}
