//! Fake probes for deterministic testing
//!
//! Pre-configured behaviour per probe, no live connections. Call counts are
//! tracked per probe id for assertions.
//!
//! ```rust,ignore
//! let fakes = FakeRegistryBuilder::standard()
//!     .behavior("cpu", FakeBehavior::Hang)
//!     .build();
//! let registry = Arc::new(fakes.registry);
//! // ... run ...
//! assert_eq!(fakes.calls.call_count("cpu"), 1);
//! ```

use super::registry::{standard_specs, ProbeRegistry};
use super::{Probe, ProbeContext};
use async_trait::async_trait;
use dbmedic_common::{MetricDomain, ProbeError, ProbeId, ProbeSpec};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Fake Probe
// ============================================================================

/// What a fake probe does when invoked
#[derive(Debug, Clone)]
pub enum FakeBehavior {
    /// Return this payload immediately
    Ok(Value),
    /// Return the domain's healthy sample payload
    Sample,
    /// Fail with a query error
    Error(String),
    /// Never return
    Hang,
    /// Sleep, then return the payload
    Delay(Duration, Value),
    /// Panic inside the probe task
    Panic,
    /// Return a payload that violates the declared shape
    Malformed,
}

pub struct FakeProbe {
    spec: ProbeSpec,
    behavior: FakeBehavior,
    calls: Arc<AtomicUsize>,
}

impl FakeProbe {
    pub fn new(spec: ProbeSpec, behavior: FakeBehavior) -> Self {
        Self {
            spec,
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Probe returning the healthy sample payload for its domain
    pub fn sample(spec: ProbeSpec) -> Arc<dyn Probe> {
        Arc::new(Self::new(spec, FakeBehavior::Sample))
    }

    pub fn ok(spec: ProbeSpec, payload: Value) -> Arc<dyn Probe> {
        Arc::new(Self::new(spec, FakeBehavior::Ok(payload)))
    }

    pub fn error(spec: ProbeSpec, message: &str) -> Arc<dyn Probe> {
        Arc::new(Self::new(spec, FakeBehavior::Error(message.to_string())))
    }

    /// Shared invocation counter
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Probe for FakeProbe {
    fn spec(&self) -> &ProbeSpec {
        &self.spec
    }

    async fn invoke(&self, _ctx: &ProbeContext) -> Result<Value, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match &self.behavior {
            FakeBehavior::Ok(payload) => Ok(payload.clone()),
            FakeBehavior::Sample => Ok(sample_payload(self.spec.domain)),
            FakeBehavior::Error(message) => Err(ProbeError::Query(message.clone())),
            FakeBehavior::Hang => {
                std::future::pending::<()>().await;
                Err(ProbeError::Cancelled)
            }
            FakeBehavior::Delay(delay, payload) => {
                tokio::time::sleep(*delay).await;
                Ok(payload.clone())
            }
            FakeBehavior::Panic => panic!("fake probe '{}' panicked", self.spec.id),
            FakeBehavior::Malformed => Ok(json!("not a valid payload")),
        }
    }
}

/// Healthy payload that satisfies the domain's declared shape
pub fn sample_payload(domain: MetricDomain) -> Value {
    match domain {
        MetricDomain::Cpu => json!({"cpu_utilization_pct": 42.0}),
        MetricDomain::Connections => json!({"active_connections": 20}),
        MetricDomain::BufferCache => json!({"buffer_cache_hit_pct": 99.2}),
        MetricDomain::DbLoad => json!({"db_load": 1.5}),
        MetricDomain::IoLatency => json!({"read_latency_ms": 1.2, "write_latency_ms": 2.4}),
        MetricDomain::Memory => json!({"freeable_memory_bytes": 4_294_967_296u64}),
        MetricDomain::Alarms => json!([
            {"name": "db-cpu-high", "metric_name": "CPUUtilization", "state": "OK"}
        ]),
        MetricDomain::Sessions => json!([
            {"pid": 101, "state": "active", "query": "SELECT 1", "duration_ms": 3}
        ]),
        _ => json!([]),
    }
}

// ============================================================================
// Call counts
// ============================================================================

/// Per-probe invocation counters of a fake registry
#[derive(Debug, Clone, Default)]
pub struct FakeCalls {
    counters: HashMap<ProbeId, Arc<AtomicUsize>>,
}

impl FakeCalls {
    /// Get the number of calls to a specific probe
    pub fn call_count(&self, probe_id: &str) -> usize {
        self.counters
            .get(probe_id)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Get total call count across all probes
    pub fn total_calls(&self) -> usize {
        self.counters.values().map(|c| c.load(Ordering::SeqCst)).sum()
    }
}

// ============================================================================
// Builder
// ============================================================================

pub struct FakeRegistry {
    pub registry: ProbeRegistry,
    pub calls: FakeCalls,
}

/// Builder for a registry of fake probes
pub struct FakeRegistryBuilder {
    specs: Vec<ProbeSpec>,
    behaviors: HashMap<ProbeId, FakeBehavior>,
    default_behavior: FakeBehavior,
}

impl FakeRegistryBuilder {
    /// Start with no probes
    pub fn new() -> Self {
        Self {
            specs: Vec::new(),
            behaviors: HashMap::new(),
            default_behavior: FakeBehavior::Sample,
        }
    }

    /// Start with the standard probe set returning healthy samples
    pub fn standard() -> Self {
        Self {
            specs: standard_specs(),
            ..Self::new()
        }
    }

    /// Add a probe spec
    pub fn spec(mut self, spec: ProbeSpec) -> Self {
        self.specs.retain(|s| s.id != spec.id);
        self.specs.push(spec);
        self
    }

    /// Override one probe's behaviour
    pub fn behavior(mut self, probe_id: &str, behavior: FakeBehavior) -> Self {
        self.behaviors.insert(probe_id.to_string(), behavior);
        self
    }

    /// Override the payload one probe returns
    pub fn payload(self, probe_id: &str, payload: Value) -> Self {
        self.behavior(probe_id, FakeBehavior::Ok(payload))
    }

    /// Behaviour for probes without an override
    pub fn default_behavior(mut self, behavior: FakeBehavior) -> Self {
        self.default_behavior = behavior;
        self
    }

    /// Every probe fails with a query error
    pub fn all_failing(self, message: &str) -> Self {
        let mut builder = self.default_behavior(FakeBehavior::Error(message.to_string()));
        builder.behaviors.clear();
        builder
    }

    pub fn build(self) -> FakeRegistry {
        let mut registry = ProbeRegistry::new();
        let mut calls = FakeCalls::default();

        for spec in self.specs {
            let behavior = self
                .behaviors
                .get(&spec.id)
                .cloned()
                .unwrap_or_else(|| self.default_behavior.clone());
            let probe = FakeProbe::new(spec, behavior);
            calls.counters.insert(probe.spec.id.clone(), probe.counter());
            registry.register(Arc::new(probe));
        }

        FakeRegistry { registry, calls }
    }
}

impl Default for FakeRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbmedic_common::TimeWindow;

    fn ctx() -> ProbeContext {
        ProbeContext::new(TimeWindow::last_minutes(60))
    }

    #[test]
    fn test_samples_match_declared_shapes() {
        for domain in MetricDomain::ALL {
            assert!(
                domain.validate(&sample_payload(domain)).is_ok(),
                "sample for {} violates its shape",
                domain
            );
        }
    }

    #[tokio::test]
    async fn test_builder_overrides_and_counts() {
        let fakes = FakeRegistryBuilder::standard()
            .behavior("cpu", FakeBehavior::Error("metrics plane down".to_string()))
            .build();

        let cpu = fakes.registry.get("cpu").unwrap();
        let err = cpu.invoke(&ctx()).await.unwrap_err();
        assert_eq!(err, ProbeError::Query("metrics plane down".to_string()));

        let cache = fakes.registry.get("buffer_cache").unwrap();
        assert!(cache.invoke(&ctx()).await.is_ok());
        assert!(cache.invoke(&ctx()).await.is_ok());

        assert_eq!(fakes.calls.call_count("cpu"), 1);
        assert_eq!(fakes.calls.call_count("buffer_cache"), 2);
        assert_eq!(fakes.calls.call_count("alarms"), 0);
        assert_eq!(fakes.calls.total_calls(), 3);
    }

    #[tokio::test]
    async fn test_all_failing_clears_overrides() {
        let fakes = FakeRegistryBuilder::standard()
            .payload("cpu", json!({"cpu_utilization_pct": 10.0}))
            .all_failing("offline")
            .build();
        for id in fakes.registry.ids() {
            let probe = fakes.registry.get(&id).unwrap();
            assert!(probe.invoke(&ctx()).await.is_err());
        }
    }
}
