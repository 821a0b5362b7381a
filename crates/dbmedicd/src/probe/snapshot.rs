//! Snapshot-backed probes.
//!
//! A telemetry snapshot captures both data planes as JSON: per probe a
//! payload, an error, or an artificial delay. The shipped binary drives the
//! engine from snapshots instead of live connections.

use super::{Probe, ProbeContext};
use async_trait::async_trait;
use dbmedic_common::{MedicError, ProbeError, ProbeId, ProbeSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// One probe's recorded response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Simulated response time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    #[serde(default)]
    pub probes: BTreeMap<ProbeId, SnapshotEntry>,
}

impl TelemetrySnapshot {
    pub fn load(path: &Path) -> Result<Self, MedicError> {
        let content = std::fs::read_to_string(path)?;
        let snapshot: TelemetrySnapshot = serde_json::from_str(&content)?;
        debug!(
            "Loaded snapshot {} with {} probe entries",
            path.display(),
            snapshot.probes.len()
        );
        Ok(snapshot)
    }
}

/// Probe answering from a shared snapshot
pub struct SnapshotProbe {
    spec: ProbeSpec,
    snapshot: Arc<TelemetrySnapshot>,
}

impl SnapshotProbe {
    pub fn new(spec: ProbeSpec, snapshot: Arc<TelemetrySnapshot>) -> Self {
        Self { spec, snapshot }
    }

    /// Factory for `ProbeRegistry::standard`
    pub fn factory(snapshot: Arc<TelemetrySnapshot>) -> impl Fn(ProbeSpec) -> Arc<dyn Probe> {
        move |spec| Arc::new(SnapshotProbe::new(spec, Arc::clone(&snapshot))) as Arc<dyn Probe>
    }
}

#[async_trait]
impl Probe for SnapshotProbe {
    fn spec(&self) -> &ProbeSpec {
        &self.spec
    }

    async fn invoke(&self, ctx: &ProbeContext) -> Result<Value, ProbeError> {
        let entry = self
            .snapshot
            .probes
            .get(&self.spec.id)
            .ok_or(ProbeError::NoData)?;

        if let Some(delay) = entry.delay_ms {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(delay)) => {}
                _ = ctx.cancel.cancelled() => return Err(ProbeError::Cancelled),
            }
        }

        if let Some(message) = &entry.error {
            return Err(ProbeError::Query(message.clone()));
        }

        entry.payload.clone().ok_or(ProbeError::NoData)
    }
}
