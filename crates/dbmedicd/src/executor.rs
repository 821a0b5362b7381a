//! Probe executor - runs a probe set concurrently under a deadline.
//!
//! One task per probe. Each probe runs in its own inner task so a panic
//! surfaces as a `JoinError` instead of tearing down the batch. Failures,
//! panics, timeouts and malformed payloads become `ProbeResult`s; siblings
//! are never aborted. At the batch deadline the shared cancellation token
//! fires and whatever is still running is recorded as timed out.

use crate::probe::registry::ProbeRegistry;
use crate::probe::{Probe, ProbeContext};
use chrono::Utc;
use dbmedic_common::{ProbeError, ProbeId, ProbeResult, ProbeSpec};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Aggregate outcome of one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    /// Every probe returned a usable payload
    Success,
    /// At least one usable payload, at least one failure
    PartiallyDegraded,
    /// No usable payload at all
    TotalFailure,
}

#[derive(Debug, Clone)]
pub struct BatchResult {
    pub results: BTreeMap<ProbeId, ProbeResult>,
    pub outcome: BatchOutcome,
}

impl BatchResult {
    fn from_results(results: BTreeMap<ProbeId, ProbeResult>) -> Self {
        let ok = results.values().filter(|r| r.is_ok()).count();
        let outcome = if ok == 0 {
            BatchOutcome::TotalFailure
        } else if ok == results.len() {
            BatchOutcome::Success
        } else {
            BatchOutcome::PartiallyDegraded
        };
        Self { results, outcome }
    }
}

#[derive(Clone)]
pub struct ProbeExecutor {
    registry: Arc<ProbeRegistry>,
    probe_timeout: Duration,
    batch_deadline: Duration,
}

impl ProbeExecutor {
    pub fn new(registry: Arc<ProbeRegistry>, probe_timeout: Duration, batch_deadline: Duration) -> Self {
        Self {
            registry,
            probe_timeout,
            batch_deadline,
        }
    }

    pub fn registry(&self) -> &Arc<ProbeRegistry> {
        &self.registry
    }

    /// Run every probe in `probe_ids` concurrently
    pub async fn execute(&self, probe_ids: &[ProbeId], ctx: &ProbeContext) -> BatchResult {
        let batch_ctx = ctx.child();
        let deadline = Instant::now() + self.batch_deadline;
        let mut tasks = JoinSet::new();
        let mut launched: Vec<&ProbeSpec> = Vec::with_capacity(probe_ids.len());

        for id in probe_ids {
            let Some(probe) = self.registry.get(id) else {
                warn!("  Skipping unregistered probe '{}'", id);
                continue;
            };
            launched.push(probe.spec());
            let probe = Arc::clone(probe);
            let task_ctx = batch_ctx.clone();
            let limit = self.probe_timeout;
            tasks.spawn(async move { run_probe(probe, task_ctx, limit).await });
        }

        info!(
            "Executing {} probes (timeout {}ms, deadline {}ms)",
            launched.len(),
            self.probe_timeout.as_millis(),
            self.batch_deadline.as_millis()
        );

        let mut results = BTreeMap::new();
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok(result))) => {
                    results.insert(result.probe_id.clone(), result);
                }
                Ok(Some(Err(e))) => error!("  Probe task failed outside the probe: {}", e),
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        "Batch deadline of {}ms reached with {} probes outstanding, cancelling",
                        self.batch_deadline.as_millis(),
                        tasks.len()
                    );
                    batch_ctx.cancel.cancel();
                    while let Some(joined) = tasks.join_next().await {
                        if let Ok(result) = joined {
                            results.insert(result.probe_id.clone(), result);
                        }
                    }
                    break;
                }
            }
        }

        // A task lost to a runtime error still gets a result
        for spec in launched {
            if !results.contains_key(&spec.id) {
                results.insert(
                    spec.id.clone(),
                    ProbeResult::timed_out(
                        spec,
                        "no result before the batch deadline".to_string(),
                        self.batch_deadline.as_millis() as u64,
                        Utc::now(),
                    ),
                );
            }
        }

        let batch = BatchResult::from_results(results);
        info!(
            "Batch finished: {:?} ({} of {} probes ok)",
            batch.outcome,
            batch.results.values().filter(|r| r.is_ok()).count(),
            batch.results.len()
        );
        batch
    }
}

enum Waited {
    Finished(Result<Result<serde_json::Value, ProbeError>, JoinError>),
    Elapsed,
    Cancelled,
}

/// Run one probe with its own timeout, honouring batch cancellation
async fn run_probe(probe: Arc<dyn Probe>, ctx: ProbeContext, limit: Duration) -> ProbeResult {
    let spec = probe.spec().clone();
    let timestamp = Utc::now();
    let started = Instant::now();
    let cancel = ctx.cancel.clone();

    let mut handle = tokio::spawn(async move { probe.invoke(&ctx).await });

    let waited = tokio::select! {
        res = tokio::time::timeout(limit, &mut handle) => match res {
            Ok(joined) => Waited::Finished(joined),
            Err(_) => Waited::Elapsed,
        },
        _ = cancel.cancelled() => Waited::Cancelled,
    };
    let latency_ms = started.elapsed().as_millis() as u64;

    match waited {
        Waited::Elapsed => {
            handle.abort();
            warn!("  Probe '{}' timed out after {}ms", spec.id, limit.as_millis());
            ProbeResult::timed_out(
                &spec,
                format!("no response within {}ms", limit.as_millis()),
                latency_ms,
                timestamp,
            )
        }
        Waited::Cancelled => {
            handle.abort();
            warn!("  Probe '{}' cancelled at batch deadline", spec.id);
            ProbeResult::timed_out(&spec, "cancelled at batch deadline".to_string(), latency_ms, timestamp)
        }
        Waited::Finished(Err(join_error)) => {
            let message = if join_error.is_panic() {
                "probe panicked".to_string()
            } else {
                format!("probe task aborted: {}", join_error)
            };
            error!("  Probe '{}' failed: {}", spec.id, message);
            ProbeResult::error(&spec, message, latency_ms, timestamp)
        }
        Waited::Finished(Ok(Err(probe_error))) => {
            warn!("  Probe '{}' failed: {}", spec.id, probe_error);
            ProbeResult::error(&spec, probe_error.to_string(), latency_ms, timestamp)
        }
        Waited::Finished(Ok(Ok(payload))) => match spec.domain.validate(&payload) {
            Ok(()) => {
                debug!("  Probe '{}' ok in {}ms", spec.id, latency_ms);
                ProbeResult::ok(&spec, payload, latency_ms, timestamp)
            }
            Err(msg) => {
                let err = ProbeError::Malformed(msg);
                warn!("  Probe '{}' returned {}", spec.id, err);
                ProbeResult::error(&spec, err.to_string(), latency_ms, timestamp)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::fake::{FakeBehavior, FakeRegistryBuilder};
    use dbmedic_common::{ProbeStatus, TimeWindow};
    use serde_json::json;

    fn ids(list: &[&str]) -> Vec<ProbeId> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn ctx() -> ProbeContext {
        ProbeContext::new(TimeWindow::last_minutes(60))
    }

    fn executor(builder: FakeRegistryBuilder, timeout_ms: u64, deadline_ms: u64) -> ProbeExecutor {
        ProbeExecutor::new(
            Arc::new(builder.build().registry),
            Duration::from_millis(timeout_ms),
            Duration::from_millis(deadline_ms),
        )
    }

    #[tokio::test]
    async fn test_all_ok_is_success() {
        let exec = executor(FakeRegistryBuilder::standard(), 4000, 10000);
        let batch = exec.execute(&ids(&["cpu", "slow_queries", "active_sessions"]), &ctx()).await;
        assert_eq!(batch.outcome, BatchOutcome::Success);
        assert_eq!(batch.results.len(), 3);
    }

    #[tokio::test]
    async fn test_error_does_not_abort_siblings() {
        let builder = FakeRegistryBuilder::standard().behavior("cpu", FakeBehavior::Error("boom".to_string()));
        let exec = executor(builder, 4000, 10000);
        let batch = exec.execute(&ids(&["cpu", "slow_queries"]), &ctx()).await;
        assert_eq!(batch.outcome, BatchOutcome::PartiallyDegraded);
        assert_eq!(batch.results["cpu"].status, ProbeStatus::Error);
        assert_eq!(batch.results["cpu"].error.as_deref(), Some("query failed: boom"));
        assert!(batch.results["slow_queries"].is_ok());
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let builder = FakeRegistryBuilder::standard().behavior("cpu", FakeBehavior::Panic);
        let exec = executor(builder, 4000, 10000);
        let batch = exec.execute(&ids(&["cpu", "connections"]), &ctx()).await;
        assert_eq!(batch.results["cpu"].status, ProbeStatus::Error);
        assert_eq!(batch.results["cpu"].error.as_deref(), Some("probe panicked"));
        assert!(batch.results["connections"].is_ok());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_error() {
        let builder = FakeRegistryBuilder::standard()
            .behavior("cpu", FakeBehavior::Malformed)
            .payload("buffer_cache", json!({"hit": 99}));
        let exec = executor(builder, 4000, 10000);
        let batch = exec.execute(&ids(&["cpu", "buffer_cache"]), &ctx()).await;
        assert_eq!(batch.outcome, BatchOutcome::TotalFailure);
        assert!(batch.results["cpu"]
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with("malformed payload")));
        assert_eq!(batch.results["buffer_cache"].status, ProbeStatus::Error);
    }

    #[tokio::test]
    async fn test_undecodable_row_is_error() {
        let builder = FakeRegistryBuilder::standard().payload(
            "index_usage",
            json!([
                {"table": "t", "index": "idx_a", "scans": 2, "size_bytes": 104857600u64},
                {"table": "t", "index": "idx_b", "scans": 1}
            ]),
        );
        let exec = executor(builder, 4000, 10000);
        let batch = exec.execute(&ids(&["index_usage", "table_stats"]), &ctx()).await;

        assert_eq!(batch.outcome, BatchOutcome::PartiallyDegraded);
        let usage = &batch.results["index_usage"];
        assert_eq!(usage.status, ProbeStatus::Error);
        assert!(usage.payload.is_null());
        assert!(usage
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with("malformed payload: index-usage: row 1")));
        assert!(batch.results["table_stats"].is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_probe_times_out() {
        let builder = FakeRegistryBuilder::standard().behavior("slow_queries", FakeBehavior::Hang);
        let exec = executor(builder, 4000, 10000);
        let started = Instant::now();
        let batch = exec.execute(&ids(&["cpu", "slow_queries"]), &ctx()).await;

        assert!(started.elapsed() < Duration::from_millis(10000));
        assert_eq!(batch.outcome, BatchOutcome::PartiallyDegraded);
        let hung = &batch.results["slow_queries"];
        assert_eq!(hung.status, ProbeStatus::TimedOut);
        assert!(hung.payload.is_null());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_cancels_outstanding_probes() {
        // Per-probe timeout longer than the batch deadline
        let builder = FakeRegistryBuilder::standard()
            .behavior("cpu", FakeBehavior::Hang)
            .behavior(
                "connections",
                FakeBehavior::Delay(Duration::from_millis(500), json!({"active_connections": 7})),
            );
        let exec = executor(builder, 60000, 2000);
        let started = Instant::now();
        let batch = exec.execute(&ids(&["cpu", "connections"]), &ctx()).await;

        assert!(started.elapsed() <= Duration::from_millis(2100));
        assert_eq!(batch.results["cpu"].status, ProbeStatus::TimedOut);
        assert_eq!(
            batch.results["cpu"].error.as_deref(),
            Some("cancelled at batch deadline")
        );
        assert!(batch.results["connections"].is_ok());
    }

    #[tokio::test]
    async fn test_all_failing_is_total_failure() {
        let exec = executor(FakeRegistryBuilder::standard().all_failing("offline"), 4000, 10000);
        let batch = exec.execute(&ids(&["cpu", "alarms", "connections"]), &ctx()).await;
        assert_eq!(batch.outcome, BatchOutcome::TotalFailure);
        assert_eq!(batch.results.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_batch_is_total_failure() {
        let exec = executor(FakeRegistryBuilder::standard(), 4000, 10000);
        let batch = exec.execute(&[], &ctx()).await;
        assert_eq!(batch.outcome, BatchOutcome::TotalFailure);
        assert!(batch.results.is_empty());
    }
}
