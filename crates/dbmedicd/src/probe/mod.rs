//! Probe trait and per-run context.
//!
//! Production runs use `SnapshotProbe`; tests use `FakeProbe` with
//! pre-configured behaviour and call counting.

pub mod fake;
pub mod registry;
pub mod snapshot;

use async_trait::async_trait;
use dbmedic_common::{ProbeError, ProbeSpec, TimeWindow};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Context handed to every probe of one run
#[derive(Debug, Clone)]
pub struct ProbeContext {
    pub run_id: Uuid,
    pub window: TimeWindow,
    /// Cancelled when the batch deadline passes
    pub cancel: CancellationToken,
}

impl ProbeContext {
    pub fn new(window: TimeWindow) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            window,
            cancel: CancellationToken::new(),
        }
    }

    /// Same run and window, separate cancellation scope
    pub fn child(&self) -> Self {
        Self {
            run_id: self.run_id,
            window: self.window,
            cancel: self.cancel.child_token(),
        }
    }
}

/// A read-only diagnostic operation against one data plane
///
/// Implementations must be cancel-safe: the executor drops the future on
/// timeout or deadline.
#[async_trait]
pub trait Probe: Send + Sync {
    fn spec(&self) -> &ProbeSpec;

    /// Payload must match `spec().domain`'s declared shape
    async fn invoke(&self, ctx: &ProbeContext) -> Result<Value, ProbeError>;
}
