//! Fallback controller - bounded recovery around selection and execution.
//!
//! ```text
//! Selecting -> Executing -> Success | PartiallyDegraded | TotalFailure
//! Selecting (invalid)  -> FallbackExecuting
//! TotalFailure         -> FallbackExecuting
//! FallbackExecuting    -> Success | PartiallyDegraded | TotalFailure (terminal, error)
//! ```
//!
//! The full registry is substituted at most once per run.

use crate::executor::{BatchOutcome, ProbeExecutor};
use crate::probe::ProbeContext;
use crate::selector::Selection;
use dbmedic_common::{FallbackReason, MedicError, ProbeId, ProbeResult, SelectionIssue};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Selecting,
    Executing,
    Success,
    PartiallyDegraded,
    TotalFailure,
    FallbackExecuting,
}

impl From<BatchOutcome> for RunState {
    fn from(outcome: BatchOutcome) -> Self {
        match outcome {
            BatchOutcome::Success => RunState::Success,
            BatchOutcome::PartiallyDegraded => RunState::PartiallyDegraded,
            BatchOutcome::TotalFailure => RunState::TotalFailure,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: RunState,
    pub to: RunState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Execution results plus the path taken to get them
#[derive(Debug, Clone)]
pub struct ControlledRun {
    pub results: BTreeMap<ProbeId, ProbeResult>,
    pub final_state: RunState,
    pub fallback_reason: Option<FallbackReason>,
    pub transitions: Vec<Transition>,
}

impl ControlledRun {
    pub fn fallback_used(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

struct Recorder {
    state: RunState,
    transitions: Vec<Transition>,
}

impl Recorder {
    fn new() -> Self {
        Self {
            state: RunState::Selecting,
            transitions: Vec::new(),
        }
    }

    fn advance(&mut self, to: RunState, note: Option<String>) {
        info!("Run state {:?} -> {:?}", self.state, to);
        self.transitions.push(Transition {
            from: self.state,
            to,
            note,
        });
        self.state = to;
    }
}

pub struct FallbackController {
    executor: ProbeExecutor,
}

impl FallbackController {
    pub fn new(executor: ProbeExecutor) -> Self {
        Self { executor }
    }

    /// Execute the selection, substituting the full registry once if the
    /// selection is invalid or the batch produces nothing usable
    pub async fn run(
        &self,
        selection: Result<Selection, SelectionIssue>,
        ctx: &ProbeContext,
    ) -> Result<ControlledRun, MedicError> {
        let mut recorder = Recorder::new();

        let reason = match selection {
            Ok(selection) => {
                recorder.advance(RunState::Executing, Some(format!("scenario {}", selection.scenario)));
                let batch = self.executor.execute(&selection.probes, ctx).await;
                let state = RunState::from(batch.outcome);
                recorder.advance(state, None);

                if batch.outcome != BatchOutcome::TotalFailure {
                    return Ok(ControlledRun {
                        results: batch.results,
                        final_state: state,
                        fallback_reason: None,
                        transitions: recorder.transitions,
                    });
                }
                warn!(
                    "All {} selected probes failed, falling back to the full registry",
                    batch.results.len()
                );
                FallbackReason::TotalFailure {
                    attempted: batch.results.len(),
                }
            }
            Err(issue) => {
                warn!("Selection invalid ({}), falling back to the full registry", issue);
                FallbackReason::SelectionInvalid { issue }
            }
        };

        recorder.advance(RunState::FallbackExecuting, Some(reason.to_string()));
        let all = self.executor.registry().ids();
        let batch = self.executor.execute(&all, ctx).await;
        let state = RunState::from(batch.outcome);
        recorder.advance(state, Some("fallback".to_string()));

        if batch.outcome == BatchOutcome::TotalFailure {
            error!("Fallback over {} probes produced no usable result", all.len());
            return Err(MedicError::TotalFailure {
                attempted: all.len(),
                fallback_used: true,
            });
        }

        Ok(ControlledRun {
            results: batch.results,
            final_state: state,
            fallback_reason: Some(reason),
            transitions: recorder.transitions,
        })
    }
}
