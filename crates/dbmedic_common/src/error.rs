//! Error types for dbmedic.
//!
//! Only `TotalFailure` (after fallback) and configuration/IO problems ever reach
//! a caller as an `Err`. Everything else is absorbed into the report as data.

use crate::probe::ProbeId;
use crate::trigger::ScenarioId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a scenario could not be turned into a usable probe set
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum SelectionIssue {
    #[error("scenario '{scenario}' is not in the catalog")]
    UnknownScenario { scenario: ScenarioId },

    #[error("scenario '{scenario}' has an empty probe set")]
    EmptyProbeSet { scenario: ScenarioId },

    #[error("scenario '{scenario}' references unknown probes: {}", probes.join(", "))]
    UnknownProbes {
        scenario: ScenarioId,
        probes: Vec<ProbeId>,
    },

    #[error("scenario '{scenario}' selects {selected} of {registry} probes (no cost reduction)")]
    NoReduction {
        scenario: ScenarioId,
        selected: usize,
        registry: usize,
    },
}

/// Run-level errors
#[derive(Error, Debug)]
pub enum MedicError {
    #[error("classification ambiguous: trigger matched {}", candidates.join(", "))]
    ClassificationAmbiguous { candidates: Vec<String> },

    #[error("probe '{probe_id}' failed: {message}")]
    ProbeExecution { probe_id: ProbeId, message: String },

    #[error("probe '{probe_id}' timed out after {after_ms}ms")]
    ProbeTimedOut { probe_id: ProbeId, after_ms: u64 },

    #[error("selection invalid: {0}")]
    SelectionInvalid(#[from] SelectionIssue),

    #[error("total failure: none of {attempted} probes produced a usable result (fallback used: {fallback_used})")]
    TotalFailure { attempted: usize, fallback_used: bool },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl MedicError {
    /// Stable numeric code for machine consumers
    pub fn code(&self) -> i32 {
        match self {
            MedicError::ClassificationAmbiguous { .. } => 100,
            MedicError::ProbeExecution { .. } => 200,
            MedicError::ProbeTimedOut { .. } => 201,
            MedicError::SelectionInvalid(_) => 300,
            MedicError::TotalFailure { .. } => 400,
            MedicError::Config(_) => 500,
            MedicError::Io(_) => 501,
            MedicError::Json(_) => 502,
            MedicError::Toml(_) => 503,
        }
    }

    /// Whether the engine absorbs this error as report data
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            MedicError::TotalFailure { .. }
                | MedicError::Config(_)
                | MedicError::Io(_)
                | MedicError::Json(_)
                | MedicError::Toml(_)
        )
    }
}

/// Error returned by a single probe invocation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("query failed: {0}")]
    Query(String),

    #[error("no data available")]
    NoData,

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("cancelled")]
    Cancelled,
}
