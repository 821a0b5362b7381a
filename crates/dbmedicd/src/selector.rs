//! Probe selector - turns a scenario into the minimal probe set.

use crate::catalog::ScenarioCatalog;
use crate::probe::registry::ProbeRegistry;
use dbmedic_common::{ProbeId, ScenarioId, SelectionIssue};
use serde::Serialize;
use std::sync::Arc;

/// Probes chosen for one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub scenario: ScenarioId,
    /// Sorted probe ids
    pub probes: Vec<ProbeId>,
    pub registry_size: usize,
    /// 1 - selected/registry
    pub reduction_ratio: f64,
}

impl Selection {
    /// Every registered probe
    pub fn full(scenario: ScenarioId, registry: &ProbeRegistry) -> Self {
        Self::new(scenario, registry.ids(), registry.count())
    }

    fn new(scenario: ScenarioId, probes: Vec<ProbeId>, registry_size: usize) -> Self {
        let reduction_ratio = if registry_size == 0 {
            0.0
        } else {
            1.0 - probes.len() as f64 / registry_size as f64
        };
        Self {
            scenario,
            probes,
            registry_size,
            reduction_ratio,
        }
    }
}

#[derive(Clone)]
pub struct ProbeSelector {
    catalog: Arc<ScenarioCatalog>,
    registry: Arc<ProbeRegistry>,
}

impl ProbeSelector {
    pub fn new(catalog: Arc<ScenarioCatalog>, registry: Arc<ProbeRegistry>) -> Self {
        Self { catalog, registry }
    }

    /// Probe set for a scenario; non-comprehensive sets must be a strict,
    /// fully registered subset of the registry
    pub fn select(&self, scenario: &ScenarioId) -> Result<Selection, SelectionIssue> {
        if scenario.is_comprehensive() {
            return Ok(Selection::full(scenario.clone(), &self.registry));
        }

        let entry = self
            .catalog
            .get(scenario)
            .ok_or_else(|| SelectionIssue::UnknownScenario {
                scenario: scenario.clone(),
            })?;

        if entry.probes.is_empty() {
            return Err(SelectionIssue::EmptyProbeSet {
                scenario: scenario.clone(),
            });
        }

        let unknown: Vec<ProbeId> = entry
            .probes
            .iter()
            .filter(|p| !self.registry.contains(p))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(SelectionIssue::UnknownProbes {
                scenario: scenario.clone(),
                probes: unknown,
            });
        }

        let registry_size = self.registry.count();
        if entry.probes.len() >= registry_size {
            return Err(SelectionIssue::NoReduction {
                scenario: scenario.clone(),
                selected: entry.probes.len(),
                registry: registry_size,
            });
        }

        Ok(Selection::new(
            scenario.clone(),
            entry.probes.iter().cloned().collect(),
            registry_size,
        ))
    }
}
