//! Scenario catalog - named investigative categories and their probe sets.
//!
//! Loaded once at startup and validated against the registry. Validation is
//! lenient: problems are reported as `CatalogIssue`s and the scenario is kept,
//! so a broken scenario surfaces at run time as an invalid selection and the
//! fallback controller takes over.

use crate::config::CatalogConfig;
use crate::probe::registry::ProbeRegistry;
use dbmedic_common::{ProbeId, ScenarioId};
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::warn;

/// A named category with a fixed probe subset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scenario {
    pub id: ScenarioId,
    pub probes: BTreeSet<ProbeId>,
}

/// Startup validation findings
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum CatalogIssue {
    #[error("scenario '{scenario}' references unknown probe '{probe}'")]
    UnknownProbe { scenario: String, probe: String },

    #[error("scenario '{scenario}' has no probes")]
    EmptyScenario { scenario: String },

    #[error("scenario '{scenario}' covers the whole registry")]
    NoReduction { scenario: String },

    #[error("scenario '{scenario}' is defined more than once; keeping the first")]
    DuplicateScenario { scenario: String },

    #[error("scenario id '{scenario}' is reserved for the full registry")]
    ReservedScenario { scenario: String },

    #[error("{rule} rule points at unknown scenario '{scenario}'")]
    UnknownRuleScenario { rule: String, scenario: String },

    #[error("alarm pattern '{pattern}' is invalid: {error}")]
    InvalidPattern { pattern: String, error: String },
}

#[derive(Debug, Clone, Default)]
pub struct ScenarioCatalog {
    scenarios: Vec<Scenario>,
}

impl ScenarioCatalog {
    /// Build the catalog and collect validation issues
    pub fn from_config(config: &CatalogConfig, registry: &ProbeRegistry) -> (Self, Vec<CatalogIssue>) {
        let mut catalog = Self::default();
        let mut issues = Vec::new();

        for entry in &config.scenarios {
            let id = ScenarioId::new(entry.id.trim());
            if id.is_comprehensive() {
                issues.push(CatalogIssue::ReservedScenario {
                    scenario: entry.id.clone(),
                });
                continue;
            }
            if catalog.get(&id).is_some() {
                issues.push(CatalogIssue::DuplicateScenario {
                    scenario: entry.id.clone(),
                });
                continue;
            }

            let probes: BTreeSet<ProbeId> = entry.probes.iter().map(|p| p.trim().to_string()).collect();
            if probes.is_empty() {
                issues.push(CatalogIssue::EmptyScenario {
                    scenario: entry.id.clone(),
                });
            }
            for probe in probes.iter().filter(|p| !registry.contains(p)) {
                issues.push(CatalogIssue::UnknownProbe {
                    scenario: entry.id.clone(),
                    probe: probe.clone(),
                });
            }
            if !registry.is_empty() && probes.len() >= registry.count() {
                issues.push(CatalogIssue::NoReduction {
                    scenario: entry.id.clone(),
                });
            }

            catalog.scenarios.push(Scenario { id, probes });
        }

        let rule_targets = config
            .alarm_rules
            .iter()
            .map(|r| ("alarm", r.scenario.as_str()))
            .chain(config.text_rules.iter().map(|r| ("text", r.scenario.as_str())));
        for (rule, scenario) in rule_targets {
            let id = ScenarioId::new(scenario);
            if !id.is_comprehensive() && catalog.get(&id).is_none() {
                issues.push(CatalogIssue::UnknownRuleScenario {
                    rule: rule.to_string(),
                    scenario: scenario.to_string(),
                });
            }
        }

        for issue in &issues {
            warn!("Catalog issue: {}", issue);
        }

        (catalog, issues)
    }

    pub fn get(&self, id: &ScenarioId) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| &s.id == id)
    }

    /// Scenarios in declaration order
    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Reverse index: which scenarios include this probe
    pub fn scenarios_using(&self, probe_id: &str) -> Vec<&ScenarioId> {
        self.scenarios
            .iter()
            .filter(|s| s.probes.contains(probe_id))
            .map(|s| &s.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}
