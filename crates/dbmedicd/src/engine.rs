//! Investigation engine - one trigger in, one investigation out.
//!
//! Classify, select, execute under the fallback controller, aggregate, score
//! and recommend. Registry and catalog are shared read-only; every run owns
//! its own context and results.

use crate::aggregator::aggregate;
use crate::catalog::{CatalogIssue, ScenarioCatalog};
use crate::classifier::{Classification, Classifier};
use crate::config::MedicConfig;
use crate::executor::ProbeExecutor;
use crate::fallback::{FallbackController, Transition};
use crate::probe::registry::ProbeRegistry;
use crate::probe::ProbeContext;
use crate::recommender::recommend;
use crate::scoring::score;
use crate::selector::{ProbeSelector, Selection};
use chrono::{DateTime, Utc};
use dbmedic_common::{
    AggregatedReport, HealthScore, MedicError, ProbeId, Recommendation, ScenarioId, TimeWindow, Trigger,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// What was selected for the run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionSummary {
    pub scenario: ScenarioId,
    pub probes: Vec<ProbeId>,
    pub registry_size: usize,
    pub reduction_ratio: f64,
}

impl From<&Selection> for SelectionSummary {
    fn from(selection: &Selection) -> Self {
        Self {
            scenario: selection.scenario.clone(),
            probes: selection.probes.clone(),
            registry_size: selection.registry_size,
            reduction_ratio: selection.reduction_ratio,
        }
    }
}

/// Complete output of one run
#[derive(Debug, Clone, Serialize)]
pub struct Investigation {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub trigger: Trigger,
    pub classification: Classification,
    pub selection: SelectionSummary,
    pub transitions: Vec<Transition>,
    pub report: AggregatedReport,
    pub health: HealthScore,
    pub recommendations: Vec<Recommendation>,
}

pub struct Investigator {
    config: MedicConfig,
    registry: Arc<ProbeRegistry>,
    catalog: Arc<ScenarioCatalog>,
    classifier: Classifier,
    selector: ProbeSelector,
    controller: FallbackController,
    issues: Vec<CatalogIssue>,
}

impl Investigator {
    /// Wire the engine; catalog problems are kept as issues, never fatal
    pub fn new(config: MedicConfig, registry: Arc<ProbeRegistry>) -> Self {
        let (catalog, mut issues) = ScenarioCatalog::from_config(&config.catalog, &registry);
        let (classifier, rule_issues) = Classifier::from_config(&config.catalog);
        for issue in &rule_issues {
            warn!("Catalog issue: {}", issue);
        }
        issues.extend(rule_issues);

        let catalog = Arc::new(catalog);
        let selector = ProbeSelector::new(Arc::clone(&catalog), Arc::clone(&registry));
        let executor = ProbeExecutor::new(
            Arc::clone(&registry),
            config.executor.probe_timeout(),
            config.executor.batch_deadline(),
        );

        info!(
            "Investigator ready: {} probes, {} scenarios, {} catalog issues",
            registry.count(),
            catalog.len(),
            issues.len()
        );

        Self {
            config,
            registry,
            catalog,
            classifier,
            selector,
            controller: FallbackController::new(executor),
            issues,
        }
    }

    pub fn catalog(&self) -> &ScenarioCatalog {
        &self.catalog
    }

    pub fn catalog_issues(&self) -> &[CatalogIssue] {
        &self.issues
    }

    pub fn registry(&self) -> &ProbeRegistry {
        &self.registry
    }

    pub fn selector(&self) -> &ProbeSelector {
        &self.selector
    }

    /// Run one investigation. Only a total failure after fallback is an error.
    pub async fn investigate(&self, trigger: Trigger) -> Result<Investigation, MedicError> {
        let ctx = ProbeContext::new(TimeWindow::last_minutes(self.config.executor.time_window_minutes));
        let started_at = Utc::now();
        info!("Run {} started for {}", ctx.run_id, trigger.summary());

        let classification = self.classifier.classify_detailed(&trigger);
        if classification.ambiguous {
            let ambiguity = MedicError::ClassificationAmbiguous {
                candidates: classification.candidates.iter().map(|c| c.to_string()).collect(),
            };
            warn!("{}; using '{}'", ambiguity, classification.scenario);
        }
        info!(
            "Classified as '{}' ({})",
            classification.scenario,
            classification.matched_rule.as_deref().unwrap_or("no rule matched")
        );

        let selection = self.selector.select(&classification.scenario);
        let summary = match &selection {
            Ok(s) => {
                info!(
                    "Selected {} of {} probes ({:.0}% reduction)",
                    s.probes.len(),
                    s.registry_size,
                    s.reduction_ratio * 100.0
                );
                SelectionSummary::from(s)
            }
            Err(_) => SelectionSummary::from(&Selection::full(classification.scenario.clone(), &self.registry)),
        };

        let run = self.controller.run(selection, &ctx).await?;
        let report = aggregate(classification.scenario.clone(), run.results, run.fallback_reason);
        let health = score(&report, &self.config.scoring);
        let recommendations = recommend(&report, &self.config.recommend);

        info!(
            "Run {} finished: score {} ({} deductions), {} recommendations, degraded: {}",
            ctx.run_id,
            health.value,
            health.deductions.len(),
            recommendations.len(),
            report.degraded
        );

        Ok(Investigation {
            run_id: ctx.run_id,
            started_at,
            trigger,
            classification,
            selection: summary,
            transitions: run.transitions,
            report,
            health,
            recommendations,
        })
    }
}
