//! Scenario classifier - maps a trigger onto a scenario.
//!
//! Alarm triggers match the metric name (or the alarm name) against ordered
//! regex rules, free-text triggers match lowercase keywords. First match wins;
//! no match means the comprehensive scenario.

use crate::catalog::CatalogIssue;
use crate::config::{CatalogConfig, MatchMode};
use dbmedic_common::{AlarmState, ScenarioId, Trigger};
use regex::{Regex, RegexBuilder};
use serde::Serialize;

#[derive(Debug, Clone)]
struct AlarmRule {
    pattern: Regex,
    state: Option<AlarmState>,
    scenario: ScenarioId,
}

impl AlarmRule {
    fn matches(&self, metric_name: &str, state: AlarmState, alarm_name: Option<&str>) -> bool {
        if self.state.is_some_and(|s| s != state) {
            return false;
        }
        self.pattern.is_match(metric_name) || alarm_name.is_some_and(|n| self.pattern.is_match(n))
    }

    fn describe(&self) -> String {
        format!("alarm /{}/ -> {}", self.pattern.as_str(), self.scenario)
    }
}

#[derive(Debug, Clone)]
struct TextRule {
    keywords: Vec<String>,
    mode: MatchMode,
    scenario: ScenarioId,
}

impl TextRule {
    fn matches(&self, normalized: &str) -> bool {
        let mut hits = self.keywords.iter().map(|k| normalized.contains(k.as_str()));
        match self.mode {
            MatchMode::Any => hits.any(|h| h),
            MatchMode::All => !self.keywords.is_empty() && hits.all(|h| h),
        }
    }

    fn describe(&self) -> String {
        let mode = match self.mode {
            MatchMode::Any => "any",
            MatchMode::All => "all",
        };
        format!("text {}[{}] -> {}", mode, self.keywords.join(","), self.scenario)
    }
}

/// Outcome of classification, kept for audit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub scenario: ScenarioId,
    /// Rule that won, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<String>,
    /// Distinct scenarios of every matching rule, in rule order
    pub candidates: Vec<ScenarioId>,
    pub ambiguous: bool,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    alarm_rules: Vec<AlarmRule>,
    text_rules: Vec<TextRule>,
}

impl Classifier {
    /// Compile rule tables; invalid patterns are reported and skipped
    pub fn from_config(config: &CatalogConfig) -> (Self, Vec<CatalogIssue>) {
        let mut issues = Vec::new();

        let alarm_rules = config
            .alarm_rules
            .iter()
            .filter_map(|rule| {
                match RegexBuilder::new(&rule.metric_pattern)
                    .case_insensitive(true)
                    .build()
                {
                    Ok(pattern) => Some(AlarmRule {
                        pattern,
                        state: rule.state,
                        scenario: ScenarioId::new(&rule.scenario),
                    }),
                    Err(e) => {
                        issues.push(CatalogIssue::InvalidPattern {
                            pattern: rule.metric_pattern.clone(),
                            error: e.to_string(),
                        });
                        None
                    }
                }
            })
            .collect();

        let text_rules = config
            .text_rules
            .iter()
            .map(|rule| TextRule {
                keywords: rule
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
                mode: rule.mode,
                scenario: ScenarioId::new(&rule.scenario),
            })
            .collect();

        (
            Self {
                alarm_rules,
                text_rules,
            },
            issues,
        )
    }

    pub fn classify(&self, trigger: &Trigger) -> ScenarioId {
        self.classify_detailed(trigger).scenario
    }

    /// Classification with the winning rule and every competing candidate
    pub fn classify_detailed(&self, trigger: &Trigger) -> Classification {
        let matches: Vec<(String, ScenarioId)> = match trigger {
            Trigger::Alarm {
                metric_name,
                state,
                alarm_name,
            } => self
                .alarm_rules
                .iter()
                .filter(|r| r.matches(metric_name, *state, alarm_name.as_deref()))
                .map(|r| (r.describe(), r.scenario.clone()))
                .collect(),
            Trigger::FreeText { text } => {
                let normalized = normalize(text);
                self.text_rules
                    .iter()
                    .filter(|r| r.matches(&normalized))
                    .map(|r| (r.describe(), r.scenario.clone()))
                    .collect()
            }
        };

        let mut candidates: Vec<ScenarioId> = Vec::new();
        for (_, scenario) in &matches {
            if !candidates.contains(scenario) {
                candidates.push(scenario.clone());
            }
        }

        match matches.into_iter().next() {
            Some((rule, scenario)) => Classification {
                scenario,
                matched_rule: Some(rule),
                ambiguous: candidates.len() > 1,
                candidates,
            },
            None => Classification {
                scenario: ScenarioId::comprehensive(),
                matched_rule: None,
                candidates,
                ambiguous: false,
            },
        }
    }
}

/// Lowercase and collapse whitespace
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}
