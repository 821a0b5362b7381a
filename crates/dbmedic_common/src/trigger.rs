//! Investigation triggers and scenario identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Alarm state as reported by the metrics plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmState {
    Ok,
    Alarm,
    InsufficientData,
}

impl AlarmState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmState::Ok => "OK",
            AlarmState::Alarm => "ALARM",
            AlarmState::InsufficientData => "INSUFFICIENT_DATA",
        }
    }

    /// Case-insensitive parse; accepts `insufficient-data` style spellings
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "OK" => Some(AlarmState::Ok),
            "ALARM" => Some(AlarmState::Alarm),
            "INSUFFICIENT_DATA" => Some(AlarmState::InsufficientData),
            _ => None,
        }
    }
}

impl fmt::Display for AlarmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What started an investigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    Alarm {
        metric_name: String,
        state: AlarmState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alarm_name: Option<String>,
    },
    FreeText {
        text: String,
    },
}

impl Trigger {
    pub fn alarm(metric_name: &str, state: AlarmState) -> Self {
        Trigger::Alarm {
            metric_name: metric_name.to_string(),
            state,
            alarm_name: None,
        }
    }

    pub fn text(text: &str) -> Self {
        Trigger::FreeText {
            text: text.to_string(),
        }
    }

    pub fn with_alarm_name(self, name: &str) -> Self {
        match self {
            Trigger::Alarm {
                metric_name, state, ..
            } => Trigger::Alarm {
                metric_name,
                state,
                alarm_name: Some(name.to_string()),
            },
            other => other,
        }
    }

    /// Short description for logs
    pub fn summary(&self) -> String {
        match self {
            Trigger::Alarm {
                metric_name,
                state,
                alarm_name,
            } => match alarm_name {
                Some(name) => format!("alarm {} ({}) {}", name, metric_name, state),
                None => format!("alarm {} {}", metric_name, state),
            },
            Trigger::FreeText { text } => format!("text \"{}\"", text),
        }
    }
}

/// Scenario identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioId(String);

impl ScenarioId {
    pub const COMPREHENSIVE: &'static str = "comprehensive";

    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// The full-registry scenario
    pub fn comprehensive() -> Self {
        Self::new(Self::COMPREHENSIVE)
    }

    pub fn is_comprehensive(&self) -> bool {
        self.0 == Self::COMPREHENSIVE
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
