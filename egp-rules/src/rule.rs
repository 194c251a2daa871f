use serde::{Deserialize, Serialize};

use crate::action::RevocationAction;
use crate::condition::{first_percentage, CriterionMatch};
use crate::outcome::RevocationCondition;

/// Condition text of the emergency stop appended to every rule set.
pub const CRITICAL_CONDITION: &str = "critical_failure_reported";

/// Placeholder in a condition template replaced by the criterion's first percentage.
pub const THRESHOLD_PLACEHOLDER: &str = "{threshold}";

/// Who is named as the recorder of a condition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Recorder {
    /// First monitor whose identifier contains `needle`.
    MonitorContaining { needle: String, fallback: String },
    /// First listed monitor.
    FirstMonitor { fallback: String },
    Fixed { value: String },
}

impl Recorder {
    pub fn resolve(&self, monitors: &[String]) -> String {
        match self {
            Recorder::MonitorContaining { needle, fallback } => monitors
                .iter()
                .find(|monitor| monitor.contains(needle.as_str()))
                .cloned()
                .unwrap_or_else(|| fallback.clone()),
            Recorder::FirstMonitor { fallback } => monitors
                .first()
                .filter(|monitor| !monitor.is_empty())
                .cloned()
                .unwrap_or_else(|| fallback.clone()),
            Recorder::Fixed { value } => value.clone(),
        }
    }
}

/// Declarative revocation rule matched against a proposal's success criterion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RevocationRule {
    /// Unique identifier for the rule.
    pub id: String,
    /// Copied onto the emitted condition.
    #[serde(default)]
    pub description: Option<String>,
    /// Lower numbers are emitted first.
    #[serde(default = "RevocationRule::default_priority")]
    pub priority: u32,
    #[serde(default = "RevocationRule::default_enabled")]
    pub enabled: bool,
    #[serde(default = "CriterionMatch::always")]
    pub matcher: CriterionMatch,
    /// Condition template. May contain `{threshold}`.
    pub condition: String,
    /// Added to the criterion's first percentage to fill `{threshold}`.
    #[serde(default)]
    pub threshold_offset: i64,
    pub action: RevocationAction,
    #[serde(default)]
    pub recorded_by: Option<Recorder>,
    #[serde(default)]
    pub check_frequency: Option<String>,
}

impl RevocationRule {
    pub fn default_priority() -> u32 {
        100
    }

    pub fn default_enabled() -> bool {
        true
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn uses_threshold(&self) -> bool {
        self.condition.contains(THRESHOLD_PLACEHOLDER)
    }

    /// Renders the rule for one criterion, or `None` when it does not apply.
    pub fn render(&self, criterion: &str, monitors: &[String]) -> Option<RevocationCondition> {
        if !self.is_enabled() || !self.matcher.evaluate(criterion) {
            return None;
        }

        let condition = if self.uses_threshold() {
            let threshold = first_percentage(criterion)?.checked_add(self.threshold_offset)?;
            self.condition
                .replace(THRESHOLD_PLACEHOLDER, &threshold.to_string())
        } else {
            self.condition.clone()
        };

        Some(RevocationCondition {
            condition,
            action: self.action,
            recorded_by: self
                .recorded_by
                .as_ref()
                .map(|recorder| recorder.resolve(monitors)),
            check_frequency: self.check_frequency.clone(),
            description: self.description.clone(),
        })
    }

    /// The emergency stop every rule set ends with.
    pub fn critical_halt() -> Self {
        Self {
            id: "critical_failure".into(),
            description: Some("Emergency stop if any monitor reports critical failure".into()),
            priority: u32::MAX,
            enabled: true,
            matcher: CriterionMatch::Always,
            condition: CRITICAL_CONDITION.into(),
            threshold_offset: 0,
            action: RevocationAction::ImmediateHalt,
            recorded_by: Some(Recorder::Fixed {
                value: "any_monitor".into(),
            }),
            check_frequency: None,
        }
    }

    /// Heuristics shipped with the node: conflict index, water efficiency and crop yield.
    pub fn builtin() -> Vec<Self> {
        vec![
            Self {
                id: "conflict_index".into(),
                description: None,
                priority: 10,
                enabled: true,
                matcher: CriterionMatch::contains("conflict"),
                condition: "community_conflict_index > 30%".into(),
                threshold_offset: 0,
                action: RevocationAction::TriggerReview,
                recorded_by: Some(Recorder::FirstMonitor {
                    fallback: "community_council".into(),
                }),
                check_frequency: Some("P1W".into()),
            },
            Self {
                id: "water_efficiency".into(),
                description: None,
                priority: 20,
                enabled: true,
                matcher: CriterionMatch::All {
                    matchers: vec![
                        CriterionMatch::contains("water"),
                        CriterionMatch::contains("%"),
                        CriterionMatch::Percentage,
                    ],
                },
                condition: "water_efficiency < {threshold}%".into(),
                threshold_offset: -10,
                action: RevocationAction::EscalateToCouncil,
                recorded_by: Some(Recorder::Fixed {
                    value: "sensor:water_monitoring".into(),
                }),
                check_frequency: Some("P3D".into()),
            },
            Self {
                id: "crop_yield".into(),
                description: None,
                priority: 30,
                enabled: true,
                matcher: CriterionMatch::Any {
                    matchers: vec![
                        CriterionMatch::contains("harvest"),
                        CriterionMatch::contains("yield"),
                    ],
                },
                condition: "crop_yield < 50% of_target".into(),
                threshold_offset: 0,
                action: RevocationAction::AutoRevert,
                recorded_by: Some(Recorder::MonitorContaining {
                    needle: "farmer".into(),
                    fallback: "agricultural_monitor".into(),
                }),
                check_frequency: Some("P1M".into()),
            },
        ]
    }
}
