use egp_protocol::duration::Duration;
use tracing::{debug, warn};

use crate::error::RuleError;
use crate::loader::load_rules;
use crate::outcome::RevocationCondition;
use crate::rule::{RevocationRule, CRITICAL_CONDITION};

/// Turns a free-text success criterion into revocation conditions.
///
/// Rules are evaluated in priority order and each contributes at most one
/// condition. The emergency stop is always emitted last, exactly once.
#[derive(Debug, Clone)]
pub struct RevocationEngine {
    rules: Vec<RevocationRule>,
}

impl Default for RevocationEngine {
    fn default() -> Self {
        Self::new(RevocationRule::builtin())
    }
}

impl RevocationEngine {
    /// Construct an engine from the provided rules, sorting them by priority.
    ///
    /// Rules restating the emergency stop are dropped since the engine
    /// appends it itself.
    pub fn new(rules: Vec<RevocationRule>) -> Self {
        let mut rules: Vec<_> = rules
            .into_iter()
            .filter(|rule| {
                let reserved = rule.condition == CRITICAL_CONDITION;
                if reserved {
                    warn!(rule_id = %rule.id, "dropping rule that restates the emergency stop");
                }
                !reserved
            })
            .collect();
        rules.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.id.cmp(&b.id)));
        Self { rules }
    }

    /// Loads rules from the given path (file or directory).
    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self, RuleError> {
        let rules = load_rules(path)?;
        for rule in &rules {
            validate_rule(rule)?;
        }
        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[RevocationRule] {
        &self.rules
    }

    pub fn generate(&self, criterion: &str, monitors: &[String]) -> Vec<RevocationCondition> {
        let mut conditions: Vec<_> = self
            .rules
            .iter()
            .filter_map(|rule| {
                let rendered = rule.render(criterion, monitors)?;
                debug!(rule_id = %rule.id, "revocation rule matched criterion");
                Some(rendered)
            })
            .collect();

        if let Some(halt) = RevocationRule::critical_halt().render(criterion, monitors) {
            conditions.push(halt);
        }
        conditions
    }
}

/// Revocation conditions for `criterion` using the built-in heuristics.
pub fn generate_revocation_conditions(
    criterion: &str,
    monitors: &[String],
) -> Vec<RevocationCondition> {
    RevocationEngine::default().generate(criterion, monitors)
}

fn validate_rule(rule: &RevocationRule) -> Result<(), RuleError> {
    if rule.condition.trim().is_empty() {
        return Err(RuleError::EmptyCondition {
            id: rule.id.clone(),
        });
    }
    if let Some(frequency) = &rule.check_frequency {
        Duration::parse_span(frequency).map_err(|source| RuleError::InvalidFrequency {
            id: rule.id.clone(),
            source,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::RevocationAction;
    use crate::condition::CriterionMatch;
    use crate::rule::Recorder;
    use test_case::test_case;

    fn monitors(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test_case("" ; "empty criterion")]
    #[test_case("reduce conflict over water by 20%" ; "several matches")]
    #[test_case("harvest yield conflict water 90%" ; "every heuristic")]
    #[test_case(CRITICAL_CONDITION ; "criterion naming the stop")]
    fn emergency_stop_comes_last_exactly_once(criterion: &str) {
        let conditions = generate_revocation_conditions(criterion, &[]);
        let halts = conditions.iter().filter(|c| c.is_critical_halt()).count();
        assert_eq!(halts, 1);
        let last = conditions.last().unwrap();
        assert!(last.is_critical_halt());
        assert_eq!(last.recorded_by.as_deref(), Some("any_monitor"));
    }

    #[test]
    fn preserves_heuristic_order() {
        let conditions = generate_revocation_conditions(
            "less conflict, water_efficiency at 85% and a better harvest",
            &monitors(&["council", "farmer_juan"]),
        );
        let actions: Vec<_> = conditions.iter().map(|c| c.action).collect();
        assert_eq!(
            actions,
            vec![
                RevocationAction::TriggerReview,
                RevocationAction::EscalateToCouncil,
                RevocationAction::AutoRevert,
                RevocationAction::ImmediateHalt,
            ]
        );
        assert_eq!(conditions[0].recorded_by.as_deref(), Some("council"));
        assert_eq!(conditions[1].condition, "water_efficiency < 75%");
        assert_eq!(conditions[2].recorded_by.as_deref(), Some("farmer_juan"));
        assert_eq!(conditions[2].check_frequency.as_deref(), Some("P1M"));
    }

    #[test]
    fn water_without_a_percentage_adds_nothing() {
        let conditions = generate_revocation_conditions("water for everyone", &[]);
        assert_eq!(conditions.len(), 1);
    }

    #[test]
    fn serializes_with_if_and_then() {
        let conditions = generate_revocation_conditions("conflict", &[]);
        let value = serde_json::to_value(&conditions[0]).unwrap();
        assert_eq!(value["if"], "community_conflict_index > 30%");
        assert_eq!(value["then"], "trigger_review");
        assert_eq!(value["recorded_by"], "community_council");
        assert_eq!(value["check_frequency"], "P1W");
        assert!(value.get("description").is_none());
    }

    #[test]
    fn custom_rules_cannot_duplicate_the_stop() {
        let engine = RevocationEngine::new(vec![RevocationRule {
            id: "second_stop".into(),
            description: None,
            priority: 1,
            enabled: true,
            matcher: CriterionMatch::Always,
            condition: CRITICAL_CONDITION.into(),
            threshold_offset: 0,
            action: RevocationAction::ImmediateHalt,
            recorded_by: Some(Recorder::Fixed {
                value: "elders".into(),
            }),
            check_frequency: None,
        }]);
        assert!(engine.rules().is_empty());
        assert_eq!(engine.generate("anything", &[]).len(), 1);
    }
}
