//! Schedule and rule generation for governance adoptions.
//!
//! Both halves are pure derivations with no clock and no I/O. Review
//! schedules are computed from trial bounds and a monitoring frequency.
//! Revocation conditions come from a declarative, priority-ordered rule set
//! matched against the free-text success criterion of a proposal. The rule
//! set is a keyword heuristic and makes no attempt at language understanding.
//! Alternative rule sets can be loaded from YAML or JSON.

mod action;
mod condition;
mod engine;
mod error;
mod loader;
mod outcome;
mod rule;
mod schedule;

pub use action::RevocationAction;
pub use condition::{first_percentage, CriterionMatch};
pub use engine::{generate_revocation_conditions, RevocationEngine};
pub use error::RuleError;
pub use loader::load_rules;
pub use outcome::RevocationCondition;
pub use rule::{Recorder, RevocationRule, CRITICAL_CONDITION, THRESHOLD_PLACEHOLDER};
pub use schedule::{generate_review_schedule, ReviewSchedule, DEFAULT_REVIEW_LIMIT};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn derives_a_trial_plan() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap();

        let reviews = generate_review_schedule(start, end, "P1M");
        assert_eq!(reviews.len(), 5);

        let conditions = generate_revocation_conditions(
            "harvest within 10% of last year",
            &["farmer_collective".to_string()],
        );
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].action, RevocationAction::AutoRevert);
    }
}
