use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

fn percentage_token() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"(\d+)%").expect("percentage token is a valid regex"))
}

/// First `n%` token in the criterion, if its number fits an `i64`.
pub fn first_percentage(criterion: &str) -> Option<i64> {
    percentage_token()
        .captures(criterion)
        .and_then(|captures| captures.get(1))
        .and_then(|number| number.as_str().parse().ok())
}

/// Test applied to the free-text success criterion of a proposal.
///
/// Matching is plain, case-sensitive substring search. There is no stemming,
/// tokenisation or language model behind it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CriterionMatch {
    /// Matches every criterion.
    Always,
    /// The criterion contains `text`.
    Contains { text: String },
    /// All nested matchers succeed.
    All { matchers: Vec<CriterionMatch> },
    /// At least one nested matcher succeeds.
    Any { matchers: Vec<CriterionMatch> },
    /// Negates the nested matcher.
    Not { matcher: Box<CriterionMatch> },
    /// The criterion carries a numeric `n%` target.
    Percentage,
}

impl CriterionMatch {
    pub fn always() -> Self {
        CriterionMatch::Always
    }

    pub fn contains(text: impl Into<String>) -> Self {
        CriterionMatch::Contains { text: text.into() }
    }

    pub fn evaluate(&self, criterion: &str) -> bool {
        match self {
            CriterionMatch::Always => true,
            CriterionMatch::Contains { text } => criterion.contains(text.as_str()),
            CriterionMatch::All { matchers } => matchers.iter().all(|m| m.evaluate(criterion)),
            CriterionMatch::Any { matchers } => matchers.iter().any(|m| m.evaluate(criterion)),
            CriterionMatch::Not { matcher } => !matcher.evaluate(criterion),
            CriterionMatch::Percentage => first_percentage(criterion).is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finds_the_first_percentage() {
        assert_eq!(first_percentage("raise from 40% to 80%"), Some(40));
        assert_eq!(first_percentage("no numbers here %"), None);
        assert_eq!(first_percentage("99999999999999999999%"), None);
    }

    #[test]
    fn matching_is_case_sensitive() {
        let water = CriterionMatch::contains("water");
        assert!(water.evaluate("water_efficiency above 80%"));
        assert!(!water.evaluate("Water efficiency above 80%"));
    }

    #[test]
    fn decodes_nested_matchers() {
        let matcher: CriterionMatch = serde_json::from_value(json!({
            "type": "all",
            "matchers": [
                {"type": "contains", "text": "water"},
                {"type": "not", "matcher": {"type": "contains", "text": "rain"}}
            ]
        }))
        .unwrap();
        assert!(matcher.evaluate("water storage"));
        assert!(!matcher.evaluate("water from rain"));
    }
}
