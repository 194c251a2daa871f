//! Inbound request validation.
//!
//! Requests are checked in two passes. A table of field rules runs first over
//! the raw JSON so every problem is reported with its dotted path
//! (`solution.description`, `monitoring.who.0`). Documents that pass are then
//! decoded into the typed inputs, which reject any nested field the tables do
//! not know about. Nothing here touches storage; durations are only required
//! to be strings and are parsed by the lifecycle engine.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::objects::{
    Adopter, DecisionProcess, Modifications, Monitoring, ObjectKind, ObjectUri, Proposer,
    Reporter, Resources, Solution, Urgency,
};

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Every issue found in a request, in table order.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            issues: vec![FieldIssue::new(field, message)],
        }
    }

    /// Message of the first issue.
    pub fn headline(&self) -> &str {
        self.issues
            .first()
            .map(|issue| issue.message.as_str())
            .unwrap_or("invalid request")
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.headline())
    }
}

#[derive(Debug, Clone, Copy)]
enum Shape {
    Text { min: usize, max: usize },
    Urgency,
    Reference(ObjectKind),
    OneOf(&'static [&'static str]),
    List { min: usize, max: usize, item_max: usize },
    Object,
    Boolean,
}

/// A nested rule only applies when its parent object is present.
#[derive(Debug, Clone, Copy)]
struct FieldRule {
    path: &'static str,
    required: bool,
    shape: Shape,
}

const fn required(path: &'static str, shape: Shape) -> FieldRule {
    FieldRule {
        path,
        required: true,
        shape,
    }
}

const fn optional(path: &'static str, shape: Shape) -> FieldRule {
    FieldRule {
        path,
        required: false,
        shape,
    }
}

const fn text(min: usize, max: usize) -> Shape {
    Shape::Text { min, max }
}

const fn list(max: usize, item_max: usize) -> Shape {
    Shape::List {
        min: 0,
        max,
        item_max,
    }
}

/// Upper bound used for duration strings; the grammar itself is checked later.
const DURATION: Shape = text(1, 64);

const SENSE_RULES: &[FieldRule] = &[
    required("issue", text(3, 100)),
    optional("title", text(1, 200)),
    required("scope", text(3, 100)),
    optional("evidence", Shape::Object),
    optional("urgency", Shape::Urgency),
    optional("tags", list(10, 50)),
    optional("reporter", Shape::Object),
    optional("reporter.did", text(1, 200)),
    optional(
        "reporter.type",
        Shape::OneOf(&["human", "sensor", "ai", "institution"]),
    ),
    optional("reporter.location", text(1, 200)),
    optional("metadata", Shape::Object),
    optional("valid_for", DURATION),
];

const PROPOSE_RULES: &[FieldRule] = &[
    required("title", text(5, 200)),
    required("in_response_to", Shape::Reference(ObjectKind::Sense)),
    required("solution", Shape::Object),
    required("solution.description", text(10, 1000)),
    optional(
        "solution.format",
        Shape::OneOf(&["text/plain", "text/markdown", "text/html"]),
    ),
    optional("solution.content", text(1, 10_000)),
    required("test", text(10, 500)),
    required("sunset", DURATION),
    optional("resources", Shape::Object),
    optional("resources.needed", list(20, 100)),
    optional("resources.offered", list(20, 100)),
    optional("proposer", Shape::Object),
    optional("proposer.did", text(1, 200)),
    optional(
        "proposer.type",
        Shape::OneOf(&["individual", "organization", "ai", "collective"]),
    ),
    optional("proposer.credentials", list(20, 200)),
    optional("metadata", Shape::Object),
];

const ADOPT_RULES: &[FieldRule] = &[
    required("proposal_uri", Shape::Reference(ObjectKind::Propose)),
    required("decision_process", Shape::Object),
    required(
        "decision_process.type",
        Shape::OneOf(&[
            "consent",
            "majority",
            "elder_council",
            "token_vote",
            "oral_tradition",
            "consensus",
        ]),
    ),
    optional("decision_process.record", text(1, 500)),
    optional("decision_process.participants", list(1000, 100)),
    optional("decision_process.unanimous_consent", Shape::Boolean),
    optional("decision_process.spiritual_validation", text(1, 500)),
    optional("modifications", Shape::Object),
    optional("modifications.sunset", DURATION),
    optional("modifications.test", text(1, 500)),
    optional("modifications.cultural_additions", text(1, 1000)),
    optional("monitoring", Shape::Object),
    required(
        "monitoring.who",
        Shape::List {
            min: 1,
            max: 100,
            item_max: 100,
        },
    ),
    required("monitoring.frequency", DURATION),
    optional("monitoring.metrics", list(50, 100)),
    optional("monitoring.reporting_format", text(1, 200)),
    optional("adopter", Shape::Object),
    optional("adopter.did", text(1, 200)),
    optional(
        "adopter.type",
        Shape::OneOf(&["community", "organization", "collective", "institution"]),
    ),
    optional("adopter.authority", text(1, 200)),
    optional("metadata", Shape::Object),
];

fn rules_for(kind: ObjectKind) -> Option<&'static [FieldRule]> {
    match kind {
        ObjectKind::Sense => Some(SENSE_RULES),
        ObjectKind::Propose => Some(PROPOSE_RULES),
        ObjectKind::Adopt => Some(ADOPT_RULES),
        ObjectKind::Relationship | ObjectKind::LearningArchive => None,
    }
}

/// Parent of a dotted path, if any.
fn parent(path: &str) -> Option<&str> {
    path.rsplit_once('.').map(|(head, _)| head)
}

fn locate<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(root, |current, segment| current.as_object()?.get(segment))
}

fn check_rules(raw: &Value, rules: &[FieldRule]) -> Vec<FieldIssue> {
    let mut issues = Vec::new();

    let Some(body) = raw.as_object() else {
        issues.push(FieldIssue::new("body", "\"value\" must be of type object"));
        return issues;
    };

    for key in body.keys() {
        if !rules.iter().any(|rule| rule.path == key.as_str()) {
            issues.push(FieldIssue::new(key, format!("\"{key}\" is not allowed")));
        }
    }

    for rule in rules {
        let parent_present = match parent(rule.path) {
            Some(head) => locate(raw, head).map(Value::is_object).unwrap_or(false),
            None => true,
        };
        if !parent_present {
            continue;
        }
        match locate(raw, rule.path) {
            None | Some(Value::Null) if rule.required => {
                issues.push(FieldIssue::new(
                    rule.path,
                    format!("\"{}\" is required", rule.path),
                ));
            }
            None | Some(Value::Null) => {}
            Some(value) => check_shape(rule.path, rule.shape, value, &mut issues),
        }
    }

    issues
}

fn check_text(label: &str, min: usize, max: usize, value: &Value, issues: &mut Vec<FieldIssue>) {
    let Some(text) = value.as_str() else {
        issues.push(FieldIssue::new(label, format!("\"{label}\" must be a string")));
        return;
    };
    let length = text.chars().count();
    if length == 0 {
        issues.push(FieldIssue::new(
            label,
            format!("\"{label}\" is not allowed to be empty"),
        ));
    } else if length < min {
        issues.push(FieldIssue::new(
            label,
            format!("\"{label}\" length must be at least {min} characters long"),
        ));
    } else if length > max {
        issues.push(FieldIssue::new(
            label,
            format!("\"{label}\" length must be less than or equal to {max} characters long"),
        ));
    }
}

fn check_shape(label: &str, shape: Shape, value: &Value, issues: &mut Vec<FieldIssue>) {
    match shape {
        Shape::Text { min, max } => check_text(label, min, max, value, issues),
        Shape::Urgency => match value.as_str() {
            Some(raw) if raw.parse::<Urgency>().is_ok() => {}
            Some(raw) => issues.push(FieldIssue::new(
                label,
                format!("\"{label}\" with value \"{raw}\" fails to match the n/5 pattern"),
            )),
            None => issues.push(FieldIssue::new(label, format!("\"{label}\" must be a string"))),
        },
        Shape::Reference(kind) => match value.as_str() {
            Some(raw) if ObjectUri::parse_kind(raw, kind).is_ok() => {}
            Some(raw) => {
                let segment = kind.uri_segment().unwrap_or("ipfs");
                issues.push(FieldIssue::new(
                    label,
                    format!(
                        "\"{label}\" with value \"{raw}\" fails to match the /{segment}/<id> pattern"
                    ),
                ));
            }
            None => issues.push(FieldIssue::new(label, format!("\"{label}\" must be a string"))),
        },
        Shape::OneOf(allowed) => {
            let matches = value
                .as_str()
                .map(|raw| allowed.contains(&raw))
                .unwrap_or(false);
            if !matches {
                issues.push(FieldIssue::new(
                    label,
                    format!("\"{label}\" must be one of [{}]", allowed.join(", ")),
                ));
            }
        }
        Shape::List { min, max, item_max } => {
            let Some(items) = value.as_array() else {
                issues.push(FieldIssue::new(label, format!("\"{label}\" must be an array")));
                return;
            };
            if items.len() < min {
                issues.push(FieldIssue::new(
                    label,
                    format!("\"{label}\" must contain at least {min} items"),
                ));
            }
            if items.len() > max {
                issues.push(FieldIssue::new(
                    label,
                    format!("\"{label}\" must contain less than or equal to {max} items"),
                ));
            }
            for (index, item) in items.iter().enumerate() {
                check_text(&format!("{label}.{index}"), 1, item_max, item, issues);
            }
        }
        Shape::Object => {
            if !value.is_object() {
                issues.push(FieldIssue::new(
                    label,
                    format!("\"{label}\" must be of type object"),
                ));
            }
        }
        Shape::Boolean => {
            if !value.is_boolean() {
                issues.push(FieldIssue::new(label, format!("\"{label}\" must be a boolean")));
            }
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    raw: &Value,
    kind: ObjectKind,
) -> Result<T, ValidationError> {
    let rules = rules_for(kind).ok_or_else(|| {
        ValidationError::single("type", format!("{kind} objects are not accepted as input"))
    })?;
    let issues = check_rules(raw, rules);
    if !issues.is_empty() {
        return Err(ValidationError { issues });
    }
    serde_json::from_value(raw.clone())
        .map_err(|err| ValidationError::single("body", format!("\"body\" {err}")))
}

/// Validated body of `POST /sense`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SenseInput {
    pub issue: String,
    #[serde(default)]
    pub title: Option<String>,
    pub scope: String,
    #[serde(default)]
    pub evidence: Option<Map<String, Value>>,
    #[serde(default)]
    pub urgency: Option<Urgency>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub reporter: Option<Reporter>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
    /// How long the signal stays actionable, as a duration.
    #[serde(default)]
    pub valid_for: Option<String>,
}

impl SenseInput {
    pub fn from_value(raw: &Value) -> Result<Self, ValidationError> {
        decode(raw, ObjectKind::Sense)
    }
}

/// Validated body of `POST /propose`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProposeInput {
    pub title: String,
    pub in_response_to: ObjectUri,
    pub solution: Solution,
    pub test: String,
    pub sunset: String,
    #[serde(default)]
    pub resources: Option<Resources>,
    #[serde(default)]
    pub proposer: Option<Proposer>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl ProposeInput {
    pub fn from_value(raw: &Value) -> Result<Self, ValidationError> {
        decode(raw, ObjectKind::Propose)
    }
}

/// Validated body of `POST /adopt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdoptInput {
    pub proposal_uri: ObjectUri,
    pub decision_process: DecisionProcess,
    #[serde(default)]
    pub modifications: Option<Modifications>,
    #[serde(default)]
    pub monitoring: Option<Monitoring>,
    #[serde(default)]
    pub adopter: Option<Adopter>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl AdoptInput {
    pub fn from_value(raw: &Value) -> Result<Self, ValidationError> {
        decode(raw, ObjectKind::Adopt)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedInput {
    Sense(SenseInput),
    Propose(ProposeInput),
    Adopt(AdoptInput),
}

/// Validates a request body for the given kind.
pub fn validate(raw: &Value, kind: ObjectKind) -> Result<ValidatedInput, ValidationError> {
    match kind {
        ObjectKind::Sense => SenseInput::from_value(raw).map(ValidatedInput::Sense),
        ObjectKind::Propose => ProposeInput::from_value(raw).map(ValidatedInput::Propose),
        ObjectKind::Adopt => AdoptInput::from_value(raw).map(ValidatedInput::Adopt),
        ObjectKind::Relationship | ObjectKind::LearningArchive => Err(ValidationError::single(
            "type",
            format!("{kind} objects are not accepted as input"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{DecisionType, SolutionFormat};
    use serde_json::json;
    use test_case::test_case;

    fn proposal_body() -> Value {
        json!({
            "title": "Rotating irrigation schedule",
            "in_response_to": "/sense/S1",
            "solution": {"description": "Rotate irrigation turns nightly between families"},
            "test": "water_efficiency above 80% after one season",
            "sunset": "P6M"
        })
    }

    #[test]
    fn accepts_a_minimal_sense() {
        let input = SenseInput::from_value(&json!({
            "issue": "water_shortage",
            "scope": "village:llajta",
            "urgency": "4/5",
            "tags": ["water"]
        }))
        .unwrap();
        assert_eq!(input.urgency.map(|u| u.level()), Some(4));
        assert_eq!(input.tags, vec!["water"]);
    }

    #[test]
    fn reports_every_missing_field() {
        let err = SenseInput::from_value(&json!({})).unwrap_err();
        let fields: Vec<_> = err.issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["issue", "scope"]);
        assert_eq!(err.to_string(), "\"issue\" is required");
    }

    #[test_case(json!({"issue": "ab", "scope": "village:x"}), "issue" ; "short issue")]
    #[test_case(json!({"issue": "water", "scope": "village:x", "urgency": "6/5"}), "urgency" ; "urgency out of scale")]
    #[test_case(json!({"issue": "water", "scope": "village:x", "tags": [""]}), "tags.0" ; "empty tag")]
    #[test_case(json!({"issue": "water", "scope": "village:x", "reporter": {"type": "robot"}}), "reporter.type" ; "unknown reporter type")]
    #[test_case(json!({"issue": "water", "scope": "village:x", "colour": "blue"}), "colour" ; "unknown top level field")]
    fn rejects_bad_sense_fields(body: Value, field: &str) {
        let err = SenseInput::from_value(&body).unwrap_err();
        assert_eq!(err.issues[0].field, field);
    }

    #[test]
    fn rejects_too_many_tags() {
        let tags: Vec<String> = (0..11).map(|i| format!("tag{i}")).collect();
        let err = SenseInput::from_value(&json!({
            "issue": "water", "scope": "village:x", "tags": tags
        }))
        .unwrap_err();
        assert_eq!(
            err.issues[0].message,
            "\"tags\" must contain less than or equal to 10 items"
        );
    }

    #[test]
    fn proposal_reference_must_point_at_a_sense() {
        let mut body = proposal_body();
        body["in_response_to"] = json!("/propose/P1");
        let err = ProposeInput::from_value(&body).unwrap_err();
        assert_eq!(err.issues[0].field, "in_response_to");

        let input = ProposeInput::from_value(&proposal_body()).unwrap();
        assert_eq!(input.in_response_to.kind, ObjectKind::Sense);
        assert_eq!(input.in_response_to.id.as_str(), "S1");
        assert_eq!(input.solution.format, SolutionFormat::Markdown);
    }

    #[test]
    fn nested_paths_are_dotted() {
        let mut body = proposal_body();
        body["solution"]["description"] = json!("short");
        let err = ProposeInput::from_value(&body).unwrap_err();
        assert_eq!(err.issues[0].field, "solution.description");
        assert_eq!(
            err.issues[0].message,
            "\"solution.description\" length must be at least 10 characters long"
        );
    }

    #[test]
    fn nested_unknown_fields_fail_decoding() {
        let mut body = proposal_body();
        body["solution"]["colour"] = json!("blue");
        let err = ProposeInput::from_value(&body).unwrap_err();
        assert_eq!(err.issues[0].field, "body");
    }

    #[test]
    fn durations_are_not_parsed_here() {
        let mut body = proposal_body();
        body["sunset"] = json!("six months");
        assert!(ProposeInput::from_value(&body).is_ok());

        body["sunset"] = json!(6);
        let err = ProposeInput::from_value(&body).unwrap_err();
        assert_eq!(err.issues[0].message, "\"sunset\" must be a string");
    }

    #[test]
    fn monitoring_needs_a_monitor_when_present() {
        let err = AdoptInput::from_value(&json!({
            "proposal_uri": "/propose/P1",
            "decision_process": {"type": "consent"},
            "monitoring": {"who": [], "frequency": "P2W"}
        }))
        .unwrap_err();
        assert_eq!(err.issues[0].field, "monitoring.who");

        let input = AdoptInput::from_value(&json!({
            "proposal_uri": "/propose/P1",
            "decision_process": {"type": "elder_council"}
        }))
        .unwrap();
        assert!(input.monitoring.is_none());
        assert_eq!(input.decision_process.kind, DecisionType::ElderCouncil);
    }

    #[test]
    fn decision_process_is_required() {
        let err = AdoptInput::from_value(&json!({"proposal_uri": "/propose/P1"})).unwrap_err();
        assert_eq!(err.issues[0].field, "decision_process");
    }

    #[test]
    fn edges_are_not_inputs() {
        assert!(validate(&json!({}), ObjectKind::Relationship).is_err());
        assert!(matches!(
            validate(&proposal_body(), ObjectKind::Propose),
            Ok(ValidatedInput::Propose(_))
        ));
    }
}
