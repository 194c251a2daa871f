use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ContentId, Urgency};

/// Lifecycle of a proposal: `proposed → adopted → active → {completed, expired}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Proposed,
    Adopted,
    Active,
    Completed,
    Expired,
}

impl ProposalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProposalStatus::Completed | ProposalStatus::Expired)
    }

    /// Any live proposal may lapse; otherwise only the forward edges are allowed.
    pub fn can_transition_to(&self, next: ProposalStatus) -> bool {
        use ProposalStatus::*;
        match (self, next) {
            (current, Expired) => !current.is_terminal(),
            (Proposed, Adopted) | (Adopted, Active) | (Active, Completed) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SolutionFormat {
    #[serde(rename = "text/plain")]
    Plain,
    #[default]
    #[serde(rename = "text/markdown")]
    Markdown,
    #[serde(rename = "text/html")]
    Html,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Solution {
    pub description: String,
    #[serde(default)]
    pub format: SolutionFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Resources {
    #[serde(default)]
    pub needed: Vec<String>,
    #[serde(default)]
    pub offered: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposerType {
    Individual,
    Organization,
    Ai,
    Collective,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Proposer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub did: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ProposerType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credentials: Vec<String>,
}

/// Snapshot of the answered sense, frozen when the proposal is minted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenseContext {
    pub id: ContentId,
    pub issue: String,
    pub scope: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,
}

/// A candidate solution to a sense, bounded by its sunset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub protocol_version: String,
    pub timestamp: DateTime<Utc>,
    pub node_id: String,
    pub title: String,
    pub in_response_to: String,
    pub solution: Solution,
    pub test: String,
    /// The sunset duration as submitted.
    pub sunset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Resources>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposer: Option<Proposer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    pub sunset_date: DateTime<Utc>,
    pub status: ProposalStatus,
    pub sense_context: SenseContext,
}

impl Proposal {
    /// A proposal lapses at its sunset instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.sunset_date
    }

    /// Status as seen at `now`: the stored value unless the sunset has passed.
    pub fn effective_status(&self, now: DateTime<Utc>) -> ProposalStatus {
        if self.is_expired(now) && self.status.can_transition_to(ProposalStatus::Expired) {
            ProposalStatus::Expired
        } else {
            self.status
        }
    }

    pub fn needed_resources(&self) -> &[String] {
        self.resources
            .as_ref()
            .map(|r| r.needed.as_slice())
            .unwrap_or(&[])
    }

    pub fn offered_resources(&self) -> &[String] {
        self.resources
            .as_ref()
            .map(|r| r.offered.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_only() {
        use ProposalStatus::*;
        assert!(Proposed.can_transition_to(Adopted));
        assert!(Adopted.can_transition_to(Active));
        assert!(Active.can_transition_to(Completed));
        assert!(Proposed.can_transition_to(Expired));
        assert!(Active.can_transition_to(Expired));

        assert!(!Adopted.can_transition_to(Proposed));
        assert!(!Proposed.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Expired));
        assert!(!Expired.can_transition_to(Active));
    }

    #[test]
    fn expiry_starts_at_the_sunset_instant() {
        let sunset: DateTime<Utc> = "2024-06-01T00:00:00Z".parse().unwrap();
        let proposal: Proposal = serde_json::from_value(serde_json::json!({
            "protocol_version": "0.1.0",
            "node_id": "andes-1",
            "timestamp": "2024-03-01T00:00:00Z",
            "title": "Rainwater catchment",
            "in_response_to": "/sense/QmSense",
            "solution": { "description": "gutters" },
            "test": "less well water",
            "sunset": "P3M",
            "sunset_date": sunset,
            "status": "proposed",
            "sense_context": { "id": "QmSense", "issue": "wells drying", "scope": "andes" },
        }))
        .unwrap();

        assert!(!proposal.is_expired(sunset - chrono::Duration::seconds(1)));
        assert!(proposal.is_expired(sunset));
        assert_eq!(proposal.effective_status(sunset), ProposalStatus::Expired);
    }

    #[test]
    fn solution_format_defaults_to_markdown() {
        let solution: Solution =
            serde_json::from_value(serde_json::json!({"description": "night rotation"})).unwrap();
        assert_eq!(solution.format, SolutionFormat::Markdown);
        assert_eq!(
            serde_json::to_value(SolutionFormat::Html).unwrap(),
            "text/html"
        );
    }
}
