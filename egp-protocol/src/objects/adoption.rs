use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ContentId;

/// Lifecycle of an adoption: `active → monitoring → {completed, revoked, expired}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdoptionStatus {
    Active,
    Monitoring,
    Completed,
    Revoked,
    Expired,
}

impl AdoptionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AdoptionStatus::Completed | AdoptionStatus::Revoked | AdoptionStatus::Expired
        )
    }

    pub fn can_transition_to(&self, next: AdoptionStatus) -> bool {
        use AdoptionStatus::*;
        match (self, next) {
            (Active, Monitoring) => true,
            (current, Revoked | Expired) => !current.is_terminal(),
            (Monitoring, Completed) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    Consent,
    Majority,
    ElderCouncil,
    TokenVote,
    OralTradition,
    Consensus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecisionProcess {
    #[serde(rename = "type")]
    pub kind: DecisionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unanimous_consent: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spiritual_validation: Option<String>,
}

/// Amendments an adopting community makes to the proposal it trials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Modifications {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cultural_additions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Monitoring {
    pub who: Vec<String>,
    pub frequency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporting_format: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdopterType {
    Community,
    Organization,
    Collective,
    Institution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Adopter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub did: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<AdopterType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialPeriod {
    pub starts: DateTime<Utc>,
    pub ends: DateTime<Utc>,
    pub original_sunset: DateTime<Utc>,
}

/// Snapshot of the adopted proposal, frozen when the adoption is minted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalContext {
    pub id: ContentId,
    pub title: String,
    pub sense_id: ContentId,
    pub original_test: String,
}

/// A time-bounded commitment to trial a proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adoption {
    pub protocol_version: String,
    pub timestamp: DateTime<Utc>,
    pub node_id: String,
    pub proposal_uri: String,
    pub decision_process: DecisionProcess,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifications: Option<Modifications>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitoring: Option<Monitoring>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adopter: Option<Adopter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    pub status: AdoptionStatus,
    pub trial_period: TrialPeriod,
    pub proposal_context: ProposalContext,
}

impl Adoption {
    pub fn effective_status(&self, now: DateTime<Utc>) -> AdoptionStatus {
        let lapsed = now > self.trial_period.ends;
        if lapsed && self.status.can_transition_to(AdoptionStatus::Expired) {
            AdoptionStatus::Expired
        } else {
            self.status
        }
    }

    pub fn monitors(&self) -> &[String] {
        self.monitoring
            .as_ref()
            .map(|m| m.who.as_slice())
            .unwrap_or(&[])
    }
}
