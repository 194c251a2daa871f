mod adoption;
mod archive;
mod id;
mod proposal;
mod relationship;
mod sense;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use adoption::{
    Adopter, AdopterType, Adoption, AdoptionStatus, DecisionProcess, DecisionType, Modifications,
    Monitoring, ProposalContext, TrialPeriod,
};
pub use archive::{AccessControl, ArchiveStructure, LearningArchive};
pub use id::{ContentId, IdError, ObjectUri};
pub use proposal::{
    Proposal, ProposalStatus, Proposer, ProposerType, Resources, SenseContext, Solution,
    SolutionFormat,
};
pub use relationship::{Link, Relationship, RelationshipType};
pub use sense::{Reporter, ReporterType, Sense, Urgency, UrgencyError};

/// Where and when a record was minted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub node_id: String,
    pub timestamp: DateTime<Utc>,
}

impl Origin {
    pub fn new(node_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            node_id: node_id.into(),
            timestamp,
        }
    }
}

/// Classification carried in the `type` field of every stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    #[serde(rename = "egp_sense")]
    Sense,
    #[serde(rename = "egp_propose")]
    Propose,
    #[serde(rename = "egp_adopt")]
    Adopt,
    #[serde(rename = "egp_relationship")]
    Relationship,
    #[serde(rename = "egp_learning_archive")]
    LearningArchive,
}

impl ObjectKind {
    pub fn type_tag(&self) -> &'static str {
        match self {
            ObjectKind::Sense => "egp_sense",
            ObjectKind::Propose => "egp_propose",
            ObjectKind::Adopt => "egp_adopt",
            ObjectKind::Relationship => "egp_relationship",
            ObjectKind::LearningArchive => "egp_learning_archive",
        }
    }

    /// Route segment used in object URIs, for the kinds that have one.
    pub fn uri_segment(&self) -> Option<&'static str> {
        match self {
            ObjectKind::Sense => Some("sense"),
            ObjectKind::Propose => Some("propose"),
            ObjectKind::Adopt => Some("adopt"),
            ObjectKind::Relationship | ObjectKind::LearningArchive => None,
        }
    }

    pub fn from_uri_segment(segment: &str) -> Option<Self> {
        match segment {
            "sense" => Some(ObjectKind::Sense),
            "propose" => Some(ObjectKind::Propose),
            "adopt" => Some(ObjectKind::Adopt),
            _ => None,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_tag())
    }
}

/// Any record the protocol persists, tagged by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GovernanceObject {
    #[serde(rename = "egp_sense")]
    Sense(Sense),
    #[serde(rename = "egp_propose")]
    Proposal(Proposal),
    #[serde(rename = "egp_adopt")]
    Adoption(Adoption),
    #[serde(rename = "egp_relationship")]
    Relationship(Relationship),
    #[serde(rename = "egp_learning_archive")]
    LearningArchive(LearningArchive),
}

impl GovernanceObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            GovernanceObject::Sense(_) => ObjectKind::Sense,
            GovernanceObject::Proposal(_) => ObjectKind::Propose,
            GovernanceObject::Adoption(_) => ObjectKind::Adopt,
            GovernanceObject::Relationship(_) => ObjectKind::Relationship,
            GovernanceObject::LearningArchive(_) => ObjectKind::LearningArchive,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            GovernanceObject::Sense(sense) => sense.timestamp,
            GovernanceObject::Proposal(proposal) => proposal.timestamp,
            GovernanceObject::Adoption(adoption) => adoption.timestamp,
            GovernanceObject::Relationship(edge) => edge.timestamp,
            GovernanceObject::LearningArchive(archive) => archive.created,
        }
    }

    /// Serializes into the JSON document handed to the store.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Decodes a fetched document. Documents of foreign or unknown shape fail.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    pub fn into_sense(self) -> Option<Sense> {
        match self {
            GovernanceObject::Sense(sense) => Some(sense),
            _ => None,
        }
    }

    pub fn into_proposal(self) -> Option<Proposal> {
        match self {
            GovernanceObject::Proposal(proposal) => Some(proposal),
            _ => None,
        }
    }

    pub fn into_adoption(self) -> Option<Adoption> {
        match self {
            GovernanceObject::Adoption(adoption) => Some(adoption),
            _ => None,
        }
    }
}

impl From<Sense> for GovernanceObject {
    fn from(value: Sense) -> Self {
        GovernanceObject::Sense(value)
    }
}

impl From<Proposal> for GovernanceObject {
    fn from(value: Proposal) -> Self {
        GovernanceObject::Proposal(value)
    }
}

impl From<Adoption> for GovernanceObject {
    fn from(value: Adoption) -> Self {
        GovernanceObject::Adoption(value)
    }
}

impl From<Relationship> for GovernanceObject {
    fn from(value: Relationship) -> Self {
        GovernanceObject::Relationship(value)
    }
}

impl From<LearningArchive> for GovernanceObject {
    fn from(value: LearningArchive) -> Self {
        GovernanceObject::LearningArchive(value)
    }
}
