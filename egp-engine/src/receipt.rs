use chrono::{DateTime, Utc};
use egp_protocol::objects::{ContentId, GovernanceObject, ObjectKind, ObjectUri};
use egp_rules::RevocationCondition;
use serde::{Deserialize, Serialize};

use crate::advisors::{Conflict, Degradation, Suggestions};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenseReceipt {
    pub id: ContentId,
    pub timestamp: DateTime<Utc>,
    pub relates_to: Vec<String>,
    pub echoes: usize,
    pub actions: Suggestions,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<Degradation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalReceipt {
    pub id: ContentId,
    pub timestamp: DateTime<Utc>,
    pub sunset_date: DateTime<Utc>,
    pub echoes: usize,
    pub conflicts: Vec<Conflict>,
    pub rituals: Suggestions,
    pub relationship_id: ContentId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<Degradation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialSchedule {
    pub starts: DateTime<Utc>,
    pub ends: DateTime<Utc>,
    pub review_at: Vec<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipIds {
    pub adopts: ContentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifies: Option<ContentId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdoptionReceipt {
    pub id: ContentId,
    pub timestamp: DateTime<Utc>,
    pub trial_period: TrialSchedule,
    pub revocation_conditions: Vec<RevocationCondition>,
    /// `/ipfs/<id>` of the learning archive, or a placeholder when it could not be stored.
    pub learning_archive: String,
    pub relationship_ids: RelationshipIds,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<Degradation>,
}

/// A stored object as seen at read time, with lapsed objects marked expired.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedObject {
    pub uri: ObjectUri,
    pub object: GovernanceObject,
    pub expired: bool,
}

impl SenseReceipt {
    /// Path of the created object, as sent in the `Location` header.
    pub fn location(&self) -> String {
        ObjectUri::new(ObjectKind::Sense, self.id.clone()).to_string()
    }
}

impl ProposalReceipt {
    pub fn location(&self) -> String {
        ObjectUri::new(ObjectKind::Propose, self.id.clone()).to_string()
    }
}

impl AdoptionReceipt {
    pub fn location(&self) -> String {
        ObjectUri::new(ObjectKind::Adopt, self.id.clone()).to_string()
    }
}
