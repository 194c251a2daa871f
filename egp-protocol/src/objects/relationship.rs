use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ContentId;
use crate::PROTOCOL_VERSION;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    RespondsTo,
    Adopts,
    Modifies,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::RespondsTo => "responds_to",
            RelationshipType::Adopts => "adopts",
            RelationshipType::Modifies => "modifies",
        }
    }
}

/// IPLD-style link, serialized as `{"/": "<id>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "/")]
    pub target: ContentId,
}

impl From<ContentId> for Link {
    fn from(target: ContentId) -> Self {
        Self { target }
    }
}

/// Typed directed edge between two stored objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub from: Link,
    pub to: Link,
    #[serde(rename = "relationshipType")]
    pub relationship_type: RelationshipType,
    pub timestamp: DateTime<Utc>,
    pub protocol_version: String,
}

impl Relationship {
    pub fn new(
        from: ContentId,
        to: ContentId,
        relationship_type: RelationshipType,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            relationship_type,
            timestamp,
            protocol_version: PROTOCOL_VERSION.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::GovernanceObject;
    use chrono::TimeZone;

    #[test]
    fn edge_wire_shape() {
        let when = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
        let edge = Relationship::new(
            ContentId::parse("P1").unwrap(),
            ContentId::parse("S1").unwrap(),
            RelationshipType::RespondsTo,
            when,
        );
        let value = GovernanceObject::from(edge).to_value().unwrap();
        assert_eq!(value["type"], "egp_relationship");
        assert_eq!(value["from"]["/"], "P1");
        assert_eq!(value["to"]["/"], "S1");
        assert_eq!(value["relationshipType"], "responds_to");
    }
}
