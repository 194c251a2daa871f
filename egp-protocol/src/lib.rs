//! Wire-level model of the Emergent Governance Protocol.
//!
//! Governance records (senses, proposals, adoptions) are immutable JSON objects
//! addressed by the hash of their content and linked to their predecessors by
//! relationship edges that are themselves stored objects. This crate holds the
//! record types, the restricted ISO-8601 duration grammar used for sunsets and
//! monitoring cadence, and the validation applied to inbound requests.

pub mod duration;
pub mod objects;
pub mod validate;

/// Protocol version stamped on every persisted object.
pub const PROTOCOL_VERSION: &str = "0.1.0-alpha";

pub mod prelude {
    pub use crate::duration::{Duration, DurationError, SpanCeiling};
    pub use crate::objects::{
        Adoption, AdoptionStatus, ContentId, GovernanceObject, LearningArchive, ObjectKind,
        ObjectUri, Proposal, ProposalStatus, Relationship, RelationshipType, Sense, Urgency,
    };
    pub use crate::validate::{
        validate, AdoptInput, FieldIssue, ProposeInput, SenseInput, ValidatedInput,
        ValidationError,
    };
}
