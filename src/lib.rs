//! EGP: a node for the Emergent Governance Protocol.
//!
//! Communities report problems as *senses*, answer them with time-limited
//! *proposals*, and commit to trialling a proposal through an *adoption* that
//! carries a review schedule and revocation conditions. Every record is an
//! immutable JSON object in a content-addressed store.
//!
//! # Architecture
//!
//! * `egp_core`: configuration, logging, JSON helpers and the service error
//! * `egp_protocol`: record types, durations and request validation
//! * `egp_rules`: review schedules and revocation rule sets
//! * `egp_engine`: the lifecycle engine, object stores and HTTP surface
//!
//! [`node`] wires these into a running service from a [`NodeConfig`].

pub mod node;

pub use egp_core::{NodeConfig, StoreBackend};
pub use egp_engine::{
    Cancellation, EngineApiBuilder, EngineError, EngineServiceConfig, InMemoryStore, IpfsStore,
    LifecycleEngine,
};
pub use egp_protocol::PROTOCOL_VERSION;
pub use node::{build_engine, open_store, NodeStore};

/// Whether a peer speaking `version` can exchange objects with this node.
///
/// Before 1.0 the minor version is part of compatibility.
pub fn verify_protocol_compatibility(version: &str) -> bool {
    let release = |raw: &str| -> Vec<String> {
        raw.split('-')
            .next()
            .unwrap_or_default()
            .split('.')
            .map(str::to_string)
            .collect()
    };
    let ours = release(PROTOCOL_VERSION);
    let theirs = release(version);
    match (ours.first(), theirs.first()) {
        (Some(major), Some(other)) if major == other && major == "0" => {
            ours.get(1).is_some() && ours.get(1) == theirs.get(1)
        }
        (Some(major), Some(other)) => major == other,
        _ => false,
    }
}
