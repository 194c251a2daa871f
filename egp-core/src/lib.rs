//! Core shared library for the Emergent Governance Protocol node.
//!
//! This crate exposes the primitives every other crate leans on: the
//! service-level error type, node configuration loading, JSON helpers and
//! logging setup.

pub mod config;
pub mod errors;
pub mod logging;
pub mod serde_utils;

pub use config::{Environment, InfuraCredentials, NodeConfig, StoreBackend};
pub use errors::{ConfigError, EgpError, Result as CoreResult};
