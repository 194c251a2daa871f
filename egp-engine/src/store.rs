use async_trait::async_trait;
use egp_protocol::objects::{ContentId, GovernanceObject, ObjectKind};
use serde_json::Value;

use crate::error::StoreError;

/// Content-addressed store the lifecycle engine persists objects to.
///
/// Implementations are shared across concurrent requests and must be safe to
/// call from many tasks at once.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes the document and returns its content address.
    async fn store(&self, object: &Value) -> Result<ContentId, StoreError>;

    async fn get(&self, id: &ContentId) -> Result<Value, StoreError>;

    async fn pin(&self, id: &ContentId) -> Result<(), StoreError>;
}

/// An object read back from a store together with its address.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub id: ContentId,
    pub object: GovernanceObject,
}

/// Read-only listing used by the heuristic advisors.
#[async_trait]
pub trait ObjectIndex: Send + Sync {
    async fn objects(&self, kind: ObjectKind) -> Result<Vec<StoredObject>, StoreError>;
}

/// Index for stores that cannot enumerate their contents.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullIndex;

#[async_trait]
impl ObjectIndex for NullIndex {
    async fn objects(&self, _kind: ObjectKind) -> Result<Vec<StoredObject>, StoreError> {
        Ok(Vec::new())
    }
}
