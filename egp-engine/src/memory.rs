use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use egp_protocol::objects::{ContentId, GovernanceObject, ObjectKind};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::error::StoreError;
use crate::store::{ObjectIndex, ObjectStore, StoredObject};

#[derive(Debug, Default)]
struct Contents {
    objects: HashMap<ContentId, Value>,
    /// Ids in first-write order.
    order: Vec<ContentId>,
}

/// Process-local store addressing documents by the SHA-256 of their JSON.
///
/// Identical payloads deduplicate to the same id.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    contents: RwLock<Contents>,
    pins: RwLock<HashSet<ContentId>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.contents.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_pinned(&self, id: &ContentId) -> bool {
        self.pins.read().contains(id)
    }

    /// Stores a document under an explicit id, bypassing content addressing.
    pub fn insert(&self, id: ContentId, object: Value) {
        let mut contents = self.contents.write();
        if contents.objects.insert(id.clone(), object).is_none() {
            contents.order.push(id);
        }
    }

    fn address(object: &Value) -> Result<ContentId, StoreError> {
        let bytes = serde_json::to_vec(object)
            .map_err(|err| StoreError::Protocol(format!("unserialisable document: {err}")))?;
        Ok(ContentId::digest(&bytes))
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn store(&self, object: &Value) -> Result<ContentId, StoreError> {
        let id = Self::address(object)?;
        self.insert(id.clone(), object.clone());
        debug!(%id, "stored object in memory");
        Ok(id)
    }

    async fn get(&self, id: &ContentId) -> Result<Value, StoreError> {
        self.contents
            .read()
            .objects
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn pin(&self, id: &ContentId) -> Result<(), StoreError> {
        if !self.contents.read().objects.contains_key(id) {
            return Err(StoreError::NotFound(id.clone()));
        }
        self.pins.write().insert(id.clone());
        Ok(())
    }
}

#[async_trait]
impl ObjectIndex for InMemoryStore {
    async fn objects(&self, kind: ObjectKind) -> Result<Vec<StoredObject>, StoreError> {
        let contents = self.contents.read();
        let found = contents
            .order
            .iter()
            .filter_map(|id| {
                let value = contents.objects.get(id)?;
                if value.get("type").and_then(Value::as_str) != Some(kind.type_tag()) {
                    return None;
                }
                let object = GovernanceObject::from_value(value.clone()).ok()?;
                Some(StoredObject {
                    id: id.clone(),
                    object,
                })
            })
            .collect();
        Ok(found)
    }
}
