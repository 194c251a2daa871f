use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::ObjectKind;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("content id {0:?} must be non-empty and alphanumeric")]
    InvalidContentId(String),
    #[error("object uri {0:?} must look like /sense/<id>, /propose/<id> or /adopt/<id>")]
    InvalidUri(String),
}

/// Content address assigned by the store when an object is written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentId(String);

impl ContentId {
    pub fn parse(raw: impl Into<String>) -> Result<Self, IdError> {
        let raw = raw.into();
        if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(IdError::InvalidContentId(raw));
        }
        Ok(Self(raw))
    }

    /// Hex-encoded SHA-256 of `bytes`.
    pub fn digest(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ContentId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ContentId> for String {
    fn from(value: ContentId) -> Self {
        value.0
    }
}

/// `/<segment>/<id>` reference to a sense, proposal or adoption.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectUri {
    pub kind: ObjectKind,
    pub id: ContentId,
}

impl ObjectUri {
    pub fn new(kind: ObjectKind, id: ContentId) -> Self {
        Self { kind, id }
    }

    pub fn parse(raw: &str) -> Result<Self, IdError> {
        let invalid = || IdError::InvalidUri(raw.to_string());
        let rest = raw.strip_prefix('/').ok_or_else(invalid)?;
        let (segment, id) = rest.split_once('/').ok_or_else(invalid)?;
        let kind = ObjectKind::from_uri_segment(segment).ok_or_else(invalid)?;
        let id = ContentId::parse(id).map_err(|_| invalid())?;
        Ok(Self { kind, id })
    }

    /// Parses and additionally requires the given kind.
    pub fn parse_kind(raw: &str, kind: ObjectKind) -> Result<Self, IdError> {
        let uri = Self::parse(raw)?;
        if uri.kind != kind {
            return Err(IdError::InvalidUri(raw.to_string()));
        }
        Ok(uri)
    }
}

impl fmt::Display for ObjectUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let segment = self.kind.uri_segment().unwrap_or("ipfs");
        write!(f, "/{}/{}", segment, self.id)
    }
}

impl TryFrom<String> for ObjectUri {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ObjectUri> for String {
    fn from(value: ObjectUri) -> Self {
        value.to_string()
    }
}
