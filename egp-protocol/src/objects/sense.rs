use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

use super::Origin;
use crate::PROTOCOL_VERSION;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("urgency {0:?} must look like n/5 with n between 1 and 5")]
pub struct UrgencyError(pub String);

/// Urgency on a five-point scale, written `n/5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Urgency(u8);

impl Urgency {
    pub const MAX: u8 = 5;

    pub fn new(level: u8) -> Result<Self, UrgencyError> {
        if (1..=Self::MAX).contains(&level) {
            Ok(Self(level))
        } else {
            Err(UrgencyError(format!("{level}/5")))
        }
    }

    pub fn level(&self) -> u8 {
        self.0
    }

    pub fn is_critical(&self) -> bool {
        self.0 == Self::MAX
    }
}

impl FromStr for Urgency {
    type Err = UrgencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || UrgencyError(s.to_string());
        let (level, scale) = s.split_once('/').ok_or_else(invalid)?;
        if scale != "5" || level.len() != 1 {
            return Err(invalid());
        }
        let level: u8 = level.parse().map_err(|_| invalid())?;
        Self::new(level).map_err(|_| invalid())
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, Self::MAX)
    }
}

impl Serialize for Urgency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Urgency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReporterType {
    Human,
    Sensor,
    Ai,
    Institution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Reporter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub did: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ReporterType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// A reported systemic signal. Root of every governance chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sense {
    pub protocol_version: String,
    pub timestamp: DateTime<Utc>,
    pub node_id: String,
    pub issue: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub scope: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter: Option<Reporter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    /// End of the signal's validity window. Senses without one never lapse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Sense {
    pub fn new(origin: &Origin, issue: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            timestamp: origin.timestamp,
            node_id: origin.node_id.clone(),
            issue: issue.into(),
            title: None,
            scope: scope.into(),
            evidence: None,
            urgency: None,
            tags: Vec::new(),
            reporter: None,
            metadata: None,
            expires_at: None,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// The part of the scope before the first `:` (`village` for `village:llajta`).
    pub fn scope_prefix(&self) -> &str {
        self.scope.split(':').next().unwrap_or(&self.scope)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| now > at).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn urgency_uses_the_five_point_form() {
        let urgency: Urgency = "5/5".parse().unwrap();
        assert!(urgency.is_critical());
        assert_eq!(serde_json::to_value(urgency).unwrap(), "5/5");
        for raw in ["0/5", "6/5", "3/4", "10/5", "3", "a/5"] {
            assert!(raw.parse::<Urgency>().is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn expiry_is_optional() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let origin = Origin::new("node", now);
        let mut sense = Sense::new(&origin, "water_shortage", "village:llajta");
        assert!(!sense.is_expired(now));
        assert_eq!(sense.scope_prefix(), "village");

        sense.expires_at = Some(now - chrono::Duration::days(1));
        assert!(sense.is_expired(now));
    }
}
