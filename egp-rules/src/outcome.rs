use serde::{Deserialize, Serialize};

use crate::action::RevocationAction;

/// A structured condition under which an adoption should be revoked or reviewed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RevocationCondition {
    #[serde(rename = "if")]
    pub condition: String,
    #[serde(rename = "then")]
    pub action: RevocationAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RevocationCondition {
    pub fn is_critical_halt(&self) -> bool {
        self.condition == crate::rule::CRITICAL_CONDITION
            && self.action == RevocationAction::ImmediateHalt
    }
}
