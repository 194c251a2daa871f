use serde::{Deserialize, Serialize};

/// What a monitor is expected to do when a revocation condition is met.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RevocationAction {
    /// Open a community review of the adoption.
    TriggerReview,
    /// Hand the decision to the council.
    EscalateToCouncil,
    /// Roll the community back to its pre-adoption practice.
    AutoRevert,
    /// Stop the trial at once.
    ImmediateHalt,
}

impl RevocationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevocationAction::TriggerReview => "trigger_review",
            RevocationAction::EscalateToCouncil => "escalate_to_council",
            RevocationAction::AutoRevert => "auto_revert",
            RevocationAction::ImmediateHalt => "immediate_halt",
        }
    }
}
