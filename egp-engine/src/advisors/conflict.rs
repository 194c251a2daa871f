use std::collections::BTreeSet;

use async_trait::async_trait;
use egp_protocol::objects::{
    ContentId, GovernanceObject, ObjectKind, Proposal, ProposalStatus,
};

use super::{AdviceContext, AdvisorError, Conflict, ConflictDetector, Severity};

/// Flags live proposals answering the same sense.
///
/// Shared `resources.needed` entries are a medium-severity resource conflict.
/// Any other live proposal for the same sense whose window overlaps the new
/// one is a low-severity scope overlap.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResourceConflictDetector;

#[async_trait]
impl ConflictDetector for ResourceConflictDetector {
    async fn conflicts(
        &self,
        id: &ContentId,
        proposal: &Proposal,
        cx: AdviceContext<'_>,
    ) -> Result<Vec<Conflict>, AdvisorError> {
        let needed: BTreeSet<&str> = proposal
            .needed_resources()
            .iter()
            .map(String::as_str)
            .collect();
        let mut conflicts = Vec::new();

        for stored in cx.index.objects(ObjectKind::Propose).await? {
            let GovernanceObject::Proposal(other) = &stored.object else {
                continue;
            };
            if &stored.id == id
                || other.sense_context.id != proposal.sense_context.id
                || other.effective_status(cx.now) == ProposalStatus::Expired
            {
                continue;
            }

            let shared: Vec<&str> = other
                .needed_resources()
                .iter()
                .map(String::as_str)
                .filter(|resource| needed.contains(resource))
                .collect();

            if !shared.is_empty() {
                conflicts.push(Conflict {
                    id: stored.id.clone(),
                    reason: "overlaps_resource_use".into(),
                    severity: Severity::Medium,
                    details: format!("both proposals need {}", shared.join(", ")),
                });
            } else if other.timestamp < proposal.sunset_date
                && proposal.timestamp < other.sunset_date
            {
                conflicts.push(Conflict {
                    id: stored.id.clone(),
                    reason: "scope_overlap".into(),
                    severity: Severity::Low,
                    details: format!(
                        "also answers the same signal in {} until {}",
                        other.sense_context.scope,
                        other.sunset_date.to_rfc3339()
                    ),
                });
            }
        }

        Ok(conflicts)
    }
}
