use async_trait::async_trait;
use egp_protocol::objects::{Proposal, Sense};

use super::{AdvisorError, RitualSuggester, Suggestions};

/// Maps the sense's scope, tags and urgency to governance protocol references.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScopeRitualSuggester;

impl ScopeRitualSuggester {
    pub fn suggest(proposal: &Proposal, sense: &Sense) -> Suggestions {
        let mut rituals = Suggestions::new();
        let mut add = |key: &str, value: &str| {
            rituals.insert(key.to_string(), value.to_string());
        };

        if sense.scope.contains("village:") {
            add("consent_process", "/rituals/village_council");
            if sense.has_tag("indigenous_knowledge") {
                add("elder_blessing", "/rituals/elder_council_blessing");
                add("spiritual_validation", "/ceremonies/water_blessing");
            }
            if sense.has_tag("water") {
                add("offering_required", "traditional_water_ceremony");
                add("blessing_required", "water_spirit_consultation");
            }
        }

        if !proposal.needed_resources().is_empty() {
            add("resource_commitment_ceremony", "/rituals/resource_sharing");
        }

        if sense.urgency.map(|u| u.is_critical()).unwrap_or(false) {
            add("emergency_adoption", "/protocols/crisis_decision");
            add("rapid_consent", "/rituals/emergency_council");
        } else {
            add("deliberative_process", "/protocols/consensus_building");
            add("community_dialogue", "/rituals/talking_circle");
        }

        rituals
    }
}

#[async_trait]
impl RitualSuggester for ScopeRitualSuggester {
    async fn rituals(
        &self,
        proposal: &Proposal,
        sense: &Sense,
    ) -> Result<Suggestions, AdvisorError> {
        Ok(Self::suggest(proposal, sense))
    }
}
