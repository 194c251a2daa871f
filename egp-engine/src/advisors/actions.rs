use async_trait::async_trait;
use egp_protocol::objects::{ContentId, Sense};
use url::form_urlencoded;

use super::{ActionSuggester, AdvisorError, Echo, Suggestions};

/// Suggests follow-up routes from a sense's tags, urgency and echoes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalActionSuggester;

fn route(path: &str, query: &[(&str, &str)]) -> String {
    if query.is_empty() {
        return path.to_string();
    }
    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(query)
        .finish();
    format!("{path}?{encoded}")
}

impl SignalActionSuggester {
    pub fn suggest(sense: &Sense, related: &[Echo]) -> Suggestions {
        let issue = sense.issue.as_str();
        let scope = sense.scope.as_str();
        let mut actions = Suggestions::new();
        let mut add = |key: &str, value: String| {
            actions.insert(key.to_string(), value);
        };

        add(
            "propose_template",
            route("/propose", &[("from_sense", issue), ("scope", scope)]),
        );

        if sense.has_tag("water") {
            add(
                "local_water_experts",
                route("/people", &[("skills", "water_management"), ("near", scope)]),
            );
            add(
                "traditional_knowledge",
                route(
                    "/knowledge",
                    &[("topic", "water_conservation"), ("culture", "local")],
                ),
            );
        }
        if sense.has_tag("indigenous_knowledge") {
            add(
                "elder_council",
                route("/councils", &[("type", "traditional"), ("scope", scope)]),
            );
            add(
                "traditional_solutions",
                route("/solutions", &[("traditional", "true"), ("issue", issue)]),
            );
        }
        if sense.has_tag("climate_adaptation") {
            let urgency = sense
                .urgency
                .map(|u| u.to_string())
                .unwrap_or_else(|| "unspecified".into());
            add(
                "climate_resources",
                route("/resources", &[("topic", "adaptation"), ("urgency", &urgency)]),
            );
            add(
                "similar_cases",
                route("/cases", &[("climate_related", "true"), ("resolved", "true")]),
            );
        }

        if !related.is_empty() {
            let ids: Vec<&str> = related.iter().map(|echo| echo.id.as_str()).collect();
            add(
                "coordinate_with",
                route("/coordination", &[("related_signals", &ids.join(","))]),
            );
            add(
                "regional_response",
                route(
                    "/regional",
                    &[("issue_cluster", issue), ("scope_pattern", sense.scope_prefix())],
                ),
            );
        }

        if sense.urgency.map(|u| u.is_critical()).unwrap_or(false) {
            add(
                "emergency_protocols",
                route("/emergency", &[("issue", issue), ("scope", scope)]),
            );
            add(
                "rapid_response_teams",
                route("/teams", &[("type", "emergency"), ("available", "true")]),
            );
        }

        actions
    }
}

#[async_trait]
impl ActionSuggester for SignalActionSuggester {
    async fn actions(
        &self,
        _id: &ContentId,
        sense: &Sense,
        related: &[Echo],
    ) -> Result<Suggestions, AdvisorError> {
        Ok(Self::suggest(sense, related))
    }
}
