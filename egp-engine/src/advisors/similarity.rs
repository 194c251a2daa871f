use std::collections::BTreeSet;

use async_trait::async_trait;
use egp_protocol::objects::{ContentId, GovernanceObject, ObjectKind, Proposal, Sense};

use super::{AdviceContext, AdvisorError, Echo, SimilarityFinder};

/// Finds echoes through literal overlap: shared tags and scopes for senses,
/// shared offerings and solution word pairs for proposals.
#[derive(Debug, Clone, Copy)]
pub struct OverlapSimilarityFinder {
    /// Most echoes returned per call.
    pub limit: usize,
    /// Least bigram Jaccard index for two solutions to count as similar.
    pub min_solution_overlap: f64,
}

impl Default for OverlapSimilarityFinder {
    fn default() -> Self {
        Self {
            limit: 10,
            min_solution_overlap: 0.2,
        }
    }
}

fn jaccard<T: Ord>(left: &BTreeSet<T>, right: &BTreeSet<T>) -> f64 {
    let union = left.union(right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(right).count() as f64 / union as f64
}

/// Lower-cased adjacent word pairs.
fn bigrams(text: &str) -> BTreeSet<(String, String)> {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect();
    words
        .windows(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect()
}

impl OverlapSimilarityFinder {
    fn rank(&self, mut echoes: Vec<Echo>) -> Vec<Echo> {
        echoes.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.id.cmp(&b.id))
        });
        echoes.truncate(self.limit);
        echoes
    }
}

#[async_trait]
impl SimilarityFinder for OverlapSimilarityFinder {
    async fn related_senses(
        &self,
        id: &ContentId,
        sense: &Sense,
        cx: AdviceContext<'_>,
    ) -> Result<Vec<Echo>, AdvisorError> {
        let tags: BTreeSet<&str> = sense.tags.iter().map(String::as_str).collect();
        let mut echoes = Vec::new();

        for stored in cx.index.objects(ObjectKind::Sense).await? {
            let GovernanceObject::Sense(other) = &stored.object else {
                continue;
            };
            if &stored.id == id || other.is_expired(cx.now) {
                continue;
            }

            let other_tags: BTreeSet<&str> = other.tags.iter().map(String::as_str).collect();
            let tag_overlap = jaccard(&tags, &other_tags);
            let same_scope = other.scope == sense.scope;
            let nearby = !same_scope && other.scope_prefix() == sense.scope_prefix();
            let same_issue = other.issue == sense.issue;

            let (similarity, reason) = if same_scope && same_issue {
                (1.0, "same_issue_same_scope")
            } else if tag_overlap > 0.0 {
                (0.3 + 0.6 * tag_overlap, "shared_tags")
            } else if same_issue && nearby {
                (0.5, "same_issue_nearby_scope")
            } else if same_scope {
                (0.4, "same_scope")
            } else {
                continue;
            };

            echoes.push(Echo {
                id: stored.id.clone(),
                kind: ObjectKind::Sense,
                similarity,
                reason: reason.into(),
            });
        }

        Ok(self.rank(echoes))
    }

    async fn similar_proposals(
        &self,
        id: &ContentId,
        proposal: &Proposal,
        cx: AdviceContext<'_>,
    ) -> Result<Vec<Echo>, AdvisorError> {
        let offered: BTreeSet<&str> = proposal
            .offered_resources()
            .iter()
            .map(String::as_str)
            .collect();
        let solution = bigrams(&proposal.solution.description);
        let mut echoes = Vec::new();

        for stored in cx.index.objects(ObjectKind::Propose).await? {
            let GovernanceObject::Proposal(other) = &stored.object else {
                continue;
            };
            if &stored.id == id {
                continue;
            }

            let other_offered: BTreeSet<&str> =
                other.offered_resources().iter().map(String::as_str).collect();
            let offering_overlap = jaccard(&offered, &other_offered);
            let solution_overlap = jaccard(&solution, &bigrams(&other.solution.description));

            let echo = if solution_overlap >= self.min_solution_overlap
                && solution_overlap >= offering_overlap
            {
                Some((solution_overlap, "similar_solution"))
            } else if offering_overlap > 0.0 {
                Some((offering_overlap, "shared_offerings"))
            } else {
                None
            };

            if let Some((similarity, reason)) = echo {
                echoes.push(Echo {
                    id: stored.id.clone(),
                    kind: ObjectKind::Propose,
                    similarity,
                    reason: reason.into(),
                });
            }
        }

        Ok(self.rank(echoes))
    }
}
