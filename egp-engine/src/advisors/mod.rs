//! Best-effort advice attached to lifecycle receipts.
//!
//! Every advisor is a capability behind a trait so an index-backed or
//! embedding-based implementation can replace the keyword heuristics shipped
//! here. Advisors only read. The engine bounds each call in time and turns any
//! failure into an empty result plus a [`Degradation`] entry.

mod actions;
mod conflict;
mod rituals;
mod similarity;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use egp_protocol::objects::{ContentId, ObjectKind, Proposal, Sense};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::StoreError;
use crate::store::ObjectIndex;

pub use actions::SignalActionSuggester;
pub use conflict::ResourceConflictDetector;
pub use rituals::ScopeRitualSuggester;
pub use similarity::OverlapSimilarityFinder;

/// Named suggestions, such as ritual or follow-up action references.
pub type Suggestions = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("index lookup failed: {0}")]
    Index(#[from] StoreError),
    #[error("{0}")]
    Failed(String),
}

/// What an advisor may consult besides the object it is asked about.
#[derive(Clone, Copy)]
pub struct AdviceContext<'a> {
    pub index: &'a dyn ObjectIndex,
    pub now: DateTime<Utc>,
}

/// A prior object that resembles the one being created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Echo {
    pub id: ContentId,
    pub kind: ObjectKind,
    pub similarity: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Another proposal competing with the new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub id: ContentId,
    pub reason: String,
    pub severity: Severity,
    pub details: String,
}

/// An advisor that failed or timed out while building a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degradation {
    pub advisor: String,
    pub reason: String,
}

#[async_trait]
pub trait ConflictDetector: Send + Sync {
    /// Proposals that compete with `proposal` for the same sense.
    async fn conflicts(
        &self,
        id: &ContentId,
        proposal: &Proposal,
        cx: AdviceContext<'_>,
    ) -> Result<Vec<Conflict>, AdvisorError>;
}

#[async_trait]
pub trait SimilarityFinder: Send + Sync {
    async fn related_senses(
        &self,
        id: &ContentId,
        sense: &Sense,
        cx: AdviceContext<'_>,
    ) -> Result<Vec<Echo>, AdvisorError>;

    async fn similar_proposals(
        &self,
        id: &ContentId,
        proposal: &Proposal,
        cx: AdviceContext<'_>,
    ) -> Result<Vec<Echo>, AdvisorError>;
}

#[async_trait]
pub trait RitualSuggester: Send + Sync {
    /// Governance protocols suited to adopting `proposal` in the scope of `sense`.
    async fn rituals(
        &self,
        proposal: &Proposal,
        sense: &Sense,
    ) -> Result<Suggestions, AdvisorError>;
}

#[async_trait]
pub trait ActionSuggester: Send + Sync {
    /// Follow-up actions for a freshly reported sense.
    async fn actions(
        &self,
        id: &ContentId,
        sense: &Sense,
        related: &[Echo],
    ) -> Result<Suggestions, AdvisorError>;
}

/// The advisor set a lifecycle engine consults.
#[derive(Clone)]
pub struct Advisors {
    pub conflicts: Arc<dyn ConflictDetector>,
    pub similarity: Arc<dyn SimilarityFinder>,
    pub rituals: Arc<dyn RitualSuggester>,
    pub actions: Arc<dyn ActionSuggester>,
}

impl Default for Advisors {
    fn default() -> Self {
        Self {
            conflicts: Arc::new(ResourceConflictDetector),
            similarity: Arc::new(OverlapSimilarityFinder::default()),
            rituals: Arc::new(ScopeRitualSuggester),
            actions: Arc::new(SignalActionSuggester),
        }
    }
}

impl Advisors {
    pub fn with_conflicts(mut self, detector: Arc<dyn ConflictDetector>) -> Self {
        self.conflicts = detector;
        self
    }

    pub fn with_similarity(mut self, finder: Arc<dyn SimilarityFinder>) -> Self {
        self.similarity = finder;
        self
    }

    pub fn with_rituals(mut self, suggester: Arc<dyn RitualSuggester>) -> Self {
        self.rituals = suggester;
        self
    }

    pub fn with_actions(mut self, suggester: Arc<dyn ActionSuggester>) -> Self {
        self.actions = suggester;
        self
    }
}
