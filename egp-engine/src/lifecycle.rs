use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use egp_core::config::NodeConfig;
use egp_protocol::duration::{Duration, SpanCeiling};
use egp_protocol::objects::{
    AccessControl, Adoption, AdoptionStatus, ArchiveStructure, ContentId, GovernanceObject,
    LearningArchive, ObjectKind, ObjectUri, Origin, Proposal, ProposalContext, ProposalStatus,
    Relationship, RelationshipType, Sense, SenseContext, TrialPeriod,
};
use egp_protocol::validate::{AdoptInput, ProposeInput, SenseInput};
use egp_protocol::PROTOCOL_VERSION;
use egp_rules::{ReviewSchedule, RevocationEngine};
use futures::FutureExt;
use tracing::{debug, info, instrument, warn};

use crate::advisors::{AdviceContext, AdvisorError, Advisors, Degradation};
use crate::cancel::Cancellation;
use crate::clock::{Clock, SystemClock};
use crate::error::{EngineError, StoreError};
use crate::receipt::{
    AdoptionReceipt, ProposalReceipt, RelationshipIds, ResolvedObject, SenseReceipt,
    TrialSchedule,
};
use crate::store::{NullIndex, ObjectIndex, ObjectStore};

/// Returned in place of the learning archive address when it could not be stored.
pub const LEARNING_ARCHIVE_PLACEHOLDER: &str = "/ipfs/learning_archive_placeholder";

#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub node_id: String,
    pub ceiling: SpanCeiling,
    pub advisor_timeout: StdDuration,
    /// Review cadence used when an adoption names no monitoring.
    pub default_monitoring_frequency: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            node_id: "unknown".into(),
            ceiling: SpanCeiling::default(),
            advisor_timeout: StdDuration::from_millis(250),
            default_monitoring_frequency: Duration {
                weeks: 2,
                ..Duration::default()
            },
        }
    }
}

impl From<&NodeConfig> for LifecycleConfig {
    fn from(config: &NodeConfig) -> Self {
        Self {
            node_id: config.node_id.clone(),
            ceiling: SpanCeiling::new(config.max_span_days),
            advisor_timeout: config.advisor_timeout,
            ..Self::default()
        }
    }
}

/// Turns validated requests into persisted, linked governance objects.
///
/// Referenced objects are fetched and checked for existence, kind and expiry
/// before anything is written. Each request then writes sequentially: the
/// object, its pin, and each relationship edge with its pin. A failed object
/// write is a storage failure. A failed edge leaves the object in place and is
/// reported as a partial link failure, since the store cannot delete. The
/// engine holds no locks; concurrent requests may interleave freely.
pub struct LifecycleEngine {
    store: Arc<dyn ObjectStore>,
    index: Arc<dyn ObjectIndex>,
    advisors: Advisors,
    revocation: RevocationEngine,
    clock: Arc<dyn Clock>,
    config: LifecycleConfig,
}

pub struct LifecycleEngineBuilder {
    store: Arc<dyn ObjectStore>,
    index: Arc<dyn ObjectIndex>,
    advisors: Advisors,
    revocation: RevocationEngine,
    clock: Arc<dyn Clock>,
    config: LifecycleConfig,
}

impl LifecycleEngineBuilder {
    pub fn index(mut self, index: Arc<dyn ObjectIndex>) -> Self {
        self.index = index;
        self
    }

    pub fn advisors(mut self, advisors: Advisors) -> Self {
        self.advisors = advisors;
        self
    }

    pub fn revocation_rules(mut self, revocation: RevocationEngine) -> Self {
        self.revocation = revocation;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(mut self, config: LifecycleConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> LifecycleEngine {
        LifecycleEngine {
            store: self.store,
            index: self.index,
            advisors: self.advisors,
            revocation: self.revocation,
            clock: self.clock,
            config: self.config,
        }
    }
}

impl LifecycleEngine {
    pub fn builder(store: Arc<dyn ObjectStore>) -> LifecycleEngineBuilder {
        LifecycleEngineBuilder {
            store,
            index: Arc::new(NullIndex),
            advisors: Advisors::default(),
            revocation: RevocationEngine::default(),
            clock: Arc::new(SystemClock),
            config: LifecycleConfig::default(),
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Records a sense. Senses reference nothing, so only the write can fail.
    #[instrument(skip_all, fields(issue = %input.issue, scope = %input.scope))]
    pub async fn sense(
        &self,
        input: SenseInput,
        cancel: &Cancellation,
    ) -> Result<SenseReceipt, EngineError> {
        let now = self.clock.now();
        let expires_at = match input.valid_for.as_deref() {
            Some(raw) => {
                let window = self
                    .config
                    .ceiling
                    .parse_bounded(raw)
                    .map_err(EngineError::invalid_duration("valid_for"))?;
                Some(
                    window
                        .add_to(now)
                        .map_err(EngineError::invalid_duration("valid_for"))?,
                )
            }
            None => None,
        };

        let origin = Origin::new(self.config.node_id.clone(), now);
        let mut sense = Sense::new(&origin, input.issue, input.scope);
        sense.title = input.title;
        sense.evidence = input.evidence;
        sense.urgency = input.urgency;
        sense.tags = input.tags;
        sense.reporter = input.reporter;
        sense.metadata = input.metadata;
        sense.expires_at = expires_at;

        let id = self.write(GovernanceObject::from(sense.clone()), cancel).await?;
        info!(%id, "sense stored");

        let mut degraded = Vec::new();
        let cx = self.context(now);
        let related = self
            .advise(
                "similarity",
                &mut degraded,
                self.advisors.similarity.related_senses(&id, &sense, cx),
            )
            .await;
        let actions = self
            .advise(
                "actions",
                &mut degraded,
                self.advisors.actions.actions(&id, &sense, &related),
            )
            .await;

        Ok(SenseReceipt {
            relates_to: related
                .iter()
                .map(|echo| ObjectUri::new(ObjectKind::Sense, echo.id.clone()).to_string())
                .collect(),
            echoes: related.len(),
            id,
            timestamp: now,
            actions,
            degraded,
        })
    }

    /// Records a proposal answering a live sense, linked by a `responds_to` edge.
    #[instrument(skip_all, fields(sense = %input.in_response_to))]
    pub async fn propose(
        &self,
        input: ProposeInput,
        cancel: &Cancellation,
    ) -> Result<ProposalReceipt, EngineError> {
        let now = self.clock.now();
        let sense_uri = input.in_response_to;
        let sense = self
            .fetch(&sense_uri, cancel)
            .await?
            .into_sense()
            .ok_or_else(|| wrong_kind(&sense_uri))?;
        if let Some(expired_at) = sense.expires_at.filter(|_| sense.is_expired(now)) {
            return Err(EngineError::ReferenceExpired {
                uri: sense_uri.to_string(),
                expired_at,
            });
        }

        let sunset = self
            .config
            .ceiling
            .parse_bounded(&input.sunset)
            .map_err(EngineError::invalid_duration("sunset"))?;
        let sunset_date = sunset
            .add_to(now)
            .map_err(EngineError::invalid_duration("sunset"))?;

        let proposal = Proposal {
            protocol_version: PROTOCOL_VERSION.to_string(),
            timestamp: now,
            node_id: self.config.node_id.clone(),
            title: input.title,
            in_response_to: sense_uri.to_string(),
            solution: input.solution,
            test: input.test,
            sunset: input.sunset,
            resources: input.resources,
            proposer: input.proposer,
            metadata: input.metadata,
            sunset_date,
            status: ProposalStatus::Proposed,
            sense_context: SenseContext {
                id: sense_uri.id.clone(),
                issue: sense.issue.clone(),
                scope: sense.scope.clone(),
                urgency: sense.urgency,
            },
        };

        let id = self
            .write(GovernanceObject::from(proposal.clone()), cancel)
            .await?;
        info!(%id, %sunset_date, "proposal stored");

        let relationship_id = self
            .link(&id, &sense_uri.id, RelationshipType::RespondsTo, now, cancel)
            .await
            .map_err(|reason| {
                warn!(%id, %reason, "proposal stored without its responds_to edge");
                EngineError::partial(
                    &id,
                    ObjectKind::Propose,
                    Vec::new(),
                    RelationshipType::RespondsTo,
                    reason,
                )
            })?;

        let mut degraded = Vec::new();
        let cx = self.context(now);
        let conflicts = self
            .advise(
                "conflicts",
                &mut degraded,
                self.advisors.conflicts.conflicts(&id, &proposal, cx),
            )
            .await;
        let echoes = self
            .advise(
                "similarity",
                &mut degraded,
                self.advisors.similarity.similar_proposals(&id, &proposal, cx),
            )
            .await;
        let rituals = self
            .advise(
                "rituals",
                &mut degraded,
                self.advisors.rituals.rituals(&proposal, &sense),
            )
            .await;

        Ok(ProposalReceipt {
            id,
            timestamp: now,
            sunset_date,
            echoes: echoes.len(),
            conflicts,
            rituals,
            relationship_id,
            degraded,
        })
    }

    /// Commits to trialling a live proposal, linked by `adopts` and, when the
    /// proposal was amended, `modifies` edges.
    #[instrument(skip_all, fields(proposal = %input.proposal_uri))]
    pub async fn adopt(
        &self,
        input: AdoptInput,
        cancel: &Cancellation,
    ) -> Result<AdoptionReceipt, EngineError> {
        let now = self.clock.now();
        let proposal_uri = input.proposal_uri;
        let proposal = self
            .fetch(&proposal_uri, cancel)
            .await?
            .into_proposal()
            .ok_or_else(|| wrong_kind(&proposal_uri))?;
        if proposal.is_expired(now) {
            return Err(EngineError::ReferenceExpired {
                uri: proposal_uri.to_string(),
                expired_at: proposal.sunset_date,
            });
        }

        let modified_sunset = input
            .modifications
            .as_ref()
            .and_then(|modifications| modifications.sunset.as_deref());
        let ends = match modified_sunset {
            Some(raw) => self
                .config
                .ceiling
                .parse_bounded(raw)
                .and_then(|sunset| sunset.add_to(now))
                .map_err(EngineError::invalid_duration("modifications.sunset"))?,
            None => proposal.sunset_date,
        };
        let frequency = match &input.monitoring {
            Some(monitoring) => Duration::parse_span(&monitoring.frequency)
                .map_err(EngineError::invalid_duration("monitoring.frequency"))?,
            None => self.config.default_monitoring_frequency,
        };

        let adoption = Adoption {
            protocol_version: PROTOCOL_VERSION.to_string(),
            timestamp: now,
            node_id: self.config.node_id.clone(),
            proposal_uri: proposal_uri.to_string(),
            decision_process: input.decision_process,
            modifications: input.modifications,
            monitoring: input.monitoring,
            adopter: input.adopter,
            metadata: input.metadata,
            status: AdoptionStatus::Active,
            trial_period: TrialPeriod {
                starts: now,
                ends,
                original_sunset: proposal.sunset_date,
            },
            proposal_context: ProposalContext {
                id: proposal_uri.id.clone(),
                title: proposal.title.clone(),
                sense_id: proposal.sense_context.id.clone(),
                original_test: proposal.test.clone(),
            },
        };

        let id = self
            .write(GovernanceObject::from(adoption.clone()), cancel)
            .await?;
        info!(%id, trial_ends = %ends, "adoption stored");

        let adopts = self
            .link(&id, &proposal_uri.id, RelationshipType::Adopts, now, cancel)
            .await
            .map_err(|reason| {
                warn!(%id, %reason, "adoption stored without its adopts edge");
                EngineError::partial(
                    &id,
                    ObjectKind::Adopt,
                    Vec::new(),
                    RelationshipType::Adopts,
                    reason,
                )
            })?;
        let modifies = match adoption.modifications {
            Some(_) => Some(
                self.link(&id, &proposal_uri.id, RelationshipType::Modifies, now, cancel)
                    .await
                    .map_err(|reason| {
                        warn!(%id, %reason, "adoption stored without its modifies edge");
                        EngineError::partial(
                            &id,
                            ObjectKind::Adopt,
                            vec![adopts.clone()],
                            RelationshipType::Modifies,
                            reason,
                        )
                    })?,
            ),
            None => None,
        };

        let review_at = ReviewSchedule::from_duration(frequency).between(now, ends);
        let criterion = adoption
            .modifications
            .as_ref()
            .and_then(|modifications| modifications.test.as_deref())
            .unwrap_or(&proposal.test);
        let revocation_conditions = self.revocation.generate(criterion, adoption.monitors());
        debug!(
            reviews = review_at.len(),
            conditions = revocation_conditions.len(),
            "derived trial plan"
        );

        let mut degraded = Vec::new();
        let learning_archive = self
            .store_learning_archive(&id, &adoption, cancel, &mut degraded)
            .await;

        Ok(AdoptionReceipt {
            id,
            timestamp: now,
            trial_period: TrialSchedule {
                starts: now,
                ends,
                review_at,
            },
            revocation_conditions,
            learning_archive,
            relationship_ids: RelationshipIds { adopts, modifies },
            degraded,
        })
    }

    /// Reads an object back, recomputing expiry from its stored dates.
    #[instrument(skip_all, fields(uri = %uri))]
    pub async fn resolve(
        &self,
        uri: &ObjectUri,
        cancel: &Cancellation,
    ) -> Result<ResolvedObject, EngineError> {
        let now = self.clock.now();
        let mut object = self.fetch(uri, cancel).await?;
        let expired = match &mut object {
            GovernanceObject::Sense(sense) => sense.is_expired(now),
            GovernanceObject::Proposal(proposal) => {
                proposal.status = proposal.effective_status(now);
                proposal.status == ProposalStatus::Expired
            }
            GovernanceObject::Adoption(adoption) => {
                adoption.status = adoption.effective_status(now);
                adoption.status == AdoptionStatus::Expired
            }
            GovernanceObject::Relationship(_) | GovernanceObject::LearningArchive(_) => false,
        };
        Ok(ResolvedObject {
            uri: uri.clone(),
            object,
            expired,
        })
    }

    fn context(&self, now: DateTime<Utc>) -> AdviceContext<'_> {
        AdviceContext {
            index: self.index.as_ref(),
            now,
        }
    }

    async fn fetch(
        &self,
        uri: &ObjectUri,
        cancel: &Cancellation,
    ) -> Result<GovernanceObject, EngineError> {
        let value = match cancel.guard(self.store.get(&uri.id)).await? {
            Ok(value) => value,
            Err(StoreError::NotFound(_)) => {
                return Err(EngineError::ReferenceNotFound {
                    uri: uri.to_string(),
                    reason: "no object is stored under this id".into(),
                })
            }
            Err(err) => return Err(EngineError::storage(err)),
        };
        let object =
            GovernanceObject::from_value(value).map_err(|err| EngineError::ReferenceNotFound {
                uri: uri.to_string(),
                reason: format!("not a governance object: {err}"),
            })?;
        if object.kind() != uri.kind {
            return Err(EngineError::ReferenceNotFound {
                uri: uri.to_string(),
                reason: format!("object is {}, not {}", object.kind(), uri.kind),
            });
        }
        Ok(object)
    }

    async fn write(
        &self,
        object: GovernanceObject,
        cancel: &Cancellation,
    ) -> Result<ContentId, EngineError> {
        let value = object
            .to_value()
            .map_err(|err| EngineError::Internal(err.to_string()))?;
        let id = cancel
            .guard(self.store.store(&value))
            .await?
            .map_err(EngineError::storage)?;
        cancel
            .guard(self.store.pin(&id))
            .await?
            .map_err(EngineError::storage)?;
        Ok(id)
    }

    /// Stores and pins an edge. Failures come back as a description.
    async fn link(
        &self,
        from: &ContentId,
        to: &ContentId,
        relationship_type: RelationshipType,
        now: DateTime<Utc>,
        cancel: &Cancellation,
    ) -> Result<ContentId, String> {
        let edge = Relationship::new(from.clone(), to.clone(), relationship_type, now);
        match self.write(GovernanceObject::from(edge), cancel).await {
            Ok(id) => {
                debug!(%id, edge = relationship_type.as_str(), "edge stored");
                Ok(id)
            }
            Err(EngineError::Cancelled) => Err("cancelled before the edge was stored".into()),
            Err(err) => Err(err.to_string()),
        }
    }

    async fn store_learning_archive(
        &self,
        id: &ContentId,
        adoption: &Adoption,
        cancel: &Cancellation,
        degraded: &mut Vec<Degradation>,
    ) -> String {
        let monitors = adoption.monitors().to_vec();
        let admin = adoption
            .adopter
            .as_ref()
            .and_then(|adopter| adopter.did.clone())
            .unwrap_or_else(|| "community_council".into());
        let archive = LearningArchive {
            adoption_id: id.clone(),
            proposal_id: adoption.proposal_context.id.clone(),
            sense_id: adoption.proposal_context.sense_id.clone(),
            created: adoption.timestamp,
            node_id: self.config.node_id.clone(),
            structure: ArchiveStructure::default(),
            contributors: monitors.clone(),
            access_control: AccessControl {
                public_read: true,
                contribute_roles: monitors,
                admin_roles: vec![admin],
            },
            protocol_version: PROTOCOL_VERSION.to_string(),
        };

        match self.write(GovernanceObject::from(archive), cancel).await {
            Ok(archive_id) => format!("/ipfs/{archive_id}"),
            Err(err) => {
                warn!(%id, error = %err, "learning archive not stored");
                degraded.push(Degradation {
                    advisor: "learning_archive".into(),
                    reason: err.to_string(),
                });
                LEARNING_ARCHIVE_PLACEHOLDER.to_string()
            }
        }
    }

    /// Runs one advisor under the advisor timeout. Errors, panics and timeouts
    /// yield the empty value and a degradation entry.
    async fn advise<T, F>(
        &self,
        advisor: &'static str,
        degraded: &mut Vec<Degradation>,
        future: F,
    ) -> T
    where
        T: Default,
        F: Future<Output = Result<T, AdvisorError>>,
    {
        let timeout = self.config.advisor_timeout;
        let reason = match tokio::time::timeout(timeout, AssertUnwindSafe(future).catch_unwind())
            .await
        {
            Ok(Ok(Ok(value))) => return value,
            Ok(Ok(Err(err))) => err.to_string(),
            Ok(Err(_)) => "advisor panicked".to_string(),
            Err(_) => format!("timed out after {}ms", timeout.as_millis()),
        };
        warn!(advisor, %reason, "advisor degraded");
        degraded.push(Degradation {
            advisor: advisor.into(),
            reason,
        });
        T::default()
    }
}

fn wrong_kind(uri: &ObjectUri) -> EngineError {
    EngineError::ReferenceNotFound {
        uri: uri.to_string(),
        reason: format!("object is not {}", uri.kind),
    }
}
