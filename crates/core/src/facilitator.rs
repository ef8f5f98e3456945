// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Facilitation: decide whether a step runs now or waits
//!
//! The step executor asks a facilitator before running a step. A SYNC answer
//! means proceed immediately; ASYNC means suspend the step and poll again
//! after `initial_wait`. Each call is one recomputation over a fresh registry
//! snapshot, so concurrent callers only ever race at the registry.

use crate::barrier::{Barrier, BarrierError, BarrierId, BarrierRegistry, BarrierState, ForceProctor};
use crate::config::{CoordinationConfig, FacilitatorConfig};
use crate::id::{IdGen, UuidIdGen};
use crate::restraint::{
    AcquireMode, Admission, Constraint, ConstraintId, ConstraintUnit, Consumer, ConsumerId,
    ConsumerState, RegistryError, ReleaseEntityId, ResourceRestraintRegistry, RestraintError,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionMode {
    /// Proceed immediately
    Sync,
    /// Suspend and re-poll later
    Async,
}

/// Decision handed back to the step executor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilitatorResponse {
    pub mode: ExecutionMode,
    #[serde(with = "humantime_serde")]
    pub initial_wait: Duration,
    /// Consumer registered for this request, if one was needed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer_id: Option<ConsumerId>,
}

impl FacilitatorResponse {
    pub fn sync() -> Self {
        Self {
            mode: ExecutionMode::Sync,
            initial_wait: Duration::ZERO,
            consumer_id: None,
        }
    }

    pub fn wait(initial_wait: Duration) -> Self {
        Self {
            mode: ExecutionMode::Async,
            initial_wait,
            consumer_id: None,
        }
    }

    fn with_consumer(mut self, consumer_id: ConsumerId) -> Self {
        self.consumer_id = Some(consumer_id);
        self
    }

    pub fn is_sync(&self) -> bool {
        self.mode == ExecutionMode::Sync
    }
}

/// A step's request to hold permits on a restraint
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcquireRequest {
    /// Configured restraint name
    pub restraint: String,
    pub unit: ConstraintUnit,
    pub release_entity_id: ReleaseEntityId,
    pub permits: u32,
    pub mode: AcquireMode,
}

impl AcquireRequest {
    pub fn new(
        restraint: impl Into<String>,
        unit: ConstraintUnit,
        release_entity_id: ReleaseEntityId,
        permits: u32,
    ) -> Self {
        Self {
            restraint: restraint.into(),
            unit,
            release_entity_id,
            permits,
            mode: AcquireMode::Accumulate,
        }
    }

    pub fn with_mode(mut self, mode: AcquireMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Decision point for steps that need permits on a shared resource
#[derive(Clone)]
pub struct ResourceRestraintFacilitator<R, G = UuidIdGen> {
    config: CoordinationConfig,
    registry: R,
    id_gen: G,
}

impl<R: ResourceRestraintRegistry, G: IdGen> ResourceRestraintFacilitator<R, G> {
    pub fn new(config: CoordinationConfig, registry: R, id_gen: G) -> Self {
        Self {
            config,
            registry,
            id_gen,
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Delay before a blocked consumer should be polled again
    pub fn initial_wait(&self) -> Duration {
        self.config.facilitator.restraint_initial_wait
    }

    /// Constraint for a configured restraint name
    pub fn constraint(&self, name: &str) -> Result<Constraint, RestraintError> {
        self.config
            .restraint(name)
            .map(|restraint| Constraint::create_abstraction(&restraint))
            .ok_or_else(|| RestraintError::MissingRestraint(name.to_string()))
    }

    fn constraint_by_id(&self, id: &ConstraintId) -> Result<Constraint, RestraintError> {
        self.config
            .restraint(id.as_str())
            .map(|restraint| Constraint::create_abstraction(&restraint))
            .ok_or_else(|| RestraintError::MissingConstraint(id.clone()))
    }

    /// Decide SYNC or ASYNC for a request, registering a consumer when
    /// permits are actually needed.
    ///
    /// The decision is taken by the registry against the unit as it stands
    /// at write time, not against an earlier read.
    pub fn facilitate(
        &self,
        request: &AcquireRequest,
    ) -> Result<FacilitatorResponse, RestraintError> {
        let constraint = self.constraint(&request.restraint)?;
        if request.permits == 0 {
            return Err(RestraintError::InvalidPermits {
                constraint: constraint.id,
                permits: request.permits,
            });
        }

        let candidate = Consumer::new(
            self.id_gen.consumer_id(),
            constraint.id.clone(),
            request.unit.clone(),
            request.permits,
            ConsumerState::Blocked,
            request.release_entity_id.clone(),
        );
        let wait = self.config.facilitator.restraint_initial_wait;

        match self
            .registry
            .admit_consumer(&constraint, candidate, request.mode)?
        {
            Admission::Held => {
                tracing::debug!(
                    constraint = %constraint.id,
                    unit = %request.unit,
                    release_entity_id = %request.release_entity_id,
                    "permits already held"
                );
                Ok(FacilitatorResponse::sync())
            }
            Admission::Queued(consumer) => {
                tracing::debug!(
                    constraint = %constraint.id,
                    unit = %request.unit,
                    consumer_id = %consumer.id,
                    "request already waiting"
                );
                Ok(FacilitatorResponse::wait(wait).with_consumer(consumer.id))
            }
            Admission::Rejected { requested } => {
                tracing::warn!(
                    constraint = %constraint.id,
                    unit = %request.unit,
                    requested,
                    capacity = constraint.spec.limits,
                    "permit request can never be satisfied"
                );
                Err(RestraintError::Rejected {
                    constraint: constraint.id,
                    requested,
                    capacity: constraint.spec.limits,
                })
            }
            Admission::Admitted(consumer) => {
                tracing::info!(
                    constraint = %constraint.id,
                    unit = %request.unit,
                    consumer_id = %consumer.id,
                    permits = consumer.permits,
                    state = ?consumer.state,
                    "consumer registered"
                );
                let response = if consumer.is_active() {
                    FacilitatorResponse::sync()
                } else {
                    FacilitatorResponse::wait(wait)
                };
                Ok(response.with_consumer(consumer.id))
            }
        }
    }

    /// Promote whichever blocked consumers of a unit fit now
    pub fn promote_runnable(
        &self,
        constraint: &Constraint,
        unit: &ConstraintUnit,
    ) -> Result<Vec<ConsumerId>, RestraintError> {
        let consumers = self.registry.load_consumers(&constraint.id, unit)?;
        let mut promoted = Vec::new();
        for consumer_id in constraint.runnable_consumers(&consumers) {
            // Re-checked under the registry's lock; another instance may
            // have promoted it or taken the capacity first
            if self
                .registry
                .consumer_unblocked(constraint, unit, &consumer_id)?
            {
                tracing::info!(
                    constraint = %constraint.id,
                    unit = %unit,
                    consumer_id = %consumer_id,
                    "consumer unblocked"
                );
                promoted.push(consumer_id);
            }
        }
        Ok(promoted)
    }

    /// Re-check a waiting consumer, promoting runnable consumers of its unit first
    pub fn poll(
        &self,
        constraint_id: &ConstraintId,
        unit: &ConstraintUnit,
        consumer_id: &ConsumerId,
    ) -> Result<ConsumerState, RestraintError> {
        let constraint = self.constraint_by_id(constraint_id)?;
        self.promote_runnable(&constraint, unit)?;

        self.registry
            .load_consumers(constraint_id, unit)?
            .into_iter()
            .find(|c| &c.id == consumer_id)
            .map(|c| c.state)
            .ok_or_else(|| {
                RegistryError::NotFound {
                    kind: "consumer".to_string(),
                    id: consumer_id.to_string(),
                }
                .into()
            })
    }

    /// Release every permit held under a scope and promote waiters on the
    /// units that freed up. Returns the promoted consumers.
    pub fn release(
        &self,
        release_entity_id: &ReleaseEntityId,
    ) -> Result<Vec<ConsumerId>, RestraintError> {
        let finished = self.registry.finish_consumers(release_entity_id)?;
        tracing::info!(
            release_entity_id = %release_entity_id,
            plan_execution_id = release_entity_id.plan_execution_id(),
            count = finished.len(),
            "consumers released"
        );

        let units: BTreeSet<(ConstraintId, ConstraintUnit)> = finished
            .into_iter()
            .map(|c| (c.constraint_id, c.unit))
            .collect();

        let mut promoted = Vec::new();
        for (constraint_id, unit) in units {
            let constraint = self.constraint_by_id(&constraint_id)?;
            promoted.extend(self.promote_runnable(&constraint, &unit)?);
        }
        Ok(promoted)
    }
}

/// Decision point for steps waiting at a barrier
#[derive(Clone)]
pub struct BarrierFacilitator<R> {
    registry: R,
    initial_wait: Duration,
}

impl<R: BarrierRegistry> BarrierFacilitator<R> {
    pub fn new(registry: R, config: &FacilitatorConfig) -> Self {
        Self {
            registry,
            initial_wait: config.barrier_initial_wait,
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// SYNC once the stored state is terminal, otherwise ASYNC with the
    /// configured initial wait
    pub fn facilitate(&self, id: &BarrierId) -> Result<FacilitatorResponse, BarrierError> {
        let barrier = Barrier::load(id, &self.registry)?;
        if barrier.state.is_terminal() {
            Ok(FacilitatorResponse::sync())
        } else {
            Ok(FacilitatorResponse::wait(self.initial_wait))
        }
    }

    /// Load, push down once, and persist the result if it changed
    pub fn poll(
        &self,
        id: &BarrierId,
        proctor: &impl ForceProctor,
    ) -> Result<BarrierState, BarrierError> {
        let barrier = Barrier::load(id, &self.registry)?;
        let state = barrier.push_down(proctor);
        if state != barrier.state {
            self.registry.update_state(id, state)?;
        }
        Ok(state)
    }
}

#[cfg(test)]
#[path = "facilitator_tests.rs"]
mod tests;
