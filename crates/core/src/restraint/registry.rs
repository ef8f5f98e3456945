// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consumer persistence contract

use super::constraint::{Admission, Constraint, ConstraintId, ConstraintUnit};
use super::consumer::{AcquireMode, Consumer, ConsumerId, ConsumerState, ReleaseEntityId};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors from consumer persistence
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("already exists: {kind}/{id}")]
    Conflict { kind: String, id: String },
    #[error("not found: {kind}/{id}")]
    NotFound { kind: String, id: String },
    #[error("backend error: {0}")]
    Backend(String),
}

/// Durable home for consumers, shared by every orchestrator instance.
///
/// Admission and promotion read the unit and write the decision as one
/// atomic step, so concurrent instances can never push a unit past its
/// capacity. Released consumers leave the live set.
pub trait ResourceRestraintRegistry {
    /// Live (blocked or active) consumers of one unit, in creation order
    fn load_consumers(
        &self,
        constraint_id: &ConstraintId,
        unit: &ConstraintUnit,
    ) -> Result<Vec<Consumer>, RegistryError>;

    /// Decide `candidate` against its unit with [`Constraint::admit`] and
    /// store it, with a fresh creation sequence, if it was admitted
    fn admit_consumer(
        &self,
        constraint: &Constraint,
        candidate: Consumer,
        mode: AcquireMode,
    ) -> Result<Admission, RegistryError>;

    /// Move a consumer from BLOCKED to ACTIVE if it is still blocked and
    /// the constraint would promote it now.
    ///
    /// Returns `false` without writing otherwise.
    fn consumer_unblocked(
        &self,
        constraint: &Constraint,
        unit: &ConstraintUnit,
        consumer_id: &ConsumerId,
    ) -> Result<bool, RegistryError>;

    /// Live consumers owned by a release scope
    fn consumers_for_release(
        &self,
        release_entity_id: &ReleaseEntityId,
    ) -> Result<Vec<Consumer>, RegistryError>;

    /// Release every live consumer of a scope, returning them marked FINISHED
    fn finish_consumers(
        &self,
        release_entity_id: &ReleaseEntityId,
    ) -> Result<Vec<Consumer>, RegistryError>;
}

#[derive(Default)]
struct RegistryState {
    live: Vec<Consumer>,
    released: Vec<Consumer>,
    next_sequence: u64,
}

impl RegistryState {
    fn unit(&self, constraint_id: &ConstraintId, unit: &ConstraintUnit) -> Vec<Consumer> {
        let mut consumers: Vec<Consumer> = self
            .live
            .iter()
            .filter(|c| &c.constraint_id == constraint_id && &c.unit == unit)
            .cloned()
            .collect();
        consumers.sort_by_key(|c| c.sequence);
        consumers
    }

    fn known(&self, id: &ConsumerId) -> bool {
        self.live.iter().chain(&self.released).any(|c| &c.id == id)
    }
}

/// In-process registry, shared across clones
#[derive(Clone, Default)]
pub struct InMemoryRestraintRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl InMemoryRestraintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every consumer ever admitted, live ones first
    pub fn all_consumers(&self) -> Vec<Consumer> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.live.iter().chain(&state.released).cloned().collect()
    }

    /// Consumers moved out of the live set by a release
    pub fn released_consumers(&self) -> Vec<Consumer> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .released
            .clone()
    }
}

impl ResourceRestraintRegistry for InMemoryRestraintRegistry {
    fn load_consumers(
        &self,
        constraint_id: &ConstraintId,
        unit: &ConstraintUnit,
    ) -> Result<Vec<Consumer>, RegistryError> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state.unit(constraint_id, unit))
    }

    fn admit_consumer(
        &self,
        constraint: &Constraint,
        candidate: Consumer,
        mode: AcquireMode,
    ) -> Result<Admission, RegistryError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.known(&candidate.id) {
            return Err(RegistryError::Conflict {
                kind: "consumer".to_string(),
                id: candidate.id.to_string(),
            });
        }
        let consumers = state.unit(&constraint.id, &candidate.unit);
        let mut admission = constraint.admit(&consumers, candidate, mode);
        if let Admission::Admitted(consumer) = &mut admission {
            state.next_sequence += 1;
            consumer.sequence = state.next_sequence;
            state.live.push(consumer.clone());
        }
        Ok(admission)
    }

    fn consumer_unblocked(
        &self,
        constraint: &Constraint,
        unit: &ConstraintUnit,
        consumer_id: &ConsumerId,
    ) -> Result<bool, RegistryError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let consumers = state.unit(&constraint.id, unit);
        if !consumers.iter().any(|c| &c.id == consumer_id) {
            // Released while the caller was deciding
            if state.released.iter().any(|c| &c.id == consumer_id) {
                return Ok(false);
            }
            return Err(RegistryError::NotFound {
                kind: "consumer".to_string(),
                id: consumer_id.to_string(),
            });
        }
        if !constraint.runnable_consumers(&consumers).contains(consumer_id) {
            return Ok(false);
        }
        for consumer in state.live.iter_mut().filter(|c| &c.id == consumer_id) {
            consumer.state = ConsumerState::Active;
        }
        Ok(true)
    }

    fn consumers_for_release(
        &self,
        release_entity_id: &ReleaseEntityId,
    ) -> Result<Vec<Consumer>, RegistryError> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state
            .live
            .iter()
            .filter(|c| &c.release_entity_id == release_entity_id)
            .cloned()
            .collect())
    }

    fn finish_consumers(
        &self,
        release_entity_id: &ReleaseEntityId,
    ) -> Result<Vec<Consumer>, RegistryError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let (released, live): (Vec<Consumer>, Vec<Consumer>) = std::mem::take(&mut state.live)
            .into_iter()
            .partition(|c| &c.release_entity_id == release_entity_id);
        state.live = live;

        let finished: Vec<Consumer> = released
            .into_iter()
            .map(|mut c| {
                c.state = ConsumerState::Finished;
                c
            })
            .collect();
        state.released.extend(finished.iter().cloned());
        Ok(finished)
    }
}
