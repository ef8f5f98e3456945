// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource restraint registry over the JSON store

use crate::json::{JsonStore, StorageError};
use tg_core::restraint::{
    AcquireMode, Admission, Constraint, ConstraintId, ConstraintUnit, Consumer, ConsumerId,
    ConsumerState, RegistryError, ReleaseEntityId, ResourceRestraintRegistry,
};

const CONSUMERS: &str = "consumers";
const RELEASED: &str = "released";
const META: &str = "meta";
const SEQUENCE: &str = "consumer-sequence";

impl From<StorageError> for RegistryError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { kind, id } => RegistryError::NotFound { kind, id },
            StorageError::AlreadyExists { kind, id } => RegistryError::Conflict { kind, id },
            other => RegistryError::Backend(other.to_string()),
        }
    }
}

impl JsonStore {
    /// Next consumer creation sequence. Callers hold the store lock.
    fn next_sequence(&self) -> Result<u64, StorageError> {
        let current: u64 = match self.load(META, SEQUENCE) {
            Ok(n) => n,
            Err(StorageError::NotFound { .. }) => 0,
            Err(e) => return Err(e),
        };
        let next = current + 1;
        self.save(META, SEQUENCE, &next)?;
        Ok(next)
    }

    /// Live consumers matching `filter`, in creation order. Released
    /// consumers live under another kind and are never scanned here.
    fn live_consumers(
        &self,
        filter: impl Fn(&Consumer) -> bool,
    ) -> Result<Vec<Consumer>, StorageError> {
        let mut consumers: Vec<Consumer> = self
            .load_all::<Consumer>(CONSUMERS)?
            .into_iter()
            .filter(|c| c.state.is_live() && filter(c))
            .collect();
        consumers.sort_by_key(|c| c.sequence);
        Ok(consumers)
    }

    fn unit_consumers(
        &self,
        constraint_id: &ConstraintId,
        unit: &ConstraintUnit,
    ) -> Result<Vec<Consumer>, StorageError> {
        self.live_consumers(|c| &c.constraint_id == constraint_id && &c.unit == unit)
    }
}

impl ResourceRestraintRegistry for JsonStore {
    fn load_consumers(
        &self,
        constraint_id: &ConstraintId,
        unit: &ConstraintUnit,
    ) -> Result<Vec<Consumer>, RegistryError> {
        Ok(self.unit_consumers(constraint_id, unit)?)
    }

    fn admit_consumer(
        &self,
        constraint: &Constraint,
        candidate: Consumer,
        mode: AcquireMode,
    ) -> Result<Admission, RegistryError> {
        let admission = self.with_lock(|| {
            let id = candidate.id.to_string();
            if self.exists(CONSUMERS, &id)? || self.exists(RELEASED, &id)? {
                return Err(StorageError::AlreadyExists {
                    kind: CONSUMERS.to_string(),
                    id,
                });
            }
            let consumers = self.unit_consumers(&constraint.id, &candidate.unit)?;
            let mut admission = constraint.admit(&consumers, candidate, mode);
            if let Admission::Admitted(consumer) = &mut admission {
                consumer.sequence = self.next_sequence()?;
                self.save(CONSUMERS, consumer.id.as_str(), &*consumer)?;
            }
            Ok(admission)
        })?;
        if let Admission::Admitted(consumer) = &admission {
            tracing::debug!(consumer_id = %consumer.id, sequence = consumer.sequence, "consumer stored");
        }
        Ok(admission)
    }

    fn consumer_unblocked(
        &self,
        constraint: &Constraint,
        unit: &ConstraintUnit,
        consumer_id: &ConsumerId,
    ) -> Result<bool, RegistryError> {
        let promoted = self.with_lock(|| {
            if self.exists(RELEASED, consumer_id.as_str())? {
                return Ok(false);
            }
            let consumers = self.unit_consumers(&constraint.id, unit)?;
            let Some(consumer) = consumers.iter().find(|c| &c.id == consumer_id) else {
                return Err(StorageError::NotFound {
                    kind: CONSUMERS.to_string(),
                    id: consumer_id.to_string(),
                });
            };
            if !constraint.runnable_consumers(&consumers).contains(consumer_id) {
                return Ok(false);
            }
            let mut consumer = consumer.clone();
            consumer.state = ConsumerState::Active;
            self.save(CONSUMERS, consumer_id.as_str(), &consumer)?;
            Ok(true)
        })?;
        Ok(promoted)
    }

    fn consumers_for_release(
        &self,
        release_entity_id: &ReleaseEntityId,
    ) -> Result<Vec<Consumer>, RegistryError> {
        Ok(self.live_consumers(|c| &c.release_entity_id == release_entity_id)?)
    }

    fn finish_consumers(
        &self,
        release_entity_id: &ReleaseEntityId,
    ) -> Result<Vec<Consumer>, RegistryError> {
        let finished = self.with_lock(|| {
            let mut finished = Vec::new();
            for mut consumer in
                self.live_consumers(|c| &c.release_entity_id == release_entity_id)?
            {
                consumer.state = ConsumerState::Finished;
                self.archive(CONSUMERS, RELEASED, consumer.id.as_str(), &consumer)?;
                finished.push(consumer);
            }
            Ok(finished)
        })?;
        Ok(finished)
    }
}

#[cfg(test)]
#[path = "restraint_tests.rs"]
mod tests;
