// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Barrier persistence contract

use super::forcer::Forcer;
use super::state::{Barrier, BarrierId, BarrierState};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors from barrier persistence. Neither is retried here.
#[derive(Debug, Error)]
pub enum BarrierError {
    #[error("unable to save barrier {id}: {reason}")]
    UnableToSave { id: BarrierId, reason: String },
    #[error("unable to load barrier {id}: {reason}")]
    UnableToLoad { id: BarrierId, reason: String },
}

/// Durable home for barriers, shared by every orchestrator instance
pub trait BarrierRegistry {
    /// Insert a new STANDING barrier. Must fail if the id already exists.
    fn save(&self, id: &BarrierId, forcer: &Forcer) -> Result<(), BarrierError>;

    /// Load a barrier. Must fail if the id is unknown.
    fn load(&self, id: &BarrierId) -> Result<Barrier, BarrierError>;

    /// Record the state computed by a poll.
    ///
    /// A stored terminal state is never overwritten.
    fn update_state(&self, id: &BarrierId, state: BarrierState) -> Result<(), BarrierError>;
}

/// In-process registry, shared across clones
#[derive(Clone, Default)]
pub struct InMemoryBarrierRegistry {
    barriers: Arc<Mutex<HashMap<BarrierId, Barrier>>>,
}

impl InMemoryBarrierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.barriers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BarrierRegistry for InMemoryBarrierRegistry {
    fn save(&self, id: &BarrierId, forcer: &Forcer) -> Result<(), BarrierError> {
        let mut barriers = self.barriers.lock().unwrap_or_else(|e| e.into_inner());
        if barriers.contains_key(id) {
            return Err(BarrierError::UnableToSave {
                id: id.clone(),
                reason: "barrier already exists".to_string(),
            });
        }
        barriers.insert(id.clone(), Barrier::new(id.clone(), forcer.clone()));
        Ok(())
    }

    fn load(&self, id: &BarrierId) -> Result<Barrier, BarrierError> {
        let barriers = self.barriers.lock().unwrap_or_else(|e| e.into_inner());
        barriers
            .get(id)
            .cloned()
            .ok_or_else(|| BarrierError::UnableToLoad {
                id: id.clone(),
                reason: "not found".to_string(),
            })
    }

    fn update_state(&self, id: &BarrierId, state: BarrierState) -> Result<(), BarrierError> {
        let mut barriers = self.barriers.lock().unwrap_or_else(|e| e.into_inner());
        let barrier = barriers
            .get_mut(id)
            .ok_or_else(|| BarrierError::UnableToSave {
                id: id.clone(),
                reason: "not found".to_string(),
            })?;
        if !barrier.state.is_terminal() {
            barrier.state = state;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_rejects_duplicate_ids() {
        let registry = InMemoryBarrierRegistry::new();
        let id = BarrierId::new("deploy-gate");

        registry.save(&id, &Forcer::leaf("root")).unwrap();
        let err = registry.save(&id, &Forcer::leaf("other")).unwrap_err();

        assert!(matches!(err, BarrierError::UnableToSave { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn load_unknown_barrier_fails() {
        let registry = InMemoryBarrierRegistry::new();
        let err = registry.load(&BarrierId::new("missing")).unwrap_err();
        assert!(matches!(err, BarrierError::UnableToLoad { id, .. } if id.as_str() == "missing"));
    }

    #[test]
    fn update_state_keeps_terminal_states() {
        let registry = InMemoryBarrierRegistry::new();
        let id = BarrierId::new("b");
        registry.save(&id, &Forcer::leaf("root")).unwrap();

        registry.update_state(&id, BarrierState::Endure).unwrap();
        registry.update_state(&id, BarrierState::Standing).unwrap();

        assert_eq!(registry.load(&id).unwrap().state, BarrierState::Endure);
    }

    #[test]
    fn clones_share_storage() {
        let registry = InMemoryBarrierRegistry::new();
        let other = registry.clone();
        registry
            .save(&BarrierId::new("shared"), &Forcer::leaf("root"))
            .unwrap();
        assert!(other.load(&BarrierId::new("shared")).is_ok());
    }
}
