// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Barrier registry over the JSON store

use crate::json::JsonStore;
use tg_core::barrier::{Barrier, BarrierError, BarrierId, BarrierRegistry, BarrierState, Forcer};

const BARRIERS: &str = "barriers";

impl BarrierRegistry for JsonStore {
    fn save(&self, id: &BarrierId, forcer: &Forcer) -> Result<(), BarrierError> {
        let barrier = Barrier::new(id.clone(), forcer.clone());
        self.with_lock(|| self.create(BARRIERS, id.as_str(), &barrier))
            .map_err(|e| BarrierError::UnableToSave {
                id: id.clone(),
                reason: e.to_string(),
            })
    }

    fn load(&self, id: &BarrierId) -> Result<Barrier, BarrierError> {
        JsonStore::load(self, BARRIERS, id.as_str()).map_err(|e| BarrierError::UnableToLoad {
            id: id.clone(),
            reason: e.to_string(),
        })
    }

    fn update_state(&self, id: &BarrierId, state: BarrierState) -> Result<(), BarrierError> {
        self.with_lock(|| {
            let barrier: Barrier = JsonStore::load(self, BARRIERS, id.as_str())?;
            if barrier.state.is_terminal() {
                return Ok(());
            }
            self.save(BARRIERS, id.as_str(), &barrier.with_state(state))
        })
        .map_err(|e| BarrierError::UnableToSave {
            id: id.clone(),
            reason: e.to_string(),
        })
    }
}
