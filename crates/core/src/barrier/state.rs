// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Barrier state machine
//!
//! A barrier is pushed down by polling: each call walks the forcer tree once
//! against the proctor's current answers and reports the resulting state.
//! Persisting that state is the caller's job.

use super::forcer::{ForceProctor, Forcer, ForcerState};
use super::registry::{BarrierError, BarrierRegistry};
use crate::id::string_id;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

string_id!(
    /// Unique identifier for a barrier
    BarrierId
);

/// Barrier state. STANDING is the only non-terminal state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BarrierState {
    /// Some forcer has not arrived yet
    #[default]
    Standing,
    /// Every forcer arrived
    Down,
    /// Some forcer was abandoned; the barrier will never come down
    Endure,
}

impl BarrierState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BarrierState::Standing)
    }
}

impl std::fmt::Display for BarrierState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BarrierState::Standing => "STANDING",
            BarrierState::Down => "DOWN",
            BarrierState::Endure => "ENDURE",
        };
        write!(f, "{}", name)
    }
}

/// A synchronization point guarded by a single root forcer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Barrier {
    pub id: BarrierId,
    pub forcer: Forcer,
    #[serde(default)]
    pub state: BarrierState,
}

impl Barrier {
    /// In-memory handle for a barrier that has not been persisted
    pub fn new(id: BarrierId, forcer: Forcer) -> Self {
        Self {
            id,
            forcer,
            state: BarrierState::Standing,
        }
    }

    /// Persist a new barrier and return a STANDING handle.
    ///
    /// Fails with [`BarrierError::UnableToSave`] if the registry rejects it,
    /// e.g. because the id is already taken.
    pub fn create<R>(id: BarrierId, forcer: Forcer, registry: &R) -> Result<Self, BarrierError>
    where
        R: BarrierRegistry + ?Sized,
    {
        registry.save(&id, &forcer)?;
        tracing::debug!(barrier_id = %id, "barrier created");
        Ok(Self::new(id, forcer))
    }

    /// Fetch a previously created barrier
    pub fn load<R>(id: &BarrierId, registry: &R) -> Result<Self, BarrierError>
    where
        R: BarrierRegistry + ?Sized,
    {
        registry.load(id)
    }

    /// Recompute the barrier state once. Does not mutate the barrier.
    pub fn push_down(&self, proctor: &impl ForceProctor) -> BarrierState {
        push_down(self, proctor)
    }

    /// Return this barrier with its state replaced, ready to be persisted
    pub fn with_state(mut self, state: BarrierState) -> Self {
        self.state = state;
        self
    }
}

/// Pure barrier transition: `(Barrier, proctor answers) -> BarrierState`.
///
/// Terminal states are returned as-is without consulting the proctor.
pub fn push_down(barrier: &Barrier, proctor: &impl ForceProctor) -> BarrierState {
    if barrier.state.is_terminal() {
        return barrier.state;
    }

    let state = traverse(&barrier.forcer, proctor);
    match state {
        BarrierState::Standing => {
            tracing::debug!(barrier_id = %barrier.id, "barrier still standing");
        }
        BarrierState::Down | BarrierState::Endure => {
            tracing::info!(barrier_id = %barrier.id, %state, "barrier reached terminal state");
        }
    }
    state
}

/// Breadth-first walk of the forcer tree.
fn traverse(root: &Forcer, proctor: &impl ForceProctor) -> BarrierState {
    let mut result = BarrierState::Down;
    let mut queue = VecDeque::from([root]);

    while let Some(forcer) = queue.pop_front() {
        match proctor.forcer_state(&forcer.id) {
            ForcerState::Abandoned => return BarrierState::Endure,
            // Nothing below an unobserved forcer can have made progress
            ForcerState::Absent => result = BarrierState::Standing,
            ForcerState::Approaching => {
                result = BarrierState::Standing;
                queue.extend(forcer.children.iter());
            }
            // Arrival covers the whole subtree
            ForcerState::Arrived => {}
        }
    }

    result
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
