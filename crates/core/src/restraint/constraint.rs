// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Constraint permit accounting
//!
//! A constraint caps the permits held on each of its units. Every rule here
//! is a pure function over a snapshot of the unit's consumers, ordered by
//! creation sequence.

use super::consumer::{AcquireMode, Consumer, ConsumerId, ConsumerState};
use crate::id::string_id;
use serde::{Deserialize, Serialize};

string_id!(
    /// Name of a capacity-bounded shared resource
    ConstraintId
);

string_id!(
    /// Partition key narrowing a constraint to one concrete target
    ConstraintUnit
);

/// Order in which blocked consumers are promoted when capacity frees up
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Strict creation order; the head of the queue blocks everyone behind it
    #[default]
    Fifo,
    /// Promote any blocked consumer that fits, skipping those that don't
    Asap,
}

/// Capacity of each unit and the promotion strategy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSpec {
    /// Maximum permits held at once per unit
    pub limits: u32,
    #[serde(default)]
    pub strategy: Strategy,
}

/// Resource restraint configuration entity, owned by the orchestration domain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRestraint {
    pub id: ConstraintId,
    pub capacity: u32,
    #[serde(default)]
    pub strategy: Strategy,
}

/// Capacity abstraction built from a [`ResourceRestraint`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Constraint {
    pub id: ConstraintId,
    pub spec: ConstraintSpec,
}

/// Outcome of one permit request against the live consumers of its unit
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Admission {
    /// The scope already holds every permit it asked for
    Held,
    /// A waiting consumer of the same scope already covers the request
    Queued(Consumer),
    /// New consumer to store, ACTIVE or BLOCKED
    Admitted(Consumer),
    /// More permits than the constraint can ever provide
    Rejected { requested: u32 },
}

/// Decide the state of a new request from raw permit counts.
///
/// ACTIVE iff `used + requested <= capacity`. A request larger than the whole
/// capacity can never be satisfied and is REJECTED.
pub fn calculate_consumer_state(capacity: u32, requested: u32, used: u32) -> ConsumerState {
    if requested > capacity {
        return ConsumerState::Rejected;
    }
    if u64::from(used) + u64::from(requested) <= u64::from(capacity) {
        ConsumerState::Active
    } else {
        ConsumerState::Blocked
    }
}

/// Permits currently held by the active consumers in `consumers`
pub fn used_permits(consumers: &[Consumer]) -> u32 {
    consumers
        .iter()
        .filter(|c| c.is_active())
        .fold(0u32, |sum, c| sum.saturating_add(c.permits))
}

impl Constraint {
    pub fn new(id: ConstraintId, spec: ConstraintSpec) -> Self {
        Self { id, spec }
    }

    /// Build the capacity abstraction for a restraint. Pure construction.
    pub fn create_abstraction(restraint: &ResourceRestraint) -> Self {
        Self::new(
            restraint.id.clone(),
            ConstraintSpec {
                limits: restraint.capacity,
                strategy: restraint.strategy,
            },
        )
    }

    /// State a new request for `requested` permits would enter, given the
    /// unit's current consumers and the permits they hold.
    ///
    /// Under FIFO a newcomer does not overtake consumers already queued.
    pub fn calculate_consumer_state(
        &self,
        consumers: &[Consumer],
        requested: u32,
        used: u32,
    ) -> ConsumerState {
        let state = calculate_consumer_state(self.spec.limits, requested, used);
        let queued = consumers.iter().any(Consumer::is_blocked);
        match state {
            ConsumerState::Active if queued && self.spec.strategy == Strategy::Fifo => {
                ConsumerState::Blocked
            }
            other => other,
        }
    }

    /// Admit `candidate` against the live consumers of its unit.
    ///
    /// Under ENSURE the permits the candidate's scope already holds or is
    /// waiting for are netted out first. The returned consumer carries the
    /// permits and state to store; its sequence is left to the registry.
    pub fn admit(
        &self,
        consumers: &[Consumer],
        mut candidate: Consumer,
        mode: AcquireMode,
    ) -> Admission {
        let requested = match mode {
            AcquireMode::Accumulate => candidate.permits,
            AcquireMode::Ensure => {
                let owned: Vec<&Consumer> = consumers
                    .iter()
                    .filter(|c| {
                        c.state.is_live() && c.release_entity_id == candidate.release_entity_id
                    })
                    .collect();
                let active = owned
                    .iter()
                    .filter(|c| c.is_active())
                    .fold(0u32, |sum, c| sum.saturating_add(c.permits));
                let waiting = owned
                    .iter()
                    .filter(|c| c.is_blocked())
                    .fold(0u32, |sum, c| sum.saturating_add(c.permits));

                let missing = candidate
                    .permits
                    .saturating_sub(active.saturating_add(waiting));
                if missing == 0 {
                    return match owned.into_iter().find(|c| c.is_blocked()) {
                        Some(queued) if active < candidate.permits => {
                            Admission::Queued(queued.clone())
                        }
                        _ => Admission::Held,
                    };
                }
                missing
            }
        };

        let used = used_permits(consumers);
        match self.calculate_consumer_state(consumers, requested, used) {
            ConsumerState::Rejected => Admission::Rejected { requested },
            state => {
                candidate.permits = requested;
                candidate.state = state;
                Admission::Admitted(candidate)
            }
        }
    }

    /// Blocked consumers that may become active now, in promotion order.
    ///
    /// `consumers` is every live consumer of one unit. FIFO stops at the first
    /// blocked consumer that does not fit; ASAP skips it and keeps looking.
    pub fn runnable_consumers(&self, consumers: &[Consumer]) -> Vec<ConsumerId> {
        let mut used = used_permits(consumers);
        let mut waiting: Vec<&Consumer> = consumers.iter().filter(|c| c.is_blocked()).collect();
        waiting.sort_by_key(|c| c.sequence);

        let mut runnable = Vec::new();
        for consumer in waiting {
            if calculate_consumer_state(self.spec.limits, consumer.permits, used)
                != ConsumerState::Active
            {
                match self.spec.strategy {
                    Strategy::Fifo => break,
                    Strategy::Asap => continue,
                }
            }
            used = used.saturating_add(consumer.permits);
            runnable.push(consumer.id.clone());
        }
        runnable
    }
}

impl From<&ResourceRestraint> for Constraint {
    fn from(restraint: &ResourceRestraint) -> Self {
        Self::create_abstraction(restraint)
    }
}

#[cfg(test)]
#[path = "constraint_tests.rs"]
mod tests;
