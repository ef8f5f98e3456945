// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tg-core: concurrency coordination for pipeline execution
//!
//! This crate provides:
//! - **Barrier** - a polling rendezvous over a tree of forcers
//! - **Constraint** - permit accounting for named, capacity-bounded resources
//! - **Facilitators** - the SYNC/ASYNC decision point consumed by step executors
//! - Registry traits for the shared store, plus in-memory implementations
//!
//! Nothing here blocks or owns a thread. Every call is a single recomputation
//! over a snapshot read from a registry; the caller drives polling.

pub mod barrier;
pub mod config;
pub mod facilitator;
pub mod id;
pub mod restraint;

pub use barrier::{
    push_down, Barrier, BarrierError, BarrierId, BarrierRegistry, BarrierState, ForceProctor,
    Forcer, ForcerId, ForcerState, InMemoryBarrierRegistry,
};
pub use config::{ConfigError, CoordinationConfig, FacilitatorConfig, RestraintSettings};
pub use facilitator::{
    AcquireRequest, BarrierFacilitator, ExecutionMode, FacilitatorResponse,
    ResourceRestraintFacilitator,
};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use restraint::{
    calculate_consumer_state, used_permits, AcquireMode, Admission, Constraint, ConstraintId,
    ConstraintSpec, ConstraintUnit, Consumer, ConsumerId, ConsumerState, ExecutionScope,
    HoldingScope, InMemoryRestraintRegistry, RegistryError, ReleaseEntityId, ResourceRestraint,
    ResourceRestraintRegistry, RestraintError, Strategy,
};
