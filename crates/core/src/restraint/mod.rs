// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource restraint: permit accounting for named, capacity-bounded resources
//!
//! This module provides:
//! - **Consumer** - a pending or granted request for permits on a constraint unit
//! - **Constraint** - capacity, strategy and the permit rules over consumers
//! - **ResourceRestraintRegistry** - the persistence contract for consumers
//! - **ReleaseEntityId** - the scope key permits are released under

mod constraint;
mod consumer;
mod error;
mod registry;

pub use constraint::{
    calculate_consumer_state, used_permits, Admission, Constraint, ConstraintId, ConstraintSpec,
    ConstraintUnit, ResourceRestraint, Strategy,
};
pub use consumer::{
    AcquireMode, Consumer, ConsumerId, ConsumerState, ExecutionScope, HoldingScope,
    ReleaseEntityId,
};
pub use error::RestraintError;
pub use registry::{InMemoryRestraintRegistry, RegistryError, ResourceRestraintRegistry};
