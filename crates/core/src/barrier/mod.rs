// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Polling barrier over a tree of forcers
//!
//! This module provides:
//! - **Forcer** - a participant node that must reach the barrier
//! - **ForceProctor** - the status oracle consulted on every poll
//! - **Barrier** - the STANDING/DOWN/ENDURE state machine
//! - **BarrierRegistry** - the persistence contract for barriers

mod forcer;
mod registry;
mod state;

pub use forcer::{ForceProctor, Forcer, ForcerId, ForcerState};
pub use registry::{BarrierError, BarrierRegistry, InMemoryBarrierRegistry};
pub use state::{push_down, Barrier, BarrierId, BarrierState};
