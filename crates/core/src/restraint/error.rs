// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for resource restraint

use super::constraint::ConstraintId;
use super::registry::RegistryError;
use thiserror::Error;

/// Errors surfaced to the step executor. None are retried here.
#[derive(Debug, Error)]
pub enum RestraintError {
    /// No restraint is configured under this name
    #[error("resource restraint not configured: {0}")]
    MissingRestraint(String),
    /// A stored consumer refers to a constraint that is no longer configured
    #[error("constraint not found: {0}")]
    MissingConstraint(ConstraintId),
    #[error("invalid permit request for {constraint}: {permits} permits")]
    InvalidPermits {
        constraint: ConstraintId,
        permits: u32,
    },
    #[error("request for {requested} permits exceeds capacity {capacity} of {constraint}")]
    Rejected {
        constraint: ConstraintId,
        requested: u32,
        capacity: u32,
    },
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}
