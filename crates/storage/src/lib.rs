// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! JSON file store backing the barrier and restraint registries
//!
//! Every mutation runs under an exclusive file lock and writes each document
//! through a temp file and rename, so concurrent processes on one host see
//! unique inserts and compare-and-swap promotions.

mod barrier;
mod json;
mod restraint;

pub use json::{JsonStore, StorageError};
