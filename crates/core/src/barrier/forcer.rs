// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Forcer tree and the proctor that reports live forcer status

use crate::id::string_id;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

string_id!(
    /// Opaque identifier used to look up a forcer's live status
    ForcerId
);

/// Live status of a forcer, supplied per poll by a [`ForceProctor`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForcerState {
    /// Not yet registered or observed
    Absent,
    /// In progress; children may still be running
    Approaching,
    /// This forcer and everything beneath it succeeded
    Arrived,
    /// Permanently failed
    Abandoned,
}

/// A participant that must reach the barrier, with its sub-participants
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forcer {
    pub id: ForcerId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Forcer>,
}

impl Forcer {
    /// A forcer with no children
    pub fn leaf(id: impl Into<String>) -> Self {
        Self {
            id: ForcerId::new(id),
            children: Vec::new(),
        }
    }

    pub fn with_children(id: impl Into<String>, children: Vec<Forcer>) -> Self {
        Self {
            id: ForcerId::new(id),
            children,
        }
    }

    /// All forcer ids in the tree, parents before children
    pub fn ids(&self) -> Vec<&ForcerId> {
        let mut ids = vec![&self.id];
        for child in &self.children {
            ids.extend(child.ids());
        }
        ids
    }
}

/// Status oracle for forcers.
///
/// Backed by whatever execution-status store the caller maintains. The
/// barrier has no knowledge of how status is determined.
pub trait ForceProctor {
    fn forcer_state(&self, id: &ForcerId) -> ForcerState;
}

/// Snapshot proctor: forcers missing from the map have not been observed yet
impl ForceProctor for HashMap<ForcerId, ForcerState> {
    fn forcer_state(&self, id: &ForcerId) -> ForcerState {
        self.get(id).copied().unwrap_or(ForcerState::Absent)
    }
}

impl ForceProctor for BTreeMap<ForcerId, ForcerState> {
    fn forcer_state(&self, id: &ForcerId) -> ForcerState {
        self.get(id).copied().unwrap_or(ForcerState::Absent)
    }
}

impl<P: ForceProctor + ?Sized> ForceProctor for &P {
    fn forcer_state(&self, id: &ForcerId) -> ForcerState {
        (**self).forcer_state(id)
    }
}
