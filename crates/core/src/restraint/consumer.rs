// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consumers and the scopes that own their permits

use super::constraint::{ConstraintId, ConstraintUnit};
use crate::id::string_id;
use serde::{Deserialize, Serialize};

string_id!(
    /// Unique identifier for a consumer
    ConsumerId
);

string_id!(
    /// Scope key under which held permits are grouped for bulk release
    ReleaseEntityId
);

/// Separator between the parts of a derived release key
const RELEASE_KEY_SEPARATOR: char = '|';

/// Consumer lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsumerState {
    /// Waiting for capacity
    Blocked,
    /// Holding its permits
    Active,
    /// Released by its owning scope; holds nothing
    Finished,
    /// Asked for more than the constraint can ever provide
    Rejected,
}

impl ConsumerState {
    /// Blocked and active consumers still take part in permit accounting
    pub fn is_live(&self) -> bool {
        matches!(self, ConsumerState::Blocked | ConsumerState::Active)
    }
}

/// A request to hold `permits` on one constraint unit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumer {
    pub id: ConsumerId,
    pub constraint_id: ConstraintId,
    pub unit: ConstraintUnit,
    pub permits: u32,
    pub state: ConsumerState,
    pub release_entity_id: ReleaseEntityId,
    /// Creation order, assigned by the registry on insert
    #[serde(default)]
    pub sequence: u64,
}

impl Consumer {
    pub fn new(
        id: ConsumerId,
        constraint_id: ConstraintId,
        unit: ConstraintUnit,
        permits: u32,
        state: ConsumerState,
        release_entity_id: ReleaseEntityId,
    ) -> Self {
        Self {
            id,
            constraint_id,
            unit,
            permits,
            state,
            release_entity_id,
            sequence: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == ConsumerState::Active
    }

    pub fn is_blocked(&self) -> bool {
        self.state == ConsumerState::Blocked
    }
}

/// How a re-acquisition by the same scope is counted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AcquireMode {
    /// Every request adds to what the scope already holds
    #[default]
    Accumulate,
    /// Request only what is missing beyond what the scope already holds
    Ensure,
}

/// How far up the execution tree permits are held
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HoldingScope {
    /// Released when the whole pipeline execution completes
    #[default]
    Pipeline,
    /// Released when the enclosing stage completes
    Stage,
    /// Released when the requesting node completes
    Step,
}

/// Where a request is coming from in the running pipeline
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionScope {
    pub plan_execution_id: String,
    pub stage_runtime_id: String,
    pub node_execution_id: String,
}

impl ReleaseEntityId {
    /// Derive the release key for a request made from `execution`
    pub fn derive(scope: HoldingScope, execution: &ExecutionScope) -> Self {
        match scope {
            HoldingScope::Pipeline => Self::new(execution.plan_execution_id.clone()),
            HoldingScope::Stage => Self::new(format!(
                "{}{}{}",
                execution.plan_execution_id, RELEASE_KEY_SEPARATOR, execution.stage_runtime_id
            )),
            HoldingScope::Step => Self::new(format!(
                "{}{}{}",
                execution.plan_execution_id, RELEASE_KEY_SEPARATOR, execution.node_execution_id
            )),
        }
    }

    /// The plan execution this key belongs to
    pub fn plan_execution_id(&self) -> &str {
        self.0
            .split(RELEASE_KEY_SEPARATOR)
            .next()
            .unwrap_or(self.0.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    fn execution() -> ExecutionScope {
        ExecutionScope {
            plan_execution_id: "plan-1".to_string(),
            stage_runtime_id: "stage-9".to_string(),
            node_execution_id: "node-42".to_string(),
        }
    }

    #[parameterized(
        pipeline = { HoldingScope::Pipeline, "plan-1" },
        stage = { HoldingScope::Stage, "plan-1|stage-9" },
        step = { HoldingScope::Step, "plan-1|node-42" },
    )]
    fn release_entity_id_follows_holding_scope(scope: HoldingScope, expected: &str) {
        let id = ReleaseEntityId::derive(scope, &execution());
        assert_eq!(id.as_str(), expected);
        assert_eq!(id.plan_execution_id(), "plan-1");
    }

    #[parameterized(
        blocked = { ConsumerState::Blocked, true },
        active = { ConsumerState::Active, true },
        finished = { ConsumerState::Finished, false },
        rejected = { ConsumerState::Rejected, false },
    )]
    fn live_states_take_part_in_accounting(state: ConsumerState, live: bool) {
        assert_eq!(state.is_live(), live);
    }

    #[test]
    fn consumer_sequence_defaults_when_missing() {
        let json = r#"{
            "id": "c-1",
            "constraint_id": "deploy-slots",
            "unit": "prod-cluster",
            "permits": 2,
            "state": "BLOCKED",
            "release_entity_id": "plan-1"
        }"#;
        let consumer: Consumer = serde_json::from_str(json).unwrap();
        assert_eq!(consumer.sequence, 0);
        assert!(consumer.is_blocked());
    }
}
