// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource restraint commands

use crate::output::{self, OutputFormat};
use clap::Subcommand;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tg_core::{
    AcquireMode, AcquireRequest, ConstraintId, ConstraintUnit, Consumer, ConsumerId,
    ConsumerState, CoordinationConfig, ExecutionMode, ReleaseEntityId,
    ResourceRestraintFacilitator, ResourceRestraintRegistry, UuidIdGen,
};
use tg_storage::JsonStore;

#[derive(Subcommand)]
pub enum RestraintCommand {
    /// Request permits on a restraint unit
    Acquire {
        /// Restraint name
        name: String,
        /// Unit of the restraint, e.g. a target environment
        #[arg(long)]
        unit: String,
        /// Release key owning the permits
        #[arg(long)]
        release: String,
        /// Permits to hold
        #[arg(long, default_value = "1")]
        permits: u32,
        /// Only request permits not already held under the release key
        #[arg(long)]
        ensure: bool,
    },
    /// Re-check a waiting consumer
    Poll {
        /// Restraint name
        name: String,
        /// Unit of the restraint
        #[arg(long)]
        unit: String,
        /// Consumer id returned by acquire
        consumer: String,
    },
    /// Release every permit held under a release key
    Release {
        /// Release key
        release: String,
        /// Only list the consumers that would be released
        #[arg(long)]
        dry_run: bool,
    },
    /// List waiting and active consumers of a restraint unit
    List {
        /// Restraint name
        name: String,
        /// Unit of the restraint
        #[arg(long)]
        unit: String,
    },
}

#[derive(Serialize)]
struct DecisionInfo {
    mode: ExecutionMode,
    initial_wait: String,
    consumer_id: Option<String>,
}

impl fmt::Display for DecisionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            ExecutionMode::Sync => write!(f, "SYNC")?,
            ExecutionMode::Async => write!(f, "ASYNC wait={}", self.initial_wait)?,
        }
        if let Some(id) = &self.consumer_id {
            write!(f, " consumer={}", id)?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ConsumerInfo {
    id: String,
    permits: u32,
    state: ConsumerState,
    release: String,
    sequence: u64,
}

impl From<Consumer> for ConsumerInfo {
    fn from(consumer: Consumer) -> Self {
        Self {
            id: consumer.id.0,
            permits: consumer.permits,
            state: consumer.state,
            release: consumer.release_entity_id.0,
            sequence: consumer.sequence,
        }
    }
}

const CONSUMER_HEADER: &str = "SEQ    CONSUMER                               PERMITS  STATE     RELEASE";

impl fmt::Display for ConsumerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            ConsumerState::Blocked => "BLOCKED",
            ConsumerState::Active => "ACTIVE",
            ConsumerState::Finished => "FINISHED",
            ConsumerState::Rejected => "REJECTED",
        };
        write!(
            f,
            "{:<6} {:<38} {:<8} {:<9} {}",
            self.sequence, self.id, self.permits, state, self.release
        )
    }
}

#[derive(Serialize)]
struct ReleaseInfo {
    release: String,
    promoted: Vec<String>,
}

impl fmt::Display for ReleaseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "released {}", self.release)?;
        if !self.promoted.is_empty() {
            write!(f, "; unblocked {}", self.promoted.join(", "))?;
        }
        Ok(())
    }
}

pub fn handle(
    command: RestraintCommand,
    store: JsonStore,
    config: CoordinationConfig,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let facilitator = ResourceRestraintFacilitator::new(config, store, UuidIdGen);
    match command {
        RestraintCommand::Acquire {
            name,
            unit,
            release,
            permits,
            ensure,
        } => {
            let mode = if ensure {
                AcquireMode::Ensure
            } else {
                AcquireMode::Accumulate
            };
            let request = AcquireRequest::new(
                name,
                ConstraintUnit::new(unit),
                ReleaseEntityId::new(release),
                permits,
            )
            .with_mode(mode);
            let response = facilitator.facilitate(&request)?;
            let info = DecisionInfo {
                mode: response.mode,
                initial_wait: humantime::format_duration(response.initial_wait).to_string(),
                consumer_id: response.consumer_id.map(|id| id.0),
            };
            output::print(&info, format)
        }
        RestraintCommand::Poll {
            name,
            unit,
            consumer,
        } => {
            let state = facilitator.poll(
                &ConstraintId::new(name),
                &ConstraintUnit::new(unit),
                &ConsumerId::new(consumer.clone()),
            )?;
            let (mode, wait) = if state == ConsumerState::Active {
                (ExecutionMode::Sync, Duration::ZERO)
            } else {
                (ExecutionMode::Async, facilitator.initial_wait())
            };
            let info = DecisionInfo {
                mode,
                initial_wait: humantime::format_duration(wait).to_string(),
                consumer_id: Some(consumer),
            };
            output::print(&info, format)
        }
        RestraintCommand::Release {
            release,
            dry_run: true,
        } => {
            let consumers: Vec<ConsumerInfo> = facilitator
                .registry()
                .consumers_for_release(&ReleaseEntityId::new(release))?
                .into_iter()
                .map(ConsumerInfo::from)
                .collect();
            output::print_table(CONSUMER_HEADER, "No consumers.", &consumers, format)
        }
        RestraintCommand::Release {
            release,
            dry_run: false,
        } => {
            let promoted = facilitator.release(&ReleaseEntityId::new(release.clone()))?;
            let info = ReleaseInfo {
                release,
                promoted: promoted.into_iter().map(|id| id.0).collect(),
            };
            output::print(&info, format)
        }
        RestraintCommand::List { name, unit } => {
            let constraint = facilitator.constraint(&name)?;
            let consumers: Vec<ConsumerInfo> = facilitator
                .registry()
                .load_consumers(&constraint.id, &ConstraintUnit::new(unit))?
                .into_iter()
                .map(ConsumerInfo::from)
                .collect();
            output::print_table(CONSUMER_HEADER, "No consumers.", &consumers, format)
        }
    }
}
