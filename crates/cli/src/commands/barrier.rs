// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Barrier commands

use crate::output::{self, OutputFormat};
use anyhow::{bail, Context};
use clap::Subcommand;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tg_core::{
    Barrier, BarrierFacilitator, BarrierId, BarrierState, CoordinationConfig, ExecutionMode,
    Forcer, ForcerId, ForcerState,
};
use tg_storage::JsonStore;
use tokio::time::Instant;

#[derive(Subcommand)]
pub enum BarrierCommand {
    /// Create a barrier from a forcer tree (JSON file)
    Create {
        /// Barrier id
        id: String,
        /// Forcer tree, e.g. {"id":"root","children":[{"id":"c1"}]}
        #[arg(long)]
        tree: PathBuf,
    },
    /// Show a barrier
    Show {
        /// Barrier id
        id: String,
    },
    /// Recompute a barrier once against a forcer status snapshot
    PushDown {
        /// Barrier id
        id: String,
        /// Forcer statuses, e.g. {"root":"APPROACHING","c1":"ARRIVED"}
        #[arg(long)]
        states: PathBuf,
    },
    /// Decide whether a step waiting at a barrier may proceed
    Facilitate {
        /// Barrier id
        id: String,
    },
    /// Poll a barrier until it reaches a terminal state
    Wait {
        /// Barrier id
        id: String,
        /// Forcer statuses, re-read on every poll
        #[arg(long)]
        states: PathBuf,
        /// Delay between polls
        #[arg(long, default_value = "1s", value_parser = humantime::parse_duration)]
        interval: Duration,
        /// Give up after this long
        #[arg(long, value_parser = humantime::parse_duration)]
        timeout: Option<Duration>,
    },
}

#[derive(Serialize)]
struct BarrierInfo {
    id: String,
    state: BarrierState,
    forcers: Vec<String>,
}

impl BarrierInfo {
    fn new(barrier: &Barrier, state: BarrierState) -> Self {
        Self {
            id: barrier.id.to_string(),
            state,
            forcers: barrier.forcer.ids().iter().map(|id| id.to_string()).collect(),
        }
    }
}

impl fmt::Display for BarrierInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<24} {:<10} forcers={}",
            self.id,
            self.state,
            self.forcers.join(",")
        )
    }
}

#[derive(Serialize)]
struct FacilitationInfo {
    id: String,
    mode: ExecutionMode,
    initial_wait: String,
}

impl fmt::Display for FacilitationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            ExecutionMode::Sync => write!(f, "{} SYNC", self.id),
            ExecutionMode::Async => write!(f, "{} ASYNC wait={}", self.id, self.initial_wait),
        }
    }
}

pub async fn handle(
    command: BarrierCommand,
    store: JsonStore,
    config: &CoordinationConfig,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let facilitator = BarrierFacilitator::new(store, &config.facilitator);
    match command {
        BarrierCommand::Create { id, tree } => {
            let forcer: Forcer = read_json(&tree)?;
            let barrier = Barrier::create(BarrierId::new(id), forcer, facilitator.registry())?;
            output::print(&BarrierInfo::new(&barrier, barrier.state), format)
        }
        BarrierCommand::Show { id } => {
            let barrier = Barrier::load(&BarrierId::new(id), facilitator.registry())?;
            output::print(&BarrierInfo::new(&barrier, barrier.state), format)
        }
        BarrierCommand::PushDown { id, states } => {
            let id = BarrierId::new(id);
            let snapshot = read_states(&states)?;
            let state = facilitator.poll(&id, &snapshot)?;
            let barrier = Barrier::load(&id, facilitator.registry())?;
            output::print(&BarrierInfo::new(&barrier, state), format)
        }
        BarrierCommand::Facilitate { id } => {
            let response = facilitator.facilitate(&BarrierId::new(id.clone()))?;
            let info = FacilitationInfo {
                id,
                mode: response.mode,
                initial_wait: humantime::format_duration(response.initial_wait).to_string(),
            };
            output::print(&info, format)
        }
        BarrierCommand::Wait {
            id,
            states,
            interval,
            timeout,
        } => wait(&facilitator, BarrierId::new(id), &states, interval, timeout, format).await,
    }
}

async fn wait(
    facilitator: &BarrierFacilitator<JsonStore>,
    id: BarrierId,
    states: &Path,
    interval: Duration,
    timeout: Option<Duration>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    if interval.is_zero() {
        bail!("poll interval must be greater than zero");
    }
    let deadline = timeout.map(|t| Instant::now() + t);
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;
        let snapshot = read_states(states)?;
        let state = facilitator.poll(&id, &snapshot)?;

        if state.is_terminal() {
            let barrier = Barrier::load(&id, facilitator.registry())?;
            output::print(&BarrierInfo::new(&barrier, state), format)?;
            if state == BarrierState::Endure {
                bail!("barrier {} will never come down: a forcer was abandoned", id);
            }
            return Ok(());
        }

        if deadline.is_some_and(|d| Instant::now() >= d) {
            bail!("timed out waiting for barrier {}", id);
        }
        tracing::debug!(barrier_id = %id, "barrier still standing, polling again");
    }
}

fn read_states(path: &Path) -> anyhow::Result<BTreeMap<ForcerId, ForcerState>> {
    read_json(path)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}
