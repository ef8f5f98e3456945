// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! [facilitator]
//! barrier_initial_wait = "10s"
//! restraint_initial_wait = "0s"
//!
//! [restraint.deploy-slots]
//! capacity = 2
//! strategy = "fifo"
//! ```

use crate::restraint::{ConstraintId, ResourceRestraint, Strategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Wait hints handed back with ASYNC decisions
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacilitatorConfig {
    /// Delay before a step waiting on a standing barrier is first re-polled
    #[serde(with = "humantime_serde")]
    pub barrier_initial_wait: Duration,
    /// Delay before a blocked consumer is first re-polled
    #[serde(with = "humantime_serde")]
    pub restraint_initial_wait: Duration,
}

impl Default for FacilitatorConfig {
    fn default() -> Self {
        Self {
            barrier_initial_wait: Duration::from_secs(10),
            restraint_initial_wait: Duration::ZERO,
        }
    }
}

/// One `[restraint.<name>]` table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestraintSettings {
    pub capacity: u32,
    #[serde(default)]
    pub strategy: Strategy,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinationConfig {
    #[serde(default)]
    pub facilitator: FacilitatorConfig,
    #[serde(default, rename = "restraint")]
    pub restraints: BTreeMap<String, RestraintSettings>,
}

impl CoordinationConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from TOML content
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: CoordinationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, settings) in &self.restraints {
            if name.is_empty() {
                return Err(ConfigError::Invalid("restraint name is empty".to_string()));
            }
            if settings.capacity == 0 {
                return Err(ConfigError::Invalid(format!(
                    "restraint {} must have a capacity of at least 1",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Add a restraint
    pub fn with_restraint(
        mut self,
        name: impl Into<String>,
        capacity: u32,
        strategy: Strategy,
    ) -> Self {
        self.restraints
            .insert(name.into(), RestraintSettings { capacity, strategy });
        self
    }

    pub fn with_facilitator(mut self, facilitator: FacilitatorConfig) -> Self {
        self.facilitator = facilitator;
        self
    }

    /// The restraint configured under `name`, if any
    pub fn restraint(&self, name: &str) -> Option<ResourceRestraint> {
        self.restraints.get(name).map(|settings| ResourceRestraint {
            id: ConstraintId::new(name),
            capacity: settings.capacity,
            strategy: settings.strategy,
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
