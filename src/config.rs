// src/config.rs

//! Manages server configuration: loading, resolving dynamic values, and validation.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::thread;
use tracing::{info, warn};

/// Upper bound on the number of shard threads.
const MAX_SHARDS: usize = 1024;

/// Shard thread settings.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardsConfig {
    /// Number of shard threads. `0` uses the available parallelism of the host.
    #[serde(default)]
    pub count: usize,
}

/// Lua scripting settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScriptingConfig {
    /// Idle interpreters each shard keeps for reuse.
    #[serde(default = "default_interpreters_per_shard")]
    pub interpreters_per_shard: usize,
}

impl Default for ScriptingConfig {
    fn default() -> Self {
        Self {
            interpreters_per_shard: default_interpreters_per_shard(),
        }
    }
}

fn default_interpreters_per_shard() -> usize {
    4
}

/// Publish/subscribe settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PubSubConfig {
    /// Log a warning when a subscriber has more than this many undelivered messages.
    #[serde(default = "default_outbound_queue_warn_len")]
    pub outbound_queue_warn_len: usize,
}

impl Default for PubSubConfig {
    fn default() -> Self {
        Self {
            outbound_queue_warn_len: default_outbound_queue_warn_len(),
        }
    }
}

fn default_outbound_queue_warn_len() -> usize {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Represents the final, validated, and resolved server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub shards: ShardsConfig,
    #[serde(default)]
    pub scripting: ScriptingConfig,
    #[serde(default)]
    pub pubsub: PubSubConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            shards: ShardsConfig::default(),
            scripting: ScriptingConfig::default(),
            pubsub: PubSubConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        Self::from_toml_str(&contents).with_context(|| format!("Invalid config in '{path}'"))
    }

    /// Parses, resolves and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(contents).context("Failed to parse TOML configuration")?;
        config.shards.count = resolve_shard_count(config.shards.count);
        config.validate()?;
        Ok(config)
    }

    /// Validates the resolved configuration to ensure logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.shards.count > MAX_SHARDS {
            return Err(anyhow!(
                "shards.count cannot exceed {MAX_SHARDS} (got {})",
                self.shards.count
            ));
        }
        if self.pubsub.outbound_queue_warn_len == 0 {
            return Err(anyhow!("pubsub.outbound_queue_warn_len cannot be 0"));
        }
        if self.log_level.trim().is_empty() {
            return Err(anyhow!("log_level cannot be empty"));
        }
        if self.scripting.interpreters_per_shard == 0 {
            warn!("scripting.interpreters_per_shard is 0; every EVAL will build a fresh interpreter");
        }
        Ok(())
    }

    /// The number of shard threads to start.
    pub fn shard_count(&self) -> usize {
        resolve_shard_count(self.shards.count)
    }
}

/// Turns `0` into the host's available parallelism.
fn resolve_shard_count(configured: usize) -> usize {
    if configured != 0 {
        return configured;
    }
    let detected = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    info!("shards.count not set; using {} shards", detected);
    detected
}
