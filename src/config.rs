//! Engine configuration

use crate::runtime::debug::DebugConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Runtime tunables
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Scheduling configuration
    pub scheduler: SchedulerConfig,
    /// Combat configuration
    pub combat: CombatConfig,
    /// Player limits
    pub player: PlayerConfig,
    /// Map geometry
    pub map: MapConfig,
    /// Seed for scripted random values; entropy seeded when absent
    pub rng_seed: Option<u64>,
    /// Debug logging
    pub debug: DebugConfig,
}

/// Scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Commands each instance may execute per tick
    pub commands_per_tick: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            commands_per_tick: 1,
        }
    }
}

/// Combat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// How long a player stays in combat after scripted damage
    pub combat_time_ms: u64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            combat_time_ms: 10_000,
        }
    }
}

/// Player limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub inventory_slots: usize,
    pub spellbook_size: usize,
    pub max_level: i32,
    pub stat_points_per_level: i64,
    pub min_name_length: usize,
    pub max_name_length: usize,
    pub min_guild_name_length: usize,
    pub max_guild_name_length: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            inventory_slots: 35,
            spellbook_size: 35,
            max_level: 100,
            stat_points_per_level: 1,
            min_name_length: 2,
            max_name_length: 20,
            min_guild_name_length: 3,
            max_guild_name_length: 24,
        }
    }
}

/// Map geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub width: i32,
    pub height: i32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 32,
            height: 26,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file, then apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let mut config: EngineConfig = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `EVENTWEAVE_*` environment overrides
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        if std::env::var_os("EVENTWEAVE_DEBUG").is_some() {
            self.debug.enabled = true;
        }
        if let Ok(value) = std::env::var("EVENTWEAVE_COMMANDS_PER_TICK") {
            self.scheduler.commands_per_tick = value
                .trim()
                .parse()
                .with_context(|| format!("EVENTWEAVE_COMMANDS_PER_TICK is not a number: {value}"))?;
        }
        Ok(())
    }
}
