// Configuration module for reading Snake.toml
// This module provides OOP-style configuration management for the Battlesnake bot

use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Main configuration structure containing all tunable parameters
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub timing: TimingConfig,
    pub search: SearchConfig,
    pub threat: ThreatConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    pub debug: DebugConfig,
}

/// Timing and performance constants
#[derive(Debug, Deserialize, Clone)]
pub struct TimingConfig {
    pub response_time_budget_ms: u64,
    pub network_overhead_ms: u64,
}

impl TimingConfig {
    /// Computes the effective computation budget
    pub fn effective_budget_ms(&self) -> u64 {
        self.response_time_budget_ms.saturating_sub(self.network_overhead_ms)
    }
}

/// A* search constants
#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Frontier pops allowed per episode before the search settles for the current node
    pub max_expansions: usize,
    /// Heuristic value reported when the board has no food
    pub no_food_heuristic: u32,
}

/// Head-to-head threat prediction constants
#[derive(Debug, Deserialize, Clone)]
pub struct ThreatConfig {
    pub enabled: bool,
    /// Upper bound on rival searches per turn
    pub max_rivals: usize,
}

/// Random fallback settings
#[derive(Debug, Deserialize, Clone, Default)]
pub struct FallbackConfig {
    /// When set, each turn's rng is seeded with `rng_seed ^ turn`
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

/// Debug configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DebugConfig {
    pub enabled: bool,
    pub log_file_path: String,
}

impl Config {
    /// Loads configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the Snake.toml configuration file
    ///
    /// # Returns
    /// * `Result<Config, String>` - Parsed configuration or error message
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        Self::from_toml_str(&contents)
    }

    /// Parses configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, String> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads default configuration from Snake.toml in the project root
    pub fn load_default() -> Result<Self, String> {
        Self::from_file("Snake.toml")
    }

    /// Creates a configuration with hardcoded default values as fallback
    /// This should match the constants defined in Snake.toml
    pub fn default_hardcoded() -> Self {
        Config {
            timing: TimingConfig {
                response_time_budget_ms: 400,
                network_overhead_ms: 50,
            },
            search: SearchConfig {
                max_expansions: 2500,
                no_food_heuristic: 9999,
            },
            threat: ThreatConfig {
                enabled: true,
                max_rivals: 3,
            },
            fallback: FallbackConfig { rng_seed: None },
            debug: DebugConfig {
                enabled: false,
                log_file_path: "battlesnake_debug.jsonl".to_string(),
            },
        }
    }

    /// Attempts to load from file, falls back to hardcoded defaults on error
    pub fn load_or_default() -> Self {
        Self::load_default().unwrap_or_else(|e| {
            log::warn!("Could not load Snake.toml ({}), using hardcoded defaults", e);
            Self::default_hardcoded()
        })
    }

    fn validate(&self) -> Result<(), String> {
        if self.search.max_expansions == 0 {
            return Err("search.max_expansions must be positive".to_string());
        }
        if self.timing.effective_budget_ms() == 0 {
            return Err("timing budget is consumed entirely by network overhead".to_string());
        }
        Ok(())
    }
}
