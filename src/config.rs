// Configuration File Support
//
// Gate limits are persisted as a JSON object with three integer fields:
// requests_per_minute, requests_per_hour and token_budget. An optional
// window_mode selects the sliding window limiter. Environment variables
// override file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::budget::DEFAULT_TOKEN_BUDGET;
use crate::rate_limit::config::{DEFAULT_REQUESTS_PER_HOUR, DEFAULT_REQUESTS_PER_MINUTE};
use crate::rate_limit::{RateLimitConfig, WindowMode};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "rate_limit_config.json";

/// Sliding windows keep one timestamp per request in the hour window
pub const MAX_SLIDING_REQUESTS_PER_HOUR: u64 = 1_000_000;

/// Environment variable names
pub const ENV_REQUESTS_PER_MINUTE: &str = "POLICY_GATE_REQUESTS_PER_MINUTE";
pub const ENV_REQUESTS_PER_HOUR: &str = "POLICY_GATE_REQUESTS_PER_HOUR";
pub const ENV_TOKEN_BUDGET: &str = "POLICY_GATE_TOKEN_BUDGET";
pub const ENV_WINDOW_MODE: &str = "POLICY_GATE_WINDOW_MODE";

/// Gate configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GateConfig {
    /// Max requests per minute per user
    pub requests_per_minute: u64,

    /// Max requests per hour per user
    pub requests_per_hour: u64,

    /// Token budget per user
    pub token_budget: u64,

    /// Window counting mode (omitted from the file when fixed)
    #[serde(skip_serializing_if = "WindowMode::is_fixed")]
    pub window_mode: WindowMode,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            requests_per_hour: DEFAULT_REQUESTS_PER_HOUR,
            token_budget: DEFAULT_TOKEN_BUDGET,
            window_mode: WindowMode::Fixed,
        }
    }
}

impl GateConfig {
    /// Create a fixed-window configuration
    pub fn new(requests_per_minute: u64, requests_per_hour: u64, token_budget: u64) -> Self {
        Self {
            requests_per_minute,
            requests_per_hour,
            token_budget,
            window_mode: WindowMode::Fixed,
        }
    }

    /// Rate limiter part of the configuration
    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig::new(self.requests_per_minute, self.requests_per_hour)
            .with_window_mode(self.window_mode)
    }

    /// Load configuration from a specific path
    ///
    /// A missing file yields the defaults. Environment overrides are applied
    /// and the result is validated either way.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or if
    /// the resulting configuration is invalid.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file from {:?}", path))?;

            let config: GateConfig = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file from {:?}", path))?;

            tracing::info!("Loaded configuration from {:?}", path);
            config
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            Self::default()
        };

        let config = config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Write configuration as pretty-printed JSON
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.validate()?;

        let content = self.to_json()?;
        fs::write(path, content + "\n")
            .with_context(|| format!("Failed to write config file to {:?}", path))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Pretty-printed JSON form
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Apply environment variable overrides
    ///
    /// - POLICY_GATE_REQUESTS_PER_MINUTE
    /// - POLICY_GATE_REQUESTS_PER_HOUR
    /// - POLICY_GATE_TOKEN_BUDGET
    /// - POLICY_GATE_WINDOW_MODE
    pub fn apply_env_overrides(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup; unparsable values are ignored
    pub fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(limit) = lookup(ENV_REQUESTS_PER_MINUTE).and_then(|v| v.parse().ok()) {
            self.requests_per_minute = limit;
        }
        if let Some(limit) = lookup(ENV_REQUESTS_PER_HOUR).and_then(|v| v.parse().ok()) {
            self.requests_per_hour = limit;
        }
        if let Some(budget) = lookup(ENV_TOKEN_BUDGET).and_then(|v| v.parse().ok()) {
            self.token_budget = budget;
        }
        if let Some(mode) = lookup(ENV_WINDOW_MODE) {
            match mode.parse() {
                Ok(mode) => self.window_mode = mode,
                Err(e) => tracing::warn!("Ignoring {}: {}", ENV_WINDOW_MODE, e),
            }
        }

        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.window_mode == WindowMode::Sliding
            && self.requests_per_hour > MAX_SLIDING_REQUESTS_PER_HOUR
        {
            anyhow::bail!(
                "Sliding window mode supports at most {} requests per hour, got {}",
                MAX_SLIDING_REQUESTS_PER_HOUR,
                self.requests_per_hour
            );
        }

        if self.requests_per_hour < self.requests_per_minute {
            tracing::debug!(
                "requests_per_hour ({}) is below requests_per_minute ({}); the hour limit binds",
                self.requests_per_hour,
                self.requests_per_minute
            );
        }

        Ok(())
    }
}
