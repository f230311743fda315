use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Polling cadence of the engine loop.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 900;
/// Grace window applied to a task with no prior firing, preventing an
/// immediate spurious fire right after registration or a missed-slot reset.
pub const DEFAULT_FIRST_FIRE_GRACE_SECS: i64 = 5;

/// Scheduler timing knobs (metronome.toml + METRONOME_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Polling cadence in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Delay before the first tick, letting the rest of the process finish
    /// initializing. Shorter in debug builds, longer in release.
    #[serde(default = "default_startup_grace_secs")]
    pub startup_grace_secs: u64,
    /// Grace window for tasks with no prior firing.
    #[serde(default = "default_first_fire_grace_secs")]
    pub first_fire_grace_secs: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            startup_grace_secs: default_startup_grace_secs(),
            first_fire_grace_secs: default_first_fire_grace_secs(),
        }
    }
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

fn default_startup_grace_secs() -> u64 {
    if cfg!(debug_assertions) {
        5
    } else {
        10
    }
}

fn default_first_fire_grace_secs() -> i64 {
    DEFAULT_FIRST_FIRE_GRACE_SECS
}

impl SchedulerConfig {
    /// Load config from a TOML file with METRONOME_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.metronome/metronome.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: SchedulerConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("METRONOME_"))
            .extract()
            .map_err(|e| crate::error::SchedulerError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.metronome/metronome.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let c = SchedulerConfig::default();
        assert_eq!(c.tick_interval_ms, DEFAULT_TICK_INTERVAL_MS);
        assert_eq!(c.first_fire_grace_secs, DEFAULT_FIRST_FIRE_GRACE_SECS);
        assert!(c.startup_grace_secs >= 5);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        // Figment treats a missing TOML file as an empty provider, so every
        // field takes its serde default.
        let c = SchedulerConfig::load(Some("/nonexistent/metronome.toml")).unwrap();
        assert_eq!(c.tick_interval_ms, DEFAULT_TICK_INTERVAL_MS);
    }
}
