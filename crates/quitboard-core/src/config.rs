//! TOML application configuration.
//!
//! Stored at `~/.config/quitboard/config.toml`; every field carries a
//! serde default so a partial file (or none at all) still yields a
//! working configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::scheduler::Trigger;
use crate::transport::{Destination, SubDestination};

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Group chat the leaderboard is published into.
    #[serde(default)]
    pub destination: i64,
    /// Optional topic/thread inside the destination.
    #[serde(default)]
    pub topic: Option<i64>,
    /// Daily publish time (hour, UTC).
    #[serde(default = "default_post_hour")]
    pub post_hour: u32,
    /// Daily publish time (minute).
    #[serde(default)]
    pub post_minute: u32,
    /// Rows shown on the published board.
    #[serde(default = "default_leaderboard_limit")]
    pub leaderboard_limit: usize,
    /// Database file; defaults to `quitboard.db` in the data dir.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// Fixed-interval override for the scheduler, in seconds.
    /// Meant for accelerated testing; absent in normal operation.
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

fn default_post_hour() -> u32 {
    9
}

fn default_leaderboard_limit() -> usize {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            destination: 0,
            topic: None,
            post_hour: default_post_hour(),
            post_minute: 0,
            leaderboard_limit: default_leaderboard_limit(),
            database_path: None,
            interval_secs: None,
        }
    }
}

impl Config {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the rest of the engine would otherwise have to
    /// paper over, notably a post time that names no real wall-clock
    /// instant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.post_hour > 23 || self.post_minute > 59 {
            return Err(ConfigError::InvalidPostTime {
                hour: self.post_hour,
                minute: self.post_minute,
            });
        }
        Ok(())
    }

    pub fn destination(&self) -> Destination {
        Destination(self.destination)
    }

    pub fn sub_destination(&self) -> SubDestination {
        SubDestination(self.topic)
    }

    /// Recurring trigger derived from the configuration: a fixed
    /// interval when `interval_secs` is set, the daily time otherwise.
    pub fn trigger(&self) -> Trigger {
        match self.interval_secs {
            Some(secs) => Trigger::Every(std::time::Duration::from_secs(secs)),
            None => Trigger::Daily {
                hour: self.post_hour,
                minute: self.post_minute,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.post_hour, 9);
        assert_eq!(config.post_minute, 0);
        assert_eq!(config.leaderboard_limit, 10);
        assert!(config.interval_secs.is_none());
    }

    #[test]
    fn interval_override_switches_trigger() {
        let config: Config = toml::from_str("interval_secs = 30").unwrap();
        assert!(matches!(config.trigger(), Trigger::Every(d) if d.as_secs() == 30));

        let daily: Config = toml::from_str("post_hour = 7\npost_minute = 30").unwrap();
        assert!(matches!(daily.trigger(), Trigger::Daily { hour: 7, minute: 30 }));
    }

    #[test]
    fn out_of_range_post_time_rejects_at_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "post_hour = 24\n").unwrap();

        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::InvalidPostTime { hour: 24, minute: 0 })
        ));

        std::fs::write(&path, "post_minute = 90\n").unwrap();
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::InvalidPostTime { minute: 90, .. })
        ));
    }

    #[test]
    fn load_parses_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "destination = -100123\nleaderboard_limit = 5\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.destination, -100123);
        assert_eq!(config.leaderboard_limit, 5);
    }
}
