//! Configuration management for thaiflash

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::learning::DailyGoal;

/// How long feedback stays on screen before the next transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    /// After a correct answer, before the next card
    pub correct_ms: u64,
    /// After a miss on an item without a mnemonic, before the next card
    pub incorrect_ms: u64,
    /// After a miss, before the mnemonic question appears
    pub mnemonic_ms: u64,
    /// After a correct mnemonic answer, before the question is asked again
    pub retry_ms: u64,
    /// After a missed mnemonic answer, before the next card
    pub mnemonic_miss_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            correct_ms: 1000,
            incorrect_ms: 1500,
            mnemonic_ms: 800,
            retry_ms: 750,
            mnemonic_miss_ms: 1200,
        }
    }
}

impl Pacing {
    pub fn correct(&self) -> Duration {
        Duration::from_millis(self.correct_ms)
    }

    pub fn incorrect(&self) -> Duration {
        Duration::from_millis(self.incorrect_ms)
    }

    pub fn mnemonic(&self) -> Duration {
        Duration::from_millis(self.mnemonic_ms)
    }

    pub fn retry(&self) -> Duration {
        Duration::from_millis(self.retry_ms)
    }

    pub fn mnemonic_miss(&self) -> Duration {
        Duration::from_millis(self.mnemonic_miss_ms)
    }

    /// No delays at all
    pub fn instant() -> Self {
        Self { correct_ms: 0, incorrect_ms: 0, mnemonic_ms: 0, retry_ms: 0, mnemonic_miss_ms: 0 }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// What counts as a finished practice day
    pub daily_goal: DailyGoal,

    /// Feedback delays
    pub pacing: Pacing,

    /// Where progress records are stored (defaults to the platform data directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from disk, or create default if not exists
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config from {:?}", config_path))?;
            serde_json::from_str(&contents).with_context(|| "Failed to parse config.json")
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config to {:?}", config_path))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("", "", "thaiflash")
            .context("Failed to determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.json"))
    }

    /// Directory holding the progress records
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let proj_dirs =
            ProjectDirs::from("", "", "thaiflash").context("Failed to determine data directory")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }
}
