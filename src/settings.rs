// src/settings.rs
//! Explicit settings passed into every component at construction.
//!
//! Resolution: `$TOPIC_ARCHIVE_CONFIG_PATH`, else `config/topic_archive.toml`; a missing file
//! means defaults. `TOPIC_HISTORY_DAYS` / `TOPIC_HISTORY_MAX_TOKENS` override the history block.

use anyhow::Context;
use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/topic_archive.toml";
pub const ENV_CONFIG_PATH: &str = "TOPIC_ARCHIVE_CONFIG_PATH";
pub const ENV_HISTORY_DAYS: &str = "TOPIC_HISTORY_DAYS";
pub const ENV_HISTORY_MAX_TOKENS: &str = "TOPIC_HISTORY_MAX_TOKENS";
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 8;

fn default_topics_file() -> PathBuf {
    PathBuf::from("config/topics.yaml")
}
fn default_archive_dir() -> PathBuf {
    PathBuf::from("output/topics")
}
fn default_timeline_dir() -> PathBuf {
    PathBuf::from("index")
}
fn default_feed_dir() -> PathBuf {
    PathBuf::from("output/news")
}
fn default_utc_offset_hours() -> i32 {
    DEFAULT_UTC_OFFSET_HOURS
}
fn default_days() -> u32 {
    7
}
fn default_max_tokens() -> usize {
    3000
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistorySettings {
    #[serde(default = "default_days")]
    pub days: u32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            days: default_days(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    #[serde(default = "default_topics_file")]
    pub topics_file: PathBuf,
    #[serde(default = "default_archive_dir")]
    pub archive_dir: PathBuf,
    /// Legacy timeline output.
    #[serde(default = "default_timeline_dir")]
    pub timeline_dir: PathBuf,
    /// Raw feed databases (`YYYY-MM-DD.db`).
    #[serde(default = "default_feed_dir")]
    pub feed_dir: PathBuf,
    /// Offset used to decide "today".
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    #[serde(default)]
    pub history: HistorySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            topics_file: default_topics_file(),
            archive_dir: default_archive_dir(),
            timeline_dir: default_timeline_dir(),
            feed_dir: default_feed_dir(),
            utc_offset_hours: default_utc_offset_hours(),
            history: HistorySettings::default(),
        }
    }
}

// parse a positive integer env value; anything else is ignored
fn parse_positive<T: std::str::FromStr + PartialOrd + From<u8>>(raw: Option<String>) -> Option<T> {
    raw.and_then(|s| s.trim().parse::<T>().ok())
        .filter(|v| *v >= T::from(1))
}

impl Settings {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let mut settings: Settings = toml::from_str(s)?;
        if !(-12..=14).contains(&settings.utc_offset_hours) {
            warn!(
                offset = settings.utc_offset_hours,
                "utc_offset_hours out of range, using default"
            );
            settings.utc_offset_hours = default_utc_offset_hours();
        }
        Ok(settings)
    }

    /// Load from an explicit path. Missing file → defaults; malformed file → error.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing settings at {}", path.display()))
    }

    /// Load using env var + fallback path, then apply env overrides.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut settings = Self::load_from(&path)?;
        settings.apply_env_overrides();
        Ok(settings)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(days) = parse_positive::<u32>(std::env::var(ENV_HISTORY_DAYS).ok()) {
            self.history.days = days;
        }
        if let Some(t) = parse_positive::<usize>(std::env::var(ENV_HISTORY_MAX_TOKENS).ok()) {
            self.history.max_tokens = t;
        }
    }

    pub fn today(&self) -> NaiveDate {
        today_at_offset(self.utc_offset_hours)
    }
}

/// Current calendar date at a fixed UTC offset (hours); invalid offsets fall back to UTC.
pub fn today_at_offset(hours: i32) -> NaiveDate {
    let offset = FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix());
    Utc::now().with_timezone(&offset).date_naive()
}
