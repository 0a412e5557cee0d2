//! Run configuration.
//!
//! Values come from an optional TOML file, then `SENTIMENT_TRACKER_*`
//! environment variables, and are validated before use.

use serde::de::{value::StrDeserializer, DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{ConfigError, CoreError};
use crate::types::{CollectionWindow, DayCalendar, OrderingPolicy, PacerKind, RunMode};

const ENV_PREFIX: &str = "SENTIMENT_TRACKER_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub subreddit: String,
    pub window_days: u32,
    pub batch_size: usize,
    pub item_delay_ms: u64,
    pub batch_delay_ms: u64,
    pub store_path: PathBuf,
    pub series_path: Option<PathBuf>,
    pub user_agent: String,
    pub feed_base_url: String,
    pub fetch_limit: Option<usize>,
    pub ordering: OrderingPolicy,
    pub calendar: DayCalendar,
    pub mode: RunMode,
    pub snapshot_limit: usize,
    pub snapshot_path: PathBuf,
    pub pacer: PacerKind,
    /// Request budget for the token-bucket pacer.
    pub requests_per_minute: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            subreddit: "wallstreetbets".to_string(),
            window_days: 50,
            batch_size: 100,
            item_delay_ms: 1000,
            batch_delay_ms: 2000,
            store_path: PathBuf::from("reddit_posts.csv"),
            series_path: None,
            user_agent: "sentiment-tracker/0.1".to_string(),
            feed_base_url: "https://www.reddit.com".to_string(),
            fetch_limit: None,
            ordering: OrderingPolicy::EarlyStop,
            calendar: DayCalendar::Local,
            mode: RunMode::Windowed,
            snapshot_limit: 200,
            snapshot_path: PathBuf::from("reddit_snapshot.csv"),
            pacer: PacerKind::Fixed,
            requests_per_minute: 60,
        }
    }
}

impl TrackerConfig {
    /// Loads `path` if it exists, applies environment overrides and validates.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let mut config = if path.exists() {
            info!("Loading configuration from {}", path.display());
            Self::from_file(path)?
        } else {
            debug!(
                "No configuration file at {}, using defaults",
                path.display()
            );
            Self::default()
        };

        config.apply_overrides(|key| env::var(format!("{}{}", ENV_PREFIX, key)).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, CoreError> {
        let content = fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, CoreError> {
        let config: TrackerConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Applies overrides looked up by key suffix (`SUBREDDIT`, `BATCH_SIZE`, ...).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("SUBREDDIT") {
            self.subreddit = value;
        }
        if let Some(value) = lookup("WINDOW_DAYS") {
            self.window_days = parse_value("window_days", &value)?;
        }
        if let Some(value) = lookup("BATCH_SIZE") {
            self.batch_size = parse_value("batch_size", &value)?;
        }
        if let Some(value) = lookup("ITEM_DELAY_MS") {
            self.item_delay_ms = parse_value("item_delay_ms", &value)?;
        }
        if let Some(value) = lookup("BATCH_DELAY_MS") {
            self.batch_delay_ms = parse_value("batch_delay_ms", &value)?;
        }
        if let Some(value) = lookup("STORE_PATH") {
            self.store_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("SERIES_PATH") {
            self.series_path = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup("USER_AGENT") {
            self.user_agent = value;
        }
        if let Some(value) = lookup("FETCH_LIMIT") {
            self.fetch_limit = Some(parse_value("fetch_limit", &value)?);
        }
        if let Some(value) = lookup("MODE") {
            self.mode = parse_variant("mode", &value)?;
        }
        if let Some(value) = lookup("ORDERING") {
            self.ordering = parse_variant("ordering", &value)?;
        }
        if let Some(value) = lookup("CALENDAR") {
            self.calendar = parse_variant("calendar", &value)?;
        }
        if let Some(value) = lookup("FEED_BASE_URL") {
            self.feed_base_url = value;
        }
        if let Some(value) = lookup("SNAPSHOT_LIMIT") {
            self.snapshot_limit = parse_value("snapshot_limit", &value)?;
        }
        if let Some(value) = lookup("SNAPSHOT_PATH") {
            self.snapshot_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("PACER") {
            self.pacer = parse_variant("pacer", &value)?;
        }
        if let Some(value) = lookup("REQUESTS_PER_MINUTE") {
            self.requests_per_minute = parse_value("requests_per_minute", &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.subreddit.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "subreddit".to_string(),
            }
            .into());
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "batch_size".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        if self.mode == RunMode::Snapshot && self.snapshot_limit == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "snapshot_limit must be positive in snapshot mode".to_string(),
            }
            .into());
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "user_agent".to_string(),
            }
            .into());
        }
        if self.pacer == PacerKind::TokenBucket && self.requests_per_minute == 0 {
            return Err(ConfigError::InvalidValue {
                field: "requests_per_minute".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        self.window()?;
        Ok(())
    }

    /// The collection window ending today on the configured calendar.
    pub fn window(&self) -> Result<CollectionWindow, CoreError> {
        CollectionWindow::ending_on(self.calendar.today(), self.window_days).map_err(|_| {
            ConfigError::InvalidValue {
                field: "window_days".to_string(),
                value: self.window_days.to_string(),
            }
            .into()
        })
    }

    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

fn parse_value<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, CoreError> {
    value.trim().parse().map_err(|_| {
        ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        }
        .into()
    })
}

/// Parses a kebab-case enum name the same way the TOML file does.
fn parse_variant<T: DeserializeOwned>(field: &str, value: &str) -> Result<T, CoreError> {
    let deserializer: StrDeserializer<'_, serde::de::value::Error> =
        value.trim().into_deserializer();
    T::deserialize(deserializer).map_err(|_| {
        ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        }
        .into()
    })
}
