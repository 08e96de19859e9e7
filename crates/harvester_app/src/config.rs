//! RON configuration for the harvester binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use harvester_engine::{ConsolidateOptions, FetchSettings, HarvestSettings, DEFAULT_BASE_URL};
use serde::Deserialize;

/// Everything a run needs besides the clock. Only `queries` is mandatory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarvestConfig {
    pub queries: Vec<String>,
    #[serde(default = "default_epoch_start")]
    pub epoch_start: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_records")]
    pub max_records: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_rate_limit_backoff_secs")]
    pub rate_limit_backoff_secs: u64,
    #[serde(default = "default_retry_wait_secs")]
    pub retry_wait_secs: u64,
    #[serde(default = "default_pause_secs")]
    pub pause_secs: u64,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,
    #[serde(default = "default_focus_language")]
    pub focus_language: Option<String>,
}

fn default_epoch_start() -> String {
    "2017-01-01".to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_max_records() -> u32 {
    250
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    4
}

fn default_rate_limit_backoff_secs() -> u64 {
    35
}

fn default_retry_wait_secs() -> u64 {
    15
}

fn default_pause_secs() -> u64 {
    10
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("data/raw/gdelt_harvest")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/staging")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("data/logs")
}

fn default_output_prefix() -> String {
    "gdelt_news".to_string()
}

fn default_focus_language() -> Option<String> {
    Some("Spanish".to_string())
}

impl HarvestConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = ron::from_str(content)?;
        if config.max_attempts == 0 {
            anyhow::bail!("max_attempts must be at least 1");
        }
        Ok(config)
    }

    /// Start of the first window, midnight UTC of `epoch_start`.
    pub fn epoch_start(&self) -> Result<DateTime<Utc>> {
        let day = NaiveDate::parse_from_str(&self.epoch_start, "%Y-%m-%d")
            .with_context(|| format!("invalid epoch_start {:?}", self.epoch_start))?;
        day.and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc())
            .with_context(|| format!("invalid epoch_start {:?}", self.epoch_start))
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            base_url: self.base_url.clone(),
            max_records: self.max_records,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_attempts: self.max_attempts,
            rate_limit_backoff: Duration::from_secs(self.rate_limit_backoff_secs),
            retry_wait: Duration::from_secs(self.retry_wait_secs),
        }
    }

    /// Orchestrator settings; consolidated files are named `{output_prefix}_{run_stamp}`.
    pub fn harvest_settings(&self, run_stamp: &str) -> HarvestSettings {
        HarvestSettings {
            inter_unit_pause: Duration::from_secs(self.pause_secs),
            focus_language: self.focus_language.clone(),
            consolidate: Some(ConsolidateOptions {
                output_dir: self.output_dir.clone(),
                file_stem: format!("{}_{}", self.output_prefix, run_stamp),
                focus_language: self.focus_language.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn queries_alone_take_every_default() {
        let config = HarvestConfig::parse(r#"(queries: ["flood peru", "frost peru"])"#).unwrap();

        assert_eq!(config.queries, vec!["flood peru", "frost peru"]);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.max_records, 250);
        assert_eq!(config.pause_secs, 10);
        assert_eq!(config.cache_dir, PathBuf::from("data/raw/gdelt_harvest"));
        assert_eq!(config.focus_language.as_deref(), Some("Spanish"));
        assert_eq!(
            config.epoch_start().unwrap(),
            Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap()
        );

        let fetch = config.fetch_settings();
        let defaults = FetchSettings::default();
        assert_eq!(fetch.max_attempts, defaults.max_attempts);
        assert_eq!(fetch.rate_limit_backoff, defaults.rate_limit_backoff);
        assert_eq!(fetch.retry_wait, defaults.retry_wait);
        assert_eq!(fetch.request_timeout, defaults.request_timeout);
    }

    #[test]
    fn overrides_flow_into_settings() {
        let config = HarvestConfig::parse(
            r#"(
                queries: ["drought peru"],
                epoch_start: "2020-04-01",
                pause_secs: 2,
                output_prefix: "news",
                focus_language: None,
            )"#,
        )
        .unwrap();

        let settings = config.harvest_settings("20260221");
        assert_eq!(settings.inter_unit_pause, Duration::from_secs(2));
        assert_eq!(settings.focus_language, None);
        let consolidate = settings.consolidate.unwrap();
        assert_eq!(consolidate.file_stem, "news_20260221");
        assert_eq!(consolidate.output_dir, PathBuf::from("data/staging"));
    }

    #[test]
    fn rejects_missing_queries_and_unknown_fields() {
        assert!(HarvestConfig::parse("(pause_secs: 1)").is_err());
        assert!(HarvestConfig::parse(r#"(queries: ["a"], pause: 1)"#).is_err());
        assert!(HarvestConfig::parse(r#"(queries: ["a"], max_attempts: 0)"#).is_err());
    }

    #[test]
    fn invalid_epoch_is_reported() {
        let config = HarvestConfig::parse(r#"(queries: ["a"], epoch_start: "2017-13-01")"#).unwrap();
        let err = config.epoch_start().unwrap_err();
        assert!(format!("{err:#}").contains("2017-13-01"));
    }

    #[test]
    fn load_names_the_file_on_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("harvest.ron");

        let missing = HarvestConfig::load(&path).unwrap_err();
        assert!(format!("{missing:#}").contains("harvest.ron"));

        fs::write(&path, r#"(queries: ["flood peru"])"#).unwrap();
        assert_eq!(HarvestConfig::load(&path).unwrap().queries, vec!["flood peru"]);
    }
}
