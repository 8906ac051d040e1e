//! Process configuration, read from environment variables.
//!
//! Durations accept either a bare number of seconds or a value with a unit
//! suffix (`250ms`, `20s`, `1m`).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use figment::Figment;
use figment::providers::Env;
use fundu::{DurationParser, TimeUnit};
use serde::{Deserialize, Deserializer};

use crate::matching::client::DEFAULT_ENDPOINT;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Postgres connection string. Without it the process keeps documents in memory.
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default = "default_gemini_endpoint")]
    pub gemini_endpoint: String,
    #[serde(
        default = "default_completion_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub completion_timeout: Duration,
    #[serde(
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub shutdown_timeout: Duration,
    /// JSON fixture of users and sessions applied at startup.
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_gemini_endpoint() -> String {
    DEFAULT_ENDPOINT.to_owned()
}

fn default_completion_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(8)
}

impl Config {
    /// Load from the process environment.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_figment(Figment::new().merge(Env::raw()))
    }

    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        figment.extract().context("Failed to load config")
    }

    /// The completion API key, if one is set and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.gemini_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

fn parse_duration(raw: &str) -> Result<Duration, String> {
    let parser = DurationParser::with_time_units(&[
        TimeUnit::MilliSecond,
        TimeUnit::Second,
        TimeUnit::Minute,
        TimeUnit::Hour,
    ]);
    let parsed = parser
        .parse(raw.trim())
        .map_err(|e| format!("invalid duration {raw:?}: {e}"))?;
    Duration::try_from(parsed).map_err(|e| format!("invalid duration {raw:?}: {e}"))
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}
