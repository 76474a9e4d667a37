//! Runtime configuration.
//!
//! Database credentials come from the environment (a `.env` file is loaded
//! first by the binary). Dashboard defaults can be overridden with a small
//! JSON file:
//! ```json
//! { "start_date": "2024-01-01", "end_date": "2024-12-31", "zoom": 12 }
//! ```

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::mysql::MySqlConnectOptions;

use crate::models::DateRange;

pub const DEFAULT_DB_PORT: u16 = 3306;
pub const DEFAULT_ZOOM: u8 = 12;

/// MySQL connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub port: u16,
}

impl DbConfig {
    /// Reads `DB_HOST`, `DB_USER`, `DB_PASSWORD`, `DB_NAME` and the optional
    /// `DB_PORT` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| anyhow!("{key} environment variable not set"))
        };

        let port = match lookup("DB_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("DB_PORT must be a valid port number, got `{raw}`"))?,
            None => DEFAULT_DB_PORT,
        };

        Ok(Self {
            host: required("DB_HOST")?,
            user: required("DB_USER")?,
            password: required("DB_PASSWORD")?,
            database: required("DB_NAME")?,
            port,
        })
    }

    pub fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }
}

/// Fallbacks used when the session has not picked a range yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardDefaults {
    pub date_range: DateRange,
    pub zoom: u8,
}

#[derive(Deserialize)]
struct DefaultsFile {
    start_date: NaiveDate,
    end_date: NaiveDate,
    zoom: Option<u8>,
}

impl DashboardDefaults {
    /// Loads defaults from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading config {path}"))?;
        let file: DefaultsFile =
            serde_json::from_str(&content).with_context(|| format!("parsing config {path}"))?;
        Ok(Self {
            date_range: DateRange::new(file.start_date, file.end_date)?,
            zoom: file.zoom.unwrap_or(DEFAULT_ZOOM),
        })
    }
}

impl Default for DashboardDefaults {
    fn default() -> Self {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date");
        let end = NaiveDate::from_ymd_opt(2024, 12, 31).expect("valid date");
        Self {
            date_range: DateRange::new(start, end).expect("ordered range"),
            zoom: DEFAULT_ZOOM,
        }
    }
}
