//! Command implementations for the CLI.
//!
//! Every command returns the text to print, so that it can be exercised
//! against a mock service.

mod dataset;
mod trips;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveTime, TimeZone};
use chrono_tz::Europe::Rome;
use chrono_tz::Tz;

use transit_core::datetime::to_rome;
use transit_core::{
    DatasetSynchronizer, FilePreferences, HttpTransitClient, RetryingClient, TransitClient,
};
use transit_store::Store;

use crate::config::Config;
use crate::format::FormatOptions;

pub use dataset::{cmd_line, cmd_lines, cmd_reload, cmd_search, cmd_status, cmd_stop};
pub use trips::{LineTripsArgs, cmd_line_trips, cmd_stop_trips};

/// Client used by the binary: HTTP with retries, shared by the synchronizer
/// and the trip caches.
pub type SharedClient = Arc<RetryingClient<HttpTransitClient>>;

/// Everything a command needs.
pub struct Session<C> {
    pub sync: DatasetSynchronizer<C>,
    pub client: C,
    pub opts: FormatOptions,
    pub json: bool,
    pub force_reload: bool,
}

impl<C: TransitClient + Clone> Session<C> {
    pub fn new(sync: DatasetSynchronizer<C>, client: C) -> Self {
        Self {
            sync,
            client,
            opts: FormatOptions::default(),
            json: false,
            force_reload: false,
        }
    }

    /// Render `value` as JSON when requested, as text otherwise.
    fn render<T: serde::Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<String> {
        if self.json {
            self.opts.as_json(value)
        } else {
            Ok(text())
        }
    }
}

/// Open the store and preferences and build the HTTP client from `config`.
pub fn connect(config: &Config, base_url: Option<&str>) -> Result<Session<SharedClient>> {
    let db_path = config.database_path();
    let store = Store::open(&db_path)
        .with_context(|| format!("Failed to open database: {}", db_path.display()))?;
    let prefs = FilePreferences::new(config.preferences_path());

    let http = HttpTransitClient::new(config.client_config(base_url))
        .context("Failed to create HTTP client")?;
    let client = Arc::new(RetryingClient::new(http, config.retry_config()));

    let sync = DatasetSynchronizer::new(Arc::clone(&client), store, prefs)
        .with_config(config.sync_config()?);

    Ok(Session::new(sync, client))
}

/// Parse a reference time: `HH:MM` on the day of `now`, or RFC 3339.
pub fn parse_reference(at: Option<&str>, now: DateTime<Tz>) -> Result<DateTime<Tz>> {
    let Some(raw) = at.map(str::trim) else {
        return Ok(now);
    };

    if let Ok(time) = NaiveTime::parse_from_str(raw, "%H:%M") {
        return Rome
            .from_local_datetime(&now.date_naive().and_time(time))
            .earliest()
            .with_context(|| format!("{raw} does not exist on {}", now.date_naive()));
    }

    let parsed = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Invalid time '{raw}', expected HH:MM or RFC 3339"))?;
    Ok(to_rome(&parsed))
}
