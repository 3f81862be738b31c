//! Freshness policy and atomic reload of the reference dataset.
//!
//! Lines and stops change rarely and the full dataset is large, so it is
//! fetched wholesale, persisted, and refreshed only when it is old enough:
//!
//! - older than [`SyncConfig::normal_interval`] (7 days): reload before reading
//! - older than [`SyncConfig::error_interval`] (1 day): reload only if the
//!   read fails or finds nothing, then read once more
//! - otherwise: read, and report whatever the read reports
//!
//! # Example
//!
//! ```no_run
//! use transit_core::{DatasetSynchronizer, HttpTransitClient, ClientConfig, MemoryPreferences};
//! use transit_store::Store;
//! use transit_types::{LineKey, TransportType};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpTransitClient::new(ClientConfig::default())?;
//! let sync = DatasetSynchronizer::new(client, Store::open_default()?, MemoryPreferences::new());
//!
//! let line = sync.line(LineKey::new(5, TransportType::Urban), false).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use transit_store::{DatasetSummary, StopQuery, Store};
use transit_types::{Area, LineKey, LineRecord, NewsItem, StopKey, StopRecord};

use crate::client::TransitClient;
use crate::error::Result;
use crate::prefs::PreferenceStore;

/// Source of the current time, replaceable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Freshness thresholds and the areas a reload covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Age after which the dataset is reloaded before any read.
    pub normal_interval: Duration,
    /// Age after which a failed or empty read triggers a reload.
    pub error_interval: Duration,
    /// Areas whose lines are fetched on reload.
    pub areas: Vec<Area>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            normal_interval: Duration::from_secs(7 * 24 * 60 * 60),
            error_interval: Duration::from_secs(24 * 60 * 60),
            areas: Area::ALL.to_vec(),
        }
    }
}

/// What the freshness policy decides before the first read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Reload before reading.
    Expired,
    /// Read first; reload and read again if that fails or finds nothing.
    Stale,
    /// Read and report the outcome as is.
    Fresh,
}

impl SyncConfig {
    /// Classify a dataset of the given age in seconds.
    ///
    /// A negative age means the clock moved backwards; the dataset is treated
    /// as expired.
    pub fn freshness(&self, elapsed_seconds: i64) -> Freshness {
        let normal = i64::try_from(self.normal_interval.as_secs()).unwrap_or(i64::MAX);
        let error = i64::try_from(self.error_interval.as_secs()).unwrap_or(i64::MAX);

        if elapsed_seconds < 0 || elapsed_seconds >= normal {
            Freshness::Expired
        } else if elapsed_seconds >= error {
            Freshness::Stale
        } else {
            Freshness::Fresh
        }
    }
}

/// Guards reads of the reference dataset with the freshness policy.
pub struct DatasetSynchronizer<C> {
    client: C,
    store: Mutex<Store>,
    prefs: Box<dyn PreferenceStore>,
    clock: Arc<dyn Clock>,
    config: SyncConfig,
}

impl<C> std::fmt::Debug for DatasetSynchronizer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetSynchronizer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<C: TransitClient> DatasetSynchronizer<C> {
    /// Create a synchronizer using the system clock and default intervals.
    pub fn new(client: C, store: Store, prefs: impl PreferenceStore + 'static) -> Self {
        Self {
            client,
            store: Mutex::new(store),
            prefs: Box::new(prefs),
            clock: Arc::new(SystemClock),
            config: SyncConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn preferences(&self) -> &dyn PreferenceStore {
        self.prefs.as_ref()
    }

    /// Seconds since the last successful reload; an unknown or unreadable
    /// reload time counts as the Unix epoch.
    pub fn elapsed_since_reload(&self) -> Result<i64> {
        let last = match self.prefs.last_reload() {
            Ok(last) => last.unwrap_or(0),
            Err(e) => {
                warn!("Cannot read last reload time, assuming none: {}", e);
                0
            }
        };
        Ok(self.clock.now().timestamp() - last)
    }

    /// Run `read` against the store under the freshness policy.
    ///
    /// `Ok(None)` from `read` means "not found". It is never turned into an
    /// error here, but on a stale dataset it triggers the same reload and
    /// second read as a failure does.
    pub async fn run_guarded<T, F>(&self, force_reload: bool, read: F) -> Result<Option<T>>
    where
        F: Fn(&Store) -> transit_store::Result<Option<T>>,
    {
        if force_reload {
            debug!("Reload forced by caller");
            self.reload().await?;
            return self.read(&read).await;
        }

        let elapsed = self.elapsed_since_reload()?;
        let freshness = self.config.freshness(elapsed);

        if freshness == Freshness::Expired {
            debug!("Reference dataset expired ({}s old)", elapsed);
            self.reload().await?;
            return self.read(&read).await;
        }

        match self.read(&read).await {
            Ok(Some(value)) => Ok(Some(value)),
            outcome if freshness == Freshness::Stale => {
                match &outcome {
                    Ok(_) => debug!("Nothing found in {}s old dataset, reloading", elapsed),
                    Err(e) => debug!("Read failed on {}s old dataset ({}), reloading", elapsed, e),
                }
                self.reload().await?;
                self.read(&read).await
            }
            outcome => outcome,
        }
    }

    async fn read<T, F>(&self, read: &F) -> Result<Option<T>>
    where
        F: Fn(&Store) -> transit_store::Result<Option<T>>,
    {
        let store = self.store.lock().await;
        Ok(read(&store)?)
    }

    /// Fetch the whole dataset and replace the stored one in one transaction.
    ///
    /// Lines and stops are fetched concurrently. Nothing is written unless
    /// both fetches succeed, and a failed transaction leaves the previous
    /// dataset in place. The reload timestamp is persisted after the commit;
    /// failing to persist it only costs an extra reload later.
    pub async fn reload(&self) -> Result<DatasetSummary> {
        info!("Reloading lines and stops from network");

        let (lines, stops) = tokio::try_join!(
            self.client.lines(&self.config.areas),
            self.client.stops(None)
        )?;

        let summary = {
            let mut store = self.store.lock().await;
            store.replace_dataset(&lines, &stops)?
        };

        let now = self.clock.now().timestamp();
        if let Err(e) = self.prefs.set_last_reload(now) {
            warn!("Failed to persist reload timestamp: {}", e);
        }

        Ok(summary)
    }

    /// Row counts of the stored dataset, without any freshness check.
    pub async fn dataset_summary(&self) -> Result<DatasetSummary> {
        Ok(self.store.lock().await.dataset_summary()?)
    }
}

// Lookups
impl<C: TransitClient> DatasetSynchronizer<C> {
    /// A line with its news items.
    pub async fn line(&self, key: LineKey, force_reload: bool) -> Result<Option<LineRecord>> {
        self.run_guarded(force_reload, |store| store.get_line(key))
            .await
    }

    /// A stop with the keys of the lines serving it.
    pub async fn stop(&self, key: StopKey, force_reload: bool) -> Result<Option<StopRecord>> {
        self.run_guarded(force_reload, |store| store.get_stop(key))
            .await
    }

    /// Every stored line; an empty store counts as "nothing found".
    pub async fn all_lines(&self, force_reload: bool) -> Result<Vec<LineRecord>> {
        self.run_guarded(force_reload, |store| {
            store.all_lines().map(non_empty)
        })
        .await
        .map(Option::unwrap_or_default)
    }

    /// Lines of one area; no line in the area counts as "nothing found".
    pub async fn lines_by_area(&self, area: Area, force_reload: bool) -> Result<Vec<LineRecord>> {
        self.run_guarded(force_reload, |store| {
            store.lines_by_area(area).map(non_empty)
        })
        .await
        .map(Option::unwrap_or_default)
    }

    /// Lines serving a stop.
    pub async fn lines_for_stop(
        &self,
        key: StopKey,
        force_reload: bool,
    ) -> Result<Vec<LineRecord>> {
        self.run_guarded(force_reload, |store| store.lines_for_stop(key).map(Some))
            .await
            .map(Option::unwrap_or_default)
    }

    /// News attached to a line.
    pub async fn news_for_line(&self, key: LineKey, force_reload: bool) -> Result<Vec<NewsItem>> {
        self.run_guarded(force_reload, |store| store.news_for_line(key).map(Some))
            .await
            .map(Option::unwrap_or_default)
    }

    /// Ranked stop search, see [`StopQuery`].
    pub async fn search_stops(
        &self,
        query: &StopQuery,
        force_reload: bool,
    ) -> Result<Vec<StopRecord>> {
        self.run_guarded(force_reload, |store| store.search_stops(query).map(Some))
            .await
            .map(Option::unwrap_or_default)
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() { None } else { Some(items) }
}
