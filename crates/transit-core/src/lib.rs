//! Synchronization and caching layer for a regional transit information
//! service.
//!
//! This crate sits between a slow, occasionally unreliable HTTP/JSON backend
//! and the code that displays lines, stops and live trips.
//!
//! # Features
//!
//! - **Reference dataset synchronizer**: lines and stops are persisted locally
//!   and reloaded wholesale, atomically, when they get old or when a lookup on
//!   aging data fails ([`DatasetSynchronizer`])
//! - **Trip window caches**: per line and day sparse trip maps filled by small
//!   range-bounded fetches, and per stop trip lists ([`LineTripsCache`],
//!   [`StopTripsCache`])
//! - **Hydration**: trips are resolved against the reference dataset when
//!   read ([`Hydrator`])
//! - **Retrying fetch**: every remote call is retried with linear backoff
//!   ([`with_retry`], [`RetryingClient`])
//! - **Mock service**: [`MockTransitClient`] for tests
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use transit_core::{
//!     ClientConfig, DatasetSynchronizer, FilePreferences, HttpTransitClient, LineTripsCache,
//!     RetryConfig, RetryingClient, datetime,
//! };
//! use transit_store::Store;
//! use transit_types::{Direction, LineKey, TransportType};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let http = HttpTransitClient::new(ClientConfig::default())?;
//!     let client = Arc::new(RetryingClient::new(http, RetryConfig::default()));
//!
//!     let sync = DatasetSynchronizer::new(
//!         Arc::clone(&client),
//!         Store::open_default()?,
//!         FilePreferences::new(FilePreferences::default_path()),
//!     );
//!     let mut trips = LineTripsCache::new(Arc::clone(&client));
//!
//!     let line = LineKey::new(5, TransportType::Urban);
//!     let near = trips
//!         .trip_near(line, datetime::rome_now(), Direction::ForwardAndBackward)
//!         .await?;
//!     println!("{} trips today", near.total);
//!
//!     if let Some(record) = sync.line(line, false).await? {
//!         println!("Line {}: {}", record.short_name, record.long_name);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod datetime;
pub mod error;
pub mod http;
pub mod hydrate;
pub mod mock;
pub mod parse;
pub mod prefs;
pub mod retry;
pub mod sync;
pub mod trips;

// Re-export the record types for convenience
pub use transit_types as types;

// Core exports
pub use cache::{Merge, SessionCache};
pub use client::{TransitClient, TripWindow};
pub use error::{Error, Result};
pub use http::{ClientConfig, DEFAULT_BASE_URL, HttpTransitClient};
pub use hydrate::{HydratedStopTime, HydratedTrip, Hydrator};
pub use mock::{ManualClock, MockCall, MockTransitClient};
pub use prefs::{FilePreferences, MemoryPreferences, PreferenceStore, Preferences};
pub use retry::{RetryConfig, RetryingClient, with_retry};
pub use sync::{Clock, DatasetSynchronizer, Freshness, SyncConfig, SystemClock};
pub use trips::{
    DayTripIndex, DirectedTrip, LINE_TRIPS_BATCH_SIZE, LineTripsCache, STOP_TRIPS_LIMIT,
    StopTripWindow, StopTripsCache, TripNear,
};
