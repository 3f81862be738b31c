//! HTTP client for the remote transit service.
//!
//! # Example
//!
//! ```no_run
//! use transit_core::{HttpTransitClient, ClientConfig, TransitClient};
//! use transit_types::Area;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpTransitClient::new(ClientConfig::default())?;
//!
//! let lines = client.lines(&Area::ALL).await?;
//! println!("{} lines", lines.len());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use tracing::debug;

use transit_types::{Area, LineKey, LineRecord, StopKey, StopRecord, TripBatch, TripRecord};

use crate::client::{TransitClient, TripWindow};
use crate::error::{Error, Result};
use crate::parse;

/// Default base URL of the service.
pub const DEFAULT_BASE_URL: &str = "https://app-tpl.tndigit.it/gtlservice";

/// Connection settings for [`HttpTransitClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL; endpoint paths are appended to it.
    pub base_url: String,
    /// HTTP basic auth user, if the deployment requires one.
    pub username: Option<String>,
    pub password: Option<String>,
    /// Timeout of a single request.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            username: None,
            password: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// [`TransitClient`] talking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransitClient {
    client: Client,
    base_url: String,
    credentials: Option<(String, Option<String>)>,
}

impl HttpTransitClient {
    /// Create a new client.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Http {
                url: config.base_url.clone(),
                source: e,
            })?;

        Self::with_client(config, client)
    }

    /// Create a client with a custom reqwest Client.
    pub fn with_client(config: ClientConfig, client: Client) -> Result<Self> {
        // Normalize URL (remove trailing slash)
        let base_url = config.base_url.trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::invalid_config(format!(
                "URL must start with http:// or https://, got: {}",
                base_url
            )));
        }

        let credentials = config.username.map(|user| (user, config.password));

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_text(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let url = self.url(path);
        debug!("GET {} {:?}", url, query);

        let mut request = self.client.get(&url).query(query);
        if let Some((user, password)) = &self.credentials {
            request = request.basic_auth(user, password.as_ref());
        }

        let response = request.send().await.map_err(|e| Error::Http {
            url: url.clone(),
            source: e,
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| Error::Http {
            url: url.clone(),
            source: e,
        })?;

        if status.is_success() {
            Ok(body)
        } else {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or_else(|| status.to_string());

            Err(Error::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

/// Query parameters shared by every trip listing.
fn trip_query(transport_type: &str, reference: &DateTime<Tz>) -> Vec<(&'static str, String)> {
    vec![
        ("type", transport_type.to_string()),
        (
            "refDateTime",
            reference
                .with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        ),
    ]
}

fn area_list(areas: &[Area]) -> String {
    areas
        .iter()
        .map(|a| a.code().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait]
impl TransitClient for HttpTransitClient {
    async fn stops(&self, limit: Option<usize>) -> Result<Vec<StopRecord>> {
        let query: Vec<(&str, String)> = limit
            .map(|n| vec![("size", n.to_string())])
            .unwrap_or_default();
        let body = self.get_text("stops", &query).await?;
        parse::parse_stops(&body)
    }

    async fn lines(&self, areas: &[Area]) -> Result<Vec<LineRecord>> {
        let body = self
            .get_text("routes", &[("areas", area_list(areas))])
            .await?;
        parse::parse_lines(&body)
    }

    async fn trips_by_stop(
        &self,
        stop: StopKey,
        reference: DateTime<Tz>,
        limit: usize,
    ) -> Result<Vec<TripRecord>> {
        let mut query = trip_query(stop.transport_type.code(), &reference);
        query.push(("stopId", stop.id.to_string()));
        query.push(("limit", limit.to_string()));

        let body = self.get_text("trips_new", &query).await?;
        parse::parse_trips(&body, &reference)
    }

    async fn trips_by_line(
        &self,
        line: LineKey,
        reference: DateTime<Tz>,
        window: TripWindow,
    ) -> Result<TripBatch> {
        let mut query = trip_query(line.transport_type.code(), &reference);
        query.push(("routeId", line.id.to_string()));
        match window {
            TripWindow::Nearest { limit } => query.push(("limit", limit.to_string())),
            TripWindow::IndexRange { from, to } => {
                query.push(("indiceDa", from.to_string()));
                query.push(("indiceA", to.to_string()));
            }
        }

        let body = self.get_text("trips_new", &query).await?;
        parse::parse_trip_batch(&body, &reference)
    }

    async fn trip_by_id(&self, trip_id: &str, reference: DateTime<Tz>) -> Result<TripRecord> {
        let body = self.get_text(&format!("trips/{trip_id}"), &[]).await?;
        parse::parse_trip(&body, &reference)
    }
}
