//! Reference dataset commands: reload, status, lines and stops.

use anyhow::{Result, anyhow};
use chrono::{TimeZone, Utc};
use tracing::warn;

use transit_core::datetime::to_rome;
use transit_core::{Preferences, TransitClient};
use transit_store::StopQuery;
use transit_types::{Area, LineKey, StopKey};

use super::Session;
use crate::format::{
    StatusView, format_line_text, format_lines_text, format_status_text, format_stop_text,
    format_stops_text,
};

/// Execute the reload command.
pub async fn cmd_reload<C: TransitClient + Clone>(session: &Session<C>) -> Result<String> {
    let summary = session.sync.reload().await?;

    session.render(&summary, || {
        let mut text = format!(
            "Reloaded {} lines ({} news items) and {} stops.\n",
            summary.lines, summary.news_items, summary.stops
        );
        if summary.skipped_associations > 0 {
            text.push_str(&format!(
                "Skipped {} stop/line links to unknown lines.\n",
                summary.skipped_associations
            ));
        }
        text
    })
}

/// Execute the status command.
pub async fn cmd_status<C: TransitClient + Clone>(session: &Session<C>) -> Result<String> {
    let prefs = session.sync.preferences();
    let last_reload_seconds = prefs.last_reload()?;
    let last_area_filter = prefs.last_area_filter()?;

    let status = StatusView {
        summary: session.sync.dataset_summary().await?,
        last_reload: last_reload_seconds
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .map(|at| to_rome(&at).fixed_offset()),
        preferences: Preferences {
            last_reload_seconds,
            last_area_filter: last_area_filter.map(|a| a.code()),
        },
    };

    session.render(&status, || format_status_text(&status))
}

/// Execute the line command.
pub async fn cmd_line<C: TransitClient + Clone>(session: &Session<C>, key: LineKey) -> Result<String> {
    let line = session
        .sync
        .line(key, session.force_reload)
        .await?
        .ok_or_else(|| anyhow!("Line {} not found", key))?;

    session.render(&line, || format_line_text(&line, &session.opts))
}

/// Execute the lines command.
///
/// An explicit area becomes the remembered filter; `--all` clears it; with
/// neither, the remembered filter applies.
pub async fn cmd_lines<C: TransitClient + Clone>(
    session: &Session<C>,
    area: Option<Area>,
    all: bool,
) -> Result<String> {
    let prefs = session.sync.preferences();
    let filter = if all || area.is_some() {
        if let Err(e) = prefs.set_last_area_filter(area) {
            warn!("Failed to remember area filter: {}", e);
        }
        area
    } else {
        prefs.last_area_filter()?
    };

    let lines = match filter {
        Some(area) => session.sync.lines_by_area(area, session.force_reload).await?,
        None => session.sync.all_lines(session.force_reload).await?,
    };

    session.render(&lines, || {
        let mut text = String::new();
        if let Some(area) = filter {
            text.push_str(&format!("Lines in {}:\n", area));
        }
        text.push_str(&format_lines_text(&lines, &session.opts));
        text
    })
}

/// Execute the stop command.
pub async fn cmd_stop<C: TransitClient + Clone>(session: &Session<C>, key: StopKey) -> Result<String> {
    let stop = session
        .sync
        .stop(key, session.force_reload)
        .await?
        .ok_or_else(|| anyhow!("Stop {} not found", key))?;
    let lines = session.sync.lines_for_stop(key, false).await?;

    session.render(&stop, || format_stop_text(&stop, &lines, &session.opts))
}

/// Execute the search command.
pub async fn cmd_search<C: TransitClient + Clone>(
    session: &Session<C>,
    text: Option<&str>,
    limit: u32,
    offset: u32,
) -> Result<String> {
    let mut query = StopQuery::new().limit(limit);
    if let Some(text) = text {
        query = query.text(text);
    }
    if offset > 0 {
        query = query.offset(offset);
    }

    let stops = session.sync.search_stops(&query, session.force_reload).await?;
    session.render(&stops, || format_stops_text(&stops, &session.opts))
}
