//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use transit_types::{Area, Direction, LineKey, StopKey, TransportType};

/// Network a line or stop id belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Network {
    /// City buses
    #[default]
    Urban,
    /// Extra-urban buses, trains and cableways
    Suburban,
}

impl From<Network> for TransportType {
    fn from(network: Network) -> Self {
        match network {
            Network::Urban => TransportType::Urban,
            Network::Suburban => TransportType::Suburban,
        }
    }
}

/// Direction filter for line trips
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    Forward,
    Backward,
    #[default]
    Both,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Forward => Direction::Forward,
            DirectionArg::Backward => Direction::Backward,
            DirectionArg::Both => Direction::ForwardAndBackward,
        }
    }
}

/// Reusable line identity arguments
#[derive(Debug, Clone, Args)]
pub struct LineArgs {
    /// Line id
    pub id: i64,

    /// Network of the line
    #[arg(short, long, value_enum, default_value = "urban")]
    pub network: Network,
}

impl LineArgs {
    pub fn key(&self) -> LineKey {
        LineKey::new(self.id, self.network.into())
    }
}

/// Reusable stop identity arguments
#[derive(Debug, Clone, Args)]
pub struct StopArgs {
    /// Stop id
    pub id: i64,

    /// Network of the stop
    #[arg(short, long, value_enum, default_value = "urban")]
    pub network: Network,
}

impl StopArgs {
    pub fn key(&self) -> StopKey {
        StopKey::new(self.id, self.network.into())
    }
}

#[derive(Parser)]
#[command(name = "transit")]
#[command(author, version, about = "CLI for the regional transit information service", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Output compact JSON (no pretty-printing)
    #[arg(long, global = true)]
    pub compact: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, env = "TRANSIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Service base URL, overriding the configuration file
    #[arg(long, global = true, env = "TRANSIT_BASE_URL")]
    pub base_url: Option<String>,

    /// Reload lines and stops before answering
    #[arg(long, global = true)]
    pub force_reload: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download lines and stops and replace the local copy
    Reload,

    /// Show the local dataset and when it was last reloaded
    Status,

    /// Show a line and its news
    Line {
        #[command(flatten)]
        line: LineArgs,
    },

    /// List lines
    Lines {
        /// Area code to filter by (remembered for the next call)
        #[arg(short, long, value_parser = parse_area, conflicts_with = "all")]
        area: Option<Area>,

        /// Show every area and forget the remembered filter
        #[arg(long)]
        all: bool,
    },

    /// Show a stop and the lines serving it
    Stop {
        #[command(flatten)]
        stop: StopArgs,
    },

    /// Search stops by name, street or town
    Search {
        /// Text to look for; without it stops are ranked by lines served
        text: Option<String>,

        /// Maximum number of results
        #[arg(short, long, default_value = "20")]
        limit: u32,

        /// Results to skip
        #[arg(long, default_value = "0")]
        offset: u32,
    },

    /// Show a trip of a line, with live delay when available
    LineTrips {
        #[command(flatten)]
        line: LineArgs,

        /// Reference time, `HH:MM` today or RFC 3339 (defaults to now)
        #[arg(long)]
        at: Option<String>,

        /// Position of the trip in the day instead of the closest one
        #[arg(short, long)]
        index: Option<usize>,

        /// Only consider trips running in this direction
        #[arg(short, long, value_enum, default_value = "both")]
        direction: DirectionArg,

        /// Refresh the shown trip's live status
        #[arg(long)]
        refresh: bool,
    },

    /// Show the next trips at a stop
    StopTrips {
        #[command(flatten)]
        stop: StopArgs,

        /// Reference time, `HH:MM` today or RFC 3339 (defaults to now)
        #[arg(long)]
        at: Option<String>,

        /// Refresh the live status of the trip at this position
        #[arg(long)]
        refresh: Option<usize>,
    },

    /// Show the configuration in use
    Config,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Parse an area from its numeric code.
pub fn parse_area(raw: &str) -> Result<Area, String> {
    let code: i64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not an area code"))?;
    Area::try_from(code).map_err(|e| e.to_string())
}
