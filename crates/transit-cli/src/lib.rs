//! Command-line interface for the regional transit information service.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `reload` | Download lines and stops and replace the local copy |
//! | `status` | Show the local dataset and when it was last reloaded |
//! | `line` | Show a line and its news |
//! | `lines` | List lines, optionally by area |
//! | `stop` | Show a stop and the lines serving it |
//! | `search` | Search stops by name, street or town |
//! | `line-trips` | Show a trip of a line with its live delay |
//! | `stop-trips` | Show the next trips at a stop |
//! | `config` | Show the configuration in use |
//! | `completions` | Generate shell completions |
//!
//! Lines and stops are kept in a local SQLite database and reloaded when they
//! get old; `--force-reload` reloads them before answering.
//!
//! # Configuration
//!
//! The CLI reads `~/.config/transit/config.toml` (or platform equivalent), or
//! the file given with `--config`:
//!
//! ```toml
//! base_url = "https://app-tpl.tndigit.it/gtlservice"
//! username = "user"
//! password = "secret"
//! timeout = 30
//! areas = [21, 22, 23, 24]
//!
//! [retry]
//! attempts = 5
//! step_ms = 200
//! ```
//!
//! # Environment Variables
//!
//! - `TRANSIT_CONFIG`: configuration file
//! - `TRANSIT_BASE_URL`: service base URL
//! - `NO_COLOR`: disable colored output
//! - `RUST_LOG`: log filter when neither `-v` nor `-q` is given
//!
//! # Examples
//!
//! ```bash
//! transit search "piazza dante"
//! transit stop-trips 10
//! transit line-trips 5 --at 07:45 --direction forward
//! transit lines --area 23
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod format;

// Re-export core dependencies for convenience
pub use transit_core;
pub use transit_types;
