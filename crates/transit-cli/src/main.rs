use std::io;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use transit_cli::cli::{Cli, Commands};
use transit_cli::commands::{self, LineTripsArgs, parse_reference};
use transit_cli::config::Config;
use transit_cli::format::FormatOptions;
use transit_core::datetime::rome_now;
use transit_core::{LineTripsCache, StopTripsCache};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle completions command early (before tracing init)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "transit", &mut io::stdout());
        return Ok(());
    }

    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref())?;

    if let Commands::Config = cli.command {
        let path = cli.config.clone().unwrap_or_else(Config::path);
        println!("# {}", path.display());
        let mut shown = config.clone();
        if shown.password.is_some() {
            shown.password = Some("********".to_string());
        }
        print!("{}", toml::to_string_pretty(&shown)?);
        return Ok(());
    }

    let mut session = commands::connect(&config, cli.base_url.as_deref())?;
    session.opts = FormatOptions::new(cli.no_color || config.no_color).with_compact(cli.compact);
    session.json = cli.json;
    session.force_reload = cli.force_reload;

    let output = match cli.command {
        Commands::Reload => commands::cmd_reload(&session).await?,
        Commands::Status => commands::cmd_status(&session).await?,
        Commands::Line { line } => commands::cmd_line(&session, line.key()).await?,
        Commands::Lines { area, all } => commands::cmd_lines(&session, area, all).await?,
        Commands::Stop { stop } => commands::cmd_stop(&session, stop.key()).await?,
        Commands::Search {
            text,
            limit,
            offset,
        } => commands::cmd_search(&session, text.as_deref(), limit, offset).await?,
        Commands::LineTrips {
            line,
            at,
            index,
            direction,
            refresh,
        } => {
            let mut cache = LineTripsCache::new(session.client.clone());
            let args = LineTripsArgs {
                line: line.key(),
                reference: parse_reference(at.as_deref(), rome_now())?,
                index,
                direction: direction.into(),
                refresh,
            };
            commands::cmd_line_trips(&session, &mut cache, args).await?
        }
        Commands::StopTrips { stop, at, refresh } => {
            let mut cache = StopTripsCache::new(session.client.clone());
            let reference = parse_reference(at.as_deref(), rome_now())?;
            commands::cmd_stop_trips(&session, &mut cache, stop.key(), reference, refresh).await?
        }
        Commands::Config | Commands::Completions { .. } => {
            // Already handled above
            unreachable!()
        }
    };

    print!("{}", output);
    Ok(())
}
