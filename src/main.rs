//! pcb-hierplace - hierarchical component placement for pcb.
//!
//! This is a standalone CLI tool that integrates with the pcb workflow
//! via the plugin mechanism (executables named `pcb-<command>` become
//! available as `pcb <command>`).

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;

mod board;
mod commands;
mod config;
mod placer;

use placer::{Point, ScopeMode};

#[derive(Parser)]
#[command(name = "pcb-hierplace")]
#[command(author, version, about = "Arrange PCB components by schematic hierarchy")]
#[command(propagate_version = true)]
struct Cli {
    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Path to a configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Place components into hierarchical clusters
    Place {
        #[command(flatten)]
        target: Target,

        /// Top-left corner of the placed cluster in mm (e.g., 100,50)
        #[arg(long, value_parser = parse_anchor, allow_hyphen_values = true)]
        anchor: Option<Point>,

        /// Compute and report positions without modifying the board
        #[arg(long)]
        dry_run: bool,

        /// Output format (human, json)
        #[arg(short, long, default_value = "human")]
        format: String,

        /// Also write the JSON report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Show the hierarchy tree and group sizes without moving anything
    Tree {
        #[command(flatten)]
        target: Target,
    },
}

/// Board and scope options shared by every command.
#[derive(Args)]
struct Target {
    /// Path to the board (.kicad_pcb or .json snapshot)
    board: PathBuf,

    /// Which components to arrange
    #[arg(short, long, value_enum, default_value = "auto")]
    scope: ScopeArg,

    /// Treat exactly these references as selected (comma-separated)
    #[arg(long, value_delimiter = ',')]
    select: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScopeArg {
    /// Selected components if any are selected, else the whole board
    Auto,
    /// Every component, ignoring selection
    Board,
    /// Only selected components
    Selection,
}

impl From<ScopeArg> for ScopeMode {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Auto => ScopeMode::Auto,
            ScopeArg::Board => ScopeMode::Board,
            ScopeArg::Selection => ScopeMode::Selection,
        }
    }
}

fn parse_anchor(value: &str) -> Result<Point, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{}'", value))?;

    let parse = |s: &str| {
        s.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("'{}' is not a valid coordinate", s.trim()))
    };

    Ok(Point::new(parse(x)?, parse(y)?))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = LevelFilter::from_str(&cli.log_level)
        .with_context(|| format!("Invalid log level: {}", cli.log_level))?;
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(level)
        .init();

    let config = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Place {
            target,
            anchor,
            dry_run,
            format,
            report,
        } => {
            let output_format = match format.to_lowercase().as_str() {
                "json" => commands::OutputFormat::Json,
                _ => commands::OutputFormat::Human,
            };

            let mut options = config.options(target.scope.into());
            if anchor.is_some() {
                options.anchor = anchor;
            }

            commands::place::execute(
                &target.board,
                &options,
                target.select.as_deref(),
                dry_run,
                output_format,
                report.as_deref(),
            )
        }

        Commands::Tree { target } => {
            let options = config.options(target.scope.into());
            commands::tree::execute(&target.board, &options, target.select.as_deref())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_anchor() {
        assert_eq!(parse_anchor("100,50.5"), Ok(Point::new(100.0, 50.5)));
        assert_eq!(parse_anchor(" -3 , 4 "), Ok(Point::new(-3.0, 4.0)));
        assert!(parse_anchor("100").is_err());
        assert!(parse_anchor("a,1").is_err());
        assert!(parse_anchor("inf,1").is_err());
    }

    #[test]
    fn test_place_arguments() {
        let cli = Cli::try_parse_from([
            "pcb-hierplace",
            "place",
            "board.kicad_pcb",
            "--scope",
            "selection",
            "--select",
            "U1,U2",
            "--anchor",
            "-10,20",
            "--dry-run",
        ])
        .unwrap();

        let Commands::Place {
            target,
            anchor,
            dry_run,
            ..
        } = cli.command
        else {
            panic!("expected place command");
        };
        assert_eq!(ScopeMode::from(target.scope), ScopeMode::Selection);
        assert_eq!(target.select, Some(vec!["U1".to_string(), "U2".to_string()]));
        assert_eq!(anchor, Some(Point::new(-10.0, 20.0)));
        assert!(dry_run);
        assert_eq!(cli.log_level, "warn");
    }
}
