//! formfn - first-order formal-function labels from a harmonic analysis
//!
//! Subcommands:
//! - `formfn analyze <FILE|->` - Label a phrase of harmony events
//! - `formfn table` - List the pattern table
//! - `formfn config` - Print the effective configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use formconf::FormConfig;
use tracing_subscriber::EnvFilter;

mod commands;
mod input;

use commands::OutputFormat;

#[derive(Parser)]
#[command(name = "formfn")]
#[command(about = "Label prolongations, cadences and pedal points in a harmonic analysis")]
#[command(version)]
struct Cli {
    /// Config file (replaces ./formfunction.toml)
    #[arg(long, global = true, env = "FORMFUNCTION_CONFIG")]
    config: Option<PathBuf>,

    /// Pattern table file (overrides the configured table)
    #[arg(long, global = true)]
    table: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Label a phrase of harmony events
    Analyze {
        /// Input file, or `-` for stdin
        input: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List the pattern table
    Table {
        /// Only rows of this window length (3 or 4)
        #[arg(short, long)]
        length: Option<usize>,
    },

    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = FormConfig::load_with_sources_from(cli.config.as_deref())?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.telemetry.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let color = !cli.no_color;

    match cli.command {
        Commands::Analyze { input, format } => {
            commands::analyze(&config, &input, cli.table.as_deref(), format, color)?;
        }
        Commands::Table { length } => {
            commands::table(&config, cli.table.as_deref(), length, color)?;
        }
        Commands::Config => {
            commands::show_config(&config, &sources);
        }
    }

    Ok(())
}
