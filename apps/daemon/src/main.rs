//! hugin entry point.

mod app;
mod config;
mod report;
mod restart;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hugin", about = "Watchtower for dedicated game servers", version)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "hugin.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the server and announce activity (the default).
    Run,
    /// Produce a player activity report from a historical log.
    Stats {
        /// Log file to analyze; defaults to the configured log_file.
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Minimum trend percentage a player needs to be reported.
        #[arg(long, default_value_t = hugin_stats::DEFAULT_MIN_TREND_PERCENTAGE)]
        min_trend: f64,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "starting hugin"
    );

    let config = config::Config::load(&cli.config)?;

    let rt = tokio::runtime::Runtime::new()?;
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => rt.block_on(app::run(config))?,
        Commands::Stats {
            log_file,
            min_trend,
        } => rt.block_on(report::run(config, log_file, min_trend))?,
    }

    tracing::info!("hugin shut down cleanly");
    Ok(())
}
