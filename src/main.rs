use clap::Parser;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use anyhow::Result;

use tsbridge::cli::{self, Command};

/// TypeScript analysis bridge
///
/// Drives the external tslint/tsmetrics engine and reports issues and metrics
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print JSON instead of Markdown
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // logs go to stderr, stdout carries the report
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    cli::handle_command(args.command, args.json)
}
