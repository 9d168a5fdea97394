use std::path::PathBuf;

use clap::Parser;

use memory_cli::commands::Command;
use memory_cli::output::OutputFormat;
use memory_cli::system;

#[derive(Parser)]
#[command(name = "memory-cli")]
#[command(about = "Command-line interface for the personal memory store")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file path (TOML); defaults match the specification.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let system = system::open(cli.config.as_deref()).await?;
    cli.command.run(&system, cli.format).await
}
