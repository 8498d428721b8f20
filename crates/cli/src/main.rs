use clap::{Parser, Subcommand};
use pageconf_core::constants::PAGECONF_LOG_VAR;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "pageconf")]
#[command(about = "Resolve page configuration across a filesystem route tree", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one resolution pass and print the resolved configuration as JSON
    Resolve {
        /// Project root directory (defaults to the current directory)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Report errors without a failing exit status (dev-server mode)
        #[arg(long)]
        dev: bool,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Resolve { root, dev, pretty } => commands::resolve(root, dev, pretty).await,
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env(PAGECONF_LOG_VAR)
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
