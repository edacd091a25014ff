use clap::Parser;
use tracing::{info, Level};

use snipsave::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    info!("Starting snipsave v{}", env!("CARGO_PKG_VERSION"));

    cli.run().await?;

    Ok(())
}
