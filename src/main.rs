mod backend;
mod cli;
mod error;
mod logging;
mod model;
mod orchestrator;
mod status_text;
mod storage;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_headless = args.json || args.text || args.once;

    cli::run(args).await?;
    // Explicitly exit with code 0 on success, especially for headless modes
    if is_headless {
        std::process::exit(0);
    }
    Ok(())
}
