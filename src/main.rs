//! packr
//!
//! Resolves the asset build configuration and hands it to the packr worker.

use anyhow::Result;
use clap::Parser;
use packr::cli::Cli;
use packr::error::BuildResult;
use packr::logging::init_logging;
use packr::pipeline::{self, Invocation};
use tracing::error;

async fn build(cli: &Cli) -> BuildResult<()> {
    let invocation = Invocation::from_current_dir(cli.config_path(), cli.options())?;
    pipeline::run(&invocation).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_target(), cli.verbose)?;

    if let Err(e) = build(&cli).await {
        error!(code = ?e.code, field = ?e.field, "Build failed");
        eprintln!("packr: {}", e.report());
        std::process::exit(1);
    }
    Ok(())
}
