//! CLI definition for packr.
//!
//! `packr [CONFIG] [--watch]` resolves the configuration, writes the artifact
//! and hands off to the worker.

use crate::config::BuildOptions;
use crate::logging::LogTarget;
use clap::Parser;
use std::path::PathBuf;

/// Resolve the asset build configuration and run the packr worker
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the config file (default: packr.json if present)
    #[arg(value_name = "CONFIG")]
    pub config_file: Option<PathBuf>,

    /// Path to the config file (takes precedence over the positional form)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Keep the worker running and rebuild on changes
    #[arg(short, long)]
    pub watch: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2")]
    pub log: String,
}

impl Cli {
    /// Config path named on the command line, if any.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(|| self.config_file.clone())
    }

    pub fn log_target(&self) -> LogTarget {
        LogTarget::parse(&self.log)
    }

    /// Options tier derived from flags. Unset flags leave the field to lower tiers.
    pub fn options(&self) -> BuildOptions {
        BuildOptions {
            watch: self.watch.then_some(true),
            ..Default::default()
        }
    }
}
