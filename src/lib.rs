//! Packr build driver library
//!
//! Resolves layered configuration (environment, options, config file,
//! defaults), keeps every path inside the project root, writes the resolved
//! artifact and launches the compilation worker.

pub mod artifact;
pub mod cli;
pub mod config;
pub mod env;
pub mod error;
pub mod logging;
pub mod output;
pub mod paths;
pub mod pipeline;
pub mod worker;
