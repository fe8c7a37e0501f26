//! The resolved-configuration artifact consumed by the worker.
//!
//! The artifact is the only channel for settings into the worker. It holds
//! the normalized output paths (destination overrides already applied) and
//! every non-path setting, serialized as pretty JSON in a fixed field order so
//! identical inputs produce byte-identical files.

use crate::config::{ModuleFormat, ResolvedConfig, UglifyOptions};
use crate::error::{BuildError, BuildResult};
use crate::output::NormalizedOutputs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Artifact file name, relative to the project root.
pub const ARTIFACT_FILE: &str = ".packr.json";

/// Settings handed to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerArtifact {
    pub scss_input: PathBuf,
    pub scss_output: PathBuf,
    pub js_input: PathBuf,
    pub js_output: PathBuf,
    pub minify: bool,
    pub minify_js: bool,
    pub minify_css: bool,
    pub uglify: UglifyOptions,
    pub target: String,
    pub verbose: bool,
    pub sourcemap: bool,
    pub format: ModuleFormat,
    pub eslint: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eslint_config: Option<PathBuf>,
}

impl WorkerArtifact {
    pub fn new(config: &ResolvedConfig, outputs: &NormalizedOutputs) -> Self {
        Self {
            scss_input: config.scss_input.clone(),
            scss_output: outputs.css.clone(),
            js_input: config.js_input.clone(),
            js_output: outputs.js.clone(),
            minify: config.minify,
            minify_js: config.minify_js,
            minify_css: config.minify_css,
            uglify: config.uglify.clone(),
            target: config.target.clone(),
            verbose: config.verbose,
            sourcemap: config.sourcemap,
            format: config.format,
            eslint: config.eslint,
            eslint_config: config.eslint_config.clone(),
        }
    }

    pub fn to_json(&self) -> BuildResult<String> {
        let mut json = serde_json::to_string_pretty(self)
            .map_err(|e| BuildError::io("Failed to serialize artifact", e))?;
        json.push('\n');
        Ok(json)
    }
}

/// Writes the artifact to its fixed location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactWriter {
    path: PathBuf,
}

impl ArtifactWriter {
    /// Writer for `<root>/.packr.json`.
    pub fn new(root: &Path) -> Self {
        Self {
            path: root.join(ARTIFACT_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the artifact atomically and return its path.
    pub fn write(&self, artifact: &WorkerArtifact) -> BuildResult<PathBuf> {
        let json = artifact.to_json()?;
        let tmp_path = self.path.with_extension("json.tmp");

        std::fs::write(&tmp_path, json.as_bytes())
            .map_err(|e| BuildError::io(&format!("Failed to write {}", tmp_path.display()), e))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            BuildError::io(&format!("Failed to replace {}", self.path.display()), e)
        })?;

        info!(path = %self.path.display(), "Wrote resolved configuration");
        Ok(self.path.clone())
    }
}
