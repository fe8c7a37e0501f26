//! Final output locations.
//!
//! A build declares a working output path (`dist/app.css`) and may redirect
//! the final file into a publish directory (`public/css`) without renaming
//! it. The normalized location is then `public/css/app.css`.

use crate::config::ResolvedConfig;
use crate::error::{BuildError, BuildResult};
use crate::paths::PathSandbox;
use std::path::{Path, PathBuf};

/// Computes sandboxed absolute output paths relative to a base directory.
#[derive(Debug, Clone, Copy)]
pub struct OutputNormalizer<'a> {
    sandbox: &'a PathSandbox,
    base: &'a Path,
}

impl<'a> OutputNormalizer<'a> {
    pub fn new(sandbox: &'a PathSandbox, base: &'a Path) -> Self {
        Self { sandbox, base }
    }

    /// Resolve `output`, moving its file name into `destination` when given.
    pub fn normalize(&self, output: &Path, destination: Option<&Path>) -> BuildResult<PathBuf> {
        let resolved = self.sandbox.resolve(output, self.base)?;
        let Some(destination) = destination else {
            return Ok(resolved);
        };

        // The root itself has no usable file name even though the OS path does.
        let relative = self.sandbox.relative(&resolved).unwrap_or_default();
        let file_name = relative.file_name().ok_or_else(|| {
            BuildError::invalid_value(
                &output.display().to_string(),
                "Output path has no file name",
            )
        })?;
        let dir = self.sandbox.resolve(destination, self.base)?;
        Ok(dir.join(file_name))
    }

    /// Normalize both the stylesheet and the script output.
    pub fn normalize_config(&self, config: &ResolvedConfig) -> BuildResult<NormalizedOutputs> {
        Ok(NormalizedOutputs {
            css: self.normalize(&config.scss_output, config.css_destination.as_deref())?,
            js: self.normalize(&config.js_output, config.js_destination.as_deref())?,
        })
    }
}

/// Final absolute locations of the compiled assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedOutputs {
    pub css: PathBuf,
    pub js: PathBuf,
}
