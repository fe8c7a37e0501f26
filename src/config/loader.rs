//! Config file loading.
//!
//! A config file is a flat object using the same snake_case keys as
//! [`PartialConfig`]. `.yaml`/`.yml` files are parsed as YAML, everything else
//! as JSON.

use super::types::PartialConfig;
use crate::error::{BuildError, BuildResult};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Config file name looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "packr.json";

/// A loaded config file and the directory its relative paths refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub path: PathBuf,
    pub dir: PathBuf,
    pub contents: PartialConfig,
}

impl ConfigFile {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> BuildResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BuildError::io(&format!("Failed to read config file {}", path.display()), e)
        })?;
        Self::parse(path, &content)
    }

    /// Load the file if it exists.
    pub fn load_optional<P: AsRef<Path>>(path: P) -> BuildResult<Option<Self>> {
        let path = path.as_ref();
        if !path.is_file() {
            debug!(path = %path.display(), "No config file, using environment and options only");
            return Ok(None);
        }
        Self::load(path).map(Some)
    }

    /// Parse config content, choosing the format from the file extension.
    pub fn parse(path: &Path, content: &str) -> BuildResult<Self> {
        let contents: PartialConfig = if is_yaml(path) {
            serde_yaml::from_str(content).map_err(|e| BuildError::config_parse(path, e))?
        } else {
            serde_json::from_str(content).map_err(|e| BuildError::config_parse(path, e))?
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Ok(Self {
            path: path.to_path_buf(),
            dir,
            contents,
        })
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModuleFormat;
    use tempfile::TempDir;

    #[test]
    fn test_parse_json() {
        let file = ConfigFile::parse(
            Path::new("/p/assets/packr.json"),
            r#"{"scss_input": "src/app.scss", "minify": false, "format": "esm"}"#,
        )
        .unwrap();
        assert_eq!(file.dir, PathBuf::from("/p/assets"));
        assert_eq!(file.contents.scss_input.as_deref(), Some("src/app.scss"));
        assert_eq!(file.contents.minify, Some(false));
        assert_eq!(file.contents.format, Some(ModuleFormat::Esm));
    }

    #[test]
    fn test_parse_yaml_by_extension() {
        let file = ConfigFile::parse(
            Path::new("packr.yaml"),
            "js_input: src/app.js\nuglify:\n  keep_fnames: true\n",
        )
        .unwrap();
        assert_eq!(file.dir, PathBuf::from("."));
        assert_eq!(file.contents.js_input.as_deref(), Some("src/app.js"));
        assert_eq!(file.contents.uglify.keep_fnames, Some(true));
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = ConfigFile::parse(Path::new("broken.json"), "{ not json").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ConfigParse);
        assert!(err.message.contains("broken.json"));
    }

    #[test]
    fn test_load_optional_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = ConfigFile::load_optional(temp.path().join("packr.json")).unwrap();
        assert!(result.is_none());
    }
}
