//! Layered environment-file loading.
//!
//! The process environment is captured once into an [`EnvSnapshot`] and the
//! env files are layered on top of it in a fixed order:
//!
//! 1. `.env` - never overrides variables that are already defined
//! 2. `.env-<mode>` - overrides
//! 3. `.env-local` - overrides, development mode only, and never replaces a
//!    `PACKR_SOURCEMAP` value established by the earlier layers
//!
//! The mode comes from `PACKR_ENV` in the process environment (default
//! `development`). `production` is the hardened runtime mode: env files must be
//! owner-only, required variables must be present and secret-looking variables
//! must not hold placeholder values.
//!
//! The resulting snapshot is immutable and is threaded through configuration
//! merging explicitly; the process environment itself is never modified.

mod audit;
mod parse;

pub use audit::{
    EnvWarning, MASK, MIN_SECRET_LEN, PLACEHOLDER_PREFIXES, Scrubber, SensitivePattern, classify,
    is_placeholder, is_sensitive, is_weak,
};
pub use parse::parse_env_file;

use crate::error::{BuildError, BuildResult};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Variable selecting the runtime mode and thus the env file set.
pub const RUNTIME_MODE_VAR: &str = "PACKR_ENV";

/// Mode used when `PACKR_ENV` is unset or empty.
pub const DEFAULT_MODE: &str = "development";

/// Mode that enables hardened checks.
pub const HARDENED_MODE: &str = "production";

/// Variable preserved across the local-file layer.
pub const SOURCEMAP_VAR: &str = "PACKR_SOURCEMAP";

/// Variables that must be defined after loading in hardened mode.
pub const REQUIRED_HARDENED_VARS: &[&str] = &["PACKR_ENV", "PACKR_TARGET"];

/// Immutable view of environment variables for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the current process environment.
    pub fn from_process() -> Self {
        Self::from_os_pairs(std::env::vars_os())
    }

    /// Keep the entries whose key and value are both valid UTF-8.
    pub fn from_os_pairs(pairs: impl IntoIterator<Item = (OsString, OsString)>) -> Self {
        let vars = pairs
            .into_iter()
            .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => Some((key, value)),
                (Ok(key), Err(_)) => {
                    debug!(key = %key, "Skipping environment variable with non-UTF-8 value");
                    None
                }
                (Err(key), _) => {
                    debug!(key = ?key, "Skipping environment variable with non-UTF-8 name");
                    None
                }
            })
            .collect();
        Self { vars }
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Active runtime mode.
    pub fn mode(&self) -> &str {
        match self.get(RUNTIME_MODE_VAR) {
            Some(mode) if !mode.is_empty() => mode,
            _ => DEFAULT_MODE,
        }
    }

    pub fn is_hardened(&self) -> bool {
        self.mode() == HARDENED_MODE
    }
}

/// How a file's keys interact with variables that are already defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverridePolicy {
    /// Existing values win.
    KeepExisting,
    /// File values win.
    Override,
    /// File values win, except for the named key when it is already set.
    OverridePreserving(&'static str),
}

/// One candidate env file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvFile {
    pub path: PathBuf,
    pub policy: OverridePolicy,
}

/// Ordered env files for a runtime mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvSource {
    files: Vec<EnvFile>,
}

impl EnvSource {
    /// The fixed load order rooted at `dir`.
    pub fn standard(dir: &Path, mode: &str) -> Self {
        let mut files = vec![
            EnvFile {
                path: dir.join(".env"),
                policy: OverridePolicy::KeepExisting,
            },
            EnvFile {
                path: dir.join(format!(".env-{}", mode)),
                policy: OverridePolicy::Override,
            },
        ];
        if mode == DEFAULT_MODE {
            files.push(EnvFile {
                path: dir.join(".env-local"),
                policy: OverridePolicy::OverridePreserving(SOURCEMAP_VAR),
            });
        }
        Self { files }
    }

    pub fn files(&self) -> &[EnvFile] {
        &self.files
    }
}

/// Snapshot produced by loading, plus the non-fatal findings along the way.
#[derive(Debug, Clone)]
pub struct LoadedEnv {
    pub snapshot: EnvSnapshot,
    pub warnings: Vec<EnvWarning>,
    /// Files that existed and were applied, in load order.
    pub loaded: Vec<PathBuf>,
}

/// Loads env files over an initial snapshot.
#[derive(Debug)]
pub struct EnvLoader {
    initial: EnvSnapshot,
    source: EnvSource,
}

impl EnvLoader {
    /// Standard file set in `dir`, mode taken from `initial`.
    pub fn new(dir: &Path, initial: EnvSnapshot) -> Self {
        let source = EnvSource::standard(dir, initial.mode());
        Self { initial, source }
    }

    /// Apply every present file in order and run the hardened checks.
    pub fn load(self) -> BuildResult<LoadedEnv> {
        let hardened = self.initial.is_hardened();
        let mut vars = self.initial.vars;
        let mut warnings = Vec::new();
        let mut loaded = Vec::new();

        for file in self.source.files {
            if !file.path.is_file() {
                debug!(path = %file.path.display(), "Env file not present, skipping");
                continue;
            }

            if hardened {
                check_permissions(&file.path)?;
            }

            let content = std::fs::read_to_string(&file.path).map_err(|e| {
                BuildError::io(&format!("Failed to read {}", file.path.display()), e)
            })?;
            let entries = parse_env_file(&content);

            for (key, value) in &entries {
                if let Some(warning) = audit::audit_entry(key, value, hardened) {
                    if let EnvWarning::WeakSecret { key, pattern, shown } = &warning {
                        warn!(key = %key, pattern = %pattern, value = %shown, "Weak or example-like value for sensitive variable");
                    }
                    warnings.push(warning);
                }
            }

            apply_entries(&mut vars, entries, file.policy);
            debug!(path = %file.path.display(), policy = ?file.policy, "Loaded env file");
            loaded.push(file.path);
        }

        let snapshot = EnvSnapshot { vars };
        if hardened {
            verify_hardened(&snapshot)?;
        }

        Ok(LoadedEnv {
            snapshot,
            warnings,
            loaded,
        })
    }
}

fn apply_entries(
    vars: &mut BTreeMap<String, String>,
    entries: Vec<(String, String)>,
    policy: OverridePolicy,
) {
    let preserved = match policy {
        OverridePolicy::OverridePreserving(key) => vars.get(key).cloned().map(|v| (key, v)),
        _ => None,
    };

    for (key, value) in entries {
        match policy {
            OverridePolicy::KeepExisting => {
                vars.entry(key).or_insert(value);
            }
            OverridePolicy::Override | OverridePolicy::OverridePreserving(_) => {
                vars.insert(key, value);
            }
        }
    }

    if let Some((key, value)) = preserved {
        vars.insert(key.to_string(), value);
    }
}

fn check_permissions(path: &Path) -> BuildResult<()> {
    let mode = audit::insecure_mode(path)
        .map_err(|e| BuildError::io(&format!("Failed to stat {}", path.display()), e))?;
    if let Some(mode) = mode {
        warn!(path = %path.display(), mode = %format!("{:o}", mode), "Env file is accessible beyond its owner");
        return Err(BuildError::env_security(format!(
            "Env file {} must be readable by its owner only (mode {:o})",
            path.display(),
            mode
        ))
        .with_details("Run `chmod 600` on the file"));
    }
    Ok(())
}

fn verify_hardened(snapshot: &EnvSnapshot) -> BuildResult<()> {
    let missing: Vec<&str> = REQUIRED_HARDENED_VARS
        .iter()
        .copied()
        .filter(|key| snapshot.get(key).is_none_or(str::is_empty))
        .collect();
    if !missing.is_empty() {
        return Err(BuildError::env_security(format!(
            "Missing required environment variables: {}",
            missing.join(", ")
        )));
    }

    let placeholders = audit::placeholder_secrets(snapshot);
    if !placeholders.is_empty() {
        return Err(BuildError::env_security(format!(
            "Sensitive variables hold example or test values: {}",
            placeholders.join(", ")
        )));
    }

    Ok(())
}
