//! Configuration types and structures.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use super::ConfigTier;

/// Output module format for bundled JavaScript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    #[default]
    Iife,
    Cjs,
    Esm,
}

impl ModuleFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "iife" => Some(ModuleFormat::Iife),
            "cjs" => Some(ModuleFormat::Cjs),
            "esm" => Some(ModuleFormat::Esm),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleFormat::Iife => "iife",
            ModuleFormat::Cjs => "cjs",
            ModuleFormat::Esm => "esm",
        }
    }
}

impl fmt::Display for ModuleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier names exempt from mangling, as a list or a comma-separated string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReservedNames {
    List(Vec<String>),
    Joined(String),
}

impl ReservedNames {
    /// Split on commas, drop empty entries and duplicates, keep first-seen order.
    pub fn names(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            ReservedNames::List(items) => items.iter().map(String::as_str).collect(),
            ReservedNames::Joined(joined) => vec![joined.as_str()],
        };

        let mut names: Vec<String> = Vec::new();
        for name in raw.iter().flat_map(|item| item.split(',')).map(str::trim) {
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }
}

/// Partial uglify settings as supplied by options or a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialUglify {
    pub mangle: Option<bool>,
    pub keep_fnames: Option<bool>,
    pub keep_classnames: Option<bool>,
    pub reserved: Option<ReservedNames>,
}

/// One configuration source with every field optional.
///
/// Used both for call-site options and for the contents of a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialConfig {
    pub scss_input: Option<String>,
    pub scss_output: Option<String>,
    pub js_input: Option<String>,
    pub js_output: Option<String>,
    pub css_destination: Option<String>,
    pub js_destination: Option<String>,
    pub minify: Option<bool>,
    pub minify_js: Option<bool>,
    pub minify_css: Option<bool>,
    pub uglify: PartialUglify,
    pub target: Option<String>,
    pub watch: Option<bool>,
    pub verbose: Option<bool>,
    pub sourcemap: Option<bool>,
    pub format: Option<ModuleFormat>,
    pub eslint: Option<bool>,
    pub eslint_config: Option<String>,
}

/// Call-site options passed programmatically to a build invocation.
pub type BuildOptions = PartialConfig;

/// Resolved uglify settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UglifyOptions {
    pub mangle: bool,
    pub keep_fnames: bool,
    pub keep_classnames: bool,
    pub reserved: Vec<String>,
}

impl Default for UglifyOptions {
    fn default() -> Self {
        Self {
            mangle: true,
            keep_fnames: false,
            keep_classnames: false,
            reserved: Vec::new(),
        }
    }
}

/// Which tier supplied each merged field.
pub type Provenance = BTreeMap<&'static str, ConfigTier>;

/// Fully merged and sandboxed configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub scss_input: PathBuf,
    pub scss_output: PathBuf,
    pub js_input: PathBuf,
    pub js_output: PathBuf,
    pub css_destination: Option<PathBuf>,
    pub js_destination: Option<PathBuf>,
    pub minify: bool,
    pub minify_js: bool,
    pub minify_css: bool,
    pub uglify: UglifyOptions,
    pub target: String,
    pub watch: bool,
    pub verbose: bool,
    pub sourcemap: bool,
    pub format: ModuleFormat,
    pub eslint: bool,
    pub eslint_config: Option<PathBuf>,
    /// Directory relative paths were resolved against.
    pub base_dir: PathBuf,
    pub provenance: Provenance,
}

pub(crate) fn default_minify() -> bool {
    true
}

pub(crate) fn default_target() -> String {
    "es2020".to_string()
}
