//! Configuration resolution.
//!
//! Consolidates configuration from four tiers, field by field, highest first:
//! 1. **Environment** - one `PACKR_*` variable per field (from the env snapshot)
//! 2. **Options** - values passed programmatically or from the CLI
//! 3. **File** - `packr.json` (or the file named on the command line)
//! 4. **Defaults** - hard-coded per field
//!
//! ## Environment Variables
//! - `PACKR_SCSS_INPUT`, `PACKR_SCSS_OUTPUT`, `PACKR_JS_INPUT`, `PACKR_JS_OUTPUT`
//! - `PACKR_CSS_DESTINATION`, `PACKR_JS_DESTINATION`
//! - `PACKR_MINIFY`, `PACKR_MINIFY_JS`, `PACKR_MINIFY_CSS`
//! - `PACKR_UGLIFY_MANGLE`, `PACKR_UGLIFY_KEEP_FNAMES`, `PACKR_UGLIFY_KEEP_CLASSNAMES`
//! - `PACKR_UGLIFY_RESERVED` - comma-separated identifier names
//! - `PACKR_TARGET`, `PACKR_FORMAT`, `PACKR_WATCH`, `PACKR_VERBOSE`, `PACKR_SOURCEMAP`
//! - `PACKR_ESLINT`, `PACKR_ESLINT_CONFIG`
//!
//! Boolean variables only count when they are exactly `true` or `false`.

mod loader;
mod merge;
mod types;

pub use loader::{ConfigFile, DEFAULT_CONFIG_FILE};
pub use merge::{
    ConfigMerger, ConfigTier, ENV_PREFIX, Layer, MergedFields, REQUIRED_FIELDS, env_key,
    first_present, merge, parse_env_bool,
};
pub use types::*;
