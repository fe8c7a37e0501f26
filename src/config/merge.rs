//! Field-by-field precedence merging.
//!
//! Each field is resolved from an ordered list of lookups, highest priority
//! first: the field's `PACKR_*` environment variable, the call-site options,
//! the config file, and finally a hard-coded default. Lookups run lazily and
//! stop at the first one that yields a value.

use super::loader::ConfigFile;
use super::types::{
    ModuleFormat, PartialConfig, Provenance, ReservedNames, ResolvedConfig, UglifyOptions,
    default_minify, default_target,
};
use crate::env::EnvSnapshot;
use crate::error::{BuildError, BuildResult};
use crate::paths::PathSandbox;
use heck::ToShoutySnakeCase;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Prefix shared by every configuration environment variable.
pub const ENV_PREFIX: &str = "PACKR_";

/// Fields that must be non-empty after merging.
pub const REQUIRED_FIELDS: [&str; 4] = ["scss_input", "scss_output", "js_input", "js_output"];

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// Hard-coded defaults (lowest priority)
    Defaults = 0,
    /// Config file
    File = 1,
    /// Call-site options
    Options = 2,
    /// Environment variables (highest priority)
    Environment = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::File => write!(f, "file"),
            ConfigTier::Options => write!(f, "options"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Environment variable name for a (possibly dotted) field name.
///
/// `uglify.keep_fnames` becomes `PACKR_UGLIFY_KEEP_FNAMES`.
pub fn env_key(field: &str) -> String {
    format!("{}{}", ENV_PREFIX, field.to_shouty_snake_case())
}

/// One precedence layer for a single field.
pub struct Layer<'a, T> {
    pub tier: ConfigTier,
    lookup: Box<dyn Fn() -> Option<T> + 'a>,
}

impl<'a, T> Layer<'a, T> {
    pub fn new(tier: ConfigTier, lookup: impl Fn() -> Option<T> + 'a) -> Self {
        Self {
            tier,
            lookup: Box::new(lookup),
        }
    }
}

/// Evaluate layers in order and return the first value found with its tier.
pub fn first_present<T>(layers: Vec<Layer<'_, T>>) -> Option<(T, ConfigTier)> {
    layers
        .into_iter()
        .find_map(|layer| (layer.lookup)().map(|value| (value, layer.tier)))
}

/// Tri-state boolean: only the exact strings `true` and `false` count.
pub fn parse_env_bool(raw: &str) -> Option<bool> {
    match raw {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn parse_env_text(raw: &str) -> Option<String> {
    (!raw.is_empty()).then(|| raw.to_string())
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|s| !s.is_empty()).cloned()
}

/// Merges environment, options and config file for one invocation.
pub struct ConfigMerger<'a> {
    env: &'a EnvSnapshot,
    options: &'a PartialConfig,
    file: Option<&'a PartialConfig>,
    provenance: Provenance,
}

impl<'a> ConfigMerger<'a> {
    pub fn new(
        env: &'a EnvSnapshot,
        options: &'a PartialConfig,
        file: Option<&'a PartialConfig>,
    ) -> Self {
        Self {
            env,
            options,
            file,
            provenance: Provenance::new(),
        }
    }

    /// Resolve one field through environment, options and file.
    fn resolve<T>(
        &mut self,
        field: &'static str,
        parse_env: impl Fn(&str) -> Option<T>,
        pick: impl Fn(&PartialConfig) -> Option<T>,
    ) -> Option<T> {
        let env = self.env;
        let options = self.options;
        let file = self.file;
        let key = env_key(field);
        let (parse_env, pick) = (&parse_env, &pick);

        let layers = vec![
            Layer::new(ConfigTier::Environment, move || {
                env.get(&key).and_then(parse_env)
            }),
            Layer::new(ConfigTier::Options, move || pick(options)),
            Layer::new(ConfigTier::File, move || file.and_then(pick)),
        ];

        let (value, tier) = first_present(layers)?;
        debug!(field, tier = %tier, "Resolved config field");
        self.provenance.insert(field, tier);
        Some(value)
    }

    fn resolve_or<T>(
        &mut self,
        field: &'static str,
        parse_env: impl Fn(&str) -> Option<T>,
        pick: impl Fn(&PartialConfig) -> Option<T>,
        default: impl FnOnce() -> T,
    ) -> T {
        match self.resolve(field, parse_env, pick) {
            Some(value) => value,
            None => {
                self.provenance.insert(field, ConfigTier::Defaults);
                default()
            }
        }
    }

    fn flag(
        &mut self,
        field: &'static str,
        pick: impl Fn(&PartialConfig) -> Option<bool>,
        default: impl FnOnce() -> bool,
    ) -> bool {
        self.resolve_or(field, parse_env_bool, pick, default)
    }

    fn text(
        &mut self,
        field: &'static str,
        pick: impl Fn(&PartialConfig) -> Option<&String>,
    ) -> Option<String> {
        self.resolve(field, parse_env_text, |c| non_empty(pick(c)))
    }

    fn format(&mut self) -> ModuleFormat {
        let key = env_key("format");
        self.resolve_or(
            "format",
            |raw| {
                let parsed = ModuleFormat::parse(raw);
                if parsed.is_none() {
                    warn!(key = %key, value = %raw, "Ignoring unrecognized module format");
                }
                parsed
            },
            |c| c.format,
            ModuleFormat::default,
        )
    }

    fn reserved(&mut self) -> Vec<String> {
        self.resolve(
            "uglify.reserved",
            |raw| parse_env_text(raw).map(ReservedNames::Joined),
            |c| c.uglify.reserved.clone(),
        )
        .map(|reserved| reserved.names())
        .unwrap_or_default()
    }

    /// Merge every field and check that the required ones are present.
    ///
    /// Paths are returned exactly as supplied; sandboxing happens in [`merge`].
    pub fn merge_fields(mut self) -> BuildResult<(MergedFields, Provenance)> {
        let scss_input = self.text("scss_input", |c| c.scss_input.as_ref());
        let scss_output = self.text("scss_output", |c| c.scss_output.as_ref());
        let js_input = self.text("js_input", |c| c.js_input.as_ref());
        let js_output = self.text("js_output", |c| c.js_output.as_ref());

        let missing: Vec<&str> = REQUIRED_FIELDS
            .iter()
            .zip([&scss_input, &scss_output, &js_input, &js_output])
            .filter(|(_, value)| value.is_none())
            .map(|(field, _)| *field)
            .collect();
        if !missing.is_empty() {
            return Err(BuildError::missing_fields(&missing));
        }

        let css_destination = self.text("css_destination", |c| c.css_destination.as_ref());
        let js_destination = self.text("js_destination", |c| c.js_destination.as_ref());

        let minify = self.flag("minify", |c| c.minify, default_minify);
        let minify_js = self.flag("minify_js", |c| c.minify_js, || minify);
        let minify_css = self.flag("minify_css", |c| c.minify_css, || minify);

        let defaults = UglifyOptions::default();
        let uglify = UglifyOptions {
            mangle: self.flag("uglify.mangle", |c| c.uglify.mangle, || defaults.mangle),
            keep_fnames: self.flag(
                "uglify.keep_fnames",
                |c| c.uglify.keep_fnames,
                || defaults.keep_fnames,
            ),
            keep_classnames: self.flag(
                "uglify.keep_classnames",
                |c| c.uglify.keep_classnames,
                || defaults.keep_classnames,
            ),
            reserved: self.reserved(),
        };

        let target = self
            .text("target", |c| c.target.as_ref())
            .unwrap_or_else(|| {
                self.provenance.insert("target", ConfigTier::Defaults);
                default_target()
            });

        let watch = self.flag("watch", |c| c.watch, || false);
        let verbose = self.flag("verbose", |c| c.verbose, || false);
        let sourcemap = self.flag("sourcemap", |c| c.sourcemap, || false);
        let format = self.format();
        let eslint = self.flag("eslint", |c| c.eslint, || false);
        let eslint_config = self.text("eslint_config", |c| c.eslint_config.as_ref());

        let fields = MergedFields {
            // Presence checked above.
            scss_input: scss_input.unwrap_or_default(),
            scss_output: scss_output.unwrap_or_default(),
            js_input: js_input.unwrap_or_default(),
            js_output: js_output.unwrap_or_default(),
            css_destination,
            js_destination,
            minify,
            minify_js,
            minify_css,
            uglify,
            target,
            watch,
            verbose,
            sourcemap,
            format,
            eslint,
            eslint_config,
        };
        Ok((fields, self.provenance))
    }
}

/// Merged values before path sandboxing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedFields {
    pub scss_input: String,
    pub scss_output: String,
    pub js_input: String,
    pub js_output: String,
    pub css_destination: Option<String>,
    pub js_destination: Option<String>,
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
    pub eslint_config: Option<String>,
}

/// Merge all sources into a validated, sandboxed configuration.
///
/// Relative paths are resolved against the config file's directory when a
/// file was loaded, otherwise against the sandbox root.
pub fn merge(
    env: &EnvSnapshot,
    options: &PartialConfig,
    file: Option<&ConfigFile>,
    sandbox: &PathSandbox,
) -> BuildResult<ResolvedConfig> {
    let merger = ConfigMerger::new(env, options, file.map(|f| &f.contents));
    let (fields, provenance) = merger.merge_fields()?;

    let base_dir = sandbox.resolve(
        file.map(|f| f.dir.as_path()).unwrap_or(Path::new(".")),
        sandbox.root(),
    )?;
    let resolve = |value: &str| -> BuildResult<PathBuf> { sandbox.resolve(value, &base_dir) };
    let resolve_opt = |value: Option<&str>| -> BuildResult<Option<PathBuf>> {
        value.map(resolve).transpose()
    };

    Ok(ResolvedConfig {
        scss_input: resolve(fields.scss_input.as_str())?,
        scss_output: resolve(fields.scss_output.as_str())?,
        js_input: resolve(fields.js_input.as_str())?,
        js_output: resolve(fields.js_output.as_str())?,
        css_destination: resolve_opt(fields.css_destination.as_deref())?,
        js_destination: resolve_opt(fields.js_destination.as_deref())?,
        minify: fields.minify,
        minify_js: fields.minify_js,
        minify_css: fields.minify_css,
        uglify: fields.uglify,
        target: fields.target,
        watch: fields.watch,
        verbose: fields.verbose,
        sourcemap: fields.sourcemap,
        format: fields.format,
        eslint: fields.eslint,
        eslint_config: resolve_opt(fields.eslint_config.as_deref())?,
        base_dir,
        provenance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn required() -> PartialConfig {
        PartialConfig {
            scss_input: Some("src/app.scss".into()),
            scss_output: Some("dist/app.css".into()),
            js_input: Some("src/app.js".into()),
            js_output: Some("dist/app.js".into()),
            ..Default::default()
        }
    }

    fn merge_fields(
        env: &EnvSnapshot,
        options: &PartialConfig,
        file: Option<&PartialConfig>,
    ) -> BuildResult<(MergedFields, Provenance)> {
        ConfigMerger::new(env, options, file).merge_fields()
    }

    #[test]
    fn test_env_key_derivation() {
        assert_eq!(env_key("scss_input"), "PACKR_SCSS_INPUT");
        assert_eq!(env_key("uglify.keep_fnames"), "PACKR_UGLIFY_KEEP_FNAMES");
        assert_eq!(env_key("uglify.reserved"), "PACKR_UGLIFY_RESERVED");
    }

    #[test]
    fn test_first_present_is_lazy() {
        use std::cell::Cell;
        let calls = Cell::new(0);
        let layers = vec![
            Layer::new(ConfigTier::Environment, || None),
            Layer::new(ConfigTier::Options, || Some(1)),
            Layer::new(ConfigTier::File, || {
                calls.set(calls.get() + 1);
                Some(2)
            }),
        ];
        assert_eq!(first_present(layers), Some((1, ConfigTier::Options)));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_defaults_applied() {
        let (fields, provenance) = merge_fields(&EnvSnapshot::default(), &required(), None).unwrap();
        assert!(fields.minify);
        assert!(fields.minify_js);
        assert!(fields.minify_css);
        assert_eq!(fields.target, "es2020");
        assert_eq!(fields.format, ModuleFormat::Iife);
        assert!(!fields.watch && !fields.verbose && !fields.sourcemap && !fields.eslint);
        assert_eq!(fields.uglify, UglifyOptions::default());
        assert_eq!(provenance["target"], ConfigTier::Defaults);
        assert_eq!(provenance["scss_input"], ConfigTier::Options);
    }

    #[test]
    fn test_minify_variants_follow_minify() {
        let file = PartialConfig {
            minify: Some(false),
            minify_css: Some(true),
            ..Default::default()
        };
        let (fields, _) =
            merge_fields(&EnvSnapshot::default(), &required(), Some(&file)).unwrap();
        assert!(!fields.minify);
        assert!(!fields.minify_js);
        assert!(fields.minify_css);
    }

    #[test]
    fn test_env_beats_options_beats_file() {
        let env = EnvSnapshot::from_pairs([("PACKR_TARGET", "es2022")]);
        let options = PartialConfig {
            target: Some("es2019".into()),
            verbose: Some(true),
            ..required()
        };
        let file = PartialConfig {
            target: Some("es2015".into()),
            verbose: Some(false),
            sourcemap: Some(true),
            ..Default::default()
        };
        let (fields, provenance) = merge_fields(&env, &options, Some(&file)).unwrap();
        assert_eq!(fields.target, "es2022");
        assert!(fields.verbose);
        assert!(fields.sourcemap);
        assert_eq!(provenance["target"], ConfigTier::Environment);
        assert_eq!(provenance["verbose"], ConfigTier::Options);
        assert_eq!(provenance["sourcemap"], ConfigTier::File);
    }

    #[test]
    fn test_boolean_env_tri_state() {
        let options = PartialConfig {
            minify: Some(false),
            eslint: Some(true),
            ..required()
        };

        let env = EnvSnapshot::from_pairs([("PACKR_MINIFY", "true"), ("PACKR_ESLINT", "false")]);
        let (fields, _) = merge_fields(&env, &options, None).unwrap();
        assert!(fields.minify);
        assert!(!fields.eslint);

        // Anything other than exact "true"/"false" falls through.
        let env = EnvSnapshot::from_pairs([("PACKR_MINIFY", "TRUE"), ("PACKR_ESLINT", "0")]);
        let (fields, provenance) = merge_fields(&env, &options, None).unwrap();
        assert!(!fields.minify);
        assert!(fields.eslint);
        assert_eq!(provenance["minify"], ConfigTier::Options);
    }

    #[test]
    fn test_malformed_format_env_falls_through() {
        let env = EnvSnapshot::from_pairs([("PACKR_FORMAT", "amd")]);
        let file = PartialConfig {
            format: Some(ModuleFormat::Esm),
            ..Default::default()
        };
        let (fields, _) = merge_fields(&env, &required(), Some(&file)).unwrap();
        assert_eq!(fields.format, ModuleFormat::Esm);

        let env = EnvSnapshot::from_pairs([("PACKR_FORMAT", "cjs")]);
        let (fields, _) = merge_fields(&env, &required(), Some(&file)).unwrap();
        assert_eq!(fields.format, ModuleFormat::Cjs);
    }

    #[test]
    fn test_empty_env_string_is_absent() {
        let env = EnvSnapshot::from_pairs([("PACKR_SCSS_INPUT", "")]);
        let (fields, provenance) = merge_fields(&env, &required(), None).unwrap();
        assert_eq!(fields.scss_input, "src/app.scss");
        assert_eq!(provenance["scss_input"], ConfigTier::Options);
    }

    #[test]
    fn test_reserved_uses_first_present_source_only() {
        let options = PartialConfig {
            uglify: crate::config::PartialUglify {
                reserved: Some(ReservedNames::List(vec!["fromOptions".into()])),
                ..Default::default()
            },
            ..required()
        };
        let file = PartialConfig {
            uglify: crate::config::PartialUglify {
                reserved: Some(ReservedNames::Joined("fromFile".into())),
                ..Default::default()
            },
            ..Default::default()
        };

        let env = EnvSnapshot::from_pairs([("PACKR_UGLIFY_RESERVED", "$,,jQuery, $")]);
        let (fields, _) = merge_fields(&env, &options, Some(&file)).unwrap();
        assert_eq!(fields.uglify.reserved, vec!["$", "jQuery"]);

        let (fields, _) = merge_fields(&EnvSnapshot::default(), &options, Some(&file)).unwrap();
        assert_eq!(fields.uglify.reserved, vec!["fromOptions"]);
    }

    #[test]
    fn test_uglify_env_toggles() {
        let env = EnvSnapshot::from_pairs([
            ("PACKR_UGLIFY_MANGLE", "false"),
            ("PACKR_UGLIFY_KEEP_CLASSNAMES", "true"),
        ]);
        let (fields, _) = merge_fields(&env, &required(), None).unwrap();
        assert!(!fields.uglify.mangle);
        assert!(!fields.uglify.keep_fnames);
        assert!(fields.uglify.keep_classnames);
    }

    #[test]
    fn test_missing_required_fields() {
        let options = PartialConfig {
            scss_input: Some("src/app.scss".into()),
            js_output: Some(String::new()),
            ..Default::default()
        };
        let err = merge_fields(&EnvSnapshot::default(), &options, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigValidation);
        assert!(err.message.contains("scss_output"));
        assert!(err.message.contains("js_input"));
        assert!(err.message.contains("js_output"));
        assert!(!err.message.contains("scss_input"));
    }

    #[test]
    fn test_merge_sandboxes_paths_relative_to_file_dir() {
        let sandbox = PathSandbox::new("/project");
        let file = ConfigFile {
            path: PathBuf::from("/project/web/packr.json"),
            dir: PathBuf::from("/project/web"),
            contents: PartialConfig {
                css_destination: Some("public/css".into()),
                ..required()
            },
        };
        let config = merge(
            &EnvSnapshot::default(),
            &PartialConfig::default(),
            Some(&file),
            &sandbox,
        )
        .unwrap();
        assert_eq!(config.base_dir, PathBuf::from("/project/web"));
        assert_eq!(config.scss_input, PathBuf::from("/project/web/src/app.scss"));
        assert_eq!(
            config.css_destination,
            Some(PathBuf::from("/project/web/public/css"))
        );
    }

    #[test]
    fn test_merge_rejects_escaping_env_path() {
        let sandbox = PathSandbox::new("/project");
        let env = EnvSnapshot::from_pairs([("PACKR_JS_OUTPUT", "../../outside/app.js")]);
        let err = merge(&env, &required(), None, &sandbox).unwrap_err();
        assert_eq!(err.code, ErrorCode::PathEscape);
    }

    #[test]
    fn test_merge_is_deterministic() {
        let sandbox = PathSandbox::new("/project");
        let env = EnvSnapshot::from_pairs([("PACKR_MINIFY", "false")]);
        let a = merge(&env, &required(), None, &sandbox).unwrap();
        let b = merge(&env, &required(), None, &sandbox).unwrap();
        assert_eq!(a, b);
    }
}
