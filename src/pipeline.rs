//! One build invocation, end to end.
//!
//! Env files are loaded into a snapshot, the configuration is merged and
//! sandboxed, output paths are normalized and the artifact is written. Only
//! then is the worker started. Every step runs to completion before the next
//! one starts, so the artifact never reflects a partial configuration.

use crate::artifact::{ArtifactWriter, WorkerArtifact};
use crate::config::{BuildOptions, ConfigFile, DEFAULT_CONFIG_FILE, ResolvedConfig, merge};
use crate::env::{EnvLoader, EnvSnapshot, LoadedEnv, Scrubber};
use crate::error::{BuildError, BuildResult};
use crate::output::{NormalizedOutputs, OutputNormalizer};
use crate::paths::PathSandbox;
use crate::worker::WorkerLauncher;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Inputs for a single build.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Trusted root; also where env files, the artifact and the worker live.
    pub root: PathBuf,
    /// Explicit config file. When `None`, `packr.json` is used if present.
    pub config_path: Option<PathBuf>,
    pub options: BuildOptions,
    /// Process environment captured at startup.
    pub process_env: EnvSnapshot,
}

impl Invocation {
    /// Invocation rooted at the current directory with the live environment.
    pub fn from_current_dir(config_path: Option<PathBuf>, options: BuildOptions) -> BuildResult<Self> {
        let sandbox = PathSandbox::from_current_dir()?;
        Ok(Self {
            root: sandbox.root().to_path_buf(),
            config_path,
            options,
            process_env: EnvSnapshot::from_process(),
        })
    }
}

/// Everything resolved before the worker starts.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub env: LoadedEnv,
    pub config: ResolvedConfig,
    pub outputs: NormalizedOutputs,
    pub artifact_path: PathBuf,
}

/// Resolve the configuration and write the artifact.
pub fn prepare(invocation: &Invocation) -> BuildResult<Prepared> {
    let sandbox = PathSandbox::new(&invocation.root);
    let env = EnvLoader::new(sandbox.root(), invocation.process_env.clone()).load()?;
    info!(
        mode = %env.snapshot.mode(),
        files = env.loaded.len(),
        "Loaded environment"
    );

    let hardened = env.snapshot.is_hardened();
    let scrubber = Scrubber::from_snapshot(&env.snapshot);
    resolve_and_write(invocation, &sandbox, env).map_err(|e| {
        if hardened { e.scrubbed(&scrubber) } else { e }
    })
}

fn resolve_and_write(
    invocation: &Invocation,
    sandbox: &PathSandbox,
    env: LoadedEnv,
) -> BuildResult<Prepared> {
    let writer = ArtifactWriter::new(sandbox.root());
    let file = load_config_file(invocation, sandbox, writer.path())?;

    let config = merge(&env.snapshot, &invocation.options, file.as_ref(), sandbox)?;
    for (field, tier) in &config.provenance {
        debug!(field = %field, tier = %tier, "Config field source");
    }

    let outputs = OutputNormalizer::new(sandbox, &config.base_dir).normalize_config(&config)?;
    info!(
        css = %outputs.css.display(),
        js = %outputs.js.display(),
        "Resolved output locations"
    );

    let artifact_path = writer.write(&WorkerArtifact::new(&config, &outputs))?;

    Ok(Prepared {
        env,
        config,
        outputs,
        artifact_path,
    })
}

fn load_config_file(
    invocation: &Invocation,
    sandbox: &PathSandbox,
    artifact_path: &Path,
) -> BuildResult<Option<ConfigFile>> {
    let requested = invocation
        .config_path
        .as_deref()
        .unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
    let path = sandbox.resolve(requested, sandbox.root())?;

    if path == artifact_path {
        return Err(BuildError::invalid_value(
            "config",
            "Config file path is the generated artifact and would be overwritten",
        )
        .with_details(path.display().to_string()));
    }

    let file = if invocation.config_path.is_some() {
        Some(ConfigFile::load(&path)?)
    } else {
        ConfigFile::load_optional(&path)?
    };
    if let Some(file) = &file {
        info!(path = %file.path.display(), "Loaded config file");
    }
    Ok(file)
}

/// Prepare and run the worker at its fixed location.
pub async fn run(invocation: &Invocation) -> BuildResult<()> {
    let launcher = WorkerLauncher::locate(&invocation.root);
    run_with(invocation, launcher).await
}

/// Prepare and run a specific worker.
pub async fn run_with(invocation: &Invocation, launcher: WorkerLauncher) -> BuildResult<()> {
    let prepared = prepare(invocation)?;
    let hardened = prepared.env.snapshot.is_hardened();
    let scrubber = Scrubber::from_snapshot(&prepared.env.snapshot);

    launcher
        .with_env(prepared.env.snapshot)
        .with_current_dir(&invocation.root)
        .launch(&prepared.artifact_path, prepared.config.watch)
        .await
        .map_err(|e| if hardened { e.scrubbed(&scrubber) } else { e })
}
