//! Launching and monitoring the external compilation worker.
//!
//! The worker receives the artifact path as its first argument and `--watch`
//! when requested. Its standard streams are inherited so its own output is
//! visible, and the launch resolves only when the process terminates.

use crate::env::EnvSnapshot;
use crate::error::{BuildError, BuildResult};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Directory, relative to the project root, holding the worker executable.
pub const WORKER_DIR: &str = "bin";

/// Worker executable name for the current platform.
pub fn worker_file_name() -> &'static str {
    if cfg!(windows) {
        "packr-worker.exe"
    } else {
        "packr-worker"
    }
}

/// Starts the worker and maps its exit status.
#[derive(Debug, Clone)]
pub struct WorkerLauncher {
    executable: PathBuf,
    env: Option<EnvSnapshot>,
    current_dir: Option<PathBuf>,
}

impl WorkerLauncher {
    /// Launcher for an explicit executable path.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            env: None,
            current_dir: None,
        }
    }

    /// Launcher for the worker at its fixed location under `root`.
    pub fn locate(root: &Path) -> Self {
        Self::new(root.join(WORKER_DIR).join(worker_file_name()))
    }

    /// Pass the loaded environment to the worker process.
    pub fn with_env(mut self, env: EnvSnapshot) -> Self {
        self.env = Some(env);
        self
    }

    /// Start the worker in `dir` instead of the caller's working directory.
    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Arguments passed to the worker.
    pub fn args(artifact: &Path, watch: bool) -> Vec<String> {
        let mut args = vec![artifact.display().to_string()];
        if watch {
            args.push("--watch".to_string());
        }
        args
    }

    /// Run the worker to completion.
    ///
    /// Fails without spawning when the executable is absent. Succeeds only on
    /// exit status zero; in watch mode this waits for the long-running process
    /// to end.
    pub async fn launch(&self, artifact: &Path, watch: bool) -> BuildResult<()> {
        if !self.executable.is_file() {
            return Err(BuildError::worker_missing(&self.executable));
        }

        let mut cmd = Command::new(&self.executable);
        cmd.args(Self::args(artifact, watch))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(env) = &self.env {
            cmd.envs(env.iter());
        }
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }

        info!(
            worker = %self.executable.display(),
            artifact = %artifact.display(),
            watch,
            "Starting worker"
        );
        let mut child = cmd.spawn().map_err(BuildError::worker_spawn)?;
        debug!(pid = ?child.id(), "Worker started");

        let status = child.wait().await.map_err(BuildError::worker_spawn)?;
        if status.success() {
            info!("Worker finished");
            Ok(())
        } else {
            Err(BuildError::worker_exit(status.code()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use tempfile::TempDir;

    #[test]
    fn test_args_with_and_without_watch() {
        let artifact = Path::new("/p/.packr.json");
        assert_eq!(WorkerLauncher::args(artifact, false), vec!["/p/.packr.json"]);
        assert_eq!(
            WorkerLauncher::args(artifact, true),
            vec!["/p/.packr.json", "--watch"]
        );
    }

    #[test]
    fn test_locate_uses_fixed_location() {
        let launcher = WorkerLauncher::locate(Path::new("/p"));
        assert_eq!(
            launcher.executable(),
            Path::new("/p").join("bin").join(worker_file_name())
        );
    }

    #[tokio::test]
    async fn test_missing_worker_fails_before_spawn() {
        let temp = TempDir::new().unwrap();
        let launcher = WorkerLauncher::locate(temp.path());
        let err = launcher
            .launch(&temp.path().join(".packr.json"), false)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::WorkerMissing);
        assert!(err.message.contains("packr-worker"));
        assert!(err.details.unwrap().contains("Build the packr worker first"));
    }
}
