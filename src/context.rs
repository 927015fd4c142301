//! Configuration directory and workspace resolution for statelock.
//!
//! This module provides the "environment resolution" layer: it locates the
//! configuration directory, selects the current workspace, and turns the
//! configured backend into the [`StateTarget`] a lock request is made for.
//!
//! All commands must resolve their target through this module so that the
//! same directory and workspace always map to the same state (and lock).

use crate::config::types::LOCAL_WORKSPACE_DIR;
use crate::config::{BackendConfig, CONFIG_FILE_NAME, Config};
use crate::error::{Result, StateLockError};
use crate::locks::{SharedDirBackend, StateTarget};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Per-directory data directory (holds the selected workspace).
pub const DATA_DIR: &str = ".statelock";

/// File inside [`DATA_DIR`] naming the selected workspace.
pub const ENVIRONMENT_FILE: &str = "environment";

/// Environment variable overriding the selected workspace.
pub const WORKSPACE_ENV_VAR: &str = "STATELOCK_WORKSPACE";

/// Name of the workspace used when none is selected.
pub const DEFAULT_WORKSPACE: &str = "default";

/// Resolved paths and workspace for one invocation.
///
/// All paths are absolute.
#[derive(Debug, Clone)]
pub struct StateContext {
    /// Directory containing `statelock.yaml`.
    pub config_dir: PathBuf,

    /// Per-directory data directory (`{config_dir}/.statelock/`).
    pub data_dir: PathBuf,

    /// Selected workspace.
    pub workspace: String,
}

impl StateContext {
    /// Resolve the context for `dir` (default: current working directory),
    /// honoring the `STATELOCK_WORKSPACE` environment variable.
    pub fn resolve(dir: Option<&Path>) -> Result<Self> {
        let dir = match dir {
            Some(dir) => dir.to_path_buf(),
            None => env::current_dir().map_err(|e| {
                StateLockError::UserError(format!(
                    "failed to get current working directory: {}",
                    e
                ))
            })?,
        };

        Self::resolve_with(&dir, env::var(WORKSPACE_ENV_VAR).ok())
    }

    /// Resolve the context for `dir` with an explicit workspace override.
    ///
    /// This is useful for testing or when the environment is known.
    pub fn resolve_with<P: AsRef<Path>>(dir: P, workspace_override: Option<String>) -> Result<Self> {
        let dir = dir.as_ref();

        let config_dir = dir.canonicalize().map_err(|e| {
            StateLockError::UserError(format!(
                "configuration directory '{}' is not accessible: {}",
                dir.display(),
                e
            ))
        })?;
        if !config_dir.is_dir() {
            return Err(StateLockError::UserError(format!(
                "'{}' is not a directory",
                config_dir.display()
            )));
        }

        let data_dir = config_dir.join(DATA_DIR);

        let workspace = match workspace_override.filter(|w| !w.trim().is_empty()) {
            Some(workspace) => workspace.trim().to_string(),
            None => read_selected_workspace(&data_dir)?,
        };
        validate_workspace_name(&workspace)?;

        debug!(config_dir = %config_dir.display(), workspace = %workspace, "resolved context");

        Ok(Self {
            config_dir,
            data_dir,
            workspace,
        })
    }

    /// Get the path to the config file.
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    pub fn is_default_workspace(&self) -> bool {
        self.workspace == DEFAULT_WORKSPACE
    }

    /// Resolve the state target for the current workspace.
    ///
    /// `state_override` replaces the local state path and is rejected for
    /// backends that do not store state in a local file. A relative override
    /// is taken from the current working directory, like any other path on
    /// the command line; configured paths are relative to the config dir.
    pub fn resolve_target(&self, config: &Config, state_override: Option<&Path>) -> Result<StateTarget> {
        match &config.backend {
            BackendConfig::Local { path } => {
                let path = match state_override {
                    Some(path) => std::path::absolute(path).map_err(|e| {
                        StateLockError::UserError(format!(
                            "failed to resolve state path '{}': {}",
                            path.display(),
                            e
                        ))
                    })?,
                    None => self.absolute(&self.local_state_path(path)),
                };
                Ok(StateTarget::local(path))
            }
            BackendConfig::SharedDir { path } => {
                if let Some(state_path) = state_override {
                    return Err(StateLockError::UserError(format!(
                        "--state '{}' can only be used with the local backend (configured backend: {})",
                        state_path.display(),
                        config.backend.name()
                    )));
                }
                let backend = SharedDirBackend::new(self.absolute(path));
                Ok(StateTarget::shared(
                    format!("{}.tfstate", self.workspace),
                    Arc::new(backend),
                ))
            }
        }
    }

    /// Local state path for the current workspace.
    ///
    /// The default workspace uses the configured path; other workspaces live
    /// under `terraform.tfstate.d/<workspace>/`.
    fn local_state_path(&self, configured: &Path) -> PathBuf {
        if self.is_default_workspace() {
            return configured.to_path_buf();
        }

        let file_name = configured
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(crate::config::types::DEFAULT_STATE_FILE));
        let base = configured.parent().unwrap_or_else(|| Path::new(""));

        base.join(LOCAL_WORKSPACE_DIR)
            .join(&self.workspace)
            .join(file_name)
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        }
    }
}

fn read_selected_workspace(data_dir: &Path) -> Result<String> {
    let path = data_dir.join(ENVIRONMENT_FILE);
    match std::fs::read_to_string(&path) {
        Ok(content) if !content.trim().is_empty() => Ok(content.trim().to_string()),
        Ok(_) => Ok(DEFAULT_WORKSPACE.to_string()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DEFAULT_WORKSPACE.to_string()),
        Err(e) => Err(StateLockError::UserError(format!(
            "failed to read selected workspace from '{}': {}",
            path.display(),
            e
        ))),
    }
}

/// Workspace names become file and key names, so only a safe subset is allowed.
fn validate_workspace_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(StateLockError::UserError(format!(
            "invalid workspace name '{}': use letters, digits, '-', '_' and '.' (not leading)",
            name
        )))
    }
}
