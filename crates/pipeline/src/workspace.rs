//! Per-build scratch directory allocation and cleanup.

use std::path::{Path, PathBuf};

use cutover_core::config::WorkspacePolicy;
use cutover_core::{CutoverConfig, WorkspaceError};
use tracing::{info, warn};
use uuid::Uuid;

pub struct WorkspaceManager {
    root: PathBuf,
    policy: WorkspacePolicy,
}

impl WorkspaceManager {
    pub fn new(config: &CutoverConfig) -> Self {
        Self {
            root: config.workspace_root.clone(),
            policy: config.workspace_policy,
        }
    }

    /// Allocate a fresh, uniquely named directory for one build.
    pub fn create(&self, job_id: &str) -> Result<PathBuf, WorkspaceError> {
        let suffix = Uuid::new_v4().simple().to_string();
        let path = self
            .root
            .join(format!("cutover-build-{job_id}-{}", &suffix[..8]));

        if path.exists() {
            return Err(WorkspaceError::AlreadyExists(path.display().to_string()));
        }
        std::fs::create_dir_all(&path)?;

        info!(workspace = %path.display(), "Workspace created");
        Ok(path)
    }

    /// Best-effort cleanup. With the default `Retain` policy the directory
    /// is left on disk so operators can inspect failed builds; cleanup
    /// failure is logged, never fatal.
    pub fn release(&self, workspace: &Path) {
        match self.policy {
            WorkspacePolicy::Retain => {
                info!(workspace = %workspace.display(), "Retaining workspace for inspection");
            }
            WorkspacePolicy::Remove => {
                if let Err(err) = std::fs::remove_dir_all(workspace) {
                    warn!(
                        workspace = %workspace.display(),
                        error = %err,
                        "Failed to remove workspace"
                    );
                }
            }
        }
    }
}
