//! Failure taxonomy for the build-and-release pipeline.
//!
//! Every named variant is an expected, reported failure and maps the owning
//! deployment to `FAILED`. Anything that arrives as `Internal` was not
//! anticipated by a pipeline step and maps to `ERROR` instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("workspace directory already exists: {0}")]
    AlreadyExists(String),

    #[error("failed to allocate workspace: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("git clone of {url} failed with exit code {exit_code}")]
    CloneFailed { url: String, exit_code: i32 },

    #[error("could not resolve fetched commit: {0}")]
    CommitUnresolved(String),

    #[error("failed to launch git: {0}")]
    Spawn(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum BuildPlanError {
    #[error("no supported build tool found in {0}")]
    UnsupportedToolchain(String),
}

#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("failed to inspect sidecar {name}: {reason}")]
    Inspect { name: String, reason: String },

    #[error("failed to start sidecar {name}: {reason}")]
    Start { name: String, reason: String },
}

#[derive(Debug, Error)]
pub enum RouterReloadError {
    #[error("failed to write router config: {0}")]
    WriteConfig(#[from] std::io::Error),

    #[error("router reload exited with code {exit_code}")]
    ReloadFailed { exit_code: i32 },
}

/// Error from the streamed command runner.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("`{program}` exited with code {code}")]
    NonZeroExit { program: String, code: i32 },

    #[error("`{program}` terminated by signal")]
    Terminated { program: String },

    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl ExecError {
    /// Exit code, if the child ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecError::NonZeroExit { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Top-level pipeline error. One variant per failing component.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    BuildPlan(#[from] BuildPlanError),

    #[error("image build failed with exit code {exit_code}")]
    Build { exit_code: i32 },

    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),

    #[error("health check did not pass before the deadline")]
    HealthCheck { deadline_exceeded: bool },

    #[error(transparent)]
    RouterReload(#[from] RouterReloadError),

    #[error("container runtime call failed: {0}")]
    Runtime(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl DeployError {
    /// `true` for expected, reported failures; `false` for faults that the
    /// pipeline did not anticipate (these surface as `ERROR`, not `FAILED`).
    pub fn is_expected(&self) -> bool {
        !matches!(self, DeployError::Internal(_))
    }
}
