//! Shared domain model and ambient services for the cutover deployment engine.
//!
//! Holds the `Project`/`Deployment` records, the persistence trait seams, the
//! per-deployment log sink, configuration, the error taxonomy, and a slim
//! filesystem abstraction used by build-tool detection.

pub mod config;
pub mod error;
pub mod fs;
pub mod logs;
pub mod model;
pub mod store;

pub use config::CutoverConfig;
pub use error::{
    BuildPlanError, DeployError, ExecError, FetchError, ProvisioningError, RouterReloadError,
    WorkspaceError,
};
pub use fs::{FileSystem, MockFileSystem, RealFileSystem};
pub use logs::{LogSink, LogStream};
pub use model::{Color, Deployment, DeploymentStatus, Project};
pub use store::{DeploymentStore, MemoryStore, ProjectStore};
