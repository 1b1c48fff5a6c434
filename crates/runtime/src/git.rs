//! Source retrieval: full clone of the default branch into the workspace.

use std::path::Path;

use async_trait::async_trait;
use cutover_core::{ExecError, FetchError, LogStream};
use tracing::info;

use crate::exec::Cmd;

/// Commit hash of the fetched snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRef(pub String);

impl CommitRef {
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(8)]
    }
}

#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Clone `repository_url` into `destination`. Any failure aborts the
    /// deployment; there is no retry and no partial checkout fallback.
    async fn fetch(
        &self,
        repository_url: &str,
        destination: &Path,
        log: &LogStream,
    ) -> Result<CommitRef, FetchError>;
}

pub struct GitFetcher;

#[async_trait]
impl SourceFetcher for GitFetcher {
    async fn fetch(
        &self,
        repository_url: &str,
        destination: &Path,
        log: &LogStream,
    ) -> Result<CommitRef, FetchError> {
        info!(url = %repository_url, dest = %destination.display(), "Cloning repository");

        let clone = Cmd::new("git")
            .arg("clone")
            .arg(repository_url)
            .arg(destination.display().to_string())
            .stream(log)
            .await;

        match clone {
            Ok(()) => {}
            Err(ExecError::NonZeroExit { code, .. }) => {
                return Err(FetchError::CloneFailed {
                    url: repository_url.to_string(),
                    exit_code: code,
                })
            }
            Err(ExecError::Terminated { .. }) => {
                return Err(FetchError::CloneFailed {
                    url: repository_url.to_string(),
                    exit_code: -1,
                })
            }
            Err(ExecError::Spawn { source, .. }) => return Err(FetchError::Spawn(source)),
        }

        let head = Cmd::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(destination)
            .capture()
            .await
            .map_err(|e| FetchError::CommitUnresolved(e.to_string()))?;

        if head.is_empty() {
            return Err(FetchError::CommitUnresolved(
                "rev-parse returned no output".to_string(),
            ));
        }

        Ok(CommitRef(head))
    }
}
