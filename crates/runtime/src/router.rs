//! Traffic router contract and the nginx implementation.
//!
//! The router owns one reloadable config artifact mapping external traffic
//! to a single internal port. Repointing it and reloading is the cutover
//! instant.

use std::path::PathBuf;

use async_trait::async_trait;
use cutover_core::{ExecError, LogStream, RouterReloadError};
use tracing::info;

use crate::exec::Cmd;

#[async_trait]
pub trait TrafficRouter: Send + Sync {
    /// Rewrite the config artifact to point at `port`. Takes effect only on
    /// the next [`TrafficRouter::reload`].
    async fn set_target(&self, port: u16) -> Result<(), RouterReloadError>;

    async fn reload(&self, log: &LogStream) -> Result<(), RouterReloadError>;
}

pub struct NginxRouter {
    config_path: PathBuf,
}

impl NginxRouter {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    fn upstream_config(port: u16) -> String {
        format!("upstream cutover_app {{\n    server 127.0.0.1:{port};\n}}\n")
    }
}

#[async_trait]
impl TrafficRouter for NginxRouter {
    async fn set_target(&self, port: u16) -> Result<(), RouterReloadError> {
        info!(port = port, path = %self.config_path.display(), "Repointing router target");
        tokio::fs::write(&self.config_path, Self::upstream_config(port)).await?;
        Ok(())
    }

    async fn reload(&self, log: &LogStream) -> Result<(), RouterReloadError> {
        match Cmd::new("nginx").args(["-s", "reload"]).stream(log).await {
            Ok(()) => Ok(()),
            Err(ExecError::NonZeroExit { code, .. }) => {
                Err(RouterReloadError::ReloadFailed { exit_code: code })
            }
            Err(ExecError::Terminated { .. }) => {
                Err(RouterReloadError::ReloadFailed { exit_code: -1 })
            }
            Err(ExecError::Spawn { source, .. }) => Err(RouterReloadError::WriteConfig(source)),
        }
    }
}
