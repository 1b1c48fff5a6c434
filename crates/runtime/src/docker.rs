//! Container runtime contract and the docker CLI implementation.

use std::path::Path;

use async_trait::async_trait;
use cutover_core::{ExecError, LogStream};
use tracing::debug;

use crate::exec::Cmd;

/// Typed `docker run` invocation. Optional features (database env
/// injection, network attachment, restart policy) are value pairs rendered
/// into an argv list deterministically.
#[derive(Debug, Clone)]
pub struct RunSpec {
    pub name: String,
    pub image: String,
    /// `(host, container)` port bindings.
    pub ports: Vec<(u16, u16)>,
    pub env: Vec<(String, String)>,
    pub network: Option<String>,
    pub restart: Option<String>,
}

impl RunSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            ports: Vec::new(),
            env: Vec::new(),
            network: None,
            restart: None,
        }
    }

    pub fn port(mut self, host: u16, container: u16) -> Self {
        self.ports.push((host, container));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    pub fn restart(mut self, policy: impl Into<String>) -> Self {
        self.restart = Some(policy.into());
        self
    }

    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            self.name.clone(),
        ];
        for (host, container) in &self.ports {
            args.push("-p".to_string());
            args.push(format!("{host}:{container}"));
        }
        for (key, value) in &self.env {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }
        if let Some(network) = &self.network {
            args.push("--network".to_string());
            args.push(network.clone());
        }
        if let Some(policy) = &self.restart {
            args.push("--restart".to_string());
            args.push(policy.clone());
        }
        args.push(self.image.clone());
        args
    }
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Build an image from `context`, streaming tool output to `log`.
    async fn build_image(
        &self,
        context: &Path,
        dockerfile: &Path,
        tag: &str,
        log: &LogStream,
    ) -> Result<(), ExecError>;

    async fn run_container(&self, spec: &RunSpec, log: &LogStream) -> Result<(), ExecError>;

    async fn remove_container(&self, name: &str, log: &LogStream) -> Result<(), ExecError>;

    async fn container_exists(&self, name: &str) -> Result<bool, ExecError>;
}

/// Drives the `docker` binary through the streamed command runner.
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new() -> Self {
        Self {
            binary: "docker".to_string(),
        }
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn build_image(
        &self,
        context: &Path,
        dockerfile: &Path,
        tag: &str,
        log: &LogStream,
    ) -> Result<(), ExecError> {
        debug!(tag = %tag, context = %context.display(), "Building image");
        Cmd::new(&self.binary)
            .arg("build")
            .arg("-f")
            .arg(dockerfile.display().to_string())
            .arg("-t")
            .arg(tag)
            .arg(".")
            .current_dir(context)
            .stream(log)
            .await
    }

    async fn run_container(&self, spec: &RunSpec, log: &LogStream) -> Result<(), ExecError> {
        debug!(name = %spec.name, image = %spec.image, "Starting container");
        Cmd::new(&self.binary).args(spec.to_args()).stream(log).await
    }

    async fn remove_container(&self, name: &str, log: &LogStream) -> Result<(), ExecError> {
        debug!(name = %name, "Removing container");
        Cmd::new(&self.binary)
            .args(["rm", "-f", name])
            .stream(log)
            .await
    }

    async fn container_exists(&self, name: &str) -> Result<bool, ExecError> {
        let out = Cmd::new(&self.binary)
            .args([
                "ps",
                "-a",
                "--filter",
                &format!("name=^{name}$"),
                "--format",
                "{{.Names}}",
            ])
            .capture()
            .await?;
        Ok(out.lines().any(|line| line.trim() == name))
    }
}
