//! Recording fakes for the external collaborators of the pipeline.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use cutover_core::{ExecError, FetchError, LogStream, RouterReloadError};
use cutover_pipeline::StatusProbe;
use cutover_runtime::{CommitRef, ContainerRuntime, RunSpec, SourceFetcher, TrafficRouter};
use tokio::sync::Notify;

/// Container runtime that records every call instead of shelling out.
#[derive(Default)]
pub struct RecordingRuntime {
    pub ops: Mutex<Vec<String>>,
    pub runs: Mutex<Vec<RunSpec>>,
    pub existing: Mutex<HashSet<String>>,
    pub build_exit_code: Mutex<Option<i32>>,
}

impl RecordingRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_existing(names: &[&str]) -> Self {
        let runtime = Self::default();
        let mut existing = runtime.existing.lock().unwrap();
        for name in names {
            existing.insert(name.to_string());
        }
        drop(existing);
        runtime
    }

    pub fn fail_builds_with(&self, exit_code: i32) {
        *self.build_exit_code.lock().unwrap() = Some(exit_code);
    }

    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    pub fn removals_of(&self, name: &str) -> usize {
        self.ops()
            .iter()
            .filter(|op| *op == &format!("rm {name}"))
            .count()
    }
}

#[async_trait]
impl ContainerRuntime for RecordingRuntime {
    async fn build_image(
        &self,
        _context: &Path,
        _dockerfile: &Path,
        tag: &str,
        log: &LogStream,
    ) -> Result<(), ExecError> {
        self.ops.lock().unwrap().push(format!("build {tag}"));
        log.append(format!("Successfully built {tag}"));
        if let Some(code) = *self.build_exit_code.lock().unwrap() {
            return Err(ExecError::NonZeroExit {
                program: "docker".to_string(),
                code,
            });
        }
        Ok(())
    }

    async fn run_container(&self, spec: &RunSpec, _log: &LogStream) -> Result<(), ExecError> {
        self.ops.lock().unwrap().push(format!("run {}", spec.name));
        self.runs.lock().unwrap().push(spec.clone());
        self.existing.lock().unwrap().insert(spec.name.clone());
        Ok(())
    }

    async fn remove_container(&self, name: &str, _log: &LogStream) -> Result<(), ExecError> {
        self.ops.lock().unwrap().push(format!("rm {name}"));
        self.existing.lock().unwrap().remove(name);
        Ok(())
    }

    async fn container_exists(&self, name: &str) -> Result<bool, ExecError> {
        self.ops.lock().unwrap().push(format!("inspect {name}"));
        Ok(self.existing.lock().unwrap().contains(name))
    }
}

#[derive(Default)]
pub struct RecordingRouter {
    pub targets: Mutex<Vec<u16>>,
    pub reloads: AtomicUsize,
}

impl RecordingRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn targets(&self) -> Vec<u16> {
        self.targets.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrafficRouter for RecordingRouter {
    async fn set_target(&self, port: u16) -> Result<(), RouterReloadError> {
        self.targets.lock().unwrap().push(port);
        Ok(())
    }

    async fn reload(&self, _log: &LogStream) -> Result<(), RouterReloadError> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Drops a maven-wrapper tree into the destination instead of cloning.
pub struct FakeFetcher {
    pub fail: bool,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl SourceFetcher for FakeFetcher {
    async fn fetch(
        &self,
        repository_url: &str,
        destination: &Path,
        log: &LogStream,
    ) -> Result<CommitRef, FetchError> {
        if self.fail {
            return Err(FetchError::CloneFailed {
                url: repository_url.to_string(),
                exit_code: 128,
            });
        }
        std::fs::write(destination.join("mvnw"), "#!/bin/sh\n").unwrap();
        std::fs::write(
            destination.join("pom.xml"),
            "<project>\n  <artifactId>petclinic</artifactId>\n</project>\n",
        )
        .unwrap();
        log.append("Cloning into workspace...");
        Ok(CommitRef("c0ffee0123456789c0ffee0123456789c0ffee01".to_string()))
    }
}

/// Health probe scripted per port. A port can additionally be gated so the
/// first probe against it blocks until the test releases it.
pub struct PortProbe {
    healthy_ports: HashSet<u16>,
    gated_port: Option<u16>,
    pub gate: Arc<Notify>,
    pub gate_hit: Arc<AtomicBool>,
}

impl PortProbe {
    pub fn healthy(ports: &[u16]) -> Self {
        Self {
            healthy_ports: ports.iter().copied().collect(),
            gated_port: None,
            gate: Arc::new(Notify::new()),
            gate_hit: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn unhealthy() -> Self {
        Self::healthy(&[])
    }

    pub fn gated_on(mut self, port: u16) -> Self {
        self.gated_port = Some(port);
        self
    }
}

#[async_trait]
impl StatusProbe for PortProbe {
    async fn status_body(&self, url: &str) -> Result<String> {
        let port: u16 = url
            .split(':')
            .nth(2)
            .and_then(|rest| rest.split('/').next())
            .and_then(|p| p.parse().ok())
            .unwrap_or(0);

        if self.gated_port == Some(port) && !self.gate_hit.swap(true, Ordering::SeqCst) {
            self.gate.notified().await;
        }

        if self.healthy_ports.contains(&port) {
            Ok(r#"{"status":"UP"}"#.to_string())
        } else {
            Err(anyhow::anyhow!("connection refused"))
        }
    }
}
