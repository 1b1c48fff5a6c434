//! Blue-green release orchestration.
//!
//! Starts the candidate on the idle color, gates on health, repoints the
//! traffic router, decommissions the previous release and persists the new
//! routing state. On a failed health gate the candidate is left running
//! for inspection and routing stays untouched: fail forward, no traffic
//! impact.

use std::sync::Arc;

use chrono::Utc;
use cutover_core::{Color, CutoverConfig, DeployError, LogStream, Project, ProjectStore};
use cutover_runtime::{ContainerRuntime, RunSpec, TrafficRouter};
use tracing::{info, warn};

use crate::health::HealthChecker;
use crate::provision::DependencyProvisioner;

pub struct ReleaseOrchestrator {
    runtime: Arc<dyn ContainerRuntime>,
    router: Arc<dyn TrafficRouter>,
    projects: Arc<dyn ProjectStore>,
    checker: HealthChecker,
    config: CutoverConfig,
}

impl ReleaseOrchestrator {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        router: Arc<dyn TrafficRouter>,
        projects: Arc<dyn ProjectStore>,
        checker: HealthChecker,
        config: CutoverConfig,
    ) -> Self {
        Self {
            runtime,
            router,
            projects,
            checker,
            config,
        }
    }

    pub fn container_name(project: &Project, color: Color) -> String {
        format!("{}-{}", project.name, color)
    }

    /// Cut traffic over to a freshly built image. The caller must hold the
    /// project lease for the whole call.
    pub async fn release(
        &self,
        project: &mut Project,
        image_tag: &str,
        log: &LogStream,
    ) -> Result<(), DeployError> {
        let next_color = project.active_color.opposite();
        let next_port = self.config.port_for(next_color);
        let candidate = Self::container_name(project, next_color);

        info!(
            project = %project.name,
            color = %next_color,
            port = next_port,
            "Starting candidate release"
        );
        log.append(format!(
            "Deploying {next_color} release on port {next_port}"
        ));

        // A previous failed attempt may have left a candidate under the
        // same deterministic name; it has to go before the new one starts.
        let stale = self
            .runtime
            .container_exists(&candidate)
            .await
            .map_err(|e| DeployError::Runtime(e.to_string()))?;
        if stale {
            log.append(format!("Removing stale candidate container {candidate}"));
            self.runtime
                .remove_container(&candidate, log)
                .await
                .map_err(|e| DeployError::Runtime(e.to_string()))?;
        }

        let mut spec = RunSpec::new(&candidate, image_tag)
            .port(next_port, self.config.app_port)
            .network(self.config.network.clone());
        if project.has_database {
            let sidecar = DependencyProvisioner::sidecar_name(project);
            spec = spec
                .env(
                    "SPRING_DATASOURCE_URL",
                    format!("jdbc:postgresql://{sidecar}:5432/{}", project.name),
                )
                .env(
                    "SPRING_DATASOURCE_USERNAME",
                    project.db_user.clone().unwrap_or_default(),
                )
                .env(
                    "SPRING_DATASOURCE_PASSWORD",
                    project.db_password.clone().unwrap_or_default(),
                );
        }

        self.runtime
            .run_container(&spec, log)
            .await
            .map_err(|e| DeployError::Runtime(e.to_string()))?;

        let url = format!("http://127.0.0.1:{next_port}{}", self.config.health_path);
        log.append(format!("Waiting for {url} to report healthy"));
        let healthy = self
            .checker
            .poll(&url, self.config.health_interval, self.config.health_deadline)
            .await;

        if !healthy {
            // Leave the candidate running for inspection; the old release
            // keeps serving traffic.
            log.append(format!(
                "Health gate failed for {candidate}; routing left untouched"
            ));
            return Err(DeployError::HealthCheck {
                deadline_exceeded: true,
            });
        }

        // Cutover instant.
        self.router.set_target(next_port).await?;
        self.router.reload(log).await?;
        log.append(format!("Traffic cut over to {next_color} ({next_port})"));

        let previous = Self::container_name(project, project.active_color);
        if let Err(err) = self.runtime.remove_container(&previous, log).await {
            // Cutover already succeeded; a lingering old container is an
            // operator chore, not a deployment failure.
            warn!(container = %previous, error = %err, "Failed to remove previous release");
            log.append(format!("Warning: could not remove {previous}: {err}"));
        }

        project.active_color = next_color;
        project.active_port = next_port;
        project.last_deployed_at = Some(Utc::now());
        self.projects.save(project.clone()).await;

        info!(
            project = %project.name,
            color = %next_color,
            port = next_port,
            "Release live"
        );
        Ok(())
    }
}
