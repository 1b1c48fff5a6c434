//! Stateful sidecar provisioning.
//!
//! Idempotently ensures a project's database container exists. An existing
//! sidecar is never recreated or reconfigured; losing data matters more
//! than an idempotent reset. Credentials are generated once and persisted
//! to the project *before* the container starts, so a crash in between is
//! recoverable by re-running provisioning.

use std::sync::Arc;

use cutover_core::{CutoverConfig, LogStream, Project, ProjectStore, ProvisioningError};
use cutover_runtime::{ContainerRuntime, RunSpec};
use tracing::info;
use uuid::Uuid;

const SIDECAR_IMAGE: &str = "postgres:16";
const DEFAULT_DB_USER: &str = "postgres";

pub struct DependencyProvisioner {
    runtime: Arc<dyn ContainerRuntime>,
    projects: Arc<dyn ProjectStore>,
    config: CutoverConfig,
}

impl DependencyProvisioner {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        projects: Arc<dyn ProjectStore>,
        config: CutoverConfig,
    ) -> Self {
        Self {
            runtime,
            projects,
            config,
        }
    }

    pub fn sidecar_name(project: &Project) -> String {
        format!("{}-db", project.name)
    }

    /// No-op unless the project opted into a database. Performs zero
    /// container-runtime calls in that case.
    pub async fn ensure(
        &self,
        project: &mut Project,
        log: &LogStream,
    ) -> Result<(), ProvisioningError> {
        if !project.has_database {
            return Ok(());
        }

        let name = Self::sidecar_name(project);
        let exists =
            self.runtime
                .container_exists(&name)
                .await
                .map_err(|e| ProvisioningError::Inspect {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;

        if exists {
            info!(sidecar = %name, "Sidecar already present, leaving it untouched");
            log.append(format!("Database sidecar {name} already running"));
            return Ok(());
        }

        if project.db_user.is_none() || project.db_password.is_none() {
            project.db_user = Some(DEFAULT_DB_USER.to_string());
            project.db_password = Some(Uuid::new_v4().to_string());
            self.projects.save(project.clone()).await;
            info!(project = %project.name, "Generated and persisted database credentials");
        } else {
            // Credentials survived an earlier crash between persist and
            // start; reuse them.
            info!(project = %project.name, "Reusing persisted database credentials");
        }

        let spec = RunSpec::new(&name, SIDECAR_IMAGE)
            .env("POSTGRES_USER", project.db_user.clone().unwrap_or_default())
            .env(
                "POSTGRES_PASSWORD",
                project.db_password.clone().unwrap_or_default(),
            )
            .env("POSTGRES_DB", project.name.clone())
            .network(self.config.network.clone())
            .restart("unless-stopped");

        log.append(format!("Starting database sidecar {name}"));
        self.runtime
            .run_container(&spec, log)
            .await
            .map_err(|e| ProvisioningError::Start {
                name,
                reason: e.to_string(),
            })?;

        Ok(())
    }
}
