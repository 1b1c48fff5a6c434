//! The deployment engine: one `start_build` call walks a single deployment
//! from PENDING to a terminal state.

use std::sync::Arc;

use anyhow::anyhow;
use cutover_core::{
    CutoverConfig, DeployError, Deployment, DeploymentStatus, DeploymentStore, LogSink, LogStream,
    Project, ProjectStore, RealFileSystem,
};
use cutover_plan::{detect_build_tool, pom, strategy_for, PlanContext, StrategyKind};
use cutover_runtime::{ContainerRuntime, SourceFetcher, TrafficRouter};
use tracing::{error, info};

use crate::health::{HealthChecker, StatusProbe};
use crate::lease::ProjectLeases;
use crate::provision::DependencyProvisioner;
use crate::release::ReleaseOrchestrator;
use crate::workspace::WorkspaceManager;

pub struct DeployEngine {
    projects: Arc<dyn ProjectStore>,
    deployments: Arc<dyn DeploymentStore>,
    fetcher: Arc<dyn SourceFetcher>,
    runtime: Arc<dyn ContainerRuntime>,
    sink: Arc<LogSink>,
    workspaces: WorkspaceManager,
    provisioner: DependencyProvisioner,
    orchestrator: ReleaseOrchestrator,
    leases: ProjectLeases,
    config: CutoverConfig,
    strategy: StrategyKind,
}

impl DeployEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        deployments: Arc<dyn DeploymentStore>,
        runtime: Arc<dyn ContainerRuntime>,
        router: Arc<dyn TrafficRouter>,
        fetcher: Arc<dyn SourceFetcher>,
        probe: Arc<dyn StatusProbe>,
        sink: Arc<LogSink>,
        config: CutoverConfig,
        strategy: StrategyKind,
    ) -> Self {
        let checker = HealthChecker::new(probe, config.health_marker.clone());
        Self {
            workspaces: WorkspaceManager::new(&config),
            provisioner: DependencyProvisioner::new(
                runtime.clone(),
                projects.clone(),
                config.clone(),
            ),
            orchestrator: ReleaseOrchestrator::new(
                runtime.clone(),
                router,
                projects.clone(),
                checker,
                config.clone(),
            ),
            leases: ProjectLeases::new(),
            projects,
            deployments,
            fetcher,
            runtime,
            sink,
            config,
            strategy,
        }
    }

    /// Run the deployment as its own task. Aborting the handle cancels the
    /// pipeline at its next await point.
    pub fn spawn(self: &Arc<Self>, deployment_id: String) -> tokio::task::JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.start_build(&deployment_id).await })
    }

    /// Execute the whole pipeline for an existing PENDING deployment.
    /// Calling twice with the same id performs two runs; there is no dedup.
    pub async fn start_build(&self, deployment_id: &str) {
        let log = LogStream::new(self.sink.clone(), deployment_id);

        match self.run_pipeline(deployment_id, &log).await {
            Ok(()) => {
                info!(deployment = %deployment_id, "Deployment live");
            }
            Err(err) => {
                let status = if err.is_expected() {
                    DeploymentStatus::Failed
                } else {
                    DeploymentStatus::Error
                };
                error!(deployment = %deployment_id, error = %err, status = %status, "Deployment did not go live");
                log.append(format!("Deployment failed: {err}"));

                if let Some(mut deployment) = self.deployments.find(deployment_id).await {
                    deployment.status = status;
                    deployment.failure_reason = Some(err.to_string());
                    self.deployments.save(deployment).await;
                }
            }
        }
    }

    async fn run_pipeline(&self, deployment_id: &str, log: &LogStream) -> Result<(), DeployError> {
        let mut deployment = self
            .deployments
            .find(deployment_id)
            .await
            .ok_or_else(|| anyhow!("unknown deployment {deployment_id}"))?;
        let mut project = self
            .projects
            .find(&deployment.project_id)
            .await
            .ok_or_else(|| anyhow!("unknown project {}", deployment.project_id))?;

        info!(deployment = %deployment.id, project = %project.name, "Engine started");
        log.append(format!("Engine started for {}", project.name));

        self.transition(&mut deployment, DeploymentStatus::Cloning, log)
            .await;
        let workspace = self.workspaces.create(deployment.job_id())?;

        let result = self
            .run_in_workspace(&workspace, &mut deployment, &mut project, log)
            .await;
        self.workspaces.release(&workspace);
        result
    }

    async fn run_in_workspace(
        &self,
        workspace: &std::path::Path,
        deployment: &mut Deployment,
        project: &mut Project,
        log: &LogStream,
    ) -> Result<(), DeployError> {
        let commit = self
            .fetcher
            .fetch(&project.repository_url, workspace, log)
            .await?;
        deployment.commit = Some(commit.0.clone());
        self.deployments.save(deployment.clone()).await;
        log.append(format!("Fetched {}", commit.short()));

        self.transition(deployment, DeploymentStatus::Analyzing, log)
            .await;
        let fs = RealFileSystem;
        let tool = detect_build_tool(workspace, &fs)?;
        let artifact = if tool.is_maven() {
            std::fs::read_to_string(workspace.join("pom.xml"))
                .map(|content| pom::artifact_id(&content))
                .unwrap_or_else(|_| project.name.clone())
        } else {
            project.name.clone()
        };

        let ctx = PlanContext::new(&self.config.runtime_version, tool, artifact);
        let strategy = strategy_for(self.strategy, tool);
        log.append(format!(
            "Build tool {tool}, strategy {}",
            strategy.name()
        ));
        let descriptor = strategy.descriptor(&ctx);
        let dockerfile = workspace.join("Dockerfile");
        std::fs::write(&dockerfile, &descriptor)
            .map_err(cutover_core::WorkspaceError::Io)?;

        self.transition(deployment, DeploymentStatus::BuildingImage, log)
            .await;
        let tag = format!(
            "{}/{}:{}",
            self.config.image_namespace, project.name, deployment.id
        );
        log.append(format!("Building image {tag}"));
        self.runtime
            .build_image(workspace, &dockerfile, &tag, log)
            .await
            .map_err(|e| match e.exit_code() {
                Some(code) => DeployError::Build { exit_code: code },
                None => DeployError::Runtime(e.to_string()),
            })?;

        if project.has_database {
            self.transition(deployment, DeploymentStatus::ProvisioningDb, log)
                .await;
            self.provisioner.ensure(project, log).await?;
        }

        // Exclusive per-project lease: held from before DEPLOYING until the
        // routing state is persisted, released on any exit from this scope.
        let _lease = self.leases.acquire(&project.id).await;

        // Another deployment may have cut over while we waited; its routing
        // state is the one to flip from.
        if let Some(fresh) = self.projects.find(&project.id).await {
            *project = fresh;
        }

        self.transition(deployment, DeploymentStatus::Deploying, log)
            .await;
        self.orchestrator.release(project, &tag, log).await?;

        self.transition(deployment, DeploymentStatus::Live, log)
            .await;
        Ok(())
    }

    async fn transition(&self, deployment: &mut Deployment, status: DeploymentStatus, log: &LogStream) {
        deployment.status = status;
        self.deployments.save(deployment.clone()).await;
        info!(deployment = %deployment.id, status = %status, "Status transition");
        log.append(format!("==> {status}"));
    }
}
