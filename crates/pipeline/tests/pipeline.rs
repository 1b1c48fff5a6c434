//! End-to-end pipeline tests against recording fakes.

mod support;

use std::sync::Arc;
use std::time::Duration;

use cutover_core::config::WorkspacePolicy;
use cutover_core::{
    Color, CutoverConfig, Deployment, DeploymentStatus, DeploymentStore, LogSink, LogStream,
    MemoryStore, Project, ProjectStore,
};
use cutover_pipeline::{DependencyProvisioner, DeployEngine, StatusProbe};
use cutover_plan::StrategyKind;
use cutover_runtime::SourceFetcher;
use support::{FakeFetcher, PortProbe, RecordingRouter, RecordingRuntime};

struct Harness {
    engine: Arc<DeployEngine>,
    store: Arc<MemoryStore>,
    runtime: Arc<RecordingRuntime>,
    router: Arc<RecordingRouter>,
    sink: Arc<LogSink>,
    _workdir: tempfile::TempDir,
}

fn harness_with(
    runtime: RecordingRuntime,
    fetcher: Arc<dyn SourceFetcher>,
    probe: Arc<dyn StatusProbe>,
) -> Harness {
    let workdir = tempfile::tempdir().unwrap();
    let config = CutoverConfig {
        workspace_root: workdir.path().to_path_buf(),
        workspace_policy: WorkspacePolicy::Remove,
        ..CutoverConfig::default()
    };

    let store = Arc::new(MemoryStore::new());
    let runtime = Arc::new(runtime);
    let router = Arc::new(RecordingRouter::new());
    let sink = Arc::new(LogSink::new(1024, 16));

    let engine = Arc::new(DeployEngine::new(
        store.clone(),
        store.clone(),
        runtime.clone(),
        router.clone(),
        fetcher,
        probe,
        sink.clone(),
        config,
        StrategyKind::Standard,
    ));

    Harness {
        engine,
        store,
        runtime,
        router,
        sink,
        _workdir: workdir,
    }
}

fn harness(probe: Arc<dyn StatusProbe>) -> Harness {
    harness_with(RecordingRuntime::new(), Arc::new(FakeFetcher::new()), probe)
}

async fn seed(store: &MemoryStore, has_database: bool) -> (Project, Deployment) {
    let mut project = Project::new("petclinic", "https://example.com/petclinic.git", 8081);
    project.has_database = has_database;
    let deployment = Deployment::new(&project.id);
    ProjectStore::save(store, project.clone()).await;
    DeploymentStore::save(store, deployment.clone()).await;
    (project, deployment)
}

#[tokio::test]
async fn successful_cutover_flips_blue_to_green() {
    let h = harness(Arc::new(PortProbe::healthy(&[8082])));
    let (project, deployment) = seed(&h.store, false).await;

    let mut log_rx = h.sink.subscribe(&deployment.id);
    h.engine.start_build(&deployment.id).await;

    let deployment = DeploymentStore::find(&*h.store, &deployment.id)
        .await
        .unwrap();
    assert_eq!(deployment.status, DeploymentStatus::Live);
    assert_eq!(
        deployment.commit.as_deref(),
        Some("c0ffee0123456789c0ffee0123456789c0ffee01")
    );

    let project = ProjectStore::find(&*h.store, &project.id).await.unwrap();
    assert_eq!(project.active_color, Color::Green);
    assert_eq!(project.active_port, 8082);
    assert!(project.last_deployed_at.is_some());

    assert_eq!(h.router.targets(), vec![8082]);
    assert_eq!(
        h.router.reloads.load(std::sync::atomic::Ordering::SeqCst),
        1
    );
    assert_eq!(h.runtime.removals_of("petclinic-blue"), 1);

    // Image tag embeds the deployment id.
    let ops = h.runtime.ops();
    assert!(ops
        .iter()
        .any(|op| op == &format!("build cutover/petclinic:{}", deployment.id)));

    // Status transitions arrive in pipeline order on the log stream.
    let mut transitions = Vec::new();
    while let Ok(line) = log_rx.try_recv() {
        if let Some(status) = line.strip_prefix("==> ") {
            transitions.push(status.to_string());
        }
    }
    assert_eq!(
        transitions,
        vec!["CLONING", "ANALYZING", "BUILDING_IMAGE", "DEPLOYING", "LIVE"]
    );
}

#[tokio::test(start_paused = true)]
async fn health_timeout_fails_forward_without_traffic_impact() {
    let h = harness(Arc::new(PortProbe::unhealthy()));
    let (project, deployment) = seed(&h.store, false).await;

    h.engine.start_build(&deployment.id).await;

    let deployment = DeploymentStore::find(&*h.store, &deployment.id)
        .await
        .unwrap();
    assert_eq!(deployment.status, DeploymentStatus::Failed);
    assert!(deployment
        .failure_reason
        .as_deref()
        .unwrap()
        .contains("health check"));

    // Routing untouched, old release still live.
    let project = ProjectStore::find(&*h.store, &project.id).await.unwrap();
    assert_eq!(project.active_color, Color::Blue);
    assert_eq!(project.active_port, 8081);
    assert!(h.router.targets().is_empty());

    // The candidate is left running for inspection.
    let ops = h.runtime.ops();
    assert!(ops.iter().any(|op| op == "run petclinic-green"));
    assert_eq!(h.runtime.removals_of("petclinic-green"), 0);
    assert_eq!(h.runtime.removals_of("petclinic-blue"), 0);
}

#[tokio::test]
async fn build_failure_maps_to_failed_with_exit_code() {
    let runtime = RecordingRuntime::new();
    runtime.fail_builds_with(2);
    let h = harness_with(
        runtime,
        Arc::new(FakeFetcher::new()),
        Arc::new(PortProbe::healthy(&[8082])),
    );
    let (_, deployment) = seed(&h.store, false).await;

    h.engine.start_build(&deployment.id).await;

    let deployment = DeploymentStore::find(&*h.store, &deployment.id)
        .await
        .unwrap();
    assert_eq!(deployment.status, DeploymentStatus::Failed);
    assert!(deployment
        .failure_reason
        .as_deref()
        .unwrap()
        .contains("exit code 2"));
    // The pipeline stops before any container is started.
    assert!(!h.runtime.ops().iter().any(|op| op.starts_with("run ")));
}

#[tokio::test]
async fn fetch_failure_aborts_the_deployment() {
    let h = harness_with(
        RecordingRuntime::new(),
        Arc::new(FakeFetcher::failing()),
        Arc::new(PortProbe::healthy(&[8082])),
    );
    let (_, deployment) = seed(&h.store, false).await;

    h.engine.start_build(&deployment.id).await;

    let deployment = DeploymentStore::find(&*h.store, &deployment.id)
        .await
        .unwrap();
    assert_eq!(deployment.status, DeploymentStatus::Failed);
    assert!(h.runtime.ops().is_empty());
}

#[tokio::test]
async fn unknown_deployment_is_a_quiet_noop() {
    let h = harness(Arc::new(PortProbe::healthy(&[8082])));
    h.engine.start_build("no-such-deployment").await;
    assert!(h.runtime.ops().is_empty());
}

#[tokio::test]
async fn database_env_is_injected_only_when_opted_in() {
    let h = harness(Arc::new(PortProbe::healthy(&[8082])));
    let (_, deployment) = seed(&h.store, true).await;

    h.engine.start_build(&deployment.id).await;

    let deployment = DeploymentStore::find(&*h.store, &deployment.id)
        .await
        .unwrap();
    assert_eq!(deployment.status, DeploymentStatus::Live);

    let runs = h.runtime.runs.lock().unwrap().clone();
    let sidecar = runs.iter().find(|s| s.name == "petclinic-db").unwrap();
    assert!(sidecar.env.iter().any(|(k, _)| k == "POSTGRES_PASSWORD"));

    let candidate = runs.iter().find(|s| s.name == "petclinic-green").unwrap();
    assert!(candidate
        .env
        .iter()
        .any(|(k, v)| k == "SPRING_DATASOURCE_URL" && v.contains("petclinic-db")));

    // And the no-database case injects nothing.
    let h2 = harness(Arc::new(PortProbe::healthy(&[8082])));
    let (_, d2) = seed(&h2.store, false).await;
    h2.engine.start_build(&d2.id).await;
    let runs = h2.runtime.runs.lock().unwrap().clone();
    let candidate = runs.iter().find(|s| s.name == "petclinic-green").unwrap();
    assert!(candidate.env.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_deployments_of_one_project_serialize() {
    let probe = PortProbe::healthy(&[8081, 8082]).gated_on(8082);
    let gate = probe.gate.clone();
    let gate_hit = probe.gate_hit.clone();

    let h = harness(Arc::new(probe));
    let (project, first) = seed(&h.store, false).await;
    let second = Deployment::new(&project.id);
    DeploymentStore::save(&*h.store, second.clone()).await;

    let first_task = h.engine.spawn(first.id.clone());

    // Wait until the first deployment is inside DEPLOYING, parked on the
    // health gate while holding the project lease.
    while !gate_hit.load(std::sync::atomic::Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let second_task = h.engine.spawn(second.id.clone());
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The second run must not have begun DEPLOYING yet.
    let status = DeploymentStore::find(&*h.store, &second.id)
        .await
        .unwrap()
        .status;
    assert_ne!(status, DeploymentStatus::Deploying);
    assert_ne!(status, DeploymentStatus::Live);

    gate.notify_one();
    first_task.await.unwrap();
    second_task.await.unwrap();

    let first = DeploymentStore::find(&*h.store, &first.id).await.unwrap();
    let second = DeploymentStore::find(&*h.store, &second.id).await.unwrap();
    assert_eq!(first.status, DeploymentStatus::Live);
    assert_eq!(second.status, DeploymentStatus::Live);

    // First flipped to green, second flipped back to blue from fresh state.
    let project = ProjectStore::find(&*h.store, &project.id).await.unwrap();
    assert_eq!(project.active_color, Color::Blue);
    assert_eq!(project.active_port, 8081);
    assert_eq!(h.router.targets(), vec![8082, 8081]);
}

// --- Dependency provisioner -------------------------------------------------

fn provisioner(
    runtime: Arc<RecordingRuntime>,
    store: Arc<MemoryStore>,
) -> DependencyProvisioner {
    DependencyProvisioner::new(runtime, store, CutoverConfig::default())
}

fn log_for(id: &str) -> LogStream {
    LogStream::new(Arc::new(LogSink::new(64, 8)), id)
}

#[tokio::test]
async fn provisioner_without_database_makes_zero_runtime_calls() {
    let runtime = Arc::new(RecordingRuntime::new());
    let store = Arc::new(MemoryStore::new());
    let mut project = Project::new("petclinic", "https://example.com/p.git", 8081);
    ProjectStore::save(&*store, project.clone()).await;

    provisioner(runtime.clone(), store)
        .ensure(&mut project, &log_for("d1"))
        .await
        .unwrap();

    assert!(runtime.ops().is_empty());
}

#[tokio::test]
async fn existing_sidecar_is_never_recreated() {
    let runtime = Arc::new(RecordingRuntime::with_existing(&["petclinic-db"]));
    let store = Arc::new(MemoryStore::new());
    let mut project = Project::new("petclinic", "https://example.com/p.git", 8081);
    project.has_database = true;
    project.db_user = Some("postgres".to_string());
    project.db_password = Some("original-secret".to_string());
    ProjectStore::save(&*store, project.clone()).await;

    let p = provisioner(runtime.clone(), store.clone());
    p.ensure(&mut project, &log_for("d1")).await.unwrap();
    p.ensure(&mut project, &log_for("d2")).await.unwrap();

    assert_eq!(project.db_user.as_deref(), Some("postgres"));
    assert_eq!(project.db_password.as_deref(), Some("original-secret"));
    assert!(!runtime.ops().iter().any(|op| op.starts_with("run ")));
}

#[tokio::test]
async fn credentials_are_persisted_before_the_sidecar_starts() {
    let runtime = Arc::new(RecordingRuntime::new());
    let store = Arc::new(MemoryStore::new());
    let mut project = Project::new("petclinic", "https://example.com/p.git", 8081);
    project.has_database = true;
    ProjectStore::save(&*store, project.clone()).await;

    provisioner(runtime.clone(), store.clone())
        .ensure(&mut project, &log_for("d1"))
        .await
        .unwrap();

    let saved = ProjectStore::find(&*store, &project.id).await.unwrap();
    assert!(saved.db_user.is_some());
    assert!(saved.db_password.is_some());

    let runs = runtime.runs.lock().unwrap().clone();
    let sidecar = runs.iter().find(|s| s.name == "petclinic-db").unwrap();
    assert!(sidecar
        .env
        .iter()
        .any(|(k, v)| k == "POSTGRES_PASSWORD" && Some(v.as_str()) == saved.db_password.as_deref()));
    assert_eq!(sidecar.restart.as_deref(), Some("unless-stopped"));
}

#[tokio::test]
async fn crash_between_persist_and_start_reuses_credentials() {
    // Credentials already on the record, sidecar missing: exactly the state
    // a crash after persistence leaves behind.
    let runtime = Arc::new(RecordingRuntime::new());
    let store = Arc::new(MemoryStore::new());
    let mut project = Project::new("petclinic", "https://example.com/p.git", 8081);
    project.has_database = true;
    project.db_user = Some("postgres".to_string());
    project.db_password = Some("survivor".to_string());
    ProjectStore::save(&*store, project.clone()).await;

    provisioner(runtime.clone(), store)
        .ensure(&mut project, &log_for("d1"))
        .await
        .unwrap();

    assert_eq!(project.db_password.as_deref(), Some("survivor"));
    let runs = runtime.runs.lock().unwrap().clone();
    let sidecar = runs.iter().find(|s| s.name == "petclinic-db").unwrap();
    assert!(sidecar
        .env
        .iter()
        .any(|(k, v)| k == "POSTGRES_PASSWORD" && v == "survivor"));
}

#[tokio::test]
async fn stale_candidate_is_replaced_on_retry() {
    // A failed attempt left petclinic-green running; the retry must remove
    // it before starting the new candidate, and still remove blue once.
    let runtime = RecordingRuntime::with_existing(&["petclinic-green"]);
    let h = harness_with(
        runtime,
        Arc::new(FakeFetcher::new()),
        Arc::new(PortProbe::healthy(&[8082])),
    );
    let (_, deployment) = seed(&h.store, false).await;

    h.engine.start_build(&deployment.id).await;

    assert_eq!(h.runtime.removals_of("petclinic-green"), 1);
    assert_eq!(h.runtime.removals_of("petclinic-blue"), 1);
    let deployment = DeploymentStore::find(&*h.store, &deployment.id)
        .await
        .unwrap();
    assert_eq!(deployment.status, DeploymentStatus::Live);
}
