use std::env;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use cutover_cli::commands::{CliArgs, Commands, DeployArgs, PlanArgs};
use cutover_cli::{project_name_from_url, NAME, VERSION};
use cutover_core::{
    CutoverConfig, Deployment, DeploymentStore, LogSink, MemoryStore, Project, ProjectStore,
    RealFileSystem,
};
use cutover_pipeline::{DeployEngine, HttpProbe};
use cutover_plan::{detect_build_tool, pom, strategy_for, PlanContext, StrategyKind};
use cutover_runtime::{DockerCli, GitFetcher, NginxRouter};
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging(&args);

    debug!("{} v{} starting", NAME, VERSION);

    let exit_code = match &args.command {
        Commands::Deploy(deploy_args) => handle_deploy(deploy_args).await,
        Commands::Plan(plan_args) => handle_plan(plan_args),
    };

    process::exit(exit_code);
}

fn init_logging(args: &CliArgs) {
    let level = if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    let mut filter = EnvFilter::from_default_env();
    if env::var("RUST_LOG").is_err() {
        filter = filter
            .add_directive(format!("cutover={}", level).parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap());
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}

fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!("Invalid log level '{}', defaulting to INFO", level_str);
            Level::INFO
        }
    }
}

async fn handle_deploy(args: &DeployArgs) -> i32 {
    let config = CutoverConfig::from_env();
    let store = Arc::new(MemoryStore::new());
    let sink = Arc::new(LogSink::new(
        config.log_channel_capacity,
        config.log_retained_deployments,
    ));

    let name = args
        .name
        .clone()
        .unwrap_or_else(|| project_name_from_url(&args.repo_url));
    info!(project = %name, url = %args.repo_url, "Deploy requested");

    // Find or create the project; the repository URL is mutable and the
    // last value wins.
    let mut project = match store.find_by_name(&name).await {
        Some(existing) => existing,
        None => Project::new(&name, &args.repo_url, config.blue_port),
    };
    project.repository_url = args.repo_url.clone();
    project.has_database = project.has_database || args.database;
    ProjectStore::save(&*store, project.clone()).await;

    let deployment = Deployment::new(&project.id);
    let deployment_id = deployment.id.clone();
    DeploymentStore::save(&*store, deployment).await;

    let strategy = if args.native {
        StrategyKind::Native
    } else {
        StrategyKind::Standard
    };

    let router = Arc::new(NginxRouter::new(config.router_config_path.clone()));
    let engine = Arc::new(DeployEngine::new(
        store.clone(),
        store.clone(),
        Arc::new(DockerCli::new()),
        router,
        Arc::new(GitFetcher),
        Arc::new(HttpProbe::new(Duration::from_secs(3))),
        sink.clone(),
        config,
        strategy,
    ));

    // Mirror the live log stream to stdout while the pipeline runs.
    let mut log_rx = sink.subscribe(&deployment_id);
    let printer = tokio::spawn(async move {
        while let Ok(line) = log_rx.recv().await {
            println!("{line}");
        }
    });

    engine.start_build(&deployment_id).await;
    printer.abort();

    let deployment = DeploymentStore::find(&*store, &deployment_id)
        .await
        .expect("deployment record vanished");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&deployment).unwrap());
    } else {
        println!("Deployment {} -> {}", deployment.id, deployment.status);
        if let Some(reason) = &deployment.failure_reason {
            println!("Reason: {reason}");
        }
    }

    match deployment.status {
        cutover_core::DeploymentStatus::Live => 0,
        _ => 1,
    }
}

fn handle_plan(args: &PlanArgs) -> i32 {
    let path = args
        .path
        .clone()
        .unwrap_or_else(|| env::current_dir().expect("failed to get current directory"));

    let fs = RealFileSystem;
    let tool = match detect_build_tool(&path, &fs) {
        Ok(tool) => tool,
        Err(err) => {
            eprintln!("{err}");
            return 1;
        }
    };

    let artifact = if tool.is_maven() {
        std::fs::read_to_string(path.join("pom.xml"))
            .map(|content| pom::artifact_id(&content))
            .unwrap_or_else(|_| "app".to_string())
    } else {
        "app".to_string()
    };

    let kind = if args.native {
        StrategyKind::Native
    } else {
        StrategyKind::Standard
    };
    let strategy = strategy_for(kind, tool);
    let ctx = PlanContext::new(&args.runtime_version, tool, artifact);

    print!("{}", strategy.descriptor(&ctx));
    0
}
