//! Engine configuration with environment overrides.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::model::Color;

const DEFAULT_BLUE_PORT: u16 = 8081;
const DEFAULT_GREEN_PORT: u16 = 8082;
const DEFAULT_APP_PORT: u16 = 8080;
const DEFAULT_HEALTH_PATH: &str = "/actuator/health";
const DEFAULT_HEALTH_MARKER: &str = "\"status\":\"UP\"";
const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 5;
const DEFAULT_HEALTH_DEADLINE_SECS: u64 = 120;
const DEFAULT_NETWORK: &str = "cutover";
const DEFAULT_IMAGE_NAMESPACE: &str = "cutover";
const DEFAULT_RUNTIME_VERSION: &str = "21";
const DEFAULT_LOG_RETAINED_DEPLOYMENTS: usize = 64;
const DEFAULT_LOG_CHANNEL_CAPACITY: usize = 1024;

/// What to do with a build workspace once its deployment has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspacePolicy {
    /// Leave the directory on disk so operators can inspect failed builds.
    Retain,
    Remove,
}

#[derive(Debug, Clone)]
pub struct CutoverConfig {
    /// Parent directory for per-build workspaces.
    pub workspace_root: PathBuf,
    pub workspace_policy: WorkspacePolicy,
    /// Host port per color; the traffic-facing pool is exactly these two.
    pub blue_port: u16,
    pub green_port: u16,
    /// Fixed container-internal port the application listens on.
    pub app_port: u16,
    pub health_path: String,
    /// Substring of the status body that counts as a positive health signal.
    pub health_marker: String,
    pub health_interval: Duration,
    pub health_deadline: Duration,
    /// Docker network joined by releases and sidecars.
    pub network: String,
    /// Image tag prefix: `<namespace>/<project>:<deployment-id>`.
    pub image_namespace: String,
    /// Language runtime major version passed to the build plan generator.
    pub runtime_version: String,
    pub router_config_path: PathBuf,
    pub log_retained_deployments: usize,
    pub log_channel_capacity: usize,
}

impl Default for CutoverConfig {
    fn default() -> Self {
        Self {
            workspace_root: env::temp_dir(),
            workspace_policy: WorkspacePolicy::Retain,
            blue_port: DEFAULT_BLUE_PORT,
            green_port: DEFAULT_GREEN_PORT,
            app_port: DEFAULT_APP_PORT,
            health_path: DEFAULT_HEALTH_PATH.to_string(),
            health_marker: DEFAULT_HEALTH_MARKER.to_string(),
            health_interval: Duration::from_secs(DEFAULT_HEALTH_INTERVAL_SECS),
            health_deadline: Duration::from_secs(DEFAULT_HEALTH_DEADLINE_SECS),
            network: DEFAULT_NETWORK.to_string(),
            image_namespace: DEFAULT_IMAGE_NAMESPACE.to_string(),
            runtime_version: DEFAULT_RUNTIME_VERSION.to_string(),
            router_config_path: PathBuf::from("/etc/nginx/conf.d/cutover-upstream.conf"),
            log_retained_deployments: DEFAULT_LOG_RETAINED_DEPLOYMENTS,
            log_channel_capacity: DEFAULT_LOG_CHANNEL_CAPACITY,
        }
    }
}

impl CutoverConfig {
    /// Defaults layered with `CUTOVER_*` environment overrides. Unparseable
    /// values fall back to the default rather than failing startup.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(root) = env::var("CUTOVER_WORKSPACE_ROOT").ok().map(PathBuf::from) {
            cfg.workspace_root = root;
        }
        if let Some(keep) = env::var("CUTOVER_RETAIN_WORKSPACES")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
        {
            cfg.workspace_policy = if keep {
                WorkspacePolicy::Retain
            } else {
                WorkspacePolicy::Remove
            };
        }
        if let Some(port) = parse_env::<u16>("CUTOVER_BLUE_PORT") {
            cfg.blue_port = port;
        }
        if let Some(port) = parse_env::<u16>("CUTOVER_GREEN_PORT") {
            cfg.green_port = port;
        }
        if let Some(port) = parse_env::<u16>("CUTOVER_APP_PORT") {
            cfg.app_port = port;
        }
        if let Ok(path) = env::var("CUTOVER_HEALTH_PATH") {
            cfg.health_path = path;
        }
        if let Ok(marker) = env::var("CUTOVER_HEALTH_MARKER") {
            cfg.health_marker = marker;
        }
        if let Some(secs) = parse_env::<u64>("CUTOVER_HEALTH_INTERVAL_SECS") {
            cfg.health_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_env::<u64>("CUTOVER_HEALTH_DEADLINE_SECS") {
            cfg.health_deadline = Duration::from_secs(secs);
        }
        if let Ok(network) = env::var("CUTOVER_NETWORK") {
            cfg.network = network;
        }
        if let Ok(ns) = env::var("CUTOVER_IMAGE_NAMESPACE") {
            cfg.image_namespace = ns;
        }
        if let Ok(version) = env::var("CUTOVER_RUNTIME_VERSION") {
            cfg.runtime_version = version;
        }
        if let Some(path) = env::var("CUTOVER_ROUTER_CONFIG").ok().map(PathBuf::from) {
            cfg.router_config_path = path;
        }

        cfg
    }

    pub fn port_for(&self, color: Color) -> u16 {
        match color {
            Color::Blue => self.blue_port,
            Color::Green => self.green_port,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
