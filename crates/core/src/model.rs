//! Project and Deployment records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One of the two release slots. Only one color serves traffic at a time;
/// releases alternate slots so cutover is a router pointer flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Color {
    Blue,
    Green,
}

impl Color {
    pub fn opposite(self) -> Self {
        match self {
            Color::Blue => Color::Green,
            Color::Green => Color::Blue,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Color::Blue => "blue",
            Color::Green => "green",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deployable application. Created on the first deploy request for a new
/// name, mutated by the release orchestrator on successful cutover.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub repository_url: String,
    pub has_database: bool,
    /// Set exactly once, on first provisioning. Never regenerated while the
    /// sidecar container exists.
    pub db_user: Option<String>,
    pub db_password: Option<String>,
    pub active_color: Color,
    pub active_port: u16,
    pub last_deployed_at: Option<DateTime<Utc>>,
}

impl Project {
    /// `blue_port` is the BLUE slot of the configured port pool; a fresh
    /// project starts there so its first release lands on GREEN.
    pub fn new(
        name: impl Into<String>,
        repository_url: impl Into<String>,
        blue_port: u16,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            repository_url: repository_url.into(),
            has_database: false,
            db_user: None,
            db_password: None,
            active_color: Color::Blue,
            active_port: blue_port,
            last_deployed_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentStatus {
    Pending,
    Cloning,
    Analyzing,
    BuildingImage,
    ProvisioningDb,
    Deploying,
    Live,
    /// An expected, reported failure (health timeout, non-zero build).
    Failed,
    /// An unanticipated fault. Terminal, like `Failed`.
    Error,
}

impl DeploymentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DeploymentStatus::Live | DeploymentStatus::Failed | DeploymentStatus::Error
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeploymentStatus::Pending => "PENDING",
            DeploymentStatus::Cloning => "CLONING",
            DeploymentStatus::Analyzing => "ANALYZING",
            DeploymentStatus::BuildingImage => "BUILDING_IMAGE",
            DeploymentStatus::ProvisioningDb => "PROVISIONING_DB",
            DeploymentStatus::Deploying => "DEPLOYING",
            DeploymentStatus::Live => "LIVE",
            DeploymentStatus::Failed => "FAILED",
            DeploymentStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One build-and-release attempt against a project. Created in `Pending` by
/// intake, exclusively mutated by the pipeline thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub project_id: String,
    pub status: DeploymentStatus,
    /// Commit hash of the fetched snapshot, recorded after the clone.
    pub commit: Option<String>,
    pub created_at: DateTime<Utc>,
    pub failure_reason: Option<String>,
}

impl Deployment {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            status: DeploymentStatus::Pending,
            commit: None,
            created_at: Utc::now(),
            failure_reason: None,
        }
    }

    /// First eight characters of the id, used to label workspaces and logs.
    pub fn job_id(&self) -> &str {
        &self.id[..self.id.len().min(8)]
    }
}
