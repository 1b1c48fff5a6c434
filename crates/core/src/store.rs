//! Persistence trait seams and the in-memory store.
//!
//! The engine only needs lookup and full-record upsert; durable storage is
//! an external collaborator. `MemoryStore` backs the CLI and the tests.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::model::{Deployment, Project};

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn find(&self, id: &str) -> Option<Project>;
    async fn find_by_name(&self, name: &str) -> Option<Project>;
    /// Full-record upsert; no field-level updates, no optimistic locking.
    async fn save(&self, project: Project);
}

#[async_trait]
pub trait DeploymentStore: Send + Sync {
    async fn find(&self, id: &str) -> Option<Deployment>;
    async fn save(&self, deployment: Deployment);
}

#[derive(Default)]
pub struct MemoryStore {
    projects: RwLock<HashMap<String, Project>>,
    deployments: RwLock<HashMap<String, Deployment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn find(&self, id: &str) -> Option<Project> {
        self.projects.read().unwrap().get(id).cloned()
    }

    async fn find_by_name(&self, name: &str) -> Option<Project> {
        self.projects
            .read()
            .unwrap()
            .values()
            .find(|p| p.name == name)
            .cloned()
    }

    async fn save(&self, project: Project) {
        self.projects
            .write()
            .unwrap()
            .insert(project.id.clone(), project);
    }
}

#[async_trait]
impl DeploymentStore for MemoryStore {
    async fn find(&self, id: &str) -> Option<Deployment> {
        self.deployments.read().unwrap().get(id).cloned()
    }

    async fn save(&self, deployment: Deployment) {
        self.deployments
            .write()
            .unwrap()
            .insert(deployment.id.clone(), deployment);
    }
}
