//! The build-and-release pipeline.
//!
//! One deployment is one independently scheduled task walking a strictly
//! sequential chain: workspace → clone → build plan → image build →
//! (database provisioning)? → blue-green release behind a health gate.

pub mod engine;
pub mod health;
pub mod lease;
pub mod provision;
pub mod release;
pub mod workspace;

pub use engine::DeployEngine;
pub use health::{HealthChecker, HttpProbe, StatusProbe};
pub use lease::ProjectLeases;
pub use provision::DependencyProvisioner;
pub use release::ReleaseOrchestrator;
pub use workspace::WorkspaceManager;
