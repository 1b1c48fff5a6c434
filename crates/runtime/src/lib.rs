//! External-process integrations: the streamed command runner and the
//! docker / nginx / git drivers built on top of it.

pub mod docker;
pub mod exec;
pub mod git;
pub mod router;

pub use docker::{ContainerRuntime, DockerCli, RunSpec};
pub use exec::Cmd;
pub use git::{CommitRef, GitFetcher, SourceFetcher};
pub use router::{NginxRouter, TrafficRouter};
