use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "cutover", about = "Single-application blue-green deployment engine")]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a repository into an image and cut traffic over to it
    Deploy(DeployArgs),
    /// Print the generated build descriptor for a local source tree
    Plan(PlanArgs),
}

#[derive(Parser, Debug)]
pub struct DeployArgs {
    /// Repository URL to deploy
    pub repo_url: String,

    /// Project name; derived from the URL when omitted
    #[arg(long)]
    pub name: Option<String>,

    /// Provision a database sidecar for this project
    #[arg(long)]
    pub database: bool,

    /// Use the ahead-of-time native compilation strategy
    #[arg(long)]
    pub native: bool,

    /// Print the final deployment record as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct PlanArgs {
    /// Source tree to analyze; defaults to the current directory
    pub path: Option<PathBuf>,

    /// Language runtime major version
    #[arg(long, default_value = "21")]
    pub runtime_version: String,

    /// Use the ahead-of-time native compilation strategy
    #[arg(long)]
    pub native: bool,
}
