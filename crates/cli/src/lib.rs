pub mod commands;

pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Project name derived from a repository URL:
/// `https://host/user/my-app.git` → `my-app`.
pub fn project_name_from_url(repo_url: &str) -> String {
    repo_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(repo_url)
        .trim_end_matches(".git")
        .to_string()
}
