//! Build strategies: one descriptor renderer per way of compiling the app.

mod native;
mod system;
mod wrapper;

pub use native::NativeImage;
pub use system::SystemToolchain;
pub use wrapper::WrapperBuild;

use crate::detect::BuildTool;

/// Inputs every strategy renders from.
#[derive(Debug, Clone)]
pub struct PlanContext {
    /// Language runtime major version, e.g. `"21"`.
    pub runtime_version: String,
    pub tool: BuildTool,
    /// Artifact name used by paths in ahead-of-time builds.
    pub artifact: String,
}

impl PlanContext {
    pub fn new(
        runtime_version: impl Into<String>,
        tool: BuildTool,
        artifact: impl Into<String>,
    ) -> Self {
        Self {
            runtime_version: runtime_version.into(),
            tool,
            artifact: artifact.into(),
        }
    }
}

/// Deterministic, side-effect-free descriptor generation. Output is pure
/// text; writing it into the workspace is the caller's concern.
pub trait BuildStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn descriptor(&self, ctx: &PlanContext) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    /// JVM build: project wrapper when the tree ships one, system toolchain
    /// otherwise.
    #[default]
    Standard,
    /// Ahead-of-time native compilation. Slower, selectable independently.
    Native,
}

pub fn strategy_for(kind: StrategyKind, tool: BuildTool) -> Box<dyn BuildStrategy> {
    match kind {
        StrategyKind::Standard if tool.has_wrapper() => Box::new(WrapperBuild),
        StrategyKind::Standard => Box::new(SystemToolchain),
        StrategyKind::Native => Box::new(NativeImage),
    }
}
