//! Build Plan Generator.
//!
//! Pure mapping from `(runtime version, detected build tool)` to a
//! multi-stage container build descriptor. Detection inspects the fetched
//! source tree for tool-specific wrapper files; generation is polymorphic
//! over [`BuildStrategy`] so the slower ahead-of-time path can be selected
//! without changing the contract.

pub mod detect;
pub mod pom;
pub mod strategy;

pub use detect::{detect_build_tool, BuildTool};
pub use strategy::{
    strategy_for, BuildStrategy, NativeImage, PlanContext, StrategyKind, SystemToolchain,
    WrapperBuild,
};
