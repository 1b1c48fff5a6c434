//! Build-tool detection over a fetched source tree.

use std::fmt;
use std::path::Path;

use cutover_core::{BuildPlanError, FileSystem};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildTool {
    MavenWrapper,
    Maven,
    GradleWrapper,
    Gradle,
}

impl BuildTool {
    pub fn has_wrapper(self) -> bool {
        matches!(self, BuildTool::MavenWrapper | BuildTool::GradleWrapper)
    }

    pub fn is_maven(self) -> bool {
        matches!(self, BuildTool::MavenWrapper | BuildTool::Maven)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BuildTool::MavenWrapper => "maven-wrapper",
            BuildTool::Maven => "maven",
            BuildTool::GradleWrapper => "gradle-wrapper",
            BuildTool::Gradle => "gradle",
        }
    }
}

impl fmt::Display for BuildTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wrapper files win over bare manifests; when both manifest families are
/// present with no wrapper the call is ambiguous and falls back to the most
/// portable system toolchain (Maven) instead of failing.
pub fn detect_build_tool(root: &Path, fs: &dyn FileSystem) -> Result<BuildTool, BuildPlanError> {
    let has_mvnw = fs.exists(&root.join("mvnw"));
    let has_gradlew = fs.exists(&root.join("gradlew"));
    let has_pom = fs.exists(&root.join("pom.xml"));
    let has_gradle =
        fs.exists(&root.join("build.gradle")) || fs.exists(&root.join("build.gradle.kts"));

    let tool = if has_mvnw && has_pom {
        BuildTool::MavenWrapper
    } else if has_gradlew && has_gradle {
        BuildTool::GradleWrapper
    } else if has_pom && has_gradle {
        debug!(root = %root.display(), "Both pom.xml and build.gradle present, defaulting to system maven");
        BuildTool::Maven
    } else if has_pom {
        BuildTool::Maven
    } else if has_gradle {
        BuildTool::Gradle
    } else {
        return Err(BuildPlanError::UnsupportedToolchain(
            root.display().to_string(),
        ));
    };

    debug!(root = %root.display(), tool = %tool, "Detected build tool");
    Ok(tool)
}
