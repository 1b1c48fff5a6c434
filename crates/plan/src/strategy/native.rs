//! Ahead-of-time native compilation. Much slower than the JVM strategies
//! and selected explicitly, never by detection.

use super::{BuildStrategy, PlanContext};

pub struct NativeImage;

impl BuildStrategy for NativeImage {
    fn name(&self) -> &'static str {
        "native-image"
    }

    fn descriptor(&self, ctx: &PlanContext) -> String {
        let v = &ctx.runtime_version;
        let artifact = &ctx.artifact;
        let (build_cmd, binary_path) = if ctx.tool.is_maven() {
            let cmd = if ctx.tool.has_wrapper() {
                "chmod +x mvnw && ./mvnw -Pnative native:compile -DskipTests"
            } else {
                "mvn -Pnative native:compile -DskipTests"
            };
            (cmd, format!("target/{artifact}"))
        } else {
            let cmd = if ctx.tool.has_wrapper() {
                "chmod +x gradlew && ./gradlew nativeCompile"
            } else {
                "gradle nativeCompile --no-daemon"
            };
            (cmd, format!("build/native/nativeCompile/{artifact}"))
        };

        format!(
            r#"# Build stage
FROM ghcr.io/graalvm/native-image-community:{v} AS builder
WORKDIR /app
COPY . .
RUN {build_cmd}

# Runtime stage
FROM ubuntu:jammy
RUN groupadd -r app && useradd -r -g app app
USER app
WORKDIR /app
COPY --from=builder /app/{binary_path} /app/runner
EXPOSE 8080
ENTRYPOINT ["/app/runner"]
"#
        )
    }
}
