//! System-toolchain fallback build for trees that ship no wrapper script.

use super::{BuildStrategy, PlanContext};

pub struct SystemToolchain;

impl BuildStrategy for SystemToolchain {
    fn name(&self) -> &'static str {
        "system-toolchain"
    }

    fn descriptor(&self, ctx: &PlanContext) -> String {
        let v = &ctx.runtime_version;
        let (builder_image, build_cmd, jar_glob) = if ctx.tool.is_maven() {
            (
                format!("maven:3.9-eclipse-temurin-{v}"),
                "mvn clean package -DskipTests",
                "target/*.jar",
            )
        } else {
            (
                format!("gradle:8.5-jdk{v}"),
                "gradle assemble --no-daemon --console=plain",
                "build/libs/*.jar",
            )
        };

        format!(
            r#"# Build stage
FROM {builder_image} AS builder
WORKDIR /app
COPY . .
RUN {build_cmd}

# Runtime stage
FROM eclipse-temurin:{v}-jre-jammy
RUN groupadd -r app && useradd -r -g app app
USER app
WORKDIR /app
COPY --from=builder /app/{jar_glob} /app/app.jar
EXPOSE 8080
ENTRYPOINT ["java", "-jar", "/app/app.jar"]
"#
        )
    }
}
