//! Project-local wrapper build (`./mvnw` / `./gradlew`).

use super::{BuildStrategy, PlanContext};

pub struct WrapperBuild;

impl BuildStrategy for WrapperBuild {
    fn name(&self) -> &'static str {
        "wrapper"
    }

    fn descriptor(&self, ctx: &PlanContext) -> String {
        let v = &ctx.runtime_version;
        let (wrapper, build_cmd, jar_glob) = if ctx.tool.is_maven() {
            ("mvnw", "./mvnw clean package -DskipTests", "target/*.jar")
        } else {
            ("gradlew", "./gradlew build -x test", "build/libs/*.jar")
        };

        format!(
            r#"# Build stage
FROM eclipse-temurin:{v}-jdk-jammy AS builder
WORKDIR /app
COPY . .
RUN chmod +x {wrapper}
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
