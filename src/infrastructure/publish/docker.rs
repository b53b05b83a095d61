//! Docker image publisher
//!
//! Builds with `docker buildx build --load` when buildx is present, falling
//! back to the classic `docker build`. Images are always built for
//! `linux/amd64` because every supported backend runs that platform.

use chrono::Utc;

use crate::domain::entities::{ImageRef, ImageSource};
use crate::domain::ports::{CommandError, CommandRunner, ImagePublisher, Invocation, PublishError};

use super::tag;

const PLATFORM: &str = "linux/amd64";

pub struct DockerPublisher<R: CommandRunner> {
    runner: R,
}

impl<R: CommandRunner> DockerPublisher<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    fn buildx_available(&self) -> bool {
        self.runner
            .run(&Invocation::new("docker").args(["buildx", "version"]))
            .map(|o| o.success)
            .unwrap_or(false)
    }

    fn build_invocation(&self, image: &ImageRef, source: &ImageSource) -> Invocation {
        let base = if self.buildx_available() {
            Invocation::new("docker").args([
                "buildx",
                "build",
                "--platform",
                PLATFORM,
                "--provenance=false",
                "--load",
            ])
        } else {
            tracing::info!("docker buildx not available; using docker build");
            Invocation::new("docker").args(["build", "--platform", PLATFORM])
        };

        base.arg("-f")
            .arg(source.dockerfile.display().to_string())
            .arg("-t")
            .arg(image.to_string())
            .arg(source.context.display().to_string())
            .env("DOCKER_BUILDKIT", "1")
    }
}

fn unavailable(err: CommandError) -> PublishError {
    PublishError::BuilderUnavailable(err.to_string())
}

impl<R: CommandRunner> ImagePublisher for DockerPublisher<R> {
    fn unique_tag(&self, source: &ImageSource) -> String {
        tag::unique_tag(&self.runner, &source.context, Utc::now())
    }

    fn publish(&self, image: &ImageRef, source: &ImageSource) -> Result<(), PublishError> {
        tracing::info!(image = %image, dockerfile = %source.dockerfile.display(), "building image");
        let build = self
            .runner
            .run_streaming(&self.build_invocation(image, source))
            .map_err(unavailable)?;
        if !build.success {
            return Err(PublishError::BuildFailed(format!(
                "docker build exited with {}",
                exit_code(build.code)
            )));
        }

        tracing::info!(image = %image, "pushing image");
        let push = self
            .runner
            .run_streaming(&Invocation::new("docker").arg("push").arg(image.to_string()))
            .map_err(unavailable)?;
        if !push.success {
            return Err(PublishError::PushFailed(format!(
                "docker push exited with {}",
                exit_code(push.code)
            )));
        }

        Ok(())
    }
}

fn exit_code(code: Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "a signal".to_string())
}
