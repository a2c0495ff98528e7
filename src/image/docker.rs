use super::{ImageMetadata, ImageMetadataProvider, MetadataError};
use async_trait::async_trait;
use bollard::errors::Error as DockerError;
use bollard::Docker;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Reads image config from the local Docker daemon
///
/// The client is created on first use and reused for the lifetime of the
/// provider.
pub struct DockerDaemonProvider {
    client: Arc<Mutex<Option<Docker>>>,
}

impl DockerDaemonProvider {
    pub fn new() -> Self {
        Self {
            client: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_client(docker: Docker) -> Self {
        Self {
            client: Arc::new(Mutex::new(Some(docker))),
        }
    }

    fn client(&self) -> Result<Docker, MetadataError> {
        let mut lock = self.client.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = lock.as_ref() {
            return Ok(client.clone());
        }

        debug!("Connecting to Docker daemon");
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| MetadataError::DaemonUnavailable(e.to_string()))?;
        *lock = Some(docker.clone());
        Ok(docker)
    }
}

impl Default for DockerDaemonProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn classify(image: &str, err: DockerError) -> MetadataError {
    match err {
        DockerError::DockerResponseServerError {
            status_code: 404, ..
        } => MetadataError::NotFound {
            image: image.to_string(),
        },
        DockerError::DockerResponseServerError {
            status_code,
            message,
        } => MetadataError::Daemon {
            image: image.to_string(),
            message: format!("{} ({})", message, status_code),
        },
        other => MetadataError::DaemonUnavailable(other.to_string()),
    }
}

#[async_trait]
impl ImageMetadataProvider for DockerDaemonProvider {
    async fn image_metadata(&self, image: &str) -> Result<ImageMetadata, MetadataError> {
        let docker = self.client()?;
        debug!(image, "Inspecting image via Docker daemon");

        let inspect = docker
            .inspect_image(image)
            .await
            .map_err(|e| classify(image, e))?;

        let (working_dir, on_build) = match inspect.config {
            Some(config) => (config.working_dir, config.on_build),
            None => (None, None),
        };
        Ok(ImageMetadata::from_config(working_dir, on_build))
    }

    fn name(&self) -> &str {
        "docker-daemon"
    }
}
