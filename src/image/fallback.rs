use super::{ImageMetadata, ImageMetadataProvider, MetadataError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Tries a primary provider and falls back when it cannot answer
///
/// Typically the local daemon first and the registry second: an unreachable
/// daemon, or an image that was never pulled locally, goes to the registry.
/// Any other failure from the primary is returned as is.
pub struct FallbackProvider {
    primary: Arc<dyn ImageMetadataProvider>,
    fallback: Arc<dyn ImageMetadataProvider>,
}

impl FallbackProvider {
    pub fn new(
        primary: Arc<dyn ImageMetadataProvider>,
        fallback: Arc<dyn ImageMetadataProvider>,
    ) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl ImageMetadataProvider for FallbackProvider {
    async fn image_metadata(&self, image: &str) -> Result<ImageMetadata, MetadataError> {
        match self.primary.image_metadata(image).await {
            Err(e) if e.is_retryable_elsewhere() => {
                debug!(
                    image,
                    primary = self.primary.name(),
                    fallback = self.fallback.name(),
                    error = %e,
                    "Falling back to secondary image metadata provider"
                );
                self.fallback.image_metadata(image).await
            }
            result => result,
        }
    }

    fn name(&self) -> &str {
        "fallback"
    }
}
