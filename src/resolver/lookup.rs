use crate::image::{ImageMetadata, ImageMetadataProvider, MetadataError};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Per-resolution memo over a metadata provider
///
/// Every distinct image name reaches the provider at most once per resolution,
/// whether the answer was metadata or an error. Each query is bounded by the
/// configured timeout.
pub(crate) struct ImageLookup<'a> {
    provider: &'a dyn ImageMetadataProvider,
    timeout: Duration,
    answers: HashMap<String, Result<ImageMetadata, MetadataError>>,
}

impl<'a> ImageLookup<'a> {
    pub(crate) fn new(provider: &'a dyn ImageMetadataProvider, timeout: Duration) -> Self {
        Self {
            provider,
            timeout,
            answers: HashMap::new(),
        }
    }

    pub(crate) async fn metadata(&mut self, image: &str) -> Result<ImageMetadata, MetadataError> {
        if let Some(answer) = self.answers.get(image) {
            return answer.clone();
        }

        debug!(image, provider = self.provider.name(), "Retrieving image config");
        let lookup = self.provider.image_metadata(image);
        let answer = match tokio::time::timeout(self.timeout, lookup).await {
            Ok(answer) => answer,
            Err(_) => Err(MetadataError::Timeout {
                image: image.to_string(),
                seconds: self.timeout.as_secs(),
            }),
        };

        self.answers.insert(image.to_string(), answer.clone());
        answer
    }
}
