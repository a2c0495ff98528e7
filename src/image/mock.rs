use super::{ImageMetadata, ImageMetadataProvider, MetadataError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory provider with canned answers and a call log
///
/// Unknown images answer [`MetadataError::NotFound`].
pub struct MockImageProvider {
    images: Mutex<HashMap<String, Result<ImageMetadata, MetadataError>>>,
    calls: Mutex<Vec<String>>,
}

impl MockImageProvider {
    pub fn new() -> Self {
        Self {
            images: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_image(self, image: impl Into<String>, metadata: ImageMetadata) -> Self {
        self.add_image(image, metadata);
        self
    }

    pub fn with_error(self, image: impl Into<String>, error: MetadataError) -> Self {
        self.add_error(image, error);
        self
    }

    pub fn add_image(&self, image: impl Into<String>, metadata: ImageMetadata) {
        self.images.lock().unwrap().insert(image.into(), Ok(metadata));
    }

    pub fn add_error(&self, image: impl Into<String>, error: MetadataError) {
        self.images.lock().unwrap().insert(image.into(), Err(error));
    }

    /// Every lookup in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, image: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == image).count()
    }
}

impl Default for MockImageProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageMetadataProvider for MockImageProvider {
    async fn image_metadata(&self, image: &str) -> Result<ImageMetadata, MetadataError> {
        self.calls.lock().unwrap().push(image.to_string());
        self.images
            .lock()
            .unwrap()
            .get(image)
            .cloned()
            .unwrap_or_else(|| {
                Err(MetadataError::NotFound {
                    image: image.to_string(),
                })
            })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
