use super::{ImageMetadata, ImageMetadataProvider, MetadataError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

/// Memoizes successful lookups across resolutions
///
/// Each image gets one cell that is initialized once; concurrent lookups of the
/// same image wait for the first one instead of querying again. Failed lookups
/// are not remembered. Entries live as long as the provider, which the caller
/// owns and may share between resolvers.
pub struct CachingProvider {
    inner: Arc<dyn ImageMetadataProvider>,
    entries: Mutex<HashMap<String, Arc<OnceCell<ImageMetadata>>>>,
}

impl CachingProvider {
    pub fn new(inner: Arc<dyn ImageMetadataProvider>) -> Self {
        Self {
            inner,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn cell(&self, image: &str) -> Arc<OnceCell<ImageMetadata>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.entry(image.to_string()).or_default().clone()
    }

    /// Number of images with a cached answer
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops the cell of a failed lookup unless another caller has since filled it
    fn forget(&self, image: &str, cell: &Arc<OnceCell<ImageMetadata>>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let stale = entries
            .get(image)
            .map_or(false, |current| Arc::ptr_eq(current, cell) && !current.initialized());
        if stale {
            entries.remove(image);
        }
    }
}

#[async_trait]
impl ImageMetadataProvider for CachingProvider {
    async fn image_metadata(&self, image: &str) -> Result<ImageMetadata, MetadataError> {
        let cell = self.cell(image);
        let result = cell
            .get_or_try_init(|| self.inner.image_metadata(image))
            .await
            .cloned();
        if result.is_err() {
            self.forget(image, &cell);
        }
        result
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
