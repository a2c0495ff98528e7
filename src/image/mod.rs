//! Base image metadata lookups
//!
//! The resolver needs two facts about every base image: the working directory
//! it declares and the ONBUILD triggers it carries. Providers fetch them from
//! the local Docker daemon or straight from a registry.

mod cache;
mod docker;
mod fallback;
mod mock;
mod registry;

pub use cache::CachingProvider;
pub use docker::DockerDaemonProvider;
pub use fallback::FallbackProvider;
pub use mock::MockImageProvider;
pub use registry::{Platform, RegistryProvider};

use async_trait::async_trait;
use thiserror::Error;

/// Image configuration facts the resolver relies on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMetadata {
    /// Declared working directory, `/` when the image sets none
    pub working_dir: String,
    /// ONBUILD trigger lines in declaration order
    pub on_build: Vec<String>,
}

impl ImageMetadata {
    pub fn new(working_dir: impl Into<String>, on_build: Vec<String>) -> Self {
        Self::from_config(Some(working_dir.into()), Some(on_build))
    }

    /// Builds metadata from optional image config fields
    pub fn from_config(working_dir: Option<String>, on_build: Option<Vec<String>>) -> Self {
        let working_dir = working_dir
            .filter(|wd| !wd.is_empty())
            .unwrap_or_else(|| "/".to_string());
        Self {
            working_dir,
            on_build: on_build.unwrap_or_default(),
        }
    }
}

impl Default for ImageMetadata {
    fn default() -> Self {
        Self::from_config(None, None)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("Docker daemon unavailable: {0}")]
    DaemonUnavailable(String),

    #[error("image {image} not found")]
    NotFound { image: String },

    #[error("inspecting image {image}: {message}")]
    Daemon { image: String, message: String },

    #[error("invalid image reference {reference:?}: {message}")]
    InvalidReference { reference: String, message: String },

    #[error("registry request for {image} failed: {message}")]
    Registry { image: String, message: String },

    #[error("looking up {image} timed out after {seconds}s")]
    Timeout { image: String, seconds: u64 },
}

impl MetadataError {
    /// Whether another provider might still answer the lookup
    pub fn is_retryable_elsewhere(&self) -> bool {
        matches!(
            self,
            MetadataError::DaemonUnavailable(_) | MetadataError::NotFound { .. }
        )
    }
}

/// Source of base image metadata
#[async_trait]
pub trait ImageMetadataProvider: Send + Sync {
    /// Looks up an image by reference; names are case-sensitive
    async fn image_metadata(&self, image: &str) -> Result<ImageMetadata, MetadataError>;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_working_dir_defaults_to_root() {
        let meta = ImageMetadata::from_config(Some(String::new()), None);
        assert_eq!(meta.working_dir, "/");
        assert!(meta.on_build.is_empty());

        let meta = ImageMetadata::from_config(None, Some(vec!["COPY . /src".into()]));
        assert_eq!(meta.working_dir, "/");
        assert_eq!(meta.on_build, vec!["COPY . /src"]);
    }

    #[test]
    fn test_default_metadata_is_rooted() {
        let meta = ImageMetadata::default();
        assert_eq!(meta.working_dir, "/");
        assert!(meta.on_build.is_empty());
    }

    #[test]
    fn test_retryable_errors() {
        assert!(MetadataError::DaemonUnavailable("socket".into()).is_retryable_elsewhere());
        assert!(MetadataError::NotFound { image: "x".into() }.is_retryable_elsewhere());
        assert!(!MetadataError::Timeout {
            image: "x".into(),
            seconds: 1
        }
        .is_retryable_elsewhere());
    }
}
