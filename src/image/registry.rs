//! Registry-only image config lookups
//!
//! Uses the `oci-distribution` client: references are normalized by
//! [`Reference`], image indexes are narrowed to the configured [`Platform`] by
//! the client's platform resolver, and the config blob is decoded for the two
//! fields the resolver needs.

use super::{ImageMetadata, ImageMetadataProvider, MetadataError};
use async_trait::async_trait;
use oci_distribution::client::{ClientConfig, ClientProtocol};
use oci_distribution::manifest::ImageIndexEntry;
use oci_distribution::secrets::RegistryAuth;
use oci_distribution::{Client, Reference};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Target platform used to pick a manifest out of an image index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub architecture: String,
    pub variant: Option<String>,
}

impl Default for Platform {
    fn default() -> Self {
        Self {
            os: "linux".to_string(),
            architecture: "amd64".to_string(),
            variant: None,
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            [os, arch] if !os.is_empty() && !arch.is_empty() => Ok(Self {
                os: os.to_string(),
                architecture: arch.to_string(),
                variant: None,
            }),
            [os, arch, variant] if !os.is_empty() && !arch.is_empty() && !variant.is_empty() => {
                Ok(Self {
                    os: os.to_string(),
                    architecture: arch.to_string(),
                    variant: Some(variant.to_string()),
                })
            }
            _ => Err(format!(
                "invalid platform {:?}, expected os/arch[/variant]",
                s
            )),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.architecture)?;
        if let Some(variant) = &self.variant {
            write!(f, "/{}", variant)?;
        }
        Ok(())
    }
}

impl Platform {
    /// Digest of the first index entry built for this platform
    fn select(&self, entries: &[ImageIndexEntry]) -> Option<String> {
        entries
            .iter()
            .find(|entry| {
                entry.platform.as_ref().map_or(false, |p| {
                    p.os == self.os
                        && p.architecture == self.architecture
                        && match &self.variant {
                            Some(variant) => p.variant.as_deref() == Some(variant.as_str()),
                            None => true,
                        }
                })
            })
            .map(|entry| entry.digest.clone())
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    config: Option<ContainerConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerConfig {
    working_dir: Option<String>,
    on_build: Option<Vec<String>>,
}

/// Fetches image config blobs directly from the registry with anonymous pulls
pub struct RegistryProvider {
    client: Client,
    platform: Platform,
}

impl RegistryProvider {
    pub fn new(platform: Platform) -> Self {
        let selector = platform.clone();
        let config = ClientConfig {
            protocol: ClientProtocol::Https,
            platform_resolver: Some(Box::new(move |entries: &[ImageIndexEntry]| {
                selector.select(entries)
            })),
            ..Default::default()
        };

        Self {
            client: Client::new(config),
            platform,
        }
    }
}

#[async_trait]
impl ImageMetadataProvider for RegistryProvider {
    async fn image_metadata(&self, image: &str) -> Result<ImageMetadata, MetadataError> {
        let reference = parse_reference(image)?;
        debug!(
            image = %reference,
            platform = %self.platform,
            "Fetching image config from registry"
        );

        let (manifest, _digest) = self
            .client
            .pull_image_manifest(&reference, &RegistryAuth::Anonymous)
            .await
            .map_err(|e| classify(image, e.to_string()))?;

        let mut config_data: Vec<u8> = Vec::new();
        self.client
            .pull_blob(&reference, &manifest.config, &mut config_data)
            .await
            .map_err(|e| classify(image, format!("pulling config blob: {}", e)))?;

        decode_config(image, &config_data)
    }

    fn name(&self) -> &str {
        "registry"
    }
}

fn parse_reference(image: &str) -> Result<Reference, MetadataError> {
    image
        .parse::<Reference>()
        .map_err(|e| MetadataError::InvalidReference {
            reference: image.to_string(),
            message: e.to_string(),
        })
}

fn decode_config(image: &str, data: &[u8]) -> Result<ImageMetadata, MetadataError> {
    let config: ConfigFile = serde_json::from_slice(data).map_err(|e| MetadataError::Registry {
        image: image.to_string(),
        message: format!("decoding config: {}", e),
    })?;

    let (working_dir, on_build) = match config.config {
        Some(c) => (c.working_dir, c.on_build),
        None => (None, None),
    };
    Ok(ImageMetadata::from_config(working_dir, on_build))
}

/// Maps a client failure, keeping unknown manifests apart from other errors
fn classify(image: &str, message: String) -> MetadataError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("not found") || lower.contains("manifest unknown") {
        MetadataError::NotFound {
            image: image.to_string(),
        }
    } else {
        MetadataError::Registry {
            image: image.to_string(),
            message,
        }
    }
}
