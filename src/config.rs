//! Resolver configuration
//!
//! Settings load from environment variables with defaults, the same way for
//! library callers and tests.
//!
//! # Environment Variables
//!
//! - `DOCKERDEPS_IGNORE_FILE`: ignore file name inside the workspace - default: ".dockerignore"
//! - `DOCKERDEPS_LOOKUP_TIMEOUT`: seconds allowed per base image lookup - default: "30"
//! - `DOCKERDEPS_REGISTRY_FALLBACK`: ask the registry when the daemon cannot - default: "true"
//! - `DOCKERDEPS_PLATFORM`: platform selected from multi-arch images - default: "linux/amd64"
//! - `DOCKERDEPS_LOG_LEVEL`: logging level - default: "info"
//! - `DOCKERDEPS_LOG_JSON`: JSON log lines instead of plain text - default: "false"
//!
//! # Example
//!
//! ```no_run
//! use dockerdeps::{DependencyResolver, ResolverConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ResolverConfig::default();
//! config.validate()?;
//!
//! let resolver = DependencyResolver::from_config(config)?;
//! # let _ = resolver;
//! # Ok(())
//! # }
//! ```

use crate::dockerignore::DEFAULT_IGNORE_FILE;
use crate::image::{
    CachingProvider, DockerDaemonProvider, FallbackProvider, ImageMetadataProvider, Platform,
    RegistryProvider,
};
use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REGISTRY_FALLBACK: bool = true;
const DEFAULT_PLATFORM: &str = "linux/amd64";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Invalid platform {value:?}: {reason}")]
    InvalidPlatform { value: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Ignore file name, relative to the workspace
    pub ignore_file: String,

    /// Time allowed for a single base image lookup
    pub lookup_timeout_secs: u64,

    /// Fall back to the registry when the daemon is unreachable or lacks the image
    pub registry_fallback: bool,

    /// Platform used to pick a manifest from an image index
    pub platform: String,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Emit JSON log lines
    pub log_json: bool,
}

impl Default for ResolverConfig {
    /// Loads from `DOCKERDEPS_*` variables, falling back to defaults
    fn default() -> Self {
        let ignore_file = env::var("DOCKERDEPS_IGNORE_FILE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_IGNORE_FILE.to_string());

        let lookup_timeout_secs = env::var("DOCKERDEPS_LOOKUP_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_LOOKUP_TIMEOUT_SECS);

        let registry_fallback = env::var("DOCKERDEPS_REGISTRY_FALLBACK")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(DEFAULT_REGISTRY_FALLBACK);

        let platform =
            env::var("DOCKERDEPS_PLATFORM").unwrap_or_else(|_| DEFAULT_PLATFORM.to_string());

        let log_level = env::var("DOCKERDEPS_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        let log_json = env::var("DOCKERDEPS_LOG_JSON")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        Self {
            ignore_file,
            lookup_timeout_secs,
            registry_fallback,
            platform,
            log_level,
            log_json,
        }
    }
}

impl ResolverConfig {
    /// Checks value ranges, the platform string and the log level
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lookup_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Lookup timeout must be at least 1 second".to_string(),
            ));
        }

        if self.ignore_file.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Ignore file name cannot be empty".to_string(),
            ));
        }

        self.parsed_platform()?;

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    pub fn parsed_platform(&self) -> Result<Platform, ConfigError> {
        self.platform
            .parse::<Platform>()
            .map_err(|reason| ConfigError::InvalidPlatform {
                value: self.platform.clone(),
                reason,
            })
    }

    /// Builds the provider chain: local daemon, then the registry when enabled,
    /// with successful answers cached for the provider's lifetime
    pub fn create_provider(&self) -> Result<Arc<dyn ImageMetadataProvider>, ConfigError> {
        let daemon: Arc<dyn ImageMetadataProvider> = Arc::new(DockerDaemonProvider::new());

        let chain = if self.registry_fallback {
            let registry: Arc<dyn ImageMetadataProvider> =
                Arc::new(RegistryProvider::new(self.parsed_platform()?));
            Arc::new(FallbackProvider::new(daemon, registry))
        } else {
            daemon
        };

        Ok(Arc::new(CachingProvider::new(chain)))
    }
}

impl fmt::Display for ResolverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Resolver Configuration:")?;
        writeln!(f, "  Ignore File: {}", self.ignore_file)?;
        writeln!(f, "  Lookup Timeout: {}s", self.lookup_timeout_secs)?;
        writeln!(f, "  Registry Fallback: {}", self.registry_fallback)?;
        writeln!(f, "  Platform: {}", self.platform)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        writeln!(f, "  JSON Logs: {}", self.log_json)?;
        Ok(())
    }
}
