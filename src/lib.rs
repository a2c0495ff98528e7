//! dockerdeps - build context dependencies of a Dockerfile
//!
//! Given a workspace and a Dockerfile, works out the set of workspace files an
//! image build would read: COPY and ADD sources after ARG, ENV and WORKDIR
//! evaluation, ONBUILD triggers inherited from base images, glob expansion,
//! recursive directory expansion and `.dockerignore` exclusion. File watchers
//! and build triggers use the result to decide when to rebuild.
//!
//! # Example
//!
//! ```no_run
//! use dockerdeps::{BuildArgs, DependencyResolver, ResolverConfig};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ResolverConfig::default();
//! dockerdeps::init_logging(&config)?;
//! let resolver = DependencyResolver::from_config(config)?;
//!
//! let mut build_args = BuildArgs::new();
//! build_args.insert("VERSION".to_string(), Some("2.0".to_string()));
//!
//! let deps = resolver
//!     .get_dependencies(Path::new("."), Path::new("Dockerfile"), &build_args)
//!     .await?;
//! for file in deps.keys() {
//!     println!("{}", file);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`dockerfile`]: parser, instruction model and shell word expansion
//! - [`dockerignore`]: ignore file reading and pattern matching
//! - [`image`]: base image metadata providers (daemon, registry, cache)
//! - [`resolver`]: the resolution pipeline
//! - [`config`]: environment-driven settings

pub mod config;
pub mod dockerfile;
pub mod dockerignore;
pub mod image;
pub mod resolver;
pub mod util;

pub use config::{ConfigError, ResolverConfig};
pub use dockerfile::{parse, validate_dockerfile, Command, Instruction, ParseError};
pub use dockerignore::{read_ignore_patterns, PatternMatcher};
pub use image::{ImageMetadata, ImageMetadataProvider, MetadataError};
pub use resolver::{
    context_paths, normalize_dockerfile_path, BuildArgs, Dependencies, DependencyResolver,
    ResolveError, SourceIndex,
};
pub use util::init_logging;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
