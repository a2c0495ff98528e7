//! Dockerfile dependency resolution
//!
//! Works out which files of a build context a Dockerfile reads:
//!
//! 1. parse the Dockerfile and substitute ARG values
//! 2. splice in ONBUILD triggers of base images
//! 3. replay WORKDIR/ENV to find every COPY/ADD source and its destination
//! 4. expand sources against the workspace (literal paths, then globs)
//! 5. walk directories, dropping whatever the ignore file excludes
//!
//! Base image facts come from an [`ImageMetadataProvider`]; each distinct
//! image is asked about at most once per resolution.

mod args;
mod copies;
mod error;
mod lookup;
mod onbuild;
mod paths;
mod walk;

pub use args::{expand_build_args, BuildArgs};
pub use copies::{change_working_dir, CopyAssociation};
pub use error::ResolveError;
pub use paths::SourceIndex;

use crate::config::{ConfigError, ResolverConfig};
use crate::dockerfile::parse;
use crate::dockerignore::{read_ignore_patterns, PatternMatcher};
use crate::image::ImageMetadataProvider;
use crate::util::path;
use lookup::ImageLookup;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Workspace-relative file paths mapped to their destination lists
pub type Dependencies = HashMap<String, Vec<String>>;

/// Destination recorded for every file in a [`Dependencies`] map
pub const DEFAULT_DESTINATION: &str = "";

pub struct DependencyResolver {
    provider: Arc<dyn ImageMetadataProvider>,
    config: ResolverConfig,
}

impl DependencyResolver {
    /// Resolver over the given provider with configuration from the environment
    pub fn new(provider: Arc<dyn ImageMetadataProvider>) -> Self {
        Self {
            provider,
            config: ResolverConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates `config` and builds its provider chain
    pub fn from_config(config: ResolverConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let provider = config.create_provider()?;
        Ok(Self { provider, config })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn ImageMetadataProvider> {
        &self.provider
    }

    /// Every context file the Dockerfile depends on
    ///
    /// The Dockerfile itself is always included and the ignore file never is.
    /// Each file maps to `[""]`.
    pub async fn get_dependencies(
        &self,
        workspace: &Path,
        dockerfile: &Path,
        build_args: &BuildArgs,
    ) -> Result<Dependencies, ResolveError> {
        let abs_dockerfile = normalize_dockerfile_path(workspace, dockerfile)?;
        let workspace = absolute_workspace(workspace)?;

        let index = self
            .resolve_copy_sources(&workspace, &abs_dockerfile, build_args)
            .await?;

        let excludes = read_ignore_patterns(&workspace, &self.config.ignore_file).map_err(|source| {
            ResolveError::ReadIgnoreFile {
                path: workspace.join(&self.config.ignore_file),
                source,
            }
        })?;
        let matcher =
            Arc::new(PatternMatcher::new(&excludes[..]).map_err(ResolveError::ExcludePatterns)?);

        let mut files = walk::walk_sources(&workspace, index.sources(), &matcher)?;
        files.insert(dockerfile_key(&workspace, &abs_dockerfile));
        files.remove(&path::context_relative(&self.config.ignore_file));

        info!(
            dockerfile = %abs_dockerfile.display(),
            files = files.len(),
            "Resolved dockerfile dependencies"
        );

        Ok(files
            .into_iter()
            .map(|file| (file, vec![DEFAULT_DESTINATION.to_string()]))
            .collect())
    }

    /// Sources read from the context, keyed by context-relative path, with the
    /// destinations they are copied to
    ///
    /// `abs_dockerfile` must already be normalized; a relative workspace is
    /// taken from the current directory. Directories are not expanded and the
    /// ignore file is not applied.
    pub async fn resolve_copy_sources(
        &self,
        workspace: &Path,
        abs_dockerfile: &Path,
        build_args: &BuildArgs,
    ) -> Result<SourceIndex, ResolveError> {
        let workspace = absolute_workspace(workspace)?;
        let content = std::fs::read_to_string(abs_dockerfile).map_err(|source| {
            ResolveError::OpenDockerfile {
                path: abs_dockerfile.to_path_buf(),
                source,
            }
        })?;

        let mut instructions = parse(&content).map_err(ResolveError::ParseDockerfile)?;
        debug!(
            dockerfile = %abs_dockerfile.display(),
            instructions = instructions.len(),
            "Parsed dockerfile"
        );
        expand_build_args(&mut instructions, build_args);

        let mut lookup = ImageLookup::new(self.provider.as_ref(), self.config.lookup_timeout());
        let expanded = onbuild::expand_onbuild_instructions(instructions, &mut lookup).await?;
        let copied = copies::copied_files(&expanded, &mut lookup).await?;

        paths::expand_paths(&workspace, &copied)
    }
}

fn absolute_workspace(workspace: &Path) -> Result<PathBuf, ResolveError> {
    path::absolute(workspace).map_err(|source| ResolveError::Workspace {
        path: workspace.to_path_buf(),
        source,
    })
}

/// Absolute Dockerfile path
///
/// Relative paths are taken relative to the workspace unless they already start
/// with it.
pub fn normalize_dockerfile_path(
    workspace: &Path,
    dockerfile: &Path,
) -> Result<PathBuf, ResolveError> {
    if dockerfile.is_absolute() {
        return Ok(dockerfile.to_path_buf());
    }

    let joined = if dockerfile.starts_with(workspace) {
        dockerfile.to_path_buf()
    } else {
        workspace.join(dockerfile)
    };
    path::absolute(&joined).map_err(|source| ResolveError::NormalizePath {
        path: dockerfile.to_path_buf(),
        source,
    })
}

/// Dependency keys turned into host paths under the workspace
pub fn context_paths(
    workspace: &Path,
    dependencies: &Dependencies,
) -> HashMap<PathBuf, Vec<String>> {
    dependencies
        .iter()
        .map(|(file, destinations)| (workspace.join(file), destinations.clone()))
        .collect()
}

/// Key of the Dockerfile in the result: workspace-relative when it lives inside
/// the workspace, absolute otherwise
fn dockerfile_key(workspace: &Path, abs_dockerfile: &Path) -> String {
    match abs_dockerfile.strip_prefix(workspace) {
        Ok(rel) => path::to_slash(rel),
        Err(_) => abs_dockerfile.to_string_lossy().into_owned(),
    }
}
