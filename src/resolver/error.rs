use crate::dockerfile::{ParseError, ShellError};
use crate::dockerignore::PatternError;
use crate::image::MetadataError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal resolution failures
///
/// Metadata problems while looking for ONBUILD triggers are not in here: they
/// are logged and resolution carries on without the triggers.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("normalizing dockerfile path {path}: {source}")]
    NormalizePath { path: PathBuf, source: io::Error },

    #[error("resolving workspace {path}: {source}")]
    Workspace { path: PathBuf, source: io::Error },

    #[error("opening dockerfile {path}: {source}")]
    OpenDockerfile { path: PathBuf, source: io::Error },

    #[error("parsing dockerfile: {0}")]
    ParseDockerfile(#[source] ParseError),

    #[error("expanding ONBUILD instructions of {image}: {source}")]
    ExpandOnbuild { image: String, source: ParseError },

    #[error("listing copied files: retrieving working directory of {image}: {source}")]
    WorkingDir { image: String, source: MetadataError },

    #[error("listing copied files: processing word {word:?}: {source}")]
    ProcessWord { word: String, source: ShellError },

    #[error("invalid glob pattern {pattern}: {source}")]
    InvalidGlob {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("glob match {path} is outside workspace {workspace}")]
    OutsideWorkspace { path: PathBuf, workspace: PathBuf },

    #[error("file pattern {patterns} must match at least one file")]
    NoMatch { patterns: String },

    #[error("reading ignore file {path}: {source}")]
    ReadIgnoreFile { path: PathBuf, source: io::Error },

    #[error("invalid exclude patterns: {0}")]
    ExcludePatterns(#[source] PatternError),

    #[error("stating file {path}: {source}")]
    Stat { path: PathBuf, source: io::Error },

    #[error("walking folder {path}: {source}")]
    Walk { path: PathBuf, source: ignore::Error },
}
