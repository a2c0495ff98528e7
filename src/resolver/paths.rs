//! COPY source expansion against the build context
//!
//! A source naming an existing path is taken literally; anything else is a glob
//! evaluated inside the workspace. Every COPY must match at least one path.

use super::copies::CopyAssociation;
use super::ResolveError;
use crate::util::path;
use glob::{MatchOptions, Pattern};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Context-relative sources mapped to the destinations they are copied to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceIndex {
    entries: HashMap<String, Vec<String>>,
}

impl SourceIndex {
    pub fn insert(&mut self, source: impl Into<String>, destination: impl Into<String>) {
        self.entries
            .entry(source.into())
            .or_default()
            .push(destination.into());
    }

    pub fn destinations(&self, source: &str) -> Option<&[String]> {
        self.entries.get(source).map(Vec::as_slice)
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub(crate) fn expand_paths(
    workspace: &Path,
    copied: &[CopyAssociation],
) -> Result<SourceIndex, ResolveError> {
    let mut index = SourceIndex::default();
    let escaped_workspace = Pattern::escape(&workspace.to_string_lossy());

    for association in copied {
        let mut matched_any = false;

        for token in &association.sources {
            let relative = path::context_relative(token);

            if workspace.join(&relative).exists() {
                index.insert(relative, association.destination.as_str());
                matched_any = true;
                continue;
            }

            let pattern = format!("{}/{}", escaped_workspace.trim_end_matches('/'), relative);
            let entries = glob::glob_with(&pattern, MATCH_OPTIONS).map_err(|source| {
                ResolveError::InvalidGlob {
                    pattern: token.clone(),
                    source,
                }
            })?;

            for entry in entries {
                let matched = match entry {
                    Ok(matched) => matched,
                    Err(e) => {
                        warn!(pattern = %token, error = %e, "Skipping unreadable glob match");
                        continue;
                    }
                };
                let rel = matched.strip_prefix(workspace).map_err(|_| {
                    ResolveError::OutsideWorkspace {
                        path: matched.clone(),
                        workspace: workspace.to_path_buf(),
                    }
                })?;
                index.insert(path::to_slash(rel), association.destination.as_str());
                matched_any = true;
            }
        }

        if !matched_any {
            return Err(ResolveError::NoMatch {
                patterns: association.sources.join(" "),
            });
        }
    }

    debug!(sources = index.len(), "Found dependencies for dockerfile");
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn workspace(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }
        dir
    }

    fn association(destination: &str, sources: &[&str]) -> CopyAssociation {
        CopyAssociation {
            destination: destination.to_string(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_literal_paths_are_kept() {
        let dir = workspace(&["server.go", "pkg/util.go"]);
        let index =
            expand_paths(dir.path(), &[association("/app", &["server.go", "/pkg"])]).unwrap();

        assert_eq!(index.destinations("server.go"), Some(&["/app".to_string()][..]));
        assert_eq!(index.destinations("pkg"), Some(&["/app".to_string()][..]));
    }

    #[test]
    fn test_globs_expand_to_matches() {
        let dir = workspace(&["a.jar", "b.jar", "lib/c.jar", "notes.txt"]);
        let index = expand_paths(dir.path(), &[association("/libs", &["*.jar"])]).unwrap();

        let mut sources: Vec<&str> = index.sources().collect();
        sources.sort();
        assert_eq!(sources, vec!["a.jar", "b.jar"]);
    }

    #[test]
    fn test_whole_context() {
        let dir = workspace(&["a"]);
        let index = expand_paths(dir.path(), &[association("/app", &["."])]).unwrap();

        assert_eq!(index.sources().collect::<Vec<_>>(), vec!["."]);
    }

    #[test]
    fn test_destinations_accumulate() {
        let dir = workspace(&["config.yml"]);
        let index = expand_paths(
            dir.path(),
            &[
                association("/etc/app", &["config.yml"]),
                association("/srv", &["config.yml"]),
            ],
        )
        .unwrap();

        assert_eq!(
            index.destinations("config.yml"),
            Some(&["/etc/app".to_string(), "/srv".to_string()][..])
        );
    }

    #[test]
    fn test_one_match_is_enough() {
        let dir = workspace(&["present.txt"]);
        let copied = [association("/", &["present.txt", "absent-*.txt"])];
        let index = expand_paths(dir.path(), &copied).unwrap();

        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_no_match_names_all_patterns() {
        let dir = workspace(&[]);
        let copied = [association("/", &["missing.txt", "*.md"])];
        let err = expand_paths(dir.path(), &copied).unwrap_err();

        assert_eq!(
            err.to_string(),
            "file pattern missing.txt *.md must match at least one file"
        );
    }

    #[test]
    fn test_invalid_glob_is_reported() {
        let dir = workspace(&[]);
        let err = expand_paths(dir.path(), &[association("/", &["[abc"])]).unwrap_err();

        assert!(matches!(err, ResolveError::InvalidGlob { .. }));
    }
}
