//! Expansion of copied sources into the files they cover
//!
//! Directories are walked recursively. Excluded directories are pruned without
//! being entered, and excluded files are dropped. Paths are compared against the
//! ignore patterns relative to the workspace.

use super::ResolveError;
use crate::dockerignore::PatternMatcher;
use crate::util::path;
use ignore::WalkBuilder;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::trace;

pub(crate) fn walk_sources<'a>(
    workspace: &Path,
    sources: impl IntoIterator<Item = &'a str>,
    matcher: &Arc<PatternMatcher>,
) -> Result<BTreeSet<String>, ResolveError> {
    let mut files = BTreeSet::new();

    for source in sources {
        let relative = path::clean(source);
        let absolute = workspace.join(&relative);
        let metadata = fs::metadata(&absolute).map_err(|source| ResolveError::Stat {
            path: absolute.clone(),
            source,
        })?;

        if metadata.is_dir() {
            walk_dir(workspace, &absolute, matcher, &mut files)?;
        } else if metadata.is_file() && !matcher.matches(&relative) {
            files.insert(relative);
        }
    }

    Ok(files)
}

fn walk_dir(
    workspace: &Path,
    root: &Path,
    matcher: &Arc<PatternMatcher>,
    files: &mut BTreeSet<String>,
) -> Result<(), ResolveError> {
    let prune_matcher = Arc::clone(matcher);
    let prune_workspace = workspace.to_path_buf();

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            if entry.depth() == 0 || !entry.file_type().map_or(false, |t| t.is_dir()) {
                return true;
            }
            match entry.path().strip_prefix(&prune_workspace) {
                Ok(rel) => !prune_matcher.matches(&path::to_slash(rel)),
                Err(_) => true,
            }
        })
        .build();

    for result in walker {
        let entry = result.map_err(|source| ResolveError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if entry.depth() == 0 || entry.file_type().map_or(false, |t| t.is_dir()) {
            continue;
        }

        let Ok(rel) = entry.path().strip_prefix(workspace) else {
            continue;
        };
        let rel = path::to_slash(rel);
        if matcher.matches(&rel) {
            trace!(path = %rel, "Excluded by ignore file");
            continue;
        }
        files.insert(rel);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn matcher(patterns: &[&str]) -> Arc<PatternMatcher> {
        Arc::new(PatternMatcher::new(patterns).unwrap())
    }

    #[test]
    fn test_directories_are_walked() {
        let dir = workspace(&["src/main.rs", "src/lib/mod.rs", "README.md"]);
        let files = walk_sources(dir.path(), ["src"], &matcher(&[])).unwrap();

        assert_eq!(
            files.into_iter().collect::<Vec<_>>(),
            vec!["src/lib/mod.rs", "src/main.rs"]
        );
    }

    #[test]
    fn test_hidden_files_are_included() {
        let dir = workspace(&[".env", ".config/app.toml", "a.txt"]);
        let files = walk_sources(dir.path(), ["."], &matcher(&[])).unwrap();

        assert!(files.contains(".env"));
        assert!(files.contains(".config/app.toml"));
        assert!(files.contains("a.txt"));
    }

    #[test]
    fn test_excluded_directories_are_pruned() {
        let dir = workspace(&["node_modules/pkg/index.js", "app.js", "logs/out.log"]);
        let files =
            walk_sources(dir.path(), ["."], &matcher(&["node_modules", "**/*.log"])).unwrap();

        assert_eq!(files.into_iter().collect::<Vec<_>>(), vec!["app.js"]);
    }

    #[test]
    fn test_gitignore_is_not_consulted() {
        let dir = workspace(&["build/out.bin"]);
        fs::write(dir.path().join(".gitignore"), "build/\n").unwrap();

        let files = walk_sources(dir.path(), ["build"], &matcher(&[])).unwrap();
        assert!(files.contains("build/out.bin"));
    }

    #[test]
    fn test_excluded_file_source() {
        let dir = workspace(&["secret.key", "public.pem"]);
        let files =
            walk_sources(dir.path(), ["secret.key", "public.pem"], &matcher(&["*.key"])).unwrap();

        assert_eq!(files.into_iter().collect::<Vec<_>>(), vec!["public.pem"]);
    }

    #[test]
    fn test_missing_source_fails_to_stat() {
        let dir = workspace(&[]);
        let err = walk_sources(dir.path(), ["gone.txt"], &matcher(&[])).unwrap_err();

        assert!(err.to_string().starts_with("stating file"));
    }
}
