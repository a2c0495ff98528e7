//! `.dockerignore` reading and matching

mod matcher;

pub use matcher::{PatternError, PatternMatcher};

use crate::util::path;
use std::io;
use std::path::Path;
use tracing::debug;

pub const DEFAULT_IGNORE_FILE: &str = ".dockerignore";

/// Reads exclude patterns from `<workspace>/<file_name>`
///
/// A missing file yields no patterns.
pub fn read_ignore_patterns(workspace: &Path, file_name: &str) -> io::Result<Vec<String>> {
    let ignore_path = workspace.join(file_name);
    match std::fs::read_to_string(&ignore_path) {
        Ok(content) => {
            let patterns = parse_patterns(&content);
            debug!(
                path = %ignore_path.display(),
                count = patterns.len(),
                "Loaded ignore patterns"
            );
            Ok(patterns)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Normalizes ignore file lines into matcher patterns
///
/// Comment lines start with `#` before any trimming. Paths are cleaned and made
/// relative to the context root, keeping a leading `!`.
pub fn parse_patterns(content: &str) -> Vec<String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut patterns = Vec::new();

    for line in content.lines() {
        if line.starts_with('#') {
            continue;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (invert, body) = match line.strip_prefix('!') {
            Some(rest) => (true, rest.trim()),
            None => (false, line),
        };

        let mut pattern = if body.is_empty() {
            String::new()
        } else {
            let cleaned = path::clean(body);
            match cleaned.strip_prefix('/') {
                Some(rest) if !rest.is_empty() => rest.to_string(),
                _ => cleaned,
            }
        };

        if invert {
            pattern.insert(0, '!');
        }
        patterns.push(pattern);
    }

    patterns
}
