//! Lexical slash-path helpers
//!
//! Container paths and context-relative paths always use `/`, independent of the
//! host platform, so these work on strings rather than `std::path`.

use std::env;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Shortest lexically equivalent path (`.` and `..` resolved, duplicate slashes removed)
pub fn clean(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

pub fn is_abs(path: &str) -> bool {
    path.starts_with('/')
}

/// Joins and cleans; empty elements are skipped
pub fn join(base: &str, elem: &str) -> String {
    match (base.is_empty(), elem.is_empty()) {
        (true, true) => String::new(),
        (true, false) => clean(elem),
        (false, true) => clean(base),
        (false, false) => clean(&format!("{}/{}", base, elem)),
    }
}

/// Directory part of a cleaned path, `.` when there is none
pub fn parent(path: &str) -> String {
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => clean(&path[..idx]),
        None => ".".to_string(),
    }
}

/// Context-relative path normalized for use as a dependency key
///
/// Leading slashes are dropped: a COPY source of `/src` means `src` inside the
/// build context.
pub fn context_relative(token: &str) -> String {
    let cleaned = clean(token);
    match cleaned.trim_start_matches('/') {
        "" => ".".to_string(),
        rest => rest.to_string(),
    }
}

/// Host path converted to a `/`-separated string
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Host path made absolute against the current directory and cleaned lexically
pub fn absolute(path: &Path) -> io::Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    };

    let mut cleaned = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if cleaned.parent().is_some() {
                    cleaned.pop();
                }
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    Ok(cleaned)
}
