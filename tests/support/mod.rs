//! Shared helpers for resolver integration tests

#![allow(dead_code)]

use dockerdeps::image::MockImageProvider;
use dockerdeps::{BuildArgs, Dependencies, DependencyResolver, ResolverConfig};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Temporary build context
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let workspace = Self::new();
        for (path, content) in files {
            workspace.write(path, content);
        }
        workspace
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.dir.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Switches the process working directory, restoring it when dropped
pub struct CurrentDirGuard {
    previous: PathBuf,
}

impl CurrentDirGuard {
    pub fn enter(dir: &Path) -> Self {
        let previous = env::current_dir().unwrap();
        env::set_current_dir(dir).unwrap();
        Self { previous }
    }
}

impl Drop for CurrentDirGuard {
    fn drop(&mut self) {
        let _ = env::set_current_dir(&self.previous);
    }
}

pub fn test_config() -> ResolverConfig {
    ResolverConfig {
        ignore_file: ".dockerignore".to_string(),
        lookup_timeout_secs: 5,
        registry_fallback: false,
        platform: "linux/amd64".to_string(),
        log_level: "debug".to_string(),
        log_json: false,
    }
}

pub fn resolver(provider: Arc<MockImageProvider>) -> DependencyResolver {
    DependencyResolver::new(provider).with_config(test_config())
}

pub fn build_args(pairs: &[(&str, Option<&str>)]) -> BuildArgs {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
        .collect()
}

pub fn sorted_keys(deps: &Dependencies) -> Vec<String> {
    let mut keys: Vec<String> = deps.keys().cloned().collect();
    keys.sort();
    keys
}
