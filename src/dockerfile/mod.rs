//! Dockerfile parsing and instruction model

mod instruction;
mod parser;
mod shell;

pub use instruction::{Command, Instruction, StageRef};
pub use parser::{parse, ParseError, DEFAULT_ESCAPE};
pub use shell::{process_word, Environment, ShellError};

use std::path::Path;
use tracing::warn;

/// Checks that a file is a Dockerfile the builder would accept
///
/// True only when the file can be read, parses, is non-empty and every
/// instruction keyword is a known command. Never fails; callers use it to skip
/// malformed files.
pub fn validate_dockerfile(path: &Path) -> bool {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("opening file {}: {}", path.display(), e);
            return false;
        }
    };

    match parse(&content) {
        Ok(instructions) if !instructions.is_empty() => {
            instructions.iter().all(|i| i.command().is_some())
        }
        _ => false,
    }
}
