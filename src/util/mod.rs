//! Shared helpers: logging setup and slash-path handling

pub mod logging;
pub mod path;

pub use logging::init_logging;
