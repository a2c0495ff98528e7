//! Structured logging setup
//!
//! Resolution progress is reported through `tracing`: lookups and walk details
//! at debug, soft failures (missing ONBUILD metadata) at warn. Callers that want
//! to see them install a subscriber from their [`ResolverConfig`].
//!
//! ```no_run
//! use dockerdeps::{init_logging, ResolverConfig};
//!
//! // DOCKERDEPS_LOG_LEVEL=debug DOCKERDEPS_LOG_JSON=true
//! init_logging(&ResolverConfig::default()).unwrap();
//! ```

use crate::config::{ConfigError, ResolverConfig};
use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Crates whose client chatter stays at warn unless `RUST_LOG` asks otherwise
const QUIET_TARGETS: [&str; 6] = [
    "h2",
    "hyper",
    "hyper_util",
    "reqwest",
    "oci_distribution",
    "bollard",
];

/// Installs the global subscriber at the configured level; later calls are ignored
///
/// `RUST_LOG` directives are honoured on top of the configured level.
pub fn init_logging(config: &ResolverConfig) -> Result<(), ConfigError> {
    let level = config.log_level.parse::<Level>().map_err(|_| {
        ConfigError::ValidationFailed(format!("Invalid log level: {}", config.log_level))
    })?;
    let filter = build_filter(level, env::var("RUST_LOG").is_ok());
    let use_json = config.log_json;

    INIT.call_once(|| {
        let registry = tracing_subscriber::registry().with(filter);
        if use_json {
            registry.with(fmt::layer().json().with_target(true)).init();
        } else {
            registry.with(fmt::layer().with_target(true)).init();
        }
    });
    Ok(())
}

fn build_filter(level: Level, rust_log_set: bool) -> EnvFilter {
    let mut filter = EnvFilter::from_default_env().add_directive(crate_directive(level));
    if !rust_log_set {
        for target in QUIET_TARGETS {
            if let Ok(directive) = format!("{}=warn", target).parse() {
                filter = filter.add_directive(directive);
            }
        }
    }
    filter
}

fn crate_directive(level: Level) -> Directive {
    format!("{}={}", env!("CARGO_CRATE_NAME"), level)
        .parse()
        .unwrap_or_else(|_| LevelFilter::from_level(level).into())
}
