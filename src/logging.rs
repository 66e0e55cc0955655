//! Tracing subscriber initialization.
//!
//! Respects `RUST_LOG`; `thumbgrid=info` applies only when it is unset.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Default directive for this crate's targets.
pub const DEFAULT_DIRECTIVE: &str = "thumbgrid=info";

pub fn filter() -> Result<EnvFilter> {
    filter_from(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref())
}

/// Builds the filter from an explicit `RUST_LOG` value, falling back to
/// [`DEFAULT_DIRECTIVE`] when it is absent or blank.
fn filter_from(env: Option<&str>) -> Result<EnvFilter> {
    match env.map(str::trim).filter(|directives| !directives.is_empty()) {
        Some(directives) => Ok(EnvFilter::try_new(directives)?),
        None => Ok(EnvFilter::new(DEFAULT_DIRECTIVE)),
    }
}

/// Installs the global fmt subscriber. Fails if one is already installed.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter()?)
        .with_thread_names(true)
        .try_init()
        .map_err(|e| anyhow!("Tracing subscriber already initialized: {e}"))
}
