//! Shared infrastructure for slate: error types, host lifecycle projections,
//! the panel surface contract, and panel positioning strategies.

#![forbid(unsafe_code)]

pub mod lifecycle;
pub mod positioner;
pub mod surface;
pub mod types;

pub use lifecycle::{HostState, LifecycleCommand};
pub use positioner::{
    FixedPointPositioner, HudPositioner, PanelPositioner, SlowTurnConfig, SlowTurnPositioner,
};
pub use surface::{SharedCanvas, SurfaceSource};
pub use types::{AppInfo, PanelConfig, Pose};

use thiserror::Error;

/// Top-level error type for slate operations.
#[derive(Debug, Error)]
pub enum ShellError {
    /// A runtime, extension, or capability the caller needs is not present.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// An OpenXR call on a mandatory path failed.
    #[error("runtime error: {0}")]
    Runtime(String),

    /// A GL object could not be created or used.
    #[error("graphics error: {0}")]
    Graphics(String),

    /// Configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

pub type ShellResult<T> = Result<T, ShellError>;

/// Initialize tracing with sensible defaults.
///
/// Log level is controlled by the `RUST_LOG` environment variable.
/// Defaults to `info` if not set.
pub fn init_tracing() {
    init_tracing_with_default("info");
}

/// Initialize tracing with a specific default level.
pub fn init_tracing_with_default(default_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
