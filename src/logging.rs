//! # Log output setup (feature `logging`).
//!
//! The crate only emits `tracing` records; it never installs a subscriber on
//! its own. Binaries and demos that want to see them call [`init_logging`].
//!
//! ```text
//! RUST_LOG=framebus=trace cargo run --example nested_frames --features logging
//! ```

use tracing_subscriber::{EnvFilter, fmt};

/// Installs a fmt subscriber filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
