//! Tracing setup for the prompter binary.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: Run progress and diagnostics via `RUST_LOG`,
//!   output to stderr.
//!
//! - **Record files (`io/store`)**: Product artifacts, always written,
//!   unaffected by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG` env var. Defaults to `info` if unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=prompter=debug prompter run --task "Plan a trip" --agent-name Trip-Agent
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
