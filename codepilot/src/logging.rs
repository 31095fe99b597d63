//! Diagnostic tracing for the engine.
//!
//! Tracing goes to stderr and is filtered by `RUST_LOG`. It is separate from
//! run artifacts (`io/run_log`), which are written whenever `--out` is given
//! regardless of the filter, and from stdout, which carries command results.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. Defaults to `warn` when `RUST_LOG` is unset.
///
/// ```bash
/// RUST_LOG=codepilot=debug codepilot run "Create hello.py printing Hello"
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
