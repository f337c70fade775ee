//! Console reporting through `tracing`.
//!
//! Everything the engine reports (phase progress, skipped actions, written
//! files, change diffs) goes through `tracing` macros. This module only
//! installs the subscriber for the CLI.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::io::config::RunOptions;

/// Filter directive for a run's verbosity.
///
/// `silent` mutes everything; otherwise `log_level` maps 0 → error,
/// 1 → warn, 2 and 3 → info, 4 → debug, 5 → trace (`debug` forces 5).
pub fn filter_directive(options: &RunOptions) -> &'static str {
    if options.silent {
        return "off";
    }
    match options.effective_log_level() {
        0 => "error",
        1 => "warn",
        2 | 3 => "info",
        4 => "debug",
        _ => "trace",
    }
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the filter comes from the run options.
/// Output: stderr, compact format, no timestamps.
///
/// # Example
/// ```bash
/// RUST_LOG=scaffolder=debug scaffolder new demo --dry-run
/// ```
pub fn init(options: &RunOptions) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(options)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .with_target(false)
                .compact(),
        )
        .init();
}
