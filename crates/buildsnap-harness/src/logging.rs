//! Tracing subscriber setup for harness tests.
//!
//! Every generation boundary logs through `tracing` with structured fields
//! (`scenario`, `generation`, `boundary`, `fingerprint`). Tests opt in by
//! calling [`init_test_logging`]; `RUST_LOG` narrows or widens the output.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "warn";

/// Install a compact test-writer subscriber filtered by `RUST_LOG`.
///
/// Uses `try_init`, so calling it from many `#[test]` functions is fine.
pub fn init_test_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    init_with_filter(filter);
}

/// Install a subscriber with an explicit filter directive string.
pub fn init_with_directives(directives: &str) {
    init_with_filter(EnvFilter::new(directives));
}

fn init_with_filter(filter: EnvFilter) {
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .without_time()
                .with_test_writer()
                .compact(),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init_test_logging();
        init_test_logging();
        init_with_directives("buildsnap_harness=trace");
        tracing::info!(case = "logging_init", "subscriber installed");
    }
}
