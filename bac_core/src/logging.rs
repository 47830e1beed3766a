//! Tracing setup for the `bactrack` binary and the crate's unit tests.
//!
//! Log lines never go to stdout: the CLI prints its results there and the
//! integration tests match on them. The binary logs to stderr, tests log to
//! the harness capture. `RUST_LOG` overrides the default level in both.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Level used when `RUST_LOG` is unset
pub const DEFAULT_LEVEL: &str = "warn";

/// Where formatted events are written
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Sink {
    Stderr,
    #[cfg(test)]
    TestCapture,
}

fn install(default_level: &str, sink: Sink) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let layer = fmt::layer().compact();

    let installed = match sink {
        Sink::Stderr => tracing_subscriber::registry()
            .with(filter)
            .with(layer.with_writer(std::io::stderr))
            .try_init(),
        #[cfg(test)]
        Sink::TestCapture => tracing_subscriber::registry()
            .with(filter)
            .with(layer.with_test_writer())
            .try_init(),
    };
    installed.is_ok()
}

/// Initialize logging at [`DEFAULT_LEVEL`]
pub fn init() {
    init_with_level(DEFAULT_LEVEL)
}

/// Initialize logging with a specific default level (debug, info, warn, error)
///
/// An embedding host that installed its own subscriber first keeps it.
pub fn init_with_level(default_level: &str) {
    if !install(default_level, Sink::Stderr) {
        tracing::debug!("Global subscriber already set, keeping it");
    }
}

/// Debug-level logging into the test harness capture
#[cfg(test)]
pub fn init_test() {
    install("debug", Sink::TestCapture);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_install_is_refused_not_fatal() {
        init_test();
        assert!(!install("info", Sink::Stderr));
        init_with_level("info");
    }
}
