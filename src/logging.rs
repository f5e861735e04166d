//! Tracing subscriber setup for the binary.

use crate::config::LogFormat;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Default filter directive for a `-v` count; `RUST_LOG` wins when set.
#[must_use]
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "rawstage=info,warn",
        1 => "rawstage=debug,info",
        _ => "rawstage=trace,debug",
    }
}

/// Install the global subscriber, writing to stderr.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init(format: LogFormat, verbosity: u8) {
    // Already installed, e.g. by an earlier call or a test harness.
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    if let Err(e) = result {
        eprintln!("failed to install log subscriber: {e}");
    }
}
