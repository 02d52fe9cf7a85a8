//! Tracing subscriber setup shared by every binary.

use tracing_subscriber::{
    EnvFilter,
    fmt::{format::Writer, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::time::now_rfc3339;

/// Timestamps log lines in RFC 3339 (UTC, milliseconds).
struct Rfc3339Timer;

impl FormatTime for Rfc3339Timer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", now_rfc3339())
    }
}

/// Build the default filter directive for a binary.
///
/// Binary names use dashes while crate targets use underscores, so
/// `chatline-server` becomes `chatline_server=<level>`.
pub fn default_directive(bin_name: &str, level: &str) -> String {
    format!(
        "{}={level},chatline_server={level},tower_http={level},info",
        bin_name.replace('-', "_")
    )
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the default directive. Calling this twice
/// is harmless: the second installation attempt is ignored.
pub fn setup_logger(bin_name: &str, level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(bin_name, level)));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(Rfc3339Timer)
                .with_target(true),
        )
        .try_init();

    if installed.is_ok() {
        tracing::debug!(bin = bin_name, "logger initialized");
    }
}
