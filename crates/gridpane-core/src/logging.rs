#![forbid(unsafe_code)]

//! Logging facade.
//!
//! Every gridpane crate logs through `tracing`. Diagnostics use a stable
//! dotted `message` key (`gridpane.handle.inert`, `gridpane.drag.clamped`, ...)
//! plus structured fields, so hosts can filter on them without parsing text.
//!
//! With the `subscriber` feature, [`init_subscriber`] installs a global
//! `tracing-subscriber` filtered by the `GRIDPANE_LOG` environment variable.

pub use tracing::{debug, trace, warn};

/// Environment variable read by [`init_subscriber`] for the filter directive.
pub const LOG_ENV_VAR: &str = "GRIDPANE_LOG";

/// Filter directive used when [`LOG_ENV_VAR`] is unset or invalid.
pub const DEFAULT_LOG_DIRECTIVE: &str = "warn";

/// Output format for the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

/// Install the global subscriber.
///
/// Returns `false` when a global subscriber was already installed; the call
/// is otherwise a no-op in that case.
#[cfg(feature = "subscriber")]
pub fn init_subscriber(format: LogFormat) -> bool {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Compact => builder.compact().try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    }
}

#[cfg(all(test, feature = "subscriber"))]
mod tests {
    use super::*;

    #[test]
    fn second_init_reports_existing_subscriber() {
        let _first = init_subscriber(LogFormat::Compact);
        assert!(!init_subscriber(LogFormat::Json));
    }
}
