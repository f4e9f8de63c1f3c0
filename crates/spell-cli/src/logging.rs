//! Tracing initialization for the CLI.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Environment variable holding the log filter, e.g. `SPELLS_LOG=spell_engine=debug`.
pub const LOG_ENV: &str = "SPELLS_LOG";

/// Install a stderr `fmt` subscriber filtered by [`LOG_ENV`], defaulting to `warn`.
///
/// Stdout stays reserved for table output. Safe to call more than once.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .with(filter)
            .init();
    });
}
