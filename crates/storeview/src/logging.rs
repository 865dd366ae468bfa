//! Diagnostic logging setup.
//!
//! Events go to **stderr** so stdout stays parseable for `--json` output.
//! Verbosity follows `RUST_LOG` (e.g. `RUST_LOG=storeview=debug`) and
//! defaults to `warn`.

use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber. Safe to call more than once.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
