//! Tracing subscriber setup shared by binaries and tests.

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<()> = OnceCell::new();

/// Initializes the global tracing subscriber.
///
/// The filter is taken from `RUST_LOG` when set, falling back to the
/// given default level. Subsequent calls are no-ops so callers do not
/// need to coordinate.
pub fn init_tracing(default_level: &str) {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}
