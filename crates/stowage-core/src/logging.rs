use tracing_subscriber::EnvFilter;

/// Default filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info,stowage_assets=debug";

/// Install a formatting subscriber for the whole process.
///
/// `RUST_LOG` overrides [`DEFAULT_FILTER`]. Calling this twice is harmless; the
/// second subscriber is simply not installed.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
