//! Tracing setup for binaries embedding the gateway.

use tracing_subscriber::EnvFilter;

/// Installs a compact `fmt` subscriber as the global default.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` (e.g.
/// `"info"` or `"arkgate=debug"`) is used. Returns `false` if a global
/// subscriber was already installed, so calling this twice is harmless.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .try_init()
        .is_ok()
}
