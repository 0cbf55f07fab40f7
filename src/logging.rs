//! Logging setup.
//!
//! The library only emits `tracing` events; nothing is printed until a host
//! installs a subscriber, either its own or the one from [`init`].

use tracing_subscriber::EnvFilter;

use crate::config::DEFAULT_LOG_FILTER;

/// Installs a compact fmt subscriber writing to stderr. `RUST_LOG` wins over
/// `default_filter`, which wins over [`DEFAULT_LOG_FILTER`]. Returns `false`
/// when a global subscriber was already set; calling it again is harmless.
pub fn init(default_filter: Option<&str>) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter.unwrap_or(DEFAULT_LOG_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init(Some("colrt=debug"));
        assert!(!init(None));
    }
}
