//! Structured logging setup.
//!
//! Logs go to **stderr**: stdout is reserved for the handshake line the host
//! parses at startup. Filtering follows `RUST_LOG`, defaulting to `info`.
//!
//! ```bash
//! # Debug logs for the provider only
//! RUST_LOG=hemmer_provider_azurerm=debug ./hemmer-provider-azurerm
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global logging subscriber.
///
/// # Panics
///
/// Panics if a global subscriber has already been set. Use
/// [`try_init_logging`] when initialization may happen more than once.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .init();
}

/// Like [`init_logging`], but returns `false` instead of panicking when a
/// subscriber is already installed.
pub fn try_init_logging() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_filter_accepts_common_directives() {
        assert!(EnvFilter::try_new("info").is_ok());
        assert!(EnvFilter::try_new("hemmer_provider_azurerm=debug").is_ok());
        assert!(EnvFilter::try_new("warn,hemmer_provider_azurerm=trace").is_ok());
    }
}
