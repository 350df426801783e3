/*!
 * Logging functionality for mqflow.
 *
 * This module provides tracing setup for consistent logging across the
 * gateway.
 */
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Error, Result};

/// Initialize the logging system with default configuration
pub fn init() -> Result<()> {
    init_with_filter("info")
}

/// Initialize the logging system with a specific filter
///
/// # Arguments
///
/// * `filter` - The log filter string (e.g., "info", "debug", "mqflow=trace")
pub fn init_with_filter(filter: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .map_err(|e| Error::runtime(format!("Failed to initialize logging: {}", e)))?;

    Ok(())
}

/// A type alias for a tracing span
pub type Span = tracing::Span;

/// Create a new span for a device instance
///
/// # Arguments
///
/// * `device_type` - The device type name
/// * `id` - The device id
pub fn device_span(device_type: &str, id: &str) -> Span {
    tracing::info_span!("device", r#type = %device_type, id = %id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init() {
        // This will fail if called multiple times in the same process
        // but it's fine for a single test
        let _ = init();
    }

    #[test]
    fn test_device_span() {
        // Whether the span is enabled depends on the global subscriber, so
        // only check that creating and entering it works.
        let span = device_span("shutter", "bedroom-shutter");
        let _guard = span.enter();
    }
}
