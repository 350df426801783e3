/*!
 * mqflow Core
 *
 * This crate provides the foundational pieces shared by the mqflow gateway:
 * identifiers and property values, error types, the injectable clock used
 * for elapsed-time calculations, and logging setup.
 */

#![warn(missing_docs)]

pub mod clock;
pub mod error;
pub mod logging;
pub mod types;

/// mqflow core crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library initialization
pub fn init() -> Result<(), error::Error> {
    logging::init()?;
    tracing::info!("mqflow Core {} initialized", VERSION);
    Ok(())
}
