/*!
 * mqflow Devices
 *
 * This crate provides the device control and state-estimation engine of the
 * mqflow gateway: the device trait and notification channel, the hardware
 * pin boundary, the per-device delayed-action scheduler, the concrete
 * device implementations (relay, reed switch, shutter and the digital
 * input/output bases) and the registry the transport layer dispatches
 * commands through.
 */

#![warn(missing_docs)]

pub mod device;
pub mod devices;
pub mod pin;
pub mod registry;
pub mod scheduler;

// Re-export the device trait and common types for convenience
pub use device::{
    Device, DeviceError, DeviceType, Notifier, PropertyType, PropertyUpdate, Result,
};
pub use registry::DeviceRegistry;

/// mqflow devices crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the device system
pub fn init() -> std::result::Result<(), mqflow_core::error::Error> {
    tracing::info!("mqflow Devices {} initialized", VERSION);
    Ok(())
}
