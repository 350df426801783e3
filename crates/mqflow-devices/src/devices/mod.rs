/*!
 * Device implementations for the mqflow gateway.
 */

pub mod digital;
pub mod relay;
pub mod reed_switch;
pub mod shutter;

// Re-export specific device implementations for convenience
pub use digital::{DigitalInputDevice, DigitalOutputDevice, DEFAULT_DEBOUNCE};
pub use reed_switch::ReedSwitchDevice;
pub use relay::{RelayDevice, RelayState};
pub use shutter::ShutterDevice;
