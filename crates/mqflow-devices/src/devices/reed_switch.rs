/*!
 * Reed-switch device.
 *
 * A debounced magnetic sensor for doors and windows: a high pin level means
 * the contact is apart (OPEN), low means together (CLOSED).
 */
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use mqflow_core::types::Id;

use crate::device::{Device, DeviceType, Notifier, PropertyType, Result};
use crate::devices::digital::{DigitalInputDevice, DEFAULT_DEBOUNCE};
use crate::pin::DigitalInputPin;

/// A door/window sensor with OPEN/CLOSED semantics
#[derive(Debug, Clone)]
pub struct ReedSwitchDevice {
    inner: DigitalInputDevice,
}

impl ReedSwitchDevice {
    /// STATE value for a separated contact
    pub const STATE_OPEN: &'static str = "OPEN";
    /// STATE value for a joined contact
    pub const STATE_CLOSED: &'static str = "CLOSED";

    /// Create a new reed switch with the default debounce window
    pub fn new(id: Id, pin: Arc<dyn DigitalInputPin>, notifier: Notifier) -> Self {
        Self::with_debounce(id, pin, DEFAULT_DEBOUNCE, notifier)
    }

    /// Create a new reed switch with a specific debounce window
    pub fn with_debounce(
        id: Id,
        pin: Arc<dyn DigitalInputPin>,
        debounce: Duration,
        notifier: Notifier,
    ) -> Self {
        Self {
            inner: DigitalInputDevice::new(
                id,
                DeviceType::ReedSwitch,
                pin,
                debounce,
                Self::STATE_OPEN,
                Self::STATE_CLOSED,
                notifier,
            ),
        }
    }
}

#[async_trait]
impl Device for ReedSwitchDevice {
    fn id(&self) -> &Id {
        self.inner.id()
    }

    fn device_type(&self) -> DeviceType {
        DeviceType::ReedSwitch
    }

    fn properties(&self) -> &[PropertyType] {
        self.inner.properties()
    }

    async fn init_device(&self) -> Result<()> {
        self.inner.init_device().await
    }

    async fn change(&self, property_id: &str, new_value: &str) -> Result<()> {
        self.inner.change(property_id, new_value).await
    }
}
