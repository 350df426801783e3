/*!
 * Relay device.
 *
 * Maps the logical OPEN/CLOSED relay state to electrical pin levels and
 * republishes a user-facing ON/OFF STATE property. The electrical level for
 * CLOSED is fixed once at construction, so boards with inverted relay
 * wiring behave identically at this layer.
 */
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use mqflow_core::types::Id;

use crate::device::{Device, DeviceType, Notifier, PropertyType, Result};
use crate::pin::{DigitalOutputPin, PinLevel};

/// Logical state of a relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Contact open, load de-energized
    Open,
    /// Contact closed, load energized
    Closed,
}

/// Properties declared by a relay
const RELAY_PROPERTIES: [PropertyType; 1] = [PropertyType::State];

/// An electrically driven switch with two logical states
#[derive(Debug, Clone)]
pub struct RelayDevice {
    id: Id,
    pin: Arc<dyn DigitalOutputPin>,
    closed_level: PinLevel,
    notifier: Notifier,
}

impl RelayDevice {
    /// STATE value published for a closed relay
    pub const STATE_ON: &'static str = "ON";
    /// STATE value published for an open relay
    pub const STATE_OFF: &'static str = "OFF";

    /// Electrical level that closes a relay on standard wiring
    pub const DEFAULT_CLOSED_LEVEL: PinLevel = PinLevel::Low;

    /// Create a new relay with the standard (active-low) wiring
    pub fn new(id: Id, pin: Arc<dyn DigitalOutputPin>, notifier: Notifier) -> Self {
        Self::with_closed_level(id, pin, Self::DEFAULT_CLOSED_LEVEL, notifier)
    }

    /// Create a new relay with an explicit CLOSED electrical level
    ///
    /// OPEN is always the inverse level.
    pub fn with_closed_level(
        id: Id,
        pin: Arc<dyn DigitalOutputPin>,
        closed_level: PinLevel,
        notifier: Notifier,
    ) -> Self {
        Self {
            id,
            pin,
            closed_level,
            notifier,
        }
    }

    /// Drive the relay to the given logical state and notify STATE
    pub fn change_state(&self, new_state: RelayState) -> Result<()> {
        let (level, value) = match new_state {
            RelayState::Closed => (self.closed_level, Self::STATE_ON),
            RelayState::Open => (self.closed_level.inverse(), Self::STATE_OFF),
        };
        self.pin.write(level)?;
        self.notifier.notify(&self.id, PropertyType::State, value);
        Ok(())
    }
}

#[async_trait]
impl Device for RelayDevice {
    fn id(&self) -> &Id {
        &self.id
    }

    fn device_type(&self) -> DeviceType {
        DeviceType::Relay
    }

    fn properties(&self) -> &[PropertyType] {
        &RELAY_PROPERTIES
    }

    async fn init_device(&self) -> Result<()> {
        // Safe de-energized state, no notification for the initial level.
        self.pin.write(self.closed_level.inverse())?;
        Ok(())
    }

    async fn change(&self, property_id: &str, new_value: &str) -> Result<()> {
        if property_id != PropertyType::State.as_str() {
            warn!(
                "Trying to change unsupported property '{}.{}'",
                self.id, property_id
            );
            return Ok(());
        }
        debug!("Changing state on relay {} to {}", self.id, new_value);
        if new_value == Self::STATE_ON {
            self.change_state(RelayState::Closed)
        } else {
            self.change_state(RelayState::Open)
        }
    }
}
