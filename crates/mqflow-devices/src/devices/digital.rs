/*!
 * Debounced digital input and plain digital output devices.
 *
 * `DigitalInputDevice` turns raw pin transitions into stable property
 * transitions: every raw edge restarts the debounce window and only a level
 * still changed after a full quiet window is reported. Typed sensors like
 * the reed switch build on it by mapping levels to their own vocabulary.
 */
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, warn};

use mqflow_core::types::Id;

use crate::device::{Device, DeviceType, Notifier, PropertyType, Result};
use crate::pin::{DigitalInputPin, DigitalOutputPin, PinLevel};

/// Default debounce window for digital inputs
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

/// Properties declared by the digital devices in this module
const DIGITAL_PROPERTIES: [PropertyType; 1] = [PropertyType::State];

/// A debounced digital input bound to a single STATE property
#[derive(Debug, Clone)]
pub struct DigitalInputDevice {
    id: Id,
    device_type: DeviceType,
    pin: Arc<dyn DigitalInputPin>,
    debounce: Duration,
    high_value: &'static str,
    low_value: &'static str,
    notifier: Notifier,
}

impl DigitalInputDevice {
    /// Create a new digital input device
    ///
    /// # Arguments
    ///
    /// * `id` - The device id
    /// * `device_type` - The concrete device type wrapping this input
    /// * `pin` - The input pin to monitor
    /// * `debounce` - The debounce window applied to raw transitions
    /// * `high_value` - STATE value reported for a high level
    /// * `low_value` - STATE value reported for a low level
    /// * `notifier` - The property-update channel
    pub fn new(
        id: Id,
        device_type: DeviceType,
        pin: Arc<dyn DigitalInputPin>,
        debounce: Duration,
        high_value: &'static str,
        low_value: &'static str,
        notifier: Notifier,
    ) -> Self {
        Self {
            id,
            device_type,
            pin,
            debounce,
            high_value,
            low_value,
            notifier,
        }
    }

    /// Get the configured debounce window
    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    fn value_for(&self, level: PinLevel) -> &'static str {
        match level {
            PinLevel::High => self.high_value,
            PinLevel::Low => self.low_value,
        }
    }

    /// Watch the pin and report debounced level changes
    async fn run(self, mut rx: watch::Receiver<PinLevel>) {
        let mut reported = *rx.borrow();
        loop {
            if rx.changed().await.is_err() {
                debug!("Input pin for {} dropped, stopping watcher", self.id);
                return;
            }
            let mut candidate = *rx.borrow();

            // Every further edge restarts the quiet window.
            loop {
                match timeout(self.debounce, rx.changed()).await {
                    Ok(Ok(())) => candidate = *rx.borrow(),
                    Ok(Err(_)) => return,
                    Err(_) => break,
                }
            }

            if candidate != reported {
                reported = candidate;
                let value = self.value_for(candidate);
                debug!("Input {} settled on {:?} ({})", self.id, candidate, value);
                self.notifier.notify(&self.id, PropertyType::State, value);
            }
        }
    }
}

#[async_trait]
impl Device for DigitalInputDevice {
    fn id(&self) -> &Id {
        &self.id
    }

    fn device_type(&self) -> DeviceType {
        self.device_type
    }

    fn properties(&self) -> &[PropertyType] {
        &DIGITAL_PROPERTIES
    }

    async fn init_device(&self) -> Result<()> {
        self.pin.set_debounce(self.debounce);
        let rx = self.pin.subscribe();
        tokio::spawn(self.clone().run(rx));
        Ok(())
    }

    async fn change(&self, property_id: &str, new_value: &str) -> Result<()> {
        warn!(
            "Trying to change unsupported property '{}.{}' (value={})",
            self.id, property_id, new_value
        );
        Ok(())
    }
}

/// A digital output driven high/low by external commands
#[derive(Debug, Clone)]
pub struct DigitalOutputDevice {
    id: Id,
    device_type: DeviceType,
    pin: Arc<dyn DigitalOutputPin>,
    notifier: Notifier,
}

impl DigitalOutputDevice {
    /// STATE value driving the pin high
    pub const STATE_HIGH: &'static str = "HIGH";
    /// STATE value driving the pin low
    pub const STATE_LOW: &'static str = "LOW";

    /// Create a new digital output device
    pub fn new(
        id: Id,
        device_type: DeviceType,
        pin: Arc<dyn DigitalOutputPin>,
        notifier: Notifier,
    ) -> Self {
        Self {
            id,
            device_type,
            pin,
            notifier,
        }
    }

    /// Drive the pin and notify the STATE property
    pub fn set_level(&self, level: PinLevel) -> Result<()> {
        self.pin.write(level)?;
        let value = match level {
            PinLevel::High => Self::STATE_HIGH,
            PinLevel::Low => Self::STATE_LOW,
        };
        self.notifier.notify(&self.id, PropertyType::State, value);
        Ok(())
    }
}

#[async_trait]
impl Device for DigitalOutputDevice {
    fn id(&self) -> &Id {
        &self.id
    }

    fn device_type(&self) -> DeviceType {
        self.device_type
    }

    fn properties(&self) -> &[PropertyType] {
        &DIGITAL_PROPERTIES
    }

    async fn init_device(&self) -> Result<()> {
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
        debug!("Driving output {} to {}", self.id, new_value);
        let level = if new_value == Self::STATE_HIGH {
            PinLevel::High
        } else {
            PinLevel::Low
        };
        self.set_level(level)
    }
}
