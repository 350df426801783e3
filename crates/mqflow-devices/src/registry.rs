/*!
 * Device registry for the mqflow gateway.
 *
 * Devices are created from the gateway configuration at startup, registered
 * once, initialized together, and afterwards addressed by id when commands
 * arrive from the transport layer.
 */
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use futures::future::join_all;
use tracing::{debug, warn};

use mqflow_core::types::Id;

use crate::device::{Device, DeviceError, Result};

/// Id-keyed store of gateway devices
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: RwLock<HashMap<Id, Arc<dyn Device>>>,
}

impl DeviceRegistry {
    /// Create a new, empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device
    ///
    /// Ids are unique; registering a second device with the same id fails.
    pub fn register<D: Device + 'static>(&self, device: D) -> Result<()> {
        let id = device.id().clone();
        let mut devices = self
            .devices
            .write()
            .map_err(|_| DeviceError::Other("Device registry lock poisoned".to_string()))?;

        if devices.contains_key(&id) {
            return Err(DeviceError::AlreadyRegistered(id));
        }

        debug!("Registered {} device {}", device.device_type(), id);
        devices.insert(id, Arc::new(device));
        Ok(())
    }

    /// Get a device by id
    pub fn get(&self, id: &Id) -> Option<Arc<dyn Device>> {
        self.devices.read().ok()?.get(id).cloned()
    }

    /// Get the ids of all registered devices
    pub fn ids(&self) -> Vec<Id> {
        self.devices
            .read()
            .map(|devices| devices.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Initialize every registered device
    ///
    /// Called once at gateway startup, after persisted properties have been
    /// restored with `init_property`.
    pub async fn init_all(&self) -> Result<()> {
        let devices: Vec<Arc<dyn Device>> = {
            let guard = self
                .devices
                .read()
                .map_err(|_| DeviceError::Other("Device registry lock poisoned".to_string()))?;
            guard.values().cloned().collect()
        };

        let results = join_all(devices.iter().map(|device| device.init_device())).await;
        for (device, result) in devices.iter().zip(results) {
            result.map_err(|e| {
                DeviceError::Other(format!("Failed to initialize device {}: {}", device.id(), e))
            })?;
        }
        Ok(())
    }

    /// Dispatch an inbound command to the addressed device
    ///
    /// Commands for unknown devices are logged and dropped.
    pub async fn dispatch_command(
        &self,
        device_id: &Id,
        property_id: &str,
        new_value: &str,
    ) -> Result<()> {
        let Some(device) = self.get(device_id) else {
            warn!(
                "Command for unknown device '{}' ({}={})",
                device_id, property_id, new_value
            );
            return Ok(());
        };
        device.change(property_id, new_value).await
    }
}
