/*!
 * Device trait and core device abstractions.
 *
 * This module defines the device trait implemented by every gateway device,
 * the property vocabulary understood by the command dispatcher, and the
 * notification channel that carries property updates to the external
 * publisher.
 */
use std::fmt;
use std::fmt::Debug;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use mqflow_core::types::{Id, Value};

/// Capacity of the property-update broadcast channel
const NOTIFY_CHANNEL_CAPACITY: usize = 256;

/// Error type for device operations
#[derive(Error, Debug)]
pub enum DeviceError {
    /// The property is not supported by the device
    #[error("Property not supported: {0}")]
    PropertyNotSupported(String),

    /// The value could not be parsed for the property
    #[error("Invalid value for property {0}: {1}")]
    InvalidValue(String, String),

    /// The device is in an invalid state for the operation
    #[error("Invalid device state: {0}")]
    InvalidState(String),

    /// Hardware I/O failure reported by the pin driver
    #[error("Pin I/O error: {0}")]
    PinIo(String),

    /// A device with the same id is already registered
    #[error("Device already registered: {0}")]
    AlreadyRegistered(Id),

    /// Other error
    #[error("Other error: {0}")]
    Other(String),

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] mqflow_core::error::Error),
}

/// Result type for device operations
pub type Result<T> = std::result::Result<T, DeviceError>;

/// The kind of a gateway device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    /// Electrically driven switch with OPEN/CLOSED states
    Relay,
    /// Debounced magnetic door/window sensor
    ReedSwitch,
    /// Motorized blind controlled via two relays
    Shutter,
}

impl DeviceType {
    /// Get the lowercase name used in topics and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Relay => "relay",
            DeviceType::ReedSwitch => "reed_switch",
            DeviceType::Shutter => "shutter",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Property ids recognized by the device engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    /// Device state (ON/OFF, OPEN/CLOSED or OPEN/CLOSE/STOP depending on type)
    State,
    /// Shutter position as an integer percentage in [0, 100]
    Position,
}

impl PropertyType {
    /// Get the property id used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::State => "state",
            PropertyType::Position => "position",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "state" => Ok(PropertyType::State),
            "position" => Ok(PropertyType::Position),
            other => Err(DeviceError::PropertyNotSupported(other.to_string())),
        }
    }
}

/// A property transition published by a device
///
/// The MQTT/Homie publisher consumes these and maps them to
/// `<prefix>/<gatewayName>/<deviceId>/<propertyId>` topics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyUpdate {
    /// The device that changed
    pub device_id: Id,
    /// The property that changed
    pub property: PropertyType,
    /// The new value
    pub value: Value,
    /// When the change was observed
    pub timestamp: DateTime<Utc>,
}

/// Notification channel from devices to the external observer
///
/// Publishing is fire-and-forget: a full or unobserved channel never fails
/// the device operation that produced the update.
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: broadcast::Sender<PropertyUpdate>,
}

impl Notifier {
    /// Create a new notifier with the default channel capacity
    pub fn new() -> Self {
        Self::with_capacity(NOTIFY_CHANNEL_CAPACITY)
    }

    /// Create a new notifier with a specific channel capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to property updates
    pub fn subscribe(&self) -> broadcast::Receiver<PropertyUpdate> {
        self.sender.subscribe()
    }

    /// Publish a property update
    pub fn notify<V: Into<Value>>(&self, device_id: &Id, property: PropertyType, value: V) {
        let update = PropertyUpdate {
            device_id: device_id.clone(),
            property,
            value: value.into(),
            timestamp: Utc::now(),
        };
        debug!(
            "Property update: {}.{} = {}",
            update.device_id, update.property, update.value
        );
        if self.sender.send(update).is_err() {
            debug!("No receivers for property update");
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

/// The core device trait
///
/// Commands arrive on whatever task the transport dispatcher uses; devices
/// needing internal serialization own their exclusion mechanism.
#[async_trait]
pub trait Device: Send + Sync + Debug {
    /// Get the device ID
    fn id(&self) -> &Id;

    /// Get the device type
    fn device_type(&self) -> DeviceType;

    /// Get the properties this device declares
    fn properties(&self) -> &[PropertyType];

    /// Perform hardware setup once after construction
    ///
    /// Applies debounce configuration, drives safe initial relay states and
    /// triggers calibration where needed.
    async fn init_device(&self) -> Result<()>;

    /// Restore a persisted property value before commands are accepted
    ///
    /// Unsupported properties are logged and ignored.
    async fn init_property(&self, property_id: &str, value: &str) {
        warn!(
            "Trying to initialize unsupported property '{}.{}' (value={})",
            self.id(),
            property_id,
            value
        );
    }

    /// Handle an external command for a property
    ///
    /// Unsupported properties, unparseable values and commands arriving
    /// before calibration are logged and dropped without error; only
    /// hardware I/O failures surface as `Err`.
    async fn change(&self, property_id: &str, new_value: &str) -> Result<()>;
}
