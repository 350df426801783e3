use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::time::sleep;
use tracing::info;

use mqflow_core::types::Id;
use mqflow_devices::devices::{RelayDevice, ShutterDevice};
use mqflow_devices::pin::{MemoryOutputPin, PinLevel};
use mqflow_devices::{Device, DeviceRegistry, Notifier};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger
    mqflow_core::logging::init_with_filter("debug")?;

    // Notification channel consumed by the (here: simulated) MQTT publisher
    let notifier = Notifier::new();
    let mut updates = notifier.subscribe();
    tokio::spawn(async move {
        while let Ok(update) = updates.recv().await {
            info!(
                "PUBLISH homie/gateway/{}/{} -> {}",
                update.device_id, update.property, update.value
            );
        }
    });

    // Wire a shutter out of two relays on in-memory pins
    let stop_pin = Arc::new(MemoryOutputPin::new(PinLevel::High));
    let up_down_pin = Arc::new(MemoryOutputPin::new(PinLevel::High));
    let shutter = ShutterDevice::new(
        Id::from_string("bedroom-shutter"),
        RelayDevice::new(Id::from_string("bedroom-shutter-stop"), stop_pin, notifier.clone()),
        RelayDevice::new(
            Id::from_string("bedroom-shutter-updown"),
            up_down_pin,
            notifier.clone(),
        ),
        Duration::from_secs(10),
        Duration::from_secs(8),
        notifier.clone(),
    );

    // Restore the position persisted by the publisher on a previous run
    shutter.init_property("position", "0").await;

    let registry = DeviceRegistry::new();
    registry.register(shutter)?;
    registry.init_all().await?;

    let shutter_id = Id::from_string("bedroom-shutter");

    // Half open, redirect mid-flight, then stop
    registry.dispatch_command(&shutter_id, "position", "50").await?;
    sleep(Duration::from_secs(2)).await;

    registry.dispatch_command(&shutter_id, "position", "80").await?;
    sleep(Duration::from_secs(3)).await;

    registry.dispatch_command(&shutter_id, "state", "STOP").await?;
    sleep(Duration::from_secs(1)).await;

    Ok(())
}
