/*!
 * Shutter (motorized blind) device.
 *
 * A shutter is driven through two relays: the up/down relay selects the
 * direction and the stop relay powers the motor. There is no position
 * sensor, so the controller infers position from elapsed run time against
 * the calibrated full-travel durations, commits the fresh estimate at the
 * start of every command, and schedules a single cancellable stop action to
 * end each move. All command processing and stop firing is serialized on a
 * per-device mutex, so overlapping commands can never interleave relay
 * writes or leave both relays indicating motion after a logical stop.
 */
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use mqflow_core::clock::{Clock, MonotonicClock};
use mqflow_core::logging::device_span;
use mqflow_core::types::Id;

use crate::device::{Device, DeviceType, Notifier, PropertyType, Result};
use crate::devices::relay::{RelayDevice, RelayState};
use crate::scheduler::ActionTimer;

/// Fully closed position
pub const POSITION_CLOSED: i64 = 0;
/// Fully open position
pub const POSITION_OPEN: i64 = 100;

/// Extra run time added when moving to an end-stop, so the shutter reaches
/// the physical limit even if the position estimate drifted
const RESET_MARGIN: Duration = Duration::from_millis(1000);

/// STATE command to fully open
const COMMAND_OPEN: &str = "OPEN";
/// STATE command to fully close
const COMMAND_CLOSE: &str = "CLOSE";
/// STATE command to stop in place
const COMMAND_STOP: &str = "STOP";

/// Properties declared by a shutter
const SHUTTER_PROPERTIES: [PropertyType; 2] = [PropertyType::State, PropertyType::Position];

/// Movement phase of a shutter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutterPhase {
    /// Motor running towards 100
    Opening,
    /// Motor running towards 0
    Closing,
    /// Motor stopped
    Stopped,
}

impl ShutterPhase {
    /// Get the STATE value published for this phase
    pub fn as_str(&self) -> &'static str {
        match self {
            ShutterPhase::Opening => "OPENING",
            ShutterPhase::Closing => "CLOSING",
            ShutterPhase::Stopped => "STOPPED",
        }
    }
}

/// Mutable shutter state, guarded by the device mutex
#[derive(Debug)]
struct ShutterState {
    /// Last committed position; None until first calibration
    position: Option<i64>,
    phase: ShutterPhase,
    /// Set iff the motor is running
    move_started: Option<Instant>,
    /// The single scheduled-stop slot
    timer: ActionTimer,
}

/// A motorized blind with time-based position estimation
#[derive(Debug, Clone)]
pub struct ShutterDevice {
    id: Id,
    stop_relay: RelayDevice,
    up_down_relay: RelayDevice,
    full_open_time: Duration,
    full_close_time: Duration,
    clock: Arc<dyn Clock>,
    notifier: Notifier,
    inner: Arc<Mutex<ShutterState>>,
}

impl ShutterDevice {
    /// Create a new shutter device
    ///
    /// # Arguments
    ///
    /// * `id` - The device id
    /// * `stop_relay` - Relay powering the motor (exclusively owned)
    /// * `up_down_relay` - Relay selecting the direction (exclusively owned)
    /// * `full_open_time` - Calibrated travel time from 0 to 100
    /// * `full_close_time` - Calibrated travel time from 100 to 0
    /// * `notifier` - The property-update channel
    pub fn new(
        id: Id,
        stop_relay: RelayDevice,
        up_down_relay: RelayDevice,
        full_open_time: Duration,
        full_close_time: Duration,
        notifier: Notifier,
    ) -> Self {
        Self::with_clock(
            id,
            stop_relay,
            up_down_relay,
            full_open_time,
            full_close_time,
            notifier,
            Arc::new(MonotonicClock),
        )
    }

    /// Create a new shutter device with an injected clock
    #[allow(clippy::too_many_arguments)]
    pub fn with_clock(
        id: Id,
        stop_relay: RelayDevice,
        up_down_relay: RelayDevice,
        full_open_time: Duration,
        full_close_time: Duration,
        notifier: Notifier,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            id,
            stop_relay,
            up_down_relay,
            full_open_time,
            full_close_time,
            clock,
            notifier,
            inner: Arc::new(Mutex::new(ShutterState {
                position: None,
                phase: ShutterPhase::Stopped,
                move_started: None,
                timer: ActionTimer::new(),
            })),
        }
    }

    /// Get the last committed position, if calibrated
    pub async fn position(&self) -> Option<i64> {
        self.inner.lock().await.position
    }

    /// Get the current movement phase
    pub async fn phase(&self) -> ShutterPhase {
        self.inner.lock().await.phase
    }

    /// Check whether a scheduled stop is pending
    pub async fn has_pending_stop(&self) -> bool {
        self.inner.lock().await.timer.is_pending()
    }

    /// Commit a position and notify the POSITION property
    fn set_position(&self, state: &mut ShutterState, position: i64) {
        state.position = Some(position);
        self.notifier
            .notify(&self.id, PropertyType::Position, position);
    }

    /// Set the movement phase and notify the STATE property
    fn set_phase(&self, state: &mut ShutterState, phase: ShutterPhase) {
        state.phase = phase;
        self.notifier
            .notify(&self.id, PropertyType::State, phase.as_str());
    }

    /// Estimate the position reached so far in the current move
    ///
    /// Stopped shutters keep their committed position; moving shutters add
    /// or subtract the percentage of full travel covered by the elapsed run
    /// time, clamped to the physical range.
    fn estimated_position(&self, state: &ShutterState, current: i64) -> i64 {
        let (sign, full_travel) = match state.phase {
            ShutterPhase::Stopped => return current,
            ShutterPhase::Opening => (1, self.full_open_time),
            ShutterPhase::Closing => (-1, self.full_close_time),
        };
        let started = state.move_started.unwrap_or_else(|| self.clock.now());
        let elapsed = self.clock.now().saturating_duration_since(started);
        let moved = (elapsed.as_millis() as f64 / full_travel.as_millis() as f64 * 100.0) as i64;
        (current + sign * moved).clamp(POSITION_CLOSED, POSITION_OPEN)
    }

    /// Resolve the target position for a command, or None if the command is
    /// malformed or the property is unsupported
    fn resolve_target(&self, current: i64, property_id: &str, new_value: &str) -> Option<i64> {
        if property_id == PropertyType::State.as_str() {
            match new_value {
                COMMAND_OPEN => Some(POSITION_OPEN),
                COMMAND_CLOSE => Some(POSITION_CLOSED),
                _ => None,
            }
        } else if property_id == PropertyType::Position.as_str() {
            new_value
                .parse::<i64>()
                .ok()
                .map(|p| p.clamp(POSITION_CLOSED, POSITION_OPEN))
        } else {
            warn!(
                "Trying to change unsupported property '{}.{}'",
                self.id, property_id
            );
            None
        }
    }

    /// Choose the movement direction for a target
    ///
    /// Re-requesting an end-stop the shutter already reports re-drives
    /// towards that end-stop, re-anchoring the estimate against the
    /// physical limit.
    fn direction_to(&self, current: i64, target: i64) -> ShutterPhase {
        if target > current {
            ShutterPhase::Opening
        } else if target < current {
            ShutterPhase::Closing
        } else if target == POSITION_OPEN {
            ShutterPhase::Opening
        } else {
            ShutterPhase::Closing
        }
    }

    /// Compute the run time needed to move from `current` to `target`
    ///
    /// The base time is the fraction of full travel covered by the distance.
    /// Moves ending at an end-stop additionally run for the reset margin so
    /// the shutter reaches the physical limit even if the estimate drifted.
    fn required_move_time(&self, current: i64, target: i64) -> Duration {
        let full_travel = match self.direction_to(current, target) {
            ShutterPhase::Closing => self.full_close_time,
            _ => self.full_open_time,
        };
        let fraction = (target - current).abs() as f64 / 100.0;
        let base = Duration::from_millis((full_travel.as_millis() as f64 * fraction) as u64);
        if target == POSITION_OPEN || target == POSITION_CLOSED {
            base + RESET_MARGIN
        } else {
            base
        }
    }

    /// Drive the relays for an upward move
    fn go_up(&self, state: &mut ShutterState) -> Result<()> {
        self.up_down_relay.change_state(RelayState::Open)?;
        self.stop_relay.change_state(RelayState::Closed)?;
        state.move_started = Some(self.clock.now());
        self.set_phase(state, ShutterPhase::Opening);
        Ok(())
    }

    /// Drive the relays for a downward move
    fn go_down(&self, state: &mut ShutterState) -> Result<()> {
        self.up_down_relay.change_state(RelayState::Closed)?;
        self.stop_relay.change_state(RelayState::Closed)?;
        state.move_started = Some(self.clock.now());
        self.set_phase(state, ShutterPhase::Closing);
        Ok(())
    }

    /// Open both relays and leave the motor stopped
    fn halt(&self, state: &mut ShutterState) -> Result<()> {
        self.stop_relay.change_state(RelayState::Open)?;
        self.up_down_relay.change_state(RelayState::Open)?;
        state.move_started = None;
        self.set_phase(state, ShutterPhase::Stopped);
        Ok(())
    }

    /// Arm the stop action ending the current move
    ///
    /// `epoch` must come from the `ActionTimer::cancel` call made by the
    /// same command, under the same lock. The fired action re-checks the
    /// epoch under the lock, so a stop replaced by a later command never
    /// produces effects.
    fn arm_stop(&self, state: &mut ShutterState, epoch: u64, duration: Duration, target: i64) {
        let device = self.clone();
        let handle = tokio::spawn(async move {
            sleep(duration).await;
            let mut state = device.inner.lock().await;
            if !state.timer.is_live(epoch) {
                return;
            }
            state.timer.disarm();
            info!("Stopping shutter {} after move", device.id);
            if let Err(e) = device.halt(&mut state) {
                error!("Failed to stop shutter {} after move: {}", device.id, e);
                return;
            }
            device.set_position(&mut state, target);
        });
        state.timer.arm(handle);
    }
}

#[async_trait]
impl Device for ShutterDevice {
    fn id(&self) -> &Id {
        &self.id
    }

    fn device_type(&self) -> DeviceType {
        DeviceType::Shutter
    }

    fn properties(&self) -> &[PropertyType] {
        &SHUTTER_PROPERTIES
    }

    async fn init_device(&self) -> Result<()> {
        self.stop_relay.init_device().await?;
        self.up_down_relay.init_device().await?;

        let mut state = self.inner.lock().await;
        let _span = device_span(DeviceType::Shutter.as_str(), self.id.as_str()).entered();
        if state.position.is_none() {
            warn!(
                "Shutter {} position is unknown. It will be initialized now by closing the shutter.",
                self.id
            );
            let epoch = state.timer.cancel();
            self.go_down(&mut state)?;
            self.arm_stop(
                &mut state,
                epoch,
                self.full_close_time + RESET_MARGIN,
                POSITION_CLOSED,
            );
        }
        Ok(())
    }

    async fn init_property(&self, property_id: &str, value: &str) {
        if property_id != PropertyType::Position.as_str() {
            warn!(
                "Trying to initialize unsupported property '{}.{}'",
                self.id, property_id
            );
            return;
        }
        match value.parse::<i64>() {
            Ok(position) => {
                let mut state = self.inner.lock().await;
                let position = position.clamp(POSITION_CLOSED, POSITION_OPEN);
                self.set_position(&mut state, position);
            }
            Err(_) => {
                error!(
                    "Invalid persisted position '{}' for shutter {}",
                    value, self.id
                );
            }
        }
    }

    async fn change(&self, property_id: &str, new_value: &str) -> Result<()> {
        let mut state = self.inner.lock().await;
        let _span = device_span(DeviceType::Shutter.as_str(), self.id.as_str()).entered();

        let Some(last_position) = state.position else {
            warn!(
                "Current position in device {} is unknown. It is currently in state '{}'. \
                 It is assumed that initialization is running, so this command will be ignored.",
                self.id,
                state.phase.as_str()
            );
            return Ok(());
        };

        let current = self.estimated_position(&state, last_position);
        if current != last_position {
            debug!(
                "New current position found {} for shutter {}. Previous was {}.",
                current, self.id, last_position
            );
            self.set_position(&mut state, current);
        }

        if property_id == PropertyType::State.as_str() && new_value == COMMAND_STOP {
            // STOP always halts in place, even at an end-stop; the freshly
            // estimated position is re-committed as-is.
            state.timer.cancel();
            info!("Stopping shutter {} at position {}", self.id, current);
            self.halt(&mut state)?;
            self.set_position(&mut state, current);
            return Ok(());
        }

        let Some(target) = self.resolve_target(current, property_id, new_value) else {
            error!(
                "Could not calculate target position for device {} (property={}, value={})",
                self.id, property_id, new_value
            );
            return Ok(());
        };

        let required = self.required_move_time(current, target);
        let epoch = state.timer.cancel();

        if required.is_zero() {
            // Target equals the freshly estimated position; stop in place
            // instead of scheduling a zero-delay action.
            info!("Shutter {} already at position {}, stopping", self.id, target);
            self.halt(&mut state)?;
            self.set_position(&mut state, target);
            return Ok(());
        }

        match self.direction_to(current, target) {
            ShutterPhase::Closing => {
                info!(
                    "Command received to move shutter {} DOWN to position {} ({:?})",
                    self.id, target, required
                );
                self.go_down(&mut state)?;
            }
            _ => {
                info!(
                    "Command received to move shutter {} UP to position {} ({:?})",
                    self.id, target, required
                );
                self.go_up(&mut state)?;
            }
        }

        self.arm_stop(&mut state, epoch, required, target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::{MemoryOutputPin, PinLevel};
    use mqflow_core::clock::ManualClock;
    use mqflow_core::types::Value;

    struct Rig {
        shutter: ShutterDevice,
        stop_pin: Arc<MemoryOutputPin>,
        up_down_pin: Arc<MemoryOutputPin>,
        notifier: Notifier,
    }

    /// Relays use the default wiring: CLOSED drives Low, OPEN drives High.
    fn rig(full_open_ms: u64, full_close_ms: u64) -> Rig {
        let notifier = Notifier::new();
        let stop_pin = Arc::new(MemoryOutputPin::new(PinLevel::High));
        let up_down_pin = Arc::new(MemoryOutputPin::new(PinLevel::High));
        let stop_relay = RelayDevice::new(
            Id::from_string("shutter-stop"),
            stop_pin.clone(),
            notifier.clone(),
        );
        let up_down_relay = RelayDevice::new(
            Id::from_string("shutter-updown"),
            up_down_pin.clone(),
            notifier.clone(),
        );
        let shutter = ShutterDevice::new(
            Id::from_string("bedroom-shutter"),
            stop_relay,
            up_down_relay,
            Duration::from_millis(full_open_ms),
            Duration::from_millis(full_close_ms),
            notifier.clone(),
        );
        Rig {
            shutter,
            stop_pin,
            up_down_pin,
            notifier,
        }
    }

    fn assert_motor_stopped(rig: &Rig) {
        // Both relays open: stop pin High, direction pin High.
        assert_eq!(rig.stop_pin.level(), PinLevel::High);
        assert_eq!(rig.up_down_pin.level(), PinLevel::High);
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn test_position_command_moves_and_stops_at_target() {
        let rig = rig(10_000, 8_000);
        rig.shutter.init_property("position", "0").await;
        rig.shutter.init_device().await.unwrap();

        rig.shutter.change("position", "50").await.unwrap();
        assert_eq!(rig.shutter.phase().await, ShutterPhase::Opening);
        // Moving up: direction relay open (High), stop relay closed (Low).
        assert_eq!(rig.up_down_pin.level(), PinLevel::High);
        assert_eq!(rig.stop_pin.level(), PinLevel::Low);
        assert!(rig.shutter.has_pending_stop().await);

        // 50% of the 10s full-open time.
        sleep(Duration::from_millis(5_100)).await;
        assert_eq!(rig.shutter.position().await, Some(50));
        assert_eq!(rig.shutter.phase().await, ShutterPhase::Stopped);
        assert!(!rig.shutter.has_pending_stop().await);
        assert_motor_stopped(&rig);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_command_adds_reset_margin() {
        let rig = rig(10_000, 8_000);
        rig.shutter.init_property("position", "30").await;
        rig.shutter.init_device().await.unwrap();

        rig.shutter.change("state", "CLOSE").await.unwrap();
        assert_eq!(rig.shutter.phase().await, ShutterPhase::Closing);
        // Moving down: both relays closed (Low).
        assert_eq!(rig.up_down_pin.level(), PinLevel::Low);
        assert_eq!(rig.stop_pin.level(), PinLevel::Low);

        // 8000 * 30% + 1000 = 3400ms; still moving just before that.
        sleep(Duration::from_millis(3_300)).await;
        assert_eq!(rig.shutter.phase().await, ShutterPhase::Closing);

        sleep(Duration::from_millis(200)).await;
        assert_eq!(rig.shutter.position().await, Some(0));
        assert_eq!(rig.shutter.phase().await, ShutterPhase::Stopped);
        assert_motor_stopped(&rig);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_mid_travel_commits_estimated_position() {
        let rig = rig(10_000, 8_000);
        rig.shutter.init_property("position", "0").await;
        rig.shutter.init_device().await.unwrap();

        rig.shutter.change("state", "OPEN").await.unwrap();
        sleep(Duration::from_millis(3_000)).await;
        rig.shutter.change("state", "STOP").await.unwrap();

        let position = rig.shutter.position().await.unwrap();
        assert!(position > 0 && position < 100, "position was {}", position);
        assert_eq!(position, 30);
        assert_eq!(rig.shutter.phase().await, ShutterPhase::Stopped);
        assert!(!rig.shutter.has_pending_stop().await);
        assert_motor_stopped(&rig);

        // The cancelled stop must never fire later.
        sleep(Duration::from_secs(20)).await;
        assert_eq!(rig.shutter.position().await, Some(position));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_commands_compound_and_keep_one_pending_stop() {
        let rig = rig(10_000, 10_000);
        rig.shutter.init_property("position", "0").await;
        rig.shutter.init_device().await.unwrap();

        rig.shutter.change("position", "80").await.unwrap();
        sleep(Duration::from_millis(4_000)).await;

        // Redirect mid-flight; estimate has reached 40 by now.
        rig.shutter.change("position", "20").await.unwrap();
        assert_eq!(rig.shutter.position().await, Some(40));
        assert_eq!(rig.shutter.phase().await, ShutterPhase::Closing);
        assert!(rig.shutter.has_pending_stop().await);

        // 20% of the 10s close time.
        sleep(Duration::from_millis(2_100)).await;
        assert_eq!(rig.shutter.position().await, Some(20));
        assert_eq!(rig.shutter.phase().await, ShutterPhase::Stopped);
        assert!(!rig.shutter.has_pending_stop().await);
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn test_calibration_runs_on_init_when_position_unknown() {
        let rig = rig(10_000, 8_000);
        rig.shutter.init_device().await.unwrap();

        assert_eq!(rig.shutter.position().await, None);
        assert_eq!(rig.shutter.phase().await, ShutterPhase::Closing);

        // full_close_time + 1000ms margin.
        sleep(Duration::from_millis(9_100)).await;
        assert_eq!(rig.shutter.position().await, Some(0));
        assert_eq!(rig.shutter.phase().await, ShutterPhase::Stopped);
        assert_motor_stopped(&rig);
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_are_ignored_while_calibrating() {
        let rig = rig(10_000, 8_000);
        rig.shutter.init_device().await.unwrap();

        sleep(Duration::from_millis(1_000)).await;
        rig.shutter.change("state", "OPEN").await.unwrap();
        // Still closing; the command did not redirect the calibration run.
        assert_eq!(rig.shutter.phase().await, ShutterPhase::Closing);

        sleep(Duration::from_millis(8_100)).await;
        assert_eq!(rig.shutter.position().await, Some(0));
        assert_eq!(rig.shutter.phase().await, ShutterPhase::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_property_skips_calibration() {
        let rig = rig(10_000, 8_000);
        rig.shutter.init_property("position", "75").await;
        rig.shutter.init_device().await.unwrap();

        assert_eq!(rig.shutter.position().await, Some(75));
        assert_eq!(rig.shutter.phase().await, ShutterPhase::Stopped);
        assert!(!rig.shutter.has_pending_stop().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_position_value_is_dropped() {
        let rig = rig(10_000, 8_000);
        rig.shutter.init_property("position", "50").await;
        rig.shutter.init_device().await.unwrap();

        rig.shutter.change("position", "not-a-number").await.unwrap();
        assert_eq!(rig.shutter.phase().await, ShutterPhase::Stopped);
        assert!(!rig.shutter.has_pending_stop().await);
        assert_motor_stopped(&rig);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_property_is_dropped() {
        let rig = rig(10_000, 8_000);
        rig.shutter.init_property("position", "50").await;
        rig.shutter.init_device().await.unwrap();

        rig.shutter.change("brightness", "10").await.unwrap();
        assert_eq!(rig.shutter.phase().await, ShutterPhase::Stopped);
        assert_motor_stopped(&rig);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_midrange_target_stops_immediately() {
        let rig = rig(10_000, 8_000);
        rig.shutter.init_property("position", "50").await;
        rig.shutter.init_device().await.unwrap();
        let notifier = rig.notifier.clone();
        let mut rx = notifier.subscribe();

        rig.shutter.change("position", "50").await.unwrap();
        assert_eq!(rig.shutter.phase().await, ShutterPhase::Stopped);
        assert!(!rig.shutter.has_pending_stop().await);
        assert_motor_stopped(&rig);

        // The in-place stop still re-commits the position.
        let mut saw_position = false;
        while let Ok(update) = rx.try_recv() {
            if update.property == PropertyType::Position {
                assert_eq!(update.value, Value::Integer(50));
                saw_position = true;
            }
        }
        assert!(saw_position);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reopening_an_end_stop_reanchors_towards_it() {
        let rig = rig(10_000, 8_000);
        rig.shutter.init_property("position", "100").await;
        rig.shutter.init_device().await.unwrap();

        rig.shutter.change("state", "OPEN").await.unwrap();
        // Re-anchoring run drives UP, not down, for the margin only.
        assert_eq!(rig.shutter.phase().await, ShutterPhase::Opening);

        sleep(Duration::from_millis(1_100)).await;
        assert_eq!(rig.shutter.position().await, Some(100));
        assert_eq!(rig.shutter.phase().await, ShutterPhase::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_command_before_any_calibration_is_ignored() {
        let rig = rig(10_000, 8_000);

        rig.shutter.change("state", "OPEN").await.unwrap();
        assert_eq!(rig.shutter.position().await, None);
        assert_eq!(rig.shutter.phase().await, ShutterPhase::Stopped);
        assert!(!rig.shutter.has_pending_stop().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_estimate_follows_injected_clock() {
        let notifier = Notifier::new();
        let stop_pin = Arc::new(MemoryOutputPin::new(PinLevel::High));
        let up_down_pin = Arc::new(MemoryOutputPin::new(PinLevel::High));
        let clock = Arc::new(ManualClock::new());
        let shutter = ShutterDevice::with_clock(
            Id::from_string("bedroom-shutter"),
            RelayDevice::new(Id::from_string("shutter-stop"), stop_pin, notifier.clone()),
            RelayDevice::new(
                Id::from_string("shutter-updown"),
                up_down_pin,
                notifier.clone(),
            ),
            Duration::from_millis(10_000),
            Duration::from_millis(8_000),
            notifier,
            clock.clone(),
        );
        shutter.init_property("position", "0").await;
        shutter.init_device().await.unwrap();

        shutter.change("state", "OPEN").await.unwrap();
        // Only the injected clock advances; the scheduled stop (running on
        // the paused runtime clock) stays pending and never fires here.
        clock.advance(Duration::from_millis(3_000));
        shutter.change("state", "STOP").await.unwrap();

        assert_eq!(shutter.position().await, Some(30));
        assert_eq!(shutter.phase().await, ShutterPhase::Stopped);
        assert!(!shutter.has_pending_stop().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_estimate_never_exceeds_physical_range() {
        let rig = rig(10_000, 8_000);
        rig.shutter.init_property("position", "90").await;
        rig.shutter.init_device().await.unwrap();

        // Open to the end-stop, then stop while still inside the margin
        // overshoot; the raw estimate (90 + 15) must clamp to 100.
        rig.shutter.change("state", "OPEN").await.unwrap();
        sleep(Duration::from_millis(1_500)).await;
        rig.shutter.change("state", "STOP").await.unwrap();

        assert_eq!(rig.shutter.position().await, Some(100));
        assert_eq!(rig.shutter.phase().await, ShutterPhase::Stopped);
        assert!(!rig.shutter.has_pending_stop().await);
        assert_motor_stopped(&rig);
    }
}
