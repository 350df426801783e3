/*!
 * Hardware boundary for digital pins.
 *
 * The gateway never talks to GPIO registers directly; it goes through the
 * traits in this module. Board-specific drivers live outside this crate.
 * The in-memory implementations here back the tests and the example
 * gateway.
 */
use std::fmt::Debug;
use std::time::Duration;

use tokio::sync::watch;

use crate::device::Result;

/// Logical level of a digital pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinLevel {
    /// Logical low
    Low,
    /// Logical high
    High,
}

impl PinLevel {
    /// Get the opposite level
    pub fn inverse(&self) -> PinLevel {
        match self {
            PinLevel::Low => PinLevel::High,
            PinLevel::High => PinLevel::Low,
        }
    }
}

/// A digital output pin
pub trait DigitalOutputPin: Send + Sync + Debug {
    /// Drive the pin to the given level
    fn write(&self, level: PinLevel) -> Result<()>;
}

/// A digital input pin
///
/// Transitions are delivered through a watch channel holding the latest
/// observed level. Debounce configuration is passed down to drivers that
/// filter in hardware; the device layer additionally enforces its own
/// debounce window on the raw transitions it receives.
pub trait DigitalInputPin: Send + Sync + Debug {
    /// Apply a debounce duration to the underlying driver
    fn set_debounce(&self, duration: Duration);

    /// Subscribe to level transitions
    fn subscribe(&self) -> watch::Receiver<PinLevel>;
}

/// In-memory output pin recording the last written level
#[derive(Debug)]
pub struct MemoryOutputPin {
    level: watch::Sender<PinLevel>,
}

impl MemoryOutputPin {
    /// Create a new memory pin at the given initial level
    pub fn new(initial: PinLevel) -> Self {
        let (level, _) = watch::channel(initial);
        Self { level }
    }

    /// Get the last written level
    pub fn level(&self) -> PinLevel {
        *self.level.borrow()
    }

    /// Subscribe to written levels
    pub fn watch(&self) -> watch::Receiver<PinLevel> {
        self.level.subscribe()
    }
}

impl Default for MemoryOutputPin {
    fn default() -> Self {
        Self::new(PinLevel::Low)
    }
}

impl DigitalOutputPin for MemoryOutputPin {
    fn write(&self, level: PinLevel) -> Result<()> {
        // send_replace never fails even with no active receivers
        self.level.send_replace(level);
        Ok(())
    }
}

/// In-memory input pin driven by tests and simulations
#[derive(Debug)]
pub struct MemoryInputPin {
    level: watch::Sender<PinLevel>,
    debounce: std::sync::Mutex<Option<Duration>>,
}

impl MemoryInputPin {
    /// Create a new memory pin at the given initial level
    pub fn new(initial: PinLevel) -> Self {
        let (level, _) = watch::channel(initial);
        Self {
            level,
            debounce: std::sync::Mutex::new(None),
        }
    }

    /// Simulate a raw level transition
    pub fn set_level(&self, level: PinLevel) {
        // send_replace never fails even with no active receivers
        self.level.send_replace(level);
    }

    /// Get the debounce duration applied by the device layer, if any
    pub fn debounce(&self) -> Option<Duration> {
        *self.debounce.lock().expect("debounce lock poisoned")
    }
}

impl Default for MemoryInputPin {
    fn default() -> Self {
        Self::new(PinLevel::Low)
    }
}

impl DigitalInputPin for MemoryInputPin {
    fn set_debounce(&self, duration: Duration) {
        *self.debounce.lock().expect("debounce lock poisoned") = Some(duration);
    }

    fn subscribe(&self) -> watch::Receiver<PinLevel> {
        self.level.subscribe()
    }
}
