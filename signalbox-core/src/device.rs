//! Device model for the I/O registry
//!
//! A device is anything that owns a block of virtual pins: a bank of
//! platform GPIOs, an I2C expander, a PWM controller, or a purely
//! logical filter such as the servo animation. All capabilities beyond
//! ownership are optional; the defaults degrade to harmless no-ops.

use heapless::Vec;

use crate::servo::ServoConfig;
use crate::vpin::{PinRange, Vpin};

/// Capacity of a device's downstream write queue
pub const MAX_DOWNSTREAM: usize = 8;

/// A single pin write requested by a device for later delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinWrite {
    /// Target virtual pin
    pub pin: Vpin,
    /// Value to deliver
    pub value: u16,
}

/// Write queue a device hands to the registry for downstream delivery
///
/// A filter device may expose an output pin that a device registered
/// before it (later in scan order) actually drives. Writes pushed here
/// are dispatched by the registry starting AFTER the issuing device, so
/// both can share one pin number without addressing each other.
#[derive(Debug, Default)]
pub struct Downstream {
    writes: Vec<PinWrite, MAX_DOWNSTREAM>,
}

impl Downstream {
    /// Create an empty queue
    pub const fn new() -> Self {
        Self { writes: Vec::new() }
    }

    /// Queue a write for downstream delivery
    ///
    /// The queue is bounded; overflow drops the write with a diagnostic
    /// so the control loop's work per pass stays bounded.
    pub fn push(&mut self, pin: Vpin, value: u16) {
        if self.writes.push(PinWrite { pin, value }).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("downstream queue full, dropping write to vpin {}", pin);
        }
    }

    /// Number of queued writes
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Iterate the queued writes in push order
    pub fn iter(&self) -> impl Iterator<Item = &PinWrite> {
        self.writes.iter()
    }

    /// Drop all queued writes
    pub fn clear(&mut self) {
        self.writes.clear();
    }

    pub(crate) fn take(&mut self) -> Vec<PinWrite, MAX_DOWNSTREAM> {
        core::mem::take(&mut self.writes)
    }
}

/// A configuration request for one pin
///
/// Typed replacement for an open-ended parameter list: each capability
/// a device family can configure gets its own variant, and devices
/// reject the variants they cannot satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigRequest {
    /// Enable or disable the input pull-up on an expander pin
    ///
    /// The expander chips cannot read a floating input reliably, so
    /// only the enable form succeeds.
    Pullup(bool),
    /// Re-arm a servo animation with new endpoints and a known state
    Servo {
        /// Endpoint positions and motion profile
        config: ServoConfig,
        /// Logical state to assume immediately
        initial_state: bool,
    },
}

/// Why a configuration request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// No installed device owns the pin
    NoDevice,
    /// The owning device cannot satisfy the request
    Unsupported,
}

/// Diagnostic descriptor of an installed device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceInfo {
    /// Short device kind name
    pub name: &'static str,
    /// Claimed virtual pin block
    pub range: PinRange,
    /// First bus address, for bus-attached devices
    pub bus_address: Option<u8>,
}

/// A registered I/O device
///
/// Implementations own all of their state exclusively; the registry is
/// the only caller and the whole system runs in one cooperative loop.
pub trait IoDevice {
    /// The contiguous virtual-pin block this device owns
    fn range(&self) -> PinRange;

    /// One-time initialisation, run by the registry after installation
    ///
    /// The device is already reachable by lookup when this runs, so
    /// writes queued on `downstream` land on devices installed earlier.
    fn init(&mut self, downstream: &mut Downstream) {
        let _ = downstream;
    }

    /// Apply a configuration request to one owned pin
    fn configure(
        &mut self,
        pin: Vpin,
        request: &ConfigRequest,
        downstream: &mut Downstream,
    ) -> Result<(), ConfigError> {
        let _ = (pin, request, downstream);
        Err(ConfigError::Unsupported)
    }

    /// Drive an owned pin
    fn write(&mut self, pin: Vpin, value: u16, downstream: &mut Downstream) {
        let _ = (pin, value, downstream);
    }

    /// Sample an owned pin
    fn read(&mut self, pin: Vpin) -> bool {
        let _ = pin;
        false
    }

    /// Periodic housekeeping, called once per control-loop pass
    ///
    /// `now_us` is a monotonic microsecond clock that wraps at the u32
    /// boundary; elapsed time must be computed with `wrapping_sub`,
    /// never by comparing instants directly.
    fn tick(&mut self, now_us: u32, downstream: &mut Downstream) {
        let _ = (now_us, downstream);
    }

    /// Diagnostic descriptor
    fn info(&self) -> DeviceInfo;

    /// Whether `Registry::remove` may uninstall this device
    ///
    /// Base infrastructure devices are permanent and report `false`.
    fn is_removable(&self) -> bool {
        false
    }
}
