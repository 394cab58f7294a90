//! Device registry and dispatcher
//!
//! The registry owns every installed device and routes all pin traffic
//! by range ownership. Scan order is most-recently-installed first, and
//! that order is load-bearing: a newer device claiming an overlapping
//! range shadows an older one until it is removed. Filter devices rely
//! on the same ordering for downstream delivery.

use alloc::boxed::Box;
use heapless::Vec;

use crate::device::{ConfigError, ConfigRequest, DeviceInfo, Downstream, IoDevice};
use crate::vpin::Vpin;

/// Maximum number of installed devices
pub const MAX_DEVICES: usize = 16;

/// Ordered collection of installed devices plus the dispatch engine
#[derive(Default)]
pub struct Registry {
    // Index 0 is the scan head (newest device).
    devices: Vec<Box<dyn IoDevice>, MAX_DEVICES>,
}

impl Registry {
    /// Create an empty registry
    pub const fn new() -> Self {
        Self { devices: Vec::new() }
    }

    /// Install a device at the head of the scan order and run its
    /// initialisation hook
    ///
    /// The device is linked before `init` runs, so it is already
    /// reachable by lookup and its init-time downstream writes are
    /// delivered to devices installed earlier. A full registry hands
    /// the device back unchanged.
    pub fn add(&mut self, device: Box<dyn IoDevice>) -> Result<(), Box<dyn IoDevice>> {
        self.devices.insert(0, device)?;
        let mut queue = Downstream::new();
        self.devices[0].init(&mut queue);
        self.deliver(1, queue);
        Ok(())
    }

    /// Number of installed devices
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether no devices are installed
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Whether some installed device owns `pin`
    pub fn exists(&self, pin: Vpin) -> bool {
        self.find_owner(0, pin).is_some()
    }

    /// Write `value` to the first device owning `pin`
    ///
    /// An unowned pin is a no-op apart from a diagnostic.
    pub fn write(&mut self, pin: Vpin, value: u16) {
        if !self.dispatch_write(0, pin, value) {
            #[cfg(feature = "defmt")]
            defmt::warn!("write: vpin {} not assigned", pin);
        }
    }

    /// Read the first device owning `pin`
    ///
    /// An unowned pin reads as `false` plus a diagnostic.
    pub fn read(&mut self, pin: Vpin) -> bool {
        match self.find_owner(0, pin) {
            Some(idx) => self.devices[idx].read(pin),
            None => {
                #[cfg(feature = "defmt")]
                defmt::warn!("read: vpin {} not assigned", pin);
                false
            }
        }
    }

    /// Apply a configuration request to the first device owning `pin`
    pub fn configure(&mut self, pin: Vpin, request: &ConfigRequest) -> Result<(), ConfigError> {
        let Some(idx) = self.find_owner(0, pin) else {
            #[cfg(feature = "defmt")]
            defmt::warn!("configure: vpin {} not assigned", pin);
            return Err(ConfigError::NoDevice);
        };
        let mut queue = Downstream::new();
        let result = self.devices[idx].configure(pin, request, &mut queue);
        self.deliver(idx + 1, queue);
        result
    }

    /// Uninstall the first device owning `pin`, if it allows removal
    ///
    /// Returns whether a device was removed. Non-removable owners are
    /// left untouched and report `false`, same as an unowned pin.
    pub fn remove(&mut self, pin: Vpin) -> bool {
        let Some(idx) = self.find_owner(0, pin) else {
            return false;
        };
        if !self.devices[idx].is_removable() {
            return false;
        }
        self.devices.remove(idx);
        true
    }

    /// Run every device's periodic hook, in scan order
    ///
    /// Call once per control-loop pass with the monotonic microsecond
    /// clock. Writes queued by a hook are delivered downstream of the
    /// device that queued them.
    pub fn tick(&mut self, now_us: u32) {
        for idx in 0..self.devices.len() {
            let mut queue = Downstream::new();
            self.devices[idx].tick(now_us, &mut queue);
            self.deliver(idx + 1, queue);
        }
    }

    /// Enumerate diagnostic descriptors of all devices, in scan order
    pub fn device_info(&self) -> impl Iterator<Item = DeviceInfo> + '_ {
        self.devices.iter().map(|dev| dev.info())
    }

    /// First device at index >= `start` owning `pin`
    fn find_owner(&self, start: usize, pin: Vpin) -> Option<usize> {
        self.devices
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, dev)| dev.range().contains(pin))
            .map(|(idx, _)| idx)
    }

    /// Dispatch a write scanning from `start`; true if a device took it
    fn dispatch_write(&mut self, start: usize, pin: Vpin, value: u16) -> bool {
        let Some(idx) = self.find_owner(start, pin) else {
            return false;
        };
        let mut queue = Downstream::new();
        self.devices[idx].write(pin, value, &mut queue);
        self.deliver(idx + 1, queue);
        true
    }

    /// Deliver queued writes, each scanning from `start`
    ///
    /// `start` strictly increases through nested deliveries, so the
    /// recursion is bounded by the device count.
    fn deliver(&mut self, start: usize, mut queue: Downstream) {
        for write in queue.take() {
            if !self.dispatch_write(start, write.pin, write.value) {
                #[cfg(feature = "defmt")]
                defmt::warn!("downstream write: vpin {} not assigned", write.pin);
            }
        }
    }
}
