//! Generic I2C port-expander device
//!
//! Both supported chip families share the same hard problem: the bus
//! is shared and slow relative to the control loop. The answer is the
//! same for all of them - shadow the port state, cache input reads
//! behind a freshness counter, and invalidate the cache on every write.
//! That algorithm lives here exactly once; a chip family contributes
//! its module width, bus speed and register accesses through
//! [`ExpanderChip`].
//!
//! One device instance manages up to [`MAX_MODULES`] chip modules on
//! consecutive bus addresses, with virtual pins assigned contiguously
//! module by module.

pub mod cache;
pub mod mcp23008;
pub mod mcp23017;
pub mod pcf8574;

pub use cache::{PortCache, MAX_MODULES, MIN_TICKS_BETWEEN_READS};
pub use mcp23008::Mcp23008;
pub use mcp23017::Mcp23017;
pub use pcf8574::Pcf8574;

use core::marker::PhantomData;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use signalbox_core::device::{ConfigError, ConfigRequest, DeviceInfo, Downstream, IoDevice};
use signalbox_core::vpin::{PinRange, Vpin};
use signalbox_hal::{I2cBus, I2cConfig};

/// One chip family's contribution to the shared expander driver
///
/// Families with direction/pull-up registers set [`Self::HAS_DIRECTION`]
/// and implement the register writes; families without them keep the
/// defaults and rely on the open-drain write-before-read protocol.
pub trait ExpanderChip {
    /// Diagnostic name
    const NAME: &'static str;

    /// Pins exposed by one chip module
    const PINS_PER_MODULE: u16;

    /// Bus clock the family is rated for
    const BUS_CLOCK: I2cConfig;

    /// Whether the family has direction and pull-up registers
    const HAS_DIRECTION: bool;

    /// Interval between freshness-counter decays, in µs
    const TICK_INTERVAL_US: u32 = 500;

    /// Drive the module's output register from the shadow
    fn write_output<B: I2cBus>(bus: &mut B, address: u8, bits: u16) -> Result<(), B::Error>;

    /// Read the module's whole input register
    fn read_input<B: I2cBus>(bus: &mut B, address: u8) -> Result<u16, B::Error>;

    /// Write the direction register (bit set = input)
    fn write_inputs<B: I2cBus>(bus: &mut B, address: u8, mask: u16) -> Result<(), B::Error> {
        let _ = (bus, address, mask);
        Ok(())
    }

    /// Write the pull-up register
    fn write_pullups<B: I2cBus>(bus: &mut B, address: u8, mask: u16) -> Result<(), B::Error> {
        let _ = (bus, address, mask);
        Ok(())
    }

    /// One-time module setup during warm-start initialisation
    fn setup<B: I2cBus>(bus: &mut B, address: u8) -> Result<(), B::Error> {
        let _ = (bus, address);
        Ok(())
    }
}

/// Pin block and bus placement of one expander device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExpanderConfig {
    /// First claimed virtual pin
    pub first_pin: Vpin,
    /// Claimed pin count; clamped to what 8 modules can expose
    pub pin_count: u16,
    /// Bus address of the first module; further modules follow at
    /// consecutive addresses
    pub base_address: u8,
}

/// Port-expander device generic over chip family and bus transport
pub struct Expander<C: ExpanderChip, B: I2cBus> {
    range: PinRange,
    base_address: u8,
    bus: B,
    cache: PortCache,
    _chip: PhantomData<C>,
}

impl<C: ExpanderChip, B: I2cBus> Expander<C, B> {
    /// Create an expander claiming `config.pin_count` pins, one module
    /// per [`ExpanderChip::PINS_PER_MODULE`] block
    ///
    /// Requests beyond 8 modules' worth of pins are silently clamped.
    pub fn new(config: ExpanderConfig, bus: B) -> Self {
        let max_pins = (MAX_MODULES as u16) * C::PINS_PER_MODULE;
        let pins = config.pin_count.min(max_pins);
        let modules = pins.div_ceil(C::PINS_PER_MODULE);
        Self {
            range: PinRange::new(config.first_pin, pins),
            base_address: config.base_address,
            bus,
            cache: PortCache::new(usize::from(modules)),
            _chip: PhantomData,
        }
    }

    /// Access the underlying bus transport
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Resolve an owned pin to its module index and bit mask
    fn locate(&self, pin: Vpin) -> Option<(usize, u16)> {
        let offset = self.range.offset(pin)?;
        Some((
            usize::from(offset / C::PINS_PER_MODULE),
            1 << (offset % C::PINS_PER_MODULE),
        ))
    }

    fn module_address(&self, module: usize) -> u8 {
        self.base_address + module as u8
    }
}

impl<C: ExpanderChip, B: I2cBus> IoDevice for Expander<C, B> {
    fn range(&self) -> PinRange {
        self.range
    }

    fn init(&mut self, _downstream: &mut Downstream) {
        self.bus.set_frequency(C::BUS_CLOCK.frequency);
        for module in 0..self.cache.module_count() {
            let address = self.module_address(module);
            if !self.bus.probe(address) {
                #[cfg(feature = "defmt")]
                defmt::warn!("{}: no response at i2c address {:#x}", C::NAME, address);
            }
            if C::HAS_DIRECTION {
                // The chip may be warm-starting with stale registers;
                // bring it in line with the shadows. Errors are final,
                // the transport owns any retry policy.
                let _ = C::setup(&mut self.bus, address);
                let _ = C::write_output(&mut self.bus, address, self.cache.output(module));
                let _ = C::write_inputs(&mut self.bus, address, self.cache.inputs(module));
                let _ = C::write_pullups(&mut self.bus, address, self.cache.pullups(module));
            }
        }
    }

    fn configure(
        &mut self,
        pin: Vpin,
        request: &ConfigRequest,
        _downstream: &mut Downstream,
    ) -> Result<(), ConfigError> {
        let Some((module, mask)) = self.locate(pin) else {
            return Err(ConfigError::NoDevice);
        };
        match *request {
            ConfigRequest::Pullup(true) => {
                if C::HAS_DIRECTION {
                    let address = self.module_address(module);
                    let pullups = self.cache.pullups(module) | mask;
                    self.cache.set_pullups(module, pullups);
                    let _ = C::write_pullups(&mut self.bus, address, pullups);
                }
                Ok(())
            }
            // The chips cannot read a floating input reliably, so a
            // pull-up-disable request is refused.
            _ => Err(ConfigError::Unsupported),
        }
    }

    fn write(&mut self, pin: Vpin, value: u16, _downstream: &mut Downstream) {
        let Some((module, mask)) = self.locate(pin) else {
            return;
        };
        let address = self.module_address(module);
        let bits = self.cache.set_output_bit(module, mask, value != 0);
        if C::write_output(&mut self.bus, address, bits).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("{}: write failed at i2c address {:#x}", C::NAME, address);
        }
        if C::HAS_DIRECTION && self.cache.inputs(module) & mask != 0 {
            // The pin was an input; claim it as an output.
            let inputs = self.cache.inputs(module) & !mask;
            self.cache.set_inputs(module, inputs);
            let _ = C::write_inputs(&mut self.bus, address, inputs);
        }
        // The electrical state changed; drop the cached read.
        self.cache.invalidate(module);
    }

    fn read(&mut self, pin: Vpin) -> bool {
        let Some((module, mask)) = self.locate(pin) else {
            return false;
        };
        let address = self.module_address(module);
        let mut forced = false;
        if C::HAS_DIRECTION {
            if self.cache.inputs(module) & mask == 0 {
                let inputs = self.cache.inputs(module) | mask;
                self.cache.set_inputs(module, inputs);
                let _ = C::write_inputs(&mut self.bus, address, inputs);
                forced = true;
            }
            if self.cache.pullups(module) & mask == 0 {
                let pullups = self.cache.pullups(module) | mask;
                self.cache.set_pullups(module, pullups);
                let _ = C::write_pullups(&mut self.bus, address, pullups);
                forced = true;
            }
        } else if self.cache.output(module) & mask == 0 {
            // Open-drain input: drive the line high first and let the
            // attached detector pull it back down.
            let bits = self.cache.set_output_bit(module, mask, true);
            let _ = C::write_output(&mut self.bus, address, bits);
            forced = true;
        }
        if forced {
            self.cache.invalidate(module);
        }
        if forced || self.cache.is_stale(module) {
            match C::read_input(&mut self.bus, address) {
                Ok(bits) => self.cache.store_input(module, bits),
                Err(_) => self.cache.store_failed_input(module),
            }
        }
        self.cache.input(module) & mask != 0
    }

    fn tick(&mut self, now_us: u32, _downstream: &mut Downstream) {
        self.cache.tick(now_us, C::TICK_INTERVAL_US);
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            name: C::NAME,
            range: self.range,
            bus_address: Some(self.base_address),
        }
    }
}
