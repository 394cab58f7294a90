//! PCF8574 8-bit quasi-bidirectional I/O expander
//!
//! The chip has no registers at all: a plain write drives the port, a
//! plain read samples it. There is no direction control either - a pin
//! meant as an input is written high and the attached detector pulls it
//! low, which is exactly the open-drain protocol the shared driver
//! falls back to when [`ExpanderChip::HAS_DIRECTION`] is off.

use signalbox_hal::{I2cBus, I2cConfig};

use super::{Expander, ExpanderChip};

/// Chip family marker for the shared expander driver
pub struct Pcf8574;

impl Pcf8574 {
    /// Lowest selectable bus address (A2..A0 strapped low)
    pub const DEFAULT_ADDRESS: u8 = 0x20;
}

impl ExpanderChip for Pcf8574 {
    const NAME: &'static str = "PCF8574";
    const PINS_PER_MODULE: u16 = 8;
    // Only supports the slow clock.
    const BUS_CLOCK: I2cConfig = I2cConfig::STANDARD;
    const HAS_DIRECTION: bool = false;

    fn write_output<B: I2cBus>(bus: &mut B, address: u8, bits: u16) -> Result<(), B::Error> {
        bus.write(address, &[bits as u8])
    }

    fn read_input<B: I2cBus>(bus: &mut B, address: u8) -> Result<u16, B::Error> {
        let mut buf = [0u8; 1];
        bus.read(address, &mut buf)?;
        Ok(u16::from(buf[0]))
    }
}

/// PCF8574-backed expander device
pub type Pcf8574Expander<B> = Expander<Pcf8574, B>;
