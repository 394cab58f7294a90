//! MCP23008 8-bit I/O expander
//!
//! The 8-bit member of the register family: direction, pull-up and
//! data live in addressable registers, so the shared driver maintains
//! them explicitly instead of using the open-drain protocol.

use signalbox_hal::{I2cBus, I2cConfig};

use super::{Expander, ExpanderChip};

/// Register addresses
pub mod reg {
    /// Direction (1 = input)
    pub const IODIR: u8 = 0x00;
    /// Interrupt-on-change enable
    pub const GPINTEN: u8 = 0x02;
    /// Interrupt compare mode
    pub const INTCON: u8 = 0x04;
    /// Expander configuration
    pub const IOCON: u8 = 0x05;
    /// Pull-up enable
    pub const GPPU: u8 = 0x06;
    /// Port data
    pub const GPIO: u8 = 0x09;
}

/// Chip family marker for the shared expander driver
pub struct Mcp23008;

impl Mcp23008 {
    /// Lowest selectable bus address
    pub const DEFAULT_ADDRESS: u8 = 0x20;
}

impl ExpanderChip for Mcp23008 {
    const NAME: &'static str = "MCP23008";
    const PINS_PER_MODULE: u16 = 8;
    const BUS_CLOCK: I2cConfig = I2cConfig::FAST_PLUS;
    const HAS_DIRECTION: bool = true;

    fn write_output<B: I2cBus>(bus: &mut B, address: u8, bits: u16) -> Result<(), B::Error> {
        bus.write(address, &[reg::GPIO, bits as u8])
    }

    fn read_input<B: I2cBus>(bus: &mut B, address: u8) -> Result<u16, B::Error> {
        let mut buf = [0u8; 1];
        bus.write_read(address, &[reg::GPIO], &mut buf)?;
        Ok(u16::from(buf[0]))
    }

    fn write_inputs<B: I2cBus>(bus: &mut B, address: u8, mask: u16) -> Result<(), B::Error> {
        bus.write(address, &[reg::IODIR, mask as u8])
    }

    fn write_pullups<B: I2cBus>(bus: &mut B, address: u8, mask: u16) -> Result<(), B::Error> {
        bus.write(address, &[reg::GPPU, mask as u8])
    }

    fn setup<B: I2cBus>(bus: &mut B, address: u8) -> Result<(), B::Error> {
        // ODR=1: open-drain interrupt line, shareable across modules.
        bus.write(address, &[reg::IOCON, 0x04])
    }
}

/// MCP23008-backed expander device
pub type Mcp23008Expander<B> = Expander<Mcp23008, B>;
