//! MCP23017 16-bit I/O expander
//!
//! Two 8-bit ports behind paired A/B registers. With IOCON left in
//! sequential mode the register pointer auto-increments, so each pair
//! is written in one transaction and both input ports are read together.

use signalbox_hal::{I2cBus, I2cConfig};

use super::{Expander, ExpanderChip};

/// Register addresses (IOCON.BANK = 0)
pub mod reg {
    /// Direction, port A (1 = input)
    pub const IODIRA: u8 = 0x00;
    /// Direction, port B
    pub const IODIRB: u8 = 0x01;
    /// Expander configuration
    pub const IOCON: u8 = 0x0A;
    /// Pull-up enable, port A
    pub const GPPUA: u8 = 0x0C;
    /// Pull-up enable, port B
    pub const GPPUB: u8 = 0x0D;
    /// Port data, port A
    pub const GPIOA: u8 = 0x12;
    /// Port data, port B
    pub const GPIOB: u8 = 0x13;
}

/// Chip family marker for the shared expander driver
pub struct Mcp23017;

impl Mcp23017 {
    /// Lowest selectable bus address
    pub const DEFAULT_ADDRESS: u8 = 0x20;
}

impl ExpanderChip for Mcp23017 {
    const NAME: &'static str = "MCP23017";
    const PINS_PER_MODULE: u16 = 16;
    const BUS_CLOCK: I2cConfig = I2cConfig::FAST_PLUS;
    const HAS_DIRECTION: bool = true;

    fn write_output<B: I2cBus>(bus: &mut B, address: u8, bits: u16) -> Result<(), B::Error> {
        bus.write(address, &[reg::GPIOA, bits as u8, (bits >> 8) as u8])
    }

    fn read_input<B: I2cBus>(bus: &mut B, address: u8) -> Result<u16, B::Error> {
        let mut buf = [0u8; 2];
        bus.write_read(address, &[reg::GPIOA], &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn write_inputs<B: I2cBus>(bus: &mut B, address: u8, mask: u16) -> Result<(), B::Error> {
        bus.write(address, &[reg::IODIRA, mask as u8, (mask >> 8) as u8])
    }

    fn write_pullups<B: I2cBus>(bus: &mut B, address: u8, mask: u16) -> Result<(), B::Error> {
        bus.write(address, &[reg::GPPUA, mask as u8, (mask >> 8) as u8])
    }

    fn setup<B: I2cBus>(bus: &mut B, address: u8) -> Result<(), B::Error> {
        // Sequential addressing, interrupts off.
        bus.write(address, &[reg::IOCON, 0x00])
    }
}

/// MCP23017-backed expander device
pub type Mcp23017Expander<B> = Expander<Mcp23017, B>;
