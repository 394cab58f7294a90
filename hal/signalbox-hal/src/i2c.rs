//! I2C bus abstractions
//!
//! Provides the bus-transport trait consumed by the expander and PWM
//! drivers. Transactions are synchronous and may block for their full
//! duration; the drivers above keep traffic down by caching, not by
//! going asynchronous.

/// Blocking I2C bus master
///
/// Implementations wrap a platform I2C peripheral. Error recovery
/// (retry, bus reset) is the implementation's business; callers treat
/// a failed transaction as final.
pub trait I2cBus {
    /// Error type for I2C operations
    type Error;

    /// Request a bus clock frequency in Hz
    ///
    /// Implementations whose clock is fixed at peripheral construction
    /// may ignore this.
    fn set_frequency(&mut self, hz: u32);

    /// Check whether a device acknowledges the given 7-bit address
    fn probe(&mut self, address: u8) -> bool;

    /// Write data to a device at the given address
    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error>;

    /// Read data from a device at the given address
    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Write then read in a single transaction (repeated start)
    ///
    /// This is commonly used to write a register address then read data.
    fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), Self::Error>;
}

/// I2C configuration
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self {
            frequency: 100_000, // 100kHz standard mode
        }
    }
}

impl I2cConfig {
    /// Standard mode (100 kHz)
    pub const STANDARD: Self = Self { frequency: 100_000 };

    /// Fast mode (400 kHz)
    pub const FAST: Self = Self { frequency: 400_000 };

    /// Fast mode plus (1 MHz)
    pub const FAST_PLUS: Self = Self {
        frequency: 1_000_000,
    };
}

/// Adapter implementing [`I2cBus`] over any `embedded-hal` 1.0 I2C master
///
/// Lets a chip HAL's I2C peripheral serve directly as the command
/// station's bus transport. Presence probing is a zero-length write;
/// the clock frequency is whatever the peripheral was built with.
pub struct BlockingI2c<T> {
    inner: T,
}

impl<T: embedded_hal::i2c::I2c> BlockingI2c<T> {
    /// Wrap an `embedded-hal` I2C peripheral
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Recover the wrapped peripheral
    pub fn release(self) -> T {
        self.inner
    }
}

impl<T: embedded_hal::i2c::I2c> I2cBus for BlockingI2c<T> {
    type Error = T::Error;

    fn set_frequency(&mut self, _hz: u32) {
        // Fixed at peripheral construction on embedded-hal implementations.
    }

    fn probe(&mut self, address: u8) -> bool {
        self.inner.write(address, &[]).is_ok()
    }

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error> {
        self.inner.write(address, data)
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.inner.read(address, buf)
    }

    fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.inner.write_read(address, write_data, read_buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

    struct FakeI2c {
        present: bool,
        writes: usize,
    }

    impl ErrorType for FakeI2c {
        type Error = ErrorKind;
    }

    impl I2c for FakeI2c {
        fn transaction(
            &mut self,
            _address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), ErrorKind> {
            if !self.present {
                return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
            }
            for operation in operations {
                match operation {
                    Operation::Write(_) => self.writes += 1,
                    Operation::Read(buf) => buf.fill(0xAA),
                }
            }
            Ok(())
        }
    }

    #[test]
    fn probe_reports_the_acknowledge() {
        let mut bus = BlockingI2c::new(FakeI2c {
            present: true,
            writes: 0,
        });
        assert!(bus.probe(0x20));
        assert!(bus.write(0x20, &[1, 2]).is_ok());
        assert_eq!(bus.release().writes, 2); // probe counts as a write too

        let mut bus = BlockingI2c::new(FakeI2c {
            present: false,
            writes: 0,
        });
        assert!(!bus.probe(0x20));
    }

    #[test]
    fn reads_pass_through() {
        let mut bus = BlockingI2c::new(FakeI2c {
            present: true,
            writes: 0,
        });
        let mut buf = [0u8; 2];
        bus.read(0x20, &mut buf).unwrap();
        assert_eq!(buf, [0xAA, 0xAA]);
    }
}
