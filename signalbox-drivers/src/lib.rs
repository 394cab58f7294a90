//! Hardware device drivers for the Signalbox registry
//!
//! This crate provides the concrete [`signalbox_core::IoDevice`]
//! implementations that talk to real hardware through the
//! `signalbox-hal` traits:
//!
//! - I2C port expanders (PCF8574, MCP23008, MCP23017) built on one
//!   shared port-cache engine
//! - PCA9685 16-channel PWM servo controller
//! - Direct platform GPIO pins

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate alloc;
#[cfg(test)]
extern crate std;

pub mod expander;
pub mod gpio;
pub mod pwm;

pub use expander::{Expander, ExpanderChip, ExpanderConfig, Mcp23008, Mcp23017, Pcf8574};
pub use gpio::DirectPins;
pub use pwm::Pca9685;

#[cfg(test)]
pub(crate) mod testutil {
    //! Shared recording bus for driver tests

    use signalbox_hal::I2cBus;
    use std::cell::{Ref, RefCell, RefMut};
    use std::rc::Rc;
    use std::vec::Vec;

    /// Everything the mock bus has seen or will serve
    #[derive(Debug, Default)]
    pub struct BusState {
        /// (address, bytes) of every plain write, in order
        pub writes: Vec<(u8, Vec<u8>)>,
        /// (address, register bytes) of every write-then-read, in order
        pub register_reads: Vec<(u8, Vec<u8>)>,
        /// Number of raw read transactions
        pub raw_reads: usize,
        /// Input bits served to reads, little-endian byte order
        pub input_bits: u16,
        pub fail_reads: bool,
        pub fail_writes: bool,
        pub frequency: Option<u32>,
        /// Addresses that do not acknowledge a probe
        pub missing: Vec<u8>,
    }

    /// Clonable handle onto one shared bus state, so tests keep a view
    /// after moving the bus into a device
    #[derive(Clone, Default)]
    pub struct MockBus {
        state: Rc<RefCell<BusState>>,
    }

    impl MockBus {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn state(&self) -> Ref<'_, BusState> {
            self.state.borrow()
        }

        pub fn state_mut(&self) -> RefMut<'_, BusState> {
            self.state.borrow_mut()
        }

        /// Total bus read transactions attempted (raw and registered)
        pub fn read_count(&self) -> usize {
            let state = self.state();
            state.raw_reads + state.register_reads.len()
        }

        pub fn write_count(&self) -> usize {
            self.state().writes.len()
        }

        pub fn set_input_bits(&self, bits: u16) {
            self.state_mut().input_bits = bits;
        }

        pub fn set_fail_reads(&self, fail: bool) {
            self.state_mut().fail_reads = fail;
        }

        /// Forget recorded traffic, keeping the served input bits
        pub fn clear(&self) {
            let mut state = self.state_mut();
            state.writes.clear();
            state.register_reads.clear();
            state.raw_reads = 0;
        }
    }

    fn fill(buf: &mut [u8], bits: u16) {
        for (index, byte) in buf.iter_mut().enumerate() {
            *byte = (bits >> (8 * index)) as u8;
        }
    }

    impl I2cBus for MockBus {
        type Error = ();

        fn set_frequency(&mut self, hz: u32) {
            self.state_mut().frequency = Some(hz);
        }

        fn probe(&mut self, address: u8) -> bool {
            !self.state().missing.contains(&address)
        }

        fn write(&mut self, address: u8, data: &[u8]) -> Result<(), ()> {
            let mut state = self.state_mut();
            if state.fail_writes {
                return Err(());
            }
            state.writes.push((address, data.to_vec()));
            Ok(())
        }

        fn read(&mut self, _address: u8, buf: &mut [u8]) -> Result<(), ()> {
            let mut state = self.state_mut();
            state.raw_reads += 1;
            if state.fail_reads {
                return Err(());
            }
            let bits = state.input_bits;
            fill(buf, bits);
            Ok(())
        }

        fn write_read(
            &mut self,
            address: u8,
            write_data: &[u8],
            read_buf: &mut [u8],
        ) -> Result<(), ()> {
            let mut state = self.state_mut();
            state.register_reads.push((address, write_data.to_vec()));
            if state.fail_reads {
                return Err(());
            }
            let bits = state.input_bits;
            fill(read_buf, bits);
            Ok(())
        }
    }
}
