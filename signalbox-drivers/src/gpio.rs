//! Direct platform GPIO pins as a registry device
//!
//! Thin adapter putting a block of the microcontroller's own pins into
//! the virtual pin space. No caching, no shadow state: the platform
//! registers are the truth.

use signalbox_core::device::{DeviceInfo, Downstream, IoDevice};
use signalbox_core::vpin::{PinRange, Vpin};
use signalbox_hal::{PinBank, PinMode};

/// Registry device over a bank of platform pins
///
/// Virtual pin `first_pin + n` maps to bank pin `n`.
pub struct DirectPins<P: PinBank> {
    range: PinRange,
    bank: P,
}

impl<P: PinBank> DirectPins<P> {
    /// Claim `pin_count` virtual pins backed by `bank`
    pub fn new(first_pin: Vpin, pin_count: u16, bank: P) -> Self {
        Self {
            range: PinRange::new(first_pin, pin_count),
            bank,
        }
    }
}

impl<P: PinBank> IoDevice for DirectPins<P> {
    fn range(&self) -> PinRange {
        self.range
    }

    fn write(&mut self, pin: Vpin, value: u16, _downstream: &mut Downstream) {
        let Some(offset) = self.range.offset(pin) else {
            return;
        };
        let bank_pin = offset as u8;
        // Level before mode, so a pin claimed from input doesn't glitch
        // through the wrong state.
        self.bank.write(bank_pin, value != 0);
        self.bank.set_mode(bank_pin, PinMode::Output);
    }

    fn read(&mut self, pin: Vpin) -> bool {
        let Some(offset) = self.range.offset(pin) else {
            return false;
        };
        let bank_pin = offset as u8;
        self.bank.set_mode(bank_pin, PinMode::InputPullup);
        self.bank.read(bank_pin)
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "pins",
            range: self.range,
            bus_address: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    #[derive(Default)]
    struct RecordingBank {
        ops: Vec<(u8, &'static str)>,
        level: bool,
    }

    impl PinBank for RecordingBank {
        fn set_mode(&mut self, pin: u8, mode: PinMode) {
            let name = match mode {
                PinMode::Output => "output",
                PinMode::Input => "input",
                PinMode::InputPullup => "input-pullup",
            };
            self.ops.push((pin, name));
        }

        fn write(&mut self, pin: u8, high: bool) {
            self.level = high;
            self.ops.push((pin, if high { "high" } else { "low" }));
        }

        fn read(&mut self, pin: u8) -> bool {
            self.ops.push((pin, "read"));
            self.level
        }
    }

    #[test]
    fn write_drives_the_level_before_claiming_the_pin() {
        let mut pins = DirectPins::new(2, 4, RecordingBank::default());
        let mut queue = Downstream::new();
        pins.write(3, 1, &mut queue);
        assert_eq!(pins.bank.ops, &[(1, "high"), (1, "output")]);
    }

    #[test]
    fn read_enables_the_pullup_first() {
        let mut pins = DirectPins::new(2, 4, RecordingBank::default());
        pins.bank.level = true;
        assert!(pins.read(2));
        assert_eq!(pins.bank.ops, &[(0, "input-pullup"), (0, "read")]);
    }
}
