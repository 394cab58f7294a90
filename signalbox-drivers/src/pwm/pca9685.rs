//! PCA9685 16-channel PWM servo controller
//!
//! Accepts position writes in the 0-4095 range and converts them to a
//! mark within the 20 ms servo frame. One device instance manages up
//! to 8 chips on consecutive bus addresses, 16 channels each, with the
//! usual contiguous virtual pin assignment.

use signalbox_core::device::{DeviceInfo, Downstream, IoDevice};
use signalbox_core::vpin::{PinRange, Vpin};
use signalbox_hal::{I2cBus, I2cConfig};

/// Register addresses
pub mod reg {
    /// Mode register 1
    pub const MODE1: u8 = 0x00;
    /// Low byte of the first channel's ON register; channels follow in
    /// blocks of four
    pub const LED0_ON_L: u8 = 0x06;
    /// PWM output frequency prescaler
    pub const PRESCALE: u8 = 0xFE;
}

/// MODE1 bits
mod mode1 {
    /// Low power mode, oscillator off
    pub const SLEEP: u8 = 0x10;
    /// Register auto-increment enabled
    pub const AI: u8 = 0x20;
    /// Restart enabled
    pub const RESTART: u8 = 0x80;
}

/// Internal oscillator, accurate enough for servo frames
const OSCILLATOR_HZ: u32 = 25_000_000;

/// Prescale value for a 50 Hz (20 ms) frame
const PRESCALE_50HZ: u8 = (OSCILLATOR_HZ / (50 * 4096) - 1) as u8;

/// Channels exposed by one chip
const CHANNELS_PER_MODULE: u16 = 16;

/// Most chips one device instance will manage
const MAX_MODULES: u16 = 8;

/// Position value meaning "fully on"
const FULL_ON: u16 = 4095;

/// PCA9685 device generic over the bus transport
pub struct Pca9685<B: I2cBus> {
    range: PinRange,
    base_address: u8,
    bus: B,
}

impl<B: I2cBus> Pca9685<B> {
    /// Factory-default bus address
    pub const DEFAULT_ADDRESS: u8 = 0x40;

    /// Create a controller claiming `pin_count` pins, 16 per chip on
    /// consecutive addresses from `base_address`
    ///
    /// Requests beyond 8 chips' worth of channels are silently clamped.
    pub fn new(first_pin: Vpin, pin_count: u16, base_address: u8, bus: B) -> Self {
        let pins = pin_count.min(MAX_MODULES * CHANNELS_PER_MODULE);
        Self {
            range: PinRange::new(first_pin, pins),
            base_address,
            bus,
        }
    }

    /// Access the underlying bus transport
    pub fn bus(&self) -> &B {
        &self.bus
    }

    fn module_count(&self) -> u16 {
        self.range.count.div_ceil(CHANNELS_PER_MODULE)
    }

    fn write_register(&mut self, address: u8, register: u8, value: u8) {
        let _ = self.bus.write(address, &[register, value]);
    }
}

impl<B: I2cBus> IoDevice for Pca9685<B> {
    fn range(&self) -> PinRange {
        self.range
    }

    fn init(&mut self, _downstream: &mut Downstream) {
        self.bus.set_frequency(I2cConfig::FAST_PLUS.frequency); // rated up to 1 MHz
        for module in 0..self.module_count() {
            let address = self.base_address + module as u8;
            // Prescale is only writable while the oscillator sleeps.
            self.write_register(address, reg::MODE1, mode1::SLEEP | mode1::AI);
            self.write_register(address, reg::PRESCALE, PRESCALE_50HZ);
            self.write_register(address, reg::MODE1, mode1::AI);
            self.write_register(address, reg::MODE1, mode1::RESTART | mode1::AI);
        }
    }

    fn write(&mut self, pin: Vpin, value: u16, _downstream: &mut Downstream) {
        let Some(offset) = self.range.offset(pin) else {
            return;
        };
        let address = self.base_address + (offset / CHANNELS_PER_MODULE) as u8;
        let channel = offset % CHANNELS_PER_MODULE;
        let value = value.min(FULL_ON);
        let mut buffer = [
            reg::LED0_ON_L + 4 * channel as u8,
            0,
            0,
            value as u8,
            (value >> 8) as u8,
        ];
        if value == FULL_ON {
            buffer[2] = 0x10; // full-on bit, no off time
        }
        if self.bus.write(address, &buffer).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("PCA9685: write failed at i2c address {:#x}", address);
        }
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "PCA9685",
            range: self.range,
            bus_address: Some(self.base_address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockBus;
    use alloc::boxed::Box;
    use signalbox_core::{MotionProfile, Registry, ServoAnimation, ServoConfig};
    use std::vec::Vec;

    fn controller(bus: &MockBus) -> Pca9685<MockBus> {
        Pca9685::new(100, 16, Pca9685::<MockBus>::DEFAULT_ADDRESS, bus.clone())
    }

    #[test]
    fn init_programs_a_50hz_frame() {
        let bus = MockBus::new();
        let mut device = controller(&bus);
        device.init(&mut Downstream::new());

        let writes = bus.state().writes.clone();
        assert_eq!(
            writes,
            &[
                (0x40, [0x00, 0x30].to_vec()), // MODE1: SLEEP | AI
                (0x40, [0xFE, 121].to_vec()),  // prescale for 50 Hz
                (0x40, [0x00, 0x20].to_vec()), // MODE1: AI
                (0x40, [0x00, 0xA0].to_vec()), // MODE1: RESTART | AI
            ]
        );
    }

    #[test]
    fn position_writes_address_the_channel_block() {
        let bus = MockBus::new();
        let mut device = controller(&bus);
        let mut queue = Downstream::new();

        device.write(103, 1000, &mut queue);
        let writes = bus.state().writes.clone();
        // Channel 3: register 0x06 + 4*3, on time 0, off time 1000.
        assert_eq!(writes, &[(0x40, [0x12, 0, 0, 0xE8, 0x03].to_vec())]);
    }

    #[test]
    fn full_scale_sets_the_full_on_bit() {
        let bus = MockBus::new();
        let mut device = controller(&bus);
        let mut queue = Downstream::new();

        device.write(100, 4095, &mut queue);
        let writes = bus.state().writes.clone();
        assert_eq!(writes, &[(0x40, [0x06, 0, 0x10, 0xFF, 0x0F].to_vec())]);
    }

    #[test]
    fn oversized_values_clamp_to_full_scale() {
        let bus = MockBus::new();
        let mut device = controller(&bus);
        let mut queue = Downstream::new();

        device.write(100, 9999, &mut queue);
        let writes = bus.state().writes.clone();
        assert_eq!(writes[0].1[2], 0x10);
    }

    /// End-to-end: a servo animation drives a PCA9685 channel through
    /// the registry's downstream dispatch.
    #[test]
    fn animated_turnout_reaches_the_pwm_chip() {
        let bus = MockBus::new();
        let mut registry = Registry::new();
        registry.add(Box::new(controller(&bus))).ok().unwrap();
        bus.clear(); // drop the init traffic
        registry
            .add(Box::new(ServoAnimation::new(
                100,
                ServoConfig {
                    active_position: 400,
                    inactive_position: 200,
                    profile: MotionProfile::Fast,
                },
            )))
            .ok()
            .unwrap();

        // First write jumps straight to the endpoint.
        registry.write(100, 0);
        // Then a full sweep to the other endpoint.
        registry.write(100, 1);
        let mut now = 0u32;
        for _ in 0..20 {
            now = now.wrapping_add(50_000);
            registry.tick(now);
        }

        let frames: Vec<u16> = bus
            .state()
            .writes
            .iter()
            .map(|(_, bytes)| u16::from(bytes[3]) | (u16::from(bytes[4]) << 8))
            .collect();

        // Jump to 200, ten monotonic steps to 400, then drive off.
        assert_eq!(frames[0], 200);
        assert_eq!(frames.len(), 12);
        assert!(frames[1..11].windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(frames[10], 400);
        assert_eq!(frames[11], 0);
    }
}
