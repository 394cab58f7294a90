//! PWM output devices
//!
//! The downstream half of servo animation: devices here accept raw
//! 0-4095 position values and turn them into pulse widths.

pub mod pca9685;

pub use pca9685::Pca9685;
