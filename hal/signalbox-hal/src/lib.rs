//! Signalbox Hardware Abstraction Layer
//!
//! This crate defines the hardware trait boundary between the command
//! station's I/O registry and the platform it runs on. Chip-specific
//! HALs implement these traits; everything above them is board-agnostic.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Turnout / accessory / sensor logic     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  signalbox-core (registry, dispatch)    │
//! │  signalbox-drivers (expanders, PWM)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  signalbox-hal (this crate - traits)    │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ platform I2C  │       │ platform GPIO │
//! │  peripheral   │       │   pin bank    │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`i2c::I2cBus`] - blocking I2C master operations
//! - [`gpio::PinBank`] - numbered digital pins with mode control

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod i2c;

// Re-export key traits at crate root for convenience
pub use gpio::{PinBank, PinMode};
pub use i2c::{BlockingI2c, I2cBus, I2cConfig};
