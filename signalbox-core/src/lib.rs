//! Board-agnostic core of the Signalbox hardware abstraction layer
//!
//! This crate contains everything between the turnout/accessory logic
//! above and the bus drivers below, with no dependency on specific
//! hardware:
//!
//! - Virtual pin namespace and range ownership
//! - The [`device::IoDevice`] trait every driver implements
//! - The [`registry::Registry`]: ordered device collection and
//!   dispatch engine with downstream delivery
//! - The [`servo::ServoAnimation`] position animation engine
//!
//! Devices are registry-owned boxed values; on embedded targets the
//! application supplies the global allocator.

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

pub mod device;
pub mod registry;
pub mod servo;
pub mod vpin;

pub use device::{ConfigError, ConfigRequest, DeviceInfo, Downstream, IoDevice, PinWrite};
pub use registry::{Registry, MAX_DEVICES};
pub use servo::{MotionProfile, ServoAnimation, ServoConfig};
pub use vpin::{PinRange, Vpin, VPIN_MAX, VPIN_NONE};
