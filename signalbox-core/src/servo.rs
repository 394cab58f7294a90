//! Servo position animation
//!
//! Turns the '1'/'0' written to a turnout or signal pin into a timed
//! sweep of PWM position values on the same pin, delivered downstream
//! to whatever PWM device was installed before it. The animation only
//! maps logical state to positions; the downstream device decides what
//! a position electrically means.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::device::{ConfigError, ConfigRequest, DeviceInfo, Downstream, IoDevice};
use crate::vpin::{PinRange, Vpin};

/// PWM value meaning "drive fully off"
const PWM_OFF: u16 = 0;

/// Largest PWM position value understood downstream
const PWM_FULL: u16 = 4095;

/// Refresh periods to wait after the last commanded position, letting
/// the horn physically reach it before the drive is cut
const CATCHUP_STEPS: u8 = 5;

/// Minimum interval between position updates, in µs
///
/// The downstream PWM frame is 20 ms, so anything faster is wasted;
/// finer-grained ticks are no-ops.
const REFRESH_INTERVAL_US: u32 = 50_000;

/// Percentage curve for the Bounce profile
///
/// Symmetrical overshoot-and-settle curve simulating a semaphore arm
/// or turnout blade hitting its stop.
const BOUNCE_CURVE: [u8; 30] = [
    2, 3, 7, 13, 33, 50, 83, 100, 83, 75, 70, 65, 60, 60, 65, 74, 84, 100, 83, 75, 70, 70, 72,
    75, 80, 87, 92, 97, 100, 100,
];

/// Named motion-timing curve governing step count and interpolation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MotionProfile {
    /// Jump between positions in a single step
    Instant,
    /// Around 500 ms end-to-end
    #[default]
    Fast,
    /// 1 s end-to-end
    Medium,
    /// 2 s end-to-end
    Slow,
    /// Overshooting curve for semaphores and turnouts with a bit of play
    Bounce,
}

impl MotionProfile {
    fn step_count(self) -> u8 {
        match self {
            MotionProfile::Instant => 1,
            MotionProfile::Fast => 10,
            MotionProfile::Medium => 20,
            MotionProfile::Slow => 40,
            MotionProfile::Bounce => BOUNCE_CURVE.len() as u8,
        }
    }
}

/// Endpoint positions and motion profile for one animated output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ServoConfig {
    /// Position driven for logical '1' (0-4095)
    pub active_position: u16,
    /// Position driven for logical '0' (0-4095)
    pub inactive_position: u16,
    /// Motion profile for transitions between the endpoints
    pub profile: MotionProfile,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            active_position: PWM_FULL,
            inactive_position: PWM_OFF,
            profile: MotionProfile::Fast,
        }
    }
}

/// Animated servo output occupying a single virtual pin
///
/// Callers replacing the animation behind a pin should remove the old
/// device first; the registry's scan order would otherwise leave the
/// newer one permanently shadowing the older.
pub struct ServoAnimation {
    pin: Vpin,
    config: ServoConfig,
    /// Logical target; `None` until the first write arrives
    state: Option<bool>,
    current_position: u16,
    from_position: u16,
    to_position: u16,
    /// Current step; only ever increases within one transition
    step_number: u8,
    num_steps: u8,
    last_refresh_us: u32,
}

impl ServoAnimation {
    /// Create an animation for `pin` in the unknown state
    ///
    /// The first write jumps straight to the commanded endpoint; only
    /// later transitions animate.
    pub fn new(pin: Vpin, config: ServoConfig) -> Self {
        Self {
            pin,
            config,
            state: None,
            current_position: config.inactive_position,
            from_position: config.inactive_position,
            to_position: config.inactive_position,
            step_number: 0,
            num_steps: 0,
            last_refresh_us: 0,
        }
    }

    fn endpoint(&self, state: bool) -> u16 {
        if state {
            self.config.active_position
        } else {
            self.config.inactive_position
        }
    }

    /// Advance the animation by one step, if one is in progress
    fn update_position(&mut self, downstream: &mut Downstream) {
        if self.step_number > self.num_steps + CATCHUP_STEPS {
            return; // idle
        }
        let mut changed = false;
        match self.config.profile {
            MotionProfile::Instant
            | MotionProfile::Fast
            | MotionProfile::Medium
            | MotionProfile::Slow => {
                if self.step_number < self.num_steps {
                    self.step_number += 1;
                    self.current_position = interpolate(
                        u16::from(self.step_number),
                        u16::from(self.num_steps),
                        self.from_position,
                        self.to_position,
                    );
                    changed = true;
                }
            }
            MotionProfile::Bounce => {
                if self.step_number < self.num_steps {
                    let percent = BOUNCE_CURVE[usize::from(self.step_number)];
                    self.current_position = interpolate(
                        u16::from(percent),
                        100,
                        self.from_position,
                        self.to_position,
                    );
                    self.step_number += 1;
                    changed = true;
                }
            }
        }
        if changed {
            downstream.push(self.pin, self.current_position);
        } else if self.step_number < self.num_steps + CATCHUP_STEPS {
            // Sweep done; give the horn time to catch up.
            self.step_number += 1;
        } else {
            // Catch-up elapsed. Unless the servo rests at a PWM rail,
            // cut the drive so it doesn't sit there buzzing.
            if self.current_position != PWM_OFF && self.current_position != PWM_FULL {
                downstream.push(self.pin, PWM_OFF);
            }
            self.step_number += 1;
        }
    }
}

impl IoDevice for ServoAnimation {
    fn range(&self) -> PinRange {
        PinRange::new(self.pin, 1)
    }

    fn configure(
        &mut self,
        _pin: Vpin,
        request: &ConfigRequest,
        downstream: &mut Downstream,
    ) -> Result<(), ConfigError> {
        match *request {
            ConfigRequest::Servo {
                config,
                initial_state,
            } => {
                self.config = config;
                self.state = Some(initial_state);
                self.current_position = self.endpoint(initial_state);
                downstream.push(self.pin, self.current_position);
                // Arms the settling path so the next updates cut the drive.
                self.step_number = 0;
                self.num_steps = 0;
                Ok(())
            }
            ConfigRequest::Pullup(_) => Err(ConfigError::Unsupported),
        }
    }

    fn write(&mut self, _pin: Vpin, value: u16, downstream: &mut Downstream) {
        let value = value != 0;
        match self.state {
            None => {
                // First position command: go straight there, no sweep.
                let target = self.endpoint(value);
                self.state = Some(value);
                self.from_position = target;
                self.to_position = target;
                self.current_position = target;
                self.step_number = 0;
                self.num_steps = 0;
                downstream.push(self.pin, target);
            }
            Some(state) if state == value => {} // nothing to do
            Some(_) => {
                self.state = Some(value);
                self.num_steps = self.config.profile.step_count();
                self.step_number = 0;
                // Start from the current position, which may be in the
                // middle of an earlier sweep.
                self.from_position = self.current_position;
                self.to_position = self.endpoint(value);
                self.update_position(downstream);
            }
        }
    }

    fn tick(&mut self, now_us: u32, downstream: &mut Downstream) {
        if now_us.wrapping_sub(self.last_refresh_us) >= REFRESH_INTERVAL_US {
            self.update_position(downstream);
            self.last_refresh_us = now_us;
        }
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "servo",
            range: self.range(),
            bus_address: None,
        }
    }

    fn is_removable(&self) -> bool {
        true
    }
}

/// Proportional map of `step`/`total` onto `[from, to]`
///
/// `from` may exceed `to`; `total` is never zero when called.
fn interpolate(step: u16, total: u16, from: u16, to: u16) -> u16 {
    let from = i32::from(from);
    let to = i32::from(to);
    let position = from + (to - from) * i32::from(step) / i32::from(total);
    position as u16
}
