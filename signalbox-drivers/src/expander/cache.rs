//! Port shadow cache with freshness accounting
//!
//! The I2C bus is shared and slow relative to the control loop, so
//! input reads are cached per chip module behind a decaying freshness
//! counter. A write to a module changes its electrical state and must
//! invalidate the cached read; a failed read must not leave stale data
//! behind.

use heapless::Vec;

/// Most chip modules one expander device will manage
pub const MAX_MODULES: usize = 8;

/// Freshness window, in decay ticks, granted by a successful read
pub const MIN_TICKS_BETWEEN_READS: u8 = 2;

/// Shadow state of one chip module
#[derive(Debug, Clone, Copy)]
struct ModuleShadow {
    /// Last driven output bits
    output: u16,
    /// Last read input bits
    input: u16,
    /// Register-family direction mask, bit set = pin is an input
    inputs: u16,
    /// Register-family pull-up mask
    pullups: u16,
    /// Ticks before `input` goes stale; 0 forces a bus read
    freshness: u8,
}

impl Default for ModuleShadow {
    fn default() -> Self {
        Self {
            output: 0,
            input: 0,
            inputs: 0xFFFF, // chips power up with every pin an input
            pullups: 0,
            freshness: 0,
        }
    }
}

/// Per-module shadows plus the freshness decay machinery
#[derive(Debug)]
pub struct PortCache {
    modules: Vec<ModuleShadow, MAX_MODULES>,
    /// Set while any counter is live, letting `tick` skip the decay
    /// loop entirely when idle
    any_fresh: bool,
    last_tick_us: u32,
}

impl PortCache {
    /// Create shadows for `module_count` modules
    ///
    /// Counts beyond [`MAX_MODULES`] are silently clamped.
    pub fn new(module_count: usize) -> Self {
        let mut modules = Vec::new();
        for _ in 0..module_count.min(MAX_MODULES) {
            // Capacity checked by the clamp above.
            let _ = modules.push(ModuleShadow::default());
        }
        Self {
            modules,
            any_fresh: false,
            last_tick_us: 0,
        }
    }

    /// Number of managed modules
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Last driven output bits of a module
    pub fn output(&self, module: usize) -> u16 {
        self.modules[module].output
    }

    /// Set or clear one output bit; returns the module's new output bits
    pub fn set_output_bit(&mut self, module: usize, mask: u16, high: bool) -> u16 {
        let shadow = &mut self.modules[module];
        if high {
            shadow.output |= mask;
        } else {
            shadow.output &= !mask;
        }
        shadow.output
    }

    /// Cached input bits of a module
    pub fn input(&self, module: usize) -> u16 {
        self.modules[module].input
    }

    /// Direction mask of a module (bit set = input)
    pub fn inputs(&self, module: usize) -> u16 {
        self.modules[module].inputs
    }

    pub fn set_inputs(&mut self, module: usize, mask: u16) {
        self.modules[module].inputs = mask;
    }

    /// Pull-up mask of a module
    pub fn pullups(&self, module: usize) -> u16 {
        self.modules[module].pullups
    }

    pub fn set_pullups(&mut self, module: usize, mask: u16) {
        self.modules[module].pullups = mask;
    }

    /// Mark a module's cached input stale
    ///
    /// Called after any write to the module: the electrical state has
    /// changed, so the cached read is meaningless.
    pub fn invalidate(&mut self, module: usize) {
        self.modules[module].freshness = 0;
    }

    /// Whether a module's next input access must hit the bus
    pub fn is_stale(&self, module: usize) -> bool {
        self.modules[module].freshness == 0
    }

    /// Store a successful bus read and open its freshness window
    pub fn store_input(&mut self, module: usize, bits: u16) {
        let shadow = &mut self.modules[module];
        shadow.input = bits;
        shadow.freshness = MIN_TICKS_BETWEEN_READS;
        self.any_fresh = true;
    }

    /// Record a failed bus read
    ///
    /// Zero beats stale, and the counter stays at 0 so the next access
    /// retries the bus.
    pub fn store_failed_input(&mut self, module: usize) {
        let shadow = &mut self.modules[module];
        shadow.input = 0;
        shadow.freshness = 0;
    }

    /// Decay every live counter by the number of whole `interval_us`
    /// periods elapsed since the previous decay, clamped at zero
    ///
    /// `now_us` wraps; elapsed time is unsigned subtraction.
    pub fn tick(&mut self, now_us: u32, interval_us: u32) {
        let elapsed = now_us.wrapping_sub(self.last_tick_us);
        if elapsed < interval_us {
            return;
        }
        if self.any_fresh {
            let ticks = (elapsed / interval_us).min(u32::from(u8::MAX)) as u8;
            let mut any = false;
            for shadow in &mut self.modules {
                shadow.freshness = shadow.freshness.saturating_sub(ticks);
                any |= shadow.freshness > 0;
            }
            self.any_fresh = any;
        }
        self.last_tick_us = now_us;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: u32 = 500;

    #[test]
    fn module_count_is_clamped() {
        assert_eq!(PortCache::new(3).module_count(), 3);
        assert_eq!(PortCache::new(20).module_count(), MAX_MODULES);
    }

    #[test]
    fn output_bits_accumulate() {
        let mut cache = PortCache::new(1);
        assert_eq!(cache.set_output_bit(0, 0x01, true), 0x01);
        assert_eq!(cache.set_output_bit(0, 0x80, true), 0x81);
        assert_eq!(cache.set_output_bit(0, 0x01, false), 0x80);
    }

    #[test]
    fn stored_input_opens_a_freshness_window() {
        let mut cache = PortCache::new(2);
        assert!(cache.is_stale(0));
        cache.store_input(0, 0xAB);
        assert!(!cache.is_stale(0));
        assert_eq!(cache.input(0), 0xAB);
        // The other module is untouched.
        assert!(cache.is_stale(1));
    }

    #[test]
    fn invalidate_forces_the_next_read() {
        let mut cache = PortCache::new(1);
        cache.store_input(0, 0xFF);
        cache.invalidate(0);
        assert!(cache.is_stale(0));
    }

    #[test]
    fn failed_read_zeroes_and_stays_stale() {
        let mut cache = PortCache::new(1);
        cache.store_input(0, 0xFF);
        cache.store_failed_input(0);
        assert_eq!(cache.input(0), 0);
        assert!(cache.is_stale(0));
    }

    #[test]
    fn counters_decay_by_whole_intervals() {
        let mut cache = PortCache::new(1);
        cache.store_input(0, 1); // counter = 2

        // Less than one interval: no decrement.
        cache.tick(INTERVAL - 1, INTERVAL);
        assert!(!cache.is_stale(0));

        // One full interval: 2 -> 1.
        cache.tick(INTERVAL, INTERVAL);
        assert!(!cache.is_stale(0));

        // Another: 1 -> 0.
        cache.tick(2 * INTERVAL, INTERVAL);
        assert!(cache.is_stale(0));

        // Never goes negative.
        cache.tick(4 * INTERVAL, INTERVAL);
        assert!(cache.is_stale(0));
    }

    #[test]
    fn a_long_gap_decays_multiple_ticks_at_once() {
        let mut cache = PortCache::new(1);
        cache.store_input(0, 1); // counter = 2
        cache.tick(10 * INTERVAL, INTERVAL);
        assert!(cache.is_stale(0));
    }

    #[test]
    fn decay_survives_clock_wraparound() {
        let mut cache = PortCache::new(1);
        cache.tick(u32::MAX - INTERVAL, INTERVAL);
        cache.store_input(0, 1);
        // Wraps past zero: still sees one whole interval, 2 -> 1.
        cache.tick(INTERVAL / 2, INTERVAL);
        assert!(!cache.is_stale(0));
    }
}
