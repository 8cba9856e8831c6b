//! Busy-wait timing for the shift-register protocol
//!
//! The protocol uses two fixed delays: half a clock period (6 µs) and the
//! latch pulse width (12 µs), which is also the settle time after setup.
//! Delays are injected through `embedded_hal::delay::DelayNs` so tests can
//! substitute a recording clock.

use embedded_hal::delay::DelayNs;
#[cfg(feature = "std")]
use std::time::{Duration, Instant};

/// Half of the shift-register clock period.
pub const HALF_CLOCK_US: u32 = 6;

/// Width of the latch pulse.
pub const LATCH_PULSE_US: u32 = 12;

/// Wait after configuring pin directions during setup.
pub const SETTLE_US: u32 = 12;

/// Main clock assumed by `CycleDelay::with_default_clock`.
/// Must be replaced when the MCU runs at another frequency.
pub const DEFAULT_MCU_CLOCK_HZ: u32 = 1_000_000;

/// Number of core cycles spanning `us` microseconds at `clock_hz`.
pub const fn cycles_for_us(us: u32, clock_hz: u32) -> u32 {
    cycles_for_ns(us as u64 * 1_000, clock_hz)
}

/// Number of core cycles spanning `ns` nanoseconds at `clock_hz`, rounded up
/// so a delay is never shorter than requested.
pub const fn cycles_for_ns(ns: u64, clock_hz: u32) -> u32 {
    let cycles = ns
        .saturating_mul(clock_hz as u64)
        .saturating_add(999_999_999)
        / 1_000_000_000;
    if cycles > u32::MAX as u64 {
        u32::MAX
    } else {
        cycles as u32
    }
}

/// A platform primitive that burns a given number of core cycles.
pub trait CycleSpin {
    fn spin_cycles(&mut self, cycles: u32);
}

impl<F: FnMut(u32)> CycleSpin for F {
    fn spin_cycles(&mut self, cycles: u32) {
        self(cycles)
    }
}

/// `DelayNs` on top of a cycle-counting busy wait and a clock frequency.
#[derive(Debug, Clone)]
pub struct CycleDelay<S> {
    spin: S,
    clock_hz: u32,
}

impl<S: CycleSpin> CycleDelay<S> {
    pub fn new(spin: S, clock_hz: u32) -> Self {
        CycleDelay { spin, clock_hz }
    }

    pub fn with_default_clock(spin: S) -> Self {
        Self::new(spin, DEFAULT_MCU_CLOCK_HZ)
    }

    pub fn clock_hz(&self) -> u32 {
        self.clock_hz
    }
}

impl<S: CycleSpin> DelayNs for CycleDelay<S> {
    fn delay_ns(&mut self, ns: u32) {
        let cycles = cycles_for_ns(ns as u64, self.clock_hz);
        if cycles > 0 {
            self.spin.spin_cycles(cycles);
        }
    }

    fn delay_us(&mut self, us: u32) {
        let cycles = cycles_for_us(us, self.clock_hz);
        if cycles > 0 {
            self.spin.spin_cycles(cycles);
        }
    }
}

/// Busy wait on the host's monotonic clock. Never yields the thread.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SpinDelay;

#[cfg(feature = "std")]
impl SpinDelay {
    pub fn new() -> Self {
        SpinDelay
    }

    fn spin_for(duration: Duration) {
        let start = Instant::now();
        while start.elapsed() < duration {
            std::hint::spin_loop();
        }
    }
}

#[cfg(feature = "std")]
impl DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        Self::spin_for(Duration::from_nanos(ns as u64));
    }

    fn delay_us(&mut self, us: u32) {
        Self::spin_for(Duration::from_micros(us as u64));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycles_at_default_clock() {
        assert_eq!(cycles_for_us(HALF_CLOCK_US, DEFAULT_MCU_CLOCK_HZ), 6);
        assert_eq!(cycles_for_us(LATCH_PULSE_US, DEFAULT_MCU_CLOCK_HZ), 12);
    }

    #[test]
    fn test_cycles_scale_with_clock() {
        assert_eq!(cycles_for_us(HALF_CLOCK_US, 16_000_000), 96);
        assert_eq!(cycles_for_us(LATCH_PULSE_US, 8_000_000), 96);
    }

    #[test]
    fn test_partial_cycles_round_up() {
        // 500 ns at 1 MHz is half a cycle
        assert_eq!(cycles_for_ns(500, DEFAULT_MCU_CLOCK_HZ), 1);
        assert_eq!(cycles_for_ns(0, DEFAULT_MCU_CLOCK_HZ), 0);
    }

    #[test]
    fn test_cycle_delay_spins() {
        let mut spun = Vec::new();
        {
            let mut delay = CycleDelay::new(|cycles: u32| spun.push(cycles), 16_000_000);
            delay.delay_us(HALF_CLOCK_US);
            delay.delay_us(LATCH_PULSE_US);
            delay.delay_ns(0);
        }
        assert_eq!(spun, vec![96, 192]);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_spin_delay_waits_at_least_requested() {
        let start = Instant::now();
        SpinDelay::new().delay_us(LATCH_PULSE_US);
        assert!(start.elapsed() >= Duration::from_micros(LATCH_PULSE_US as u64));
    }
}
