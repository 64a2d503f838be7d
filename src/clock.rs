//! Monotonic time source

use core::cell::Cell;

/// Monotonic time since start-up
///
/// Firmware implements this over its hardware timer; host code can use
/// [`ManualClock`].
pub trait Clock {
    /// Microseconds since start-up
    fn now_us(&self) -> u64;

    /// Milliseconds since start-up
    fn now_ms(&self) -> u64 {
        self.now_us() / 1000
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}

/// Clock that only moves when told to
///
/// # Example
/// ```
/// use buoy_fusion::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// clock.advance_us(1500);
/// assert_eq!(clock.now_us(), 1500);
/// assert_eq!(clock.now_ms(), 1);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    now_us: Cell<u64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_us(&self, us: u64) {
        self.now_us.set(us);
    }

    pub fn advance_us(&self, us: u64) {
        self.now_us.set(self.now_us.get().saturating_add(us));
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance_us(ms.saturating_mul(1000));
    }
}

impl Clock for ManualClock {
    fn now_us(&self) -> u64 {
        self.now_us.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new();
        assert_eq!(clock.now_us(), 0);
        clock.advance_ms(3);
        clock.advance_us(250);
        assert_eq!(clock.now_us(), 3250);
        assert_eq!(clock.now_ms(), 3);
        clock.set_us(10);
        assert_eq!(clock.now_us(), 10);
    }

    #[test]
    fn test_clock_through_reference() {
        fn read<C: Clock>(clock: C) -> u64 {
            clock.now_ms()
        }
        let clock = ManualClock::new();
        clock.advance_ms(42);
        assert_eq!(read(&clock), 42);
    }
}
