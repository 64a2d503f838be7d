//! Butterworth low-pass filter for the motion channel
//!
//! Orders 1 to 4 are built from at most two cascaded sections: one
//! first-order section and/or second-order biquads, each evaluated in
//! transposed direct form II with `f64` state.

#[allow(unused_imports)]
use nalgebra::ComplexField;

use crate::types::FilterOrder;

/// Largest usable `cutoff * sample_time` ratio, just below Nyquist
const MAX_NORMALIZED_CUTOFF: f64 = 0.49;

/// Quality factors of the biquad sections for each order
const Q_ORDER_2: [f64; 1] = [core::f64::consts::FRAC_1_SQRT_2];
const Q_ORDER_3: [f64; 1] = [1.0];
const Q_ORDER_4: [f64; 2] = [0.541_196_1, 1.306_563];

/// One cascaded filter section
///
/// A first-order section is a biquad with `b2 = a2 = 0`.
#[derive(Debug, Clone, Copy, Default)]
struct Section {
    b: [f64; 3],
    a: [f64; 2],
    state: [f64; 2],
}

impl Section {
    fn first_order(k: f64) -> Self {
        let norm = 1.0 / (1.0 + k);
        Self {
            b: [k * norm, k * norm, 0.0],
            a: [(k - 1.0) * norm, 0.0],
            state: [0.0; 2],
        }
    }

    fn biquad(k: f64, q: f64) -> Self {
        let k2 = k * k;
        let norm = 1.0 / (1.0 + k / q + k2);
        let b0 = k2 * norm;
        Self {
            b: [b0, 2.0 * b0, b0],
            a: [2.0 * (k2 - 1.0) * norm, (1.0 - k / q + k2) * norm],
            state: [0.0; 2],
        }
    }

    /// Set the state as if `x0` had been applied forever
    fn prime(&mut self, x0: f64) {
        self.state[0] = x0 * (1.0 - self.b[0]);
        self.state[1] = x0 * (self.b[2] - self.a[1]);
    }

    fn step(&mut self, x: f64) -> f64 {
        let y = self.b[0] * x + self.state[0];
        self.state[0] = self.b[1] * x - self.a[0] * y + self.state[1];
        self.state[1] = self.b[2] * x - self.a[1] * y;
        y
    }
}

/// Cascaded Butterworth low-pass filter
///
/// # Example
/// ```
/// use buoy_fusion::{FilterOrder, LowPassFilter};
///
/// let mut filter = LowPassFilter::new(FilterOrder::Second, 0.4, 0.01);
/// filter.prime(100.0);
/// assert!((filter.step(100.0) - 100.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct LowPassFilter {
    order: FilterOrder,
    cutoff_frequency: f32,
    sections: heapless::Vec<Section, 2>,
}

impl LowPassFilter {
    /// Design a filter for the given cutoff in Hz and sampling period in seconds
    pub fn new(order: FilterOrder, cutoff_frequency: f32, sample_time: f32) -> Self {
        let mut filter = Self {
            order,
            cutoff_frequency,
            sections: heapless::Vec::new(),
        };
        filter.design(sample_time);
        filter
    }

    pub fn order(&self) -> FilterOrder {
        self.order
    }

    pub fn cutoff_frequency(&self) -> f32 {
        self.cutoff_frequency
    }

    /// Recompute coefficients for a new sampling period and clear the state
    ///
    /// Non-positive or non-finite periods leave the current design untouched.
    pub fn design(&mut self, sample_time: f32) {
        if !(sample_time > 0.0 && sample_time.is_finite()) {
            return;
        }

        let ratio = (self.cutoff_frequency as f64 * sample_time as f64)
            .clamp(f64::EPSILON, MAX_NORMALIZED_CUTOFF);
        let k = (core::f64::consts::PI * ratio).tan();

        self.sections.clear();
        let mut push = |section: Section| {
            // Capacity is two and no order needs more
            let _ = self.sections.push(section);
        };
        match self.order {
            FilterOrder::First => push(Section::first_order(k)),
            FilterOrder::Second => Q_ORDER_2.iter().for_each(|&q| push(Section::biquad(k, q))),
            FilterOrder::Third => {
                push(Section::first_order(k));
                Q_ORDER_3.iter().for_each(|&q| push(Section::biquad(k, q)));
            }
            FilterOrder::Fourth => Q_ORDER_4.iter().for_each(|&q| push(Section::biquad(k, q))),
        }
    }

    /// Start every section in steady state at `x0`
    pub fn prime(&mut self, x0: f64) {
        for section in self.sections.iter_mut() {
            section.prime(x0);
        }
    }

    /// Clear all section state
    pub fn reset(&mut self) {
        for section in self.sections.iter_mut() {
            section.state = [0.0; 2];
        }
    }

    /// Filter one sample
    pub fn step(&mut self, x: f64) -> f64 {
        self.sections.iter_mut().fold(x, |value, section| section.step(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDERS: [FilterOrder; 4] = [
        FilterOrder::First,
        FilterOrder::Second,
        FilterOrder::Third,
        FilterOrder::Fourth,
    ];

    #[test]
    fn test_unity_dc_gain() {
        for order in ORDERS {
            let filter = LowPassFilter::new(order, 0.4, 0.01);
            for section in filter.sections.iter() {
                let gain = (section.b[0] + section.b[1] + section.b[2])
                    / (1.0 + section.a[0] + section.a[1]);
                assert!((gain - 1.0).abs() < 1e-9, "order {:?}", order);
            }
        }
    }

    #[test]
    fn test_section_count() {
        assert_eq!(LowPassFilter::new(FilterOrder::First, 1.0, 0.01).sections.len(), 1);
        assert_eq!(LowPassFilter::new(FilterOrder::Second, 1.0, 0.01).sections.len(), 1);
        assert_eq!(LowPassFilter::new(FilterOrder::Third, 1.0, 0.01).sections.len(), 2);
        assert_eq!(LowPassFilter::new(FilterOrder::Fourth, 1.0, 0.01).sections.len(), 2);
    }

    #[test]
    fn test_primed_constant_stays_constant() {
        for order in ORDERS {
            let mut filter = LowPassFilter::new(order, 0.4, 0.01);
            filter.prime(-731.0);
            for _ in 0..500 {
                let y = filter.step(-731.0);
                assert!((y + 731.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_step_response_settles() {
        let mut filter = LowPassFilter::new(FilterOrder::Third, 1.0, 0.01);
        let mut y = 0.0;
        for _ in 0..1000 {
            y = filter.step(1.0);
        }
        assert!((y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_attenuates_high_frequency() {
        let mut filter = LowPassFilter::new(FilterOrder::Fourth, 0.4, 0.01);
        let mut peak: f64 = 0.0;
        // 10 Hz tone, far above the 0.4 Hz cutoff
        for i in 0..2000 {
            let x = (2.0 * core::f64::consts::PI * 10.0 * i as f64 * 0.01).sin();
            let y = filter.step(x);
            if i > 1000 {
                peak = peak.max(y.abs());
            }
        }
        assert!(peak < 0.01);
    }

    #[test]
    fn test_invalid_period_keeps_design() {
        let mut filter = LowPassFilter::new(FilterOrder::Second, 0.4, 0.01);
        let before = filter.sections[0].b;
        filter.design(0.0);
        filter.design(f32::NAN);
        assert_eq!(filter.sections[0].b, before);
    }
}
