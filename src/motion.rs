//! Fixed-capacity store of vertical acceleration samples
//!
//! [`MotionBuffer`] collects one full window of samples in milli-g ticks,
//! low-pass filters them in place once the window is complete, and then
//! answers the gradient and displacement queries used by the wave analysis.

use log::debug;

use crate::lowpass::LowPassFilter;
use crate::math::GRAVITY;
use crate::types::WaveSettings;

/// Ring buffer of `N` signed 16-bit samples with an embedded low-pass filter
///
/// # Example
/// ```
/// use buoy_fusion::{MotionBuffer, WaveSettings};
///
/// let mut buffer: MotionBuffer<4> = MotionBuffer::new(&WaveSettings::default());
/// assert!(!buffer.add(10, 0.01));
/// assert!(!buffer.add(20, 0.01));
/// assert!(!buffer.add(30, 0.01));
/// assert!(buffer.add(40, 0.01));
/// ```
#[derive(Debug, Clone)]
pub struct MotionBuffer<const N: usize> {
    samples: [i16; N],
    cursor: usize,
    len: usize,
    total_dt: f32,
    nominal_sample_time: f32,
    sample_time: f32,
    gradient_window: usize,
    half_period: f32,
    filter: LowPassFilter,
}

impl<const N: usize> MotionBuffer<N> {
    /// Create an empty buffer configured from the wave settings
    pub fn new(settings: &WaveSettings) -> Self {
        Self {
            samples: [0; N],
            cursor: 0,
            len: 0,
            total_dt: 0.0,
            nominal_sample_time: settings.sampling_time,
            sample_time: settings.sampling_time,
            gradient_window: settings.gradient_window.min(N / 5),
            half_period: 0.0,
            filter: LowPassFilter::new(
                settings.filter_order,
                settings.cutoff_frequency,
                settings.sampling_time,
            ),
        }
    }

    /// Append a sample and its time step in seconds
    ///
    /// Returns `true` once the buffer holds `N` samples. Samples offered after
    /// that are dropped until [`reset`](Self::reset).
    pub fn add(&mut self, sample: i16, dt: f32) -> bool {
        if self.is_full() {
            return true;
        }

        self.samples[self.cursor] = sample;
        self.cursor = (self.cursor + 1) % N;
        self.total_dt += dt;
        self.len += 1;

        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn capacity(&self) -> usize {
        N
    }

    /// Gradient half-width after clamping to `N / 5`
    pub fn gradient_window(&self) -> usize {
        self.gradient_window
    }

    /// Sample at index `i`, if it has been written
    pub fn get(&self, i: usize) -> Option<i16> {
        self.samples().get(i).copied()
    }

    /// Samples written so far, in array order
    pub fn samples(&self) -> &[i16] {
        &self.samples[..self.len]
    }

    /// Sum of all time steps added since the last reset
    pub fn total_time(&self) -> f32 {
        self.total_dt
    }

    /// Accumulated time divided by capacity
    pub fn average_sample_time(&self) -> f32 {
        if N == 0 { 0.0 } else { self.total_dt / N as f32 }
    }

    /// Sampling period used by [`displacement`](Self::displacement)
    pub fn sample_time(&self) -> f32 {
        self.sample_time
    }

    /// Low-pass filter every stored sample in place
    ///
    /// The filter is redesigned for the measured average sampling period and
    /// started in steady state at the first sample, so a constant buffer stays
    /// constant. Call once after the buffer fills and before any gradient query.
    pub fn apply_low_pass_filter(&mut self) {
        if self.is_empty() {
            return;
        }

        let average = self.average_sample_time();
        debug!("DT: {:.6}", average);
        if average > 0.0 && average.is_finite() {
            self.sample_time = average;
            self.filter.design(average);
        } else {
            self.filter.reset();
        }

        self.filter.prime(self.samples[0] as f64);
        let len = self.len;
        for sample in self.samples[..len].iter_mut() {
            let filtered = self.filter.step(*sample as f64);
            *sample = to_ticks(filtered);
        }
        self.cursor = 0;
    }

    /// Direction of the signal around index `i`: -1, 0 or 1
    ///
    /// Compares the samples `gradient_window` positions either side of `i`,
    /// clamped to the buffer bounds.
    pub fn gradient_at(&self, i: usize) -> i8 {
        let samples = self.samples();
        if samples.is_empty() {
            return 0;
        }

        let lo = i.saturating_sub(self.gradient_window).min(samples.len() - 1);
        let hi = (i + self.gradient_window).min(samples.len() - 1);
        let difference = samples[hi] as i32 - samples[lo] as i32;
        difference.signum() as i8
    }

    /// Net vertical displacement in meters between two sample indices
    ///
    /// Integrates `(x - offset) * g / 1000` twice from `start` to `end`
    /// inclusive, where the offset moves linearly from `offset_start` to
    /// `offset_end` over the interval. Returns the absolute value and records
    /// the half-period `sample_time * (end - start)`.
    ///
    /// Empty or out-of-range intervals yield zero.
    pub fn displacement(
        &mut self,
        start: usize,
        end: usize,
        offset_start: i16,
        offset_end: i16,
    ) -> f32 {
        if end <= start || end >= self.len {
            self.half_period = 0.0;
            return 0.0;
        }

        let dt = self.sample_time;
        let span = (end - start) as f32;
        let mut velocity = 0.0f32;
        let mut distance = 0.0f32;

        for (k, &sample) in self.samples[start..=end].iter().enumerate() {
            let relative = k as f32 / span;
            let offset = (1.0 - relative) * offset_start as f32 + relative * offset_end as f32;
            velocity += dt * ((sample as f32 - offset) * GRAVITY / 1000.0);
            distance += dt * velocity;
        }

        self.half_period = dt * span;
        distance.abs()
    }

    /// Duration in seconds of the interval passed to the last displacement call
    pub fn half_period(&self) -> f32 {
        self.half_period
    }

    /// Clear all samples and filter state for the next collection cycle
    pub fn reset(&mut self) {
        self.samples = [0; N];
        self.cursor = 0;
        self.len = 0;
        self.total_dt = 0.0;
        self.sample_time = self.nominal_sample_time;
        self.half_period = 0.0;
        self.filter.reset();
    }
}

/// Round a filtered value to the nearest tick, saturating at the i16 range
fn to_ticks(value: f64) -> i16 {
    #[allow(unused_imports)]
    use nalgebra::ComplexField;

    value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
}
