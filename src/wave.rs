//! Wave extraction state machine
//!
//! [`WaveAnalyser`] waits for the attitude filter to settle, collects one
//! window of vertical acceleration into a [`MotionBuffer`], and then finds
//! crests and troughs, integrates each half-wave to a height, and reduces the
//! heights to average height, significant height and average period.
//!
//! ```text
//! Waiting ──settle delay──▶ Collecting ──buffer full──▶ Analyzing ─┬─▶ Done
//!    ▲                                                             │
//!    └──────────────────────────── Retry ◀─────────────────────────┘
//! ```

use log::{debug, info, trace};

use crate::motion::MotionBuffer;
use crate::store::{LogStore, NullStore};
use crate::types::{DEFAULT_CAPACITY, MAX_WAVES, WaveSettings};

/// Exclusive upper bound for the settle delay in milliseconds
pub const MAX_SETTLE_DELAY_MS: u32 = 200_000;

const MAX_EXTREMA: usize = 2 * MAX_WAVES;

/// Phase of the measurement cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavePhase {
    /// Settle delay running, samples are discarded
    Waiting,
    /// Samples are being stored
    Collecting,
    /// Buffer is full and being analysed
    Analyzing,
    /// Too few waves; the next sample restarts the cycle
    Retry,
    /// A result (or "no waves") is available
    Done,
}

/// One half-wave: crest to trough or trough to crest
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WaveMeasurement {
    /// Vertical travel in meters
    pub height: f32,
    /// Duration in seconds
    pub half_period: f32,
}

/// Summary of one completed measurement
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WaveStatistics {
    /// Mean of the largest `wave_count` half-wave heights, meters
    pub average_height: f32,
    /// Mean of the top heights after outlier rejection, meters
    pub significant_height: f32,
    /// Mean full period of the waves used for the average height, seconds
    pub average_period: f32,
}

/// Result of a finished analysis
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaveOutcome {
    Measured(WaveStatistics),
    /// Fewer than two extrema in a full window: calm water
    NoWaves,
}

/// Crest/trough detector and wave statistics over a buffer of `N` samples
///
/// Feed it one rotated vertical acceleration sample per output interval with
/// [`push`](Self::push). Results are written to the log facade and mirrored to
/// the [`LogStore`] `S`.
///
/// # Example
/// ```
/// use buoy_fusion::{WaveAnalyser, WavePhase, WaveSettings};
///
/// let mut analyser: WaveAnalyser<100> = WaveAnalyser::new(WaveSettings {
///     settle_delay_ms: 1_000,
///     ..Default::default()
/// });
/// analyser.start(0);
/// assert!(!analyser.push(0, 0.01, 500));
/// assert_eq!(analyser.phase(), WavePhase::Waiting);
/// ```
#[derive(Debug)]
pub struct WaveAnalyser<const N: usize = DEFAULT_CAPACITY, S: LogStore = NullStore> {
    settings: WaveSettings,
    buffer: MotionBuffer<N>,
    store: S,
    phase: WavePhase,
    wait_start_ms: Option<u32>,
    progress_seconds: u32,
    gradient: i8,
    steady_gradient: i8,
    gradient_count: usize,
    candidate: usize,
    extrema: heapless::Vec<usize, MAX_EXTREMA>,
    measurements: heapless::Vec<WaveMeasurement, MAX_EXTREMA>,
    outcome: Option<WaveOutcome>,
}

impl<const N: usize> WaveAnalyser<N, NullStore> {
    /// Create an analyser without a durable log
    pub fn new(settings: WaveSettings) -> Self {
        Self::with_store(settings, NullStore)
    }
}

impl<const N: usize, S: LogStore> WaveAnalyser<N, S> {
    /// Create an analyser that mirrors its records into `store`
    ///
    /// Out-of-range settle delay or wave count fall back to the defaults.
    pub fn with_store(settings: WaveSettings, store: S) -> Self {
        let defaults = WaveSettings::default();
        let mut settings = settings;
        if !settle_delay_in_range(settings.settle_delay_ms) {
            settings.settle_delay_ms = defaults.settle_delay_ms;
        }
        if !wave_count_in_range(settings.wave_count) {
            settings.wave_count = defaults.wave_count;
        }

        Self {
            buffer: MotionBuffer::new(&settings),
            settings,
            store,
            phase: WavePhase::Waiting,
            wait_start_ms: None,
            progress_seconds: 0,
            gradient: 0,
            steady_gradient: 0,
            gradient_count: 0,
            candidate: 0,
            extrema: heapless::Vec::new(),
            measurements: heapless::Vec::new(),
            outcome: None,
        }
    }

    pub fn settings(&self) -> &WaveSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn buffer(&self) -> &MotionBuffer<N> {
        &self.buffer
    }

    pub fn phase(&self) -> WavePhase {
        self.phase
    }

    /// Confirmed extremum indices of the last analysed window
    pub fn extrema(&self) -> &[usize] {
        &self.extrema
    }

    pub fn extrema_count(&self) -> usize {
        self.extrema.len()
    }

    /// Half-waves measured so far, kept across retries
    pub fn measurements(&self) -> &[WaveMeasurement] {
        &self.measurements
    }

    pub fn outcome(&self) -> Option<WaveOutcome> {
        self.outcome
    }

    pub fn is_done(&self) -> bool {
        self.phase == WavePhase::Done
    }

    /// `true` when the last window held fewer than two extrema
    pub fn no_waves(&self) -> bool {
        matches!(self.outcome, Some(WaveOutcome::NoWaves))
    }

    /// Statistics of the finished measurement, if waves were found
    pub fn statistics(&self) -> Option<WaveStatistics> {
        match self.outcome {
            Some(WaveOutcome::Measured(stats)) => Some(stats),
            _ => None,
        }
    }

    /// Significant wave height in meters, zero until measured
    pub fn significant_wave_height(&self) -> f32 {
        self.statistics().map_or(0.0, |s| s.significant_height)
    }

    /// Average wave height in meters, zero until measured
    pub fn average_wave_height(&self) -> f32 {
        self.statistics().map_or(0.0, |s| s.average_height)
    }

    /// Average wave period in seconds, zero until measured
    pub fn average_period(&self) -> f32 {
        self.statistics().map_or(0.0, |s| s.average_period)
    }

    pub fn settle_delay_ms(&self) -> u32 {
        self.settings.settle_delay_ms
    }

    /// Change the settle delay; values outside `(0, 200 000)` ms are ignored
    pub fn set_settle_delay(&mut self, delay_ms: u32) {
        if settle_delay_in_range(delay_ms) {
            self.settings.settle_delay_ms = delay_ms;
        } else {
            debug!("Settle delay {} ms rejected", delay_ms);
        }
    }

    pub fn wave_count(&self) -> usize {
        self.settings.wave_count
    }

    /// Change the number of waves per result; values outside `(0, 50)` are ignored
    pub fn set_wave_count(&mut self, count: usize) {
        if wave_count_in_range(count) {
            self.settings.wave_count = count;
        } else {
            debug!("Wave count {} rejected", count);
        }
    }

    /// Begin a collection cycle at `now_ms`
    ///
    /// Clears the buffer, the extrema and the gradient tracking, and restarts
    /// the settle delay. Half-waves measured in earlier cycles are kept.
    pub fn start(&mut self, now_ms: u32) {
        self.buffer.reset();
        self.extrema.clear();
        self.gradient = 0;
        self.steady_gradient = 0;
        self.gradient_count = 0;
        self.candidate = 0;
        self.outcome = None;
        self.wait_start_ms = Some(now_ms);
        self.progress_seconds = 0;
        self.phase = WavePhase::Waiting;
    }

    /// Drop every measurement and begin a fresh cycle at `now_ms`
    pub fn restart(&mut self, now_ms: u32) {
        self.measurements.clear();
        self.start(now_ms);
    }

    /// Offer one vertical acceleration sample in milli-g with its time step
    ///
    /// Returns `true` on the call that completes a measurement, whether waves
    /// were found or not. After that the analyser stays [`WavePhase::Done`]
    /// and ignores samples until [`restart`](Self::restart).
    pub fn push(&mut self, sample: i16, dt: f32, now_ms: u32) -> bool {
        match self.phase {
            WavePhase::Done => return false,
            WavePhase::Retry => self.start(now_ms),
            _ => {}
        }

        let start = *self.wait_start_ms.get_or_insert(now_ms);
        if self.phase == WavePhase::Waiting {
            let elapsed = now_ms.wrapping_sub(start);
            if elapsed > self.settings.settle_delay_ms {
                info!("Collecting {} samples", N);
                self.phase = WavePhase::Collecting;
            } else {
                self.report_progress(elapsed);
                return false;
            }
        }

        if self.buffer.add(sample, dt) {
            self.phase = WavePhase::Analyzing;
            return self.analyse();
        }
        false
    }

    fn report_progress(&mut self, elapsed: u32) {
        if elapsed <= self.progress_seconds.saturating_mul(1000) {
            return;
        }

        self.progress_seconds += 1;
        let delay_s = self.settings.settle_delay_ms / 1000;
        info!("Wait for: {} s", delay_s.saturating_sub(elapsed / 1000));
        if self.progress_seconds == delay_s {
            info!(
                "Log data for ca. {:.0} s",
                N as f32 * self.settings.sampling_time
            );
            self.store.append_line("DATA LOG:");
        }
    }

    fn analyse(&mut self) -> bool {
        info!("Filtering data...");
        for &sample in self.buffer.samples() {
            self.store.append_fmt(format_args!("{}", sample));
        }
        self.buffer.apply_low_pass_filter();
        self.store.append_fmt(format_args!(
            "Average dt: {:.6}",
            self.buffer.average_sample_time()
        ));

        info!("Identifying waves...");
        self.scan_extrema();
        self.measure_waves();
        self.evaluate()
    }

    /// Debounced crest/trough detection over the filtered buffer
    fn scan_extrema(&mut self) {
        for i in 0..self.buffer.len() {
            let gradient = self.buffer.gradient_at(i);
            if gradient != self.gradient {
                self.gradient = gradient;
                self.gradient_count = 0;
                if gradient != 0 {
                    self.candidate = i;
                }
            } else {
                self.gradient_count += 1;
            }

            if self.gradient_count == self.settings.debounce_count
                && self.steady_gradient != self.gradient
            {
                if self.steady_gradient != 0 {
                    self.commit_extremum(self.candidate);
                }
                self.steady_gradient = self.gradient;
            }
        }
        debug!("{} extrema found", self.extrema.len());
    }

    fn commit_extremum(&mut self, index: usize) {
        if self.extrema.last().is_some_and(|&last| index <= last) {
            return;
        }
        if self.extrema.push(index).is_ok() {
            trace!("Max point: {}", index);
        }
    }

    /// Integrate each pair of consecutive extrema into a half-wave
    fn measure_waves(&mut self) {
        let needed = 2 * self.settings.wave_count;
        for i in 1..self.extrema.len() {
            if self.measurements.len() >= needed {
                break;
            }

            let (from, to) = (self.extrema[i - 1], self.extrema[i]);
            let offset_start = offset_between(&self.buffer, from, to);
            let offset_end = match self.extrema.get(i + 1) {
                Some(&next) => offset_between(&self.buffer, to, next),
                None => offset_start,
            };

            let height = self.buffer.displacement(from, to, offset_start, offset_end);
            let measurement = WaveMeasurement {
                height,
                half_period: self.buffer.half_period(),
            };
            if self.measurements.push(measurement).is_err() {
                break;
            }
        }
    }

    fn evaluate(&mut self) -> bool {
        let needed = 2 * self.settings.wave_count;
        if self.measurements.len() >= needed {
            let measured = &mut self.measurements[..needed];
            let stats = wave_statistics(measured, &self.settings);

            self.store.append_line("Heights:");
            for m in measured.iter().take(self.settings.wave_count) {
                debug!("Height {:.2} m", m.height);
                self.store.append_fmt(format_args!("{:.2}", m.height));
            }
            info!("AVERAGE WAVE H: {:.2} m", stats.average_height);
            info!("SIGNIFICANT WAVE H: {:.2} m", stats.significant_height);
            info!("AVERAGE PERIOD: {:.2} s", stats.average_period);
            self.store
                .append_fmt(format_args!("AVERAGE WAVE H: {:.2}", stats.average_height));
            self.store.append_fmt(format_args!(
                "SIGNIFICANT WAVE H: {:.2}",
                stats.significant_height
            ));
            self.store
                .append_fmt(format_args!("AVERAGE PERIOD: {:.2}", stats.average_period));

            self.outcome = Some(WaveOutcome::Measured(stats));
            self.phase = WavePhase::Done;
            return true;
        }

        if self.extrema.len() < 2 {
            info!("Array full, no waves.");
            self.store.append_line("Array full, no waves.");
            self.outcome = Some(WaveOutcome::NoWaves);
            self.phase = WavePhase::Done;
            return true;
        }

        info!(
            "Array not full, number of waves: {}",
            self.measurements.len()
        );
        self.store.append_fmt(format_args!(
            "Array not full, number of waves: {}",
            self.measurements.len()
        ));
        self.phase = WavePhase::Retry;
        false
    }
}

fn settle_delay_in_range(delay_ms: u32) -> bool {
    delay_ms > 0 && delay_ms < MAX_SETTLE_DELAY_MS
}

fn wave_count_in_range(count: usize) -> bool {
    count > 0 && count < MAX_WAVES
}

/// Midpoint of two buffered samples, truncated toward zero
fn offset_between<const N: usize>(buffer: &MotionBuffer<N>, a: usize, b: usize) -> i16 {
    let x_a = buffer.get(a).unwrap_or(0) as i32;
    let x_b = buffer.get(b).unwrap_or(0) as i32;
    ((x_a + x_b) / 2) as i16
}

/// Sort half-waves by height, largest first, keeping equal heights in order
pub fn sort_descending(measurements: &mut [WaveMeasurement]) {
    for i in 1..measurements.len() {
        let mut j = i;
        while j > 0 && measurements[j - 1].height < measurements[j].height {
            measurements.swap(j - 1, j);
            j -= 1;
        }
    }
}

/// Reduce half-wave measurements to summary statistics
///
/// Sorts `measurements` in place. The average height and period use the
/// largest `wave_count` half-waves; the significant height averages the first
/// `int(2/3 * wave_count + 1)` of them that lie below `max_height` and below
/// `outlier_factor` times the average.
pub fn wave_statistics(
    measurements: &mut [WaveMeasurement],
    settings: &WaveSettings,
) -> WaveStatistics {
    sort_descending(measurements);

    let count = settings.wave_count.min(measurements.len());
    if count == 0 {
        return WaveStatistics::default();
    }

    let top = &measurements[..count];
    let average_height = top.iter().map(|m| m.height).sum::<f32>() / count as f32;
    let average_period = top.iter().map(|m| 2.0 * m.half_period).sum::<f32>() / count as f32;

    let significant_end = ((2.0 / 3.0) * settings.wave_count as f32 + 1.0) as usize;
    let ceiling = settings.outlier_factor * average_height;
    let (sum, used) = measurements
        .iter()
        .take(significant_end)
        .filter(|m| m.height < settings.max_height && m.height < ceiling)
        .fold((0.0f32, 0usize), |(sum, n), m| (sum + m.height, n + 1));
    let significant_height = if used > 0 { sum / used as f32 } else { 0.0 };

    WaveStatistics {
        average_height,
        significant_height,
        average_period,
    }
}
