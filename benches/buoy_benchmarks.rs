use buoy_fusion::{
    DEFAULT_CAPACITY, FilterAlgorithm, FilterOrder, Fusion, FusionSettings, LowPassFilter,
    MotionBuffer, WaveAnalyser, WaveSettings,
};
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use nalgebra::Vector3;
use rand::prelude::*;
use rand_pcg::Pcg64;
use std::f32::consts::PI;

// Pre-generated sensor data to eliminate RNG overhead during benchmarks
struct PreGeneratedData {
    samples: Vec<(Vector3<f32>, Vector3<f32>, Vector3<f32>)>,
    index: usize,
}

impl PreGeneratedData {
    fn new(count: usize, seed: u64) -> Self {
        let mut rng = Pcg64::seed_from_u64(seed);
        let mut samples = Vec::with_capacity(count);

        for i in 0..count {
            let time = i as f32 * 0.01; // 100Hz sample rate

            // Buoy rolling in a 4 s swell
            let motion_phase = time * 0.25 * 2.0 * PI;

            let accelerometer = Vector3::new(
                -0.1 * motion_phase.sin() + rng.random_range(-0.002..0.002),
                0.1 * motion_phase.cos() + rng.random_range(-0.002..0.002),
                1.0 + 0.15 * motion_phase.sin() + rng.random_range(-0.002..0.002),
            );

            let gyroscope = Vector3::new(
                5.0 * motion_phase.cos() + rng.random_range(-0.5..0.5),
                5.0 * motion_phase.sin() + rng.random_range(-0.5..0.5),
                rng.random_range(-0.5..0.5),
            );

            let magnetometer = Vector3::new(
                200.0 + 10.0 * motion_phase.cos() + rng.random_range(-5.0..5.0),
                10.0 * motion_phase.sin() + rng.random_range(-5.0..5.0),
                -400.0 + rng.random_range(-5.0..5.0),
            );

            samples.push((accelerometer, gyroscope, magnetometer));
        }

        Self { samples, index: 0 }
    }

    fn next(&mut self) -> (Vector3<f32>, Vector3<f32>, Vector3<f32>) {
        let sample = self.samples[self.index];
        self.index = (self.index + 1) % self.samples.len();
        sample
    }
}

fn swell(count: usize) -> Vec<i16> {
    let mut rng = Pcg64::seed_from_u64(17);
    (0..count)
        .map(|i| {
            let t = i as f32 * 0.01;
            (150.0 * (2.0 * PI * t / 4.0).sin() + rng.random_range(-20.0..20.0)) as i16
        })
        .collect()
}

/// Benchmark one fusion update per filter
fn bench_update(c: &mut Criterion) {
    for (name, algorithm) in [
        ("fusion_update_madgwick", FilterAlgorithm::Madgwick),
        ("fusion_update_mahony", FilterAlgorithm::Mahony),
    ] {
        let mut fusion = Fusion::with_settings(FusionSettings {
            algorithm,
            ..Default::default()
        });
        let mut data = PreGeneratedData::new(1000, 42);

        c.bench_function(name, |b| {
            b.iter(|| {
                let (accelerometer, gyroscope, magnetometer) = data.next();
                fusion.update(
                    black_box(accelerometer),
                    black_box(gyroscope),
                    black_box(magnetometer),
                    black_box(0.01),
                )
            })
        });
    }
}

/// Benchmark batch processing of sensor updates
fn bench_batch_updates(c: &mut Criterion) {
    let mut fusion = Fusion::new();
    let mut data = PreGeneratedData::new(100, 7);

    c.bench_function("fusion_batch_100_updates", |b| {
        b.iter(|| {
            for _ in 0..100 {
                let (accelerometer, gyroscope, magnetometer) = data.next();
                fusion.update(
                    black_box(accelerometer),
                    black_box(gyroscope),
                    black_box(magnetometer),
                    black_box(0.01),
                );
            }
        })
    });
}

/// Benchmark Euler angle derivation
fn bench_euler_angles(c: &mut Criterion) {
    let mut fusion = Fusion::new();
    let mut data = PreGeneratedData::new(10, 1);
    for _ in 0..10 {
        let (accelerometer, gyroscope, magnetometer) = data.next();
        fusion.update(accelerometer, gyroscope, magnetometer, 0.01);
    }

    c.bench_function("fusion_euler_angles", |b| {
        b.iter(|| black_box(fusion.euler_angles()))
    });
}

/// Benchmark the Butterworth cascade on one sample
fn bench_low_pass_step(c: &mut Criterion) {
    let mut filter = LowPassFilter::new(FilterOrder::Third, 0.4, 0.01);
    filter.prime(0.0);

    c.bench_function("low_pass_step", |b| {
        b.iter(|| black_box(filter.step(black_box(123.0))))
    });
}

/// Benchmark filtering a full default-size buffer
fn bench_buffer_filter(c: &mut Criterion) {
    let settings = WaveSettings::default();
    let samples = swell(DEFAULT_CAPACITY);

    c.bench_function("motion_buffer_filter_3000", |b| {
        b.iter_batched(
            || {
                let mut buffer: Box<MotionBuffer<DEFAULT_CAPACITY>> =
                    Box::new(MotionBuffer::new(&settings));
                for &sample in &samples {
                    buffer.add(sample, 0.01);
                }
                buffer
            },
            |mut buffer| {
                buffer.apply_low_pass_filter();
                buffer
            },
            BatchSize::SmallInput,
        )
    });
}

/// Benchmark a complete measurement window: collection, filtering and analysis
fn bench_analysis_window(c: &mut Criterion) {
    let settings = WaveSettings {
        settle_delay_ms: 1,
        ..Default::default()
    };
    let samples = swell(DEFAULT_CAPACITY);

    c.bench_function("wave_analysis_3000", |b| {
        b.iter_batched(
            || {
                let mut analyser: Box<WaveAnalyser> = Box::new(WaveAnalyser::new(settings));
                analyser.start(0);
                analyser.push(0, 0.01, 0);
                analyser
            },
            |mut analyser| {
                for (k, &sample) in samples.iter().enumerate() {
                    analyser.push(sample, 0.01, 10 * (k as u32 + 1));
                }
                analyser
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_update,
    bench_batch_updates,
    bench_euler_angles,
    bench_low_pass_step,
    bench_buffer_filter,
    bench_analysis_window
);

criterion_main!(benches);
