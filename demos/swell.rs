//! Wave analysis on a synthetic swell
//!
//! Generates vertical acceleration for a regular swell, runs one measurement
//! window through the wave analyser and writes the filtered signal with the
//! detected crests and troughs to `demos/output/`.
//!
//! Run with: `cargo run --example swell`

use buoy_fusion::{DEFAULT_CAPACITY, GRAVITY, WaveAnalyser, WaveOutcome, WaveSettings};
use plotters::prelude::*;
use rand::prelude::*;
use rand_pcg::Pcg64;
use serde::Serialize;
use std::error::Error;
use std::f32::consts::PI;
use std::fs;

const SAMPLE_PERIOD: f32 = 0.01; // 100 Hz
const SWELL_PERIOD: f32 = 4.0; // seconds
const SWELL_AMPLITUDE: f32 = 150.0; // milli-g
const NOISE: f32 = 20.0; // milli-g, peak

#[derive(Debug, Serialize)]
struct Record {
    #[serde(rename = "Time (s)")]
    time: f32,
    #[serde(rename = "Raw (mg)")]
    raw: i16,
    #[serde(rename = "Filtered (mg)")]
    filtered: i16,
    #[serde(rename = "Extremum")]
    extremum: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    println!("Swell Example - one measurement window of a {SWELL_PERIOD} s swell");

    let mut rng = Pcg64::seed_from_u64(42);
    let raw: Vec<i16> = (0..DEFAULT_CAPACITY)
        .map(|k| {
            let t = k as f32 * SAMPLE_PERIOD;
            let swell = SWELL_AMPLITUDE * (2.0 * PI * t / SWELL_PERIOD).sin();
            (swell + rng.random_range(-NOISE..NOISE)) as i16
        })
        .collect();

    let mut analyser: Box<WaveAnalyser> = Box::new(WaveAnalyser::new(WaveSettings {
        settle_delay_ms: 1,
        ..Default::default()
    }));

    // the first sample after the settle delay starts collection
    analyser.start(0);
    analyser.push(0, SAMPLE_PERIOD, 0);

    let mut now_ms = 0;
    let mut done = false;
    for &sample in &raw {
        now_ms += 10;
        done = analyser.push(sample, SAMPLE_PERIOD, now_ms);
    }

    if !done {
        println!("Window ended without a result: {:?}", analyser.phase());
        return Ok(());
    }

    match analyser.outcome() {
        Some(WaveOutcome::Measured(statistics)) => {
            // a sine swell of amplitude A rises and falls 2 A / w^2
            let w = 2.0 * PI / SWELL_PERIOD;
            let expected = 2.0 * SWELL_AMPLITUDE / 1000.0 * GRAVITY / (w * w);
            println!("Average wave height:     {:.2} m", statistics.average_height);
            println!("Significant wave height: {:.2} m", statistics.significant_height);
            println!("Average period:          {:.2} s", statistics.average_period);
            println!("Expected height:         {:.2} m", expected);
        }
        Some(WaveOutcome::NoWaves) => println!("No waves found"),
        None => {}
    }

    let filtered = analyser.buffer().samples();
    let extrema = analyser.extrema();

    fs::create_dir_all("demos/output")?;

    let mut writer = csv::Writer::from_path("demos/output/swell.csv")?;
    for (k, (&raw, &filtered)) in raw.iter().zip(filtered.iter()).enumerate() {
        writer.serialize(Record {
            time: k as f32 * SAMPLE_PERIOD,
            raw,
            filtered,
            extremum: extrema.contains(&k),
        })?;
    }
    writer.flush()?;
    println!("✓ Samples saved to demos/output/swell.csv");

    create_plot(&raw, filtered, extrema)?;
    println!("✓ Plot saved to demos/output/swell.png");
    Ok(())
}

/// Raw and filtered vertical acceleration with the detected extrema
fn create_plot(raw: &[i16], filtered: &[i16], extrema: &[usize]) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new("demos/output/swell.png", (1200, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let duration = raw.len() as f32 * SAMPLE_PERIOD;
    let limit = SWELL_AMPLITUDE + 2.0 * NOISE;

    let mut chart = ChartBuilder::on(&root)
        .caption("Vertical acceleration", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f32..duration, -limit..limit)?;

    chart
        .configure_mesh()
        .x_desc("Time (s)")
        .y_desc("Acceleration (mg)")
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            raw.iter()
                .enumerate()
                .map(|(k, &v)| (k as f32 * SAMPLE_PERIOD, v as f32)),
            &RGBColor(180, 180, 180),
        ))?
        .label("Raw")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], RGBColor(180, 180, 180)));

    chart
        .draw_series(LineSeries::new(
            filtered
                .iter()
                .enumerate()
                .map(|(k, &v)| (k as f32 * SAMPLE_PERIOD, v as f32)),
            &BLUE,
        ))?
        .label("Filtered")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], BLUE));

    chart
        .draw_series(extrema.iter().filter_map(|&k| {
            filtered
                .get(k)
                .map(|&v| Circle::new((k as f32 * SAMPLE_PERIOD, v as f32), 4, RED.filled()))
        }))?
        .label("Crest / trough")
        .legend(|(x, y)| Circle::new((x + 5, y), 4, RED.filled()));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
