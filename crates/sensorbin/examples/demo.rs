//! Synthetic three-axis sensor pipeline.
//!
//! A feeder thread plays the device adaptor, a map filter applies a fixed
//! declination correction to the heading axis, and a terminal sink logs
//! every corrected sample.
//!
//! Run with: `cargo run -p sensorbin --example demo`

use sensorbin::{Bin, FnSink, MapFilter, RingConfig, SampleSource};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Three-axis sample as a device adaptor would emit it.
#[derive(Debug, Clone, Copy)]
struct Xyz {
    x: i32,
    y: i32,
    z: i32,
    timestamp_us: u64,
}

/// Correction applied to the x axis, in millidegrees.
const DECLINATION_MDEG: i32 = 10_500;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let bin = Bin::new();

    let adaptor = Arc::new(SampleSource::<Xyz>::with_config(
        "samples",
        RingConfig::new(10, true),
    ));
    let correction = Arc::new(MapFilter::new("samples", "corrected", |s: Xyz| Xyz {
        x: s.x + DECLINATION_MDEG,
        ..s
    }));
    let channel = Arc::new(FnSink::new("corrected", |batch: &[Xyz]| {
        for sample in batch {
            tracing::info!(
                x = sample.x,
                y = sample.y,
                z = sample.z,
                timestamp_us = sample.timestamp_us,
                "corrected sample"
            );
        }
    }));

    bin.add_producer("adaptor", adaptor.clone())?;
    bin.add_filter("declination", correction)?;
    bin.add_consumer("channel", channel)?;

    bin.join("adaptor", "samples", "declination", "samples")?;
    bin.join("declination", "corrected", "channel", "corrected")?;

    bin.start()?;

    // Feeder thread standing in for a kernel input device.
    let feeder = {
        let adaptor = Arc::clone(&adaptor);
        thread::spawn(move || {
            for tick in 0u64..20 {
                let sample = Xyz {
                    x: (tick as i32) * 100,
                    y: -(tick as i32) * 50,
                    z: 981,
                    timestamp_us: tick * 5_000,
                };
                adaptor.ingest(&[sample]);
                thread::sleep(Duration::from_millis(5));
            }
        })
    };

    feeder.join().expect("feeder thread panicked");
    thread::sleep(Duration::from_millis(50));

    bin.stop()?;

    let metrics = adaptor.metrics();
    tracing::info!(?metrics, "adaptor ring counters");
    Ok(())
}
