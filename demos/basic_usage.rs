/// Basic usage example: feed a marker set, get normalized gait cycles
use std::f64::consts::PI;

use gait_phase::{
    AnalysisStatus, Axis, Cycle, GaitAnalysisConfig, GaitCycleAnalyzer, MarkerSet, PhaseUnwrap,
    Plane,
};

fn main() -> gait_phase::Result<()> {
    println!("=== Gait Phase Engine: Basic Example ===\n");

    // Four seconds of walking at 100 Hz, 1.05 s strides
    let rate = 100.0;
    let frames = 400;
    let phase = |i: usize| 2.0 * PI * i as f64 / (rate * 1.05);

    let heel = (0..frames)
        .map(|i| [i as f64 * 12.0, 100.0, 60.0 - 40.0 * phase(i).cos()])
        .collect();
    let hip = (0..frames)
        .map(|i| [i as f64 * 12.0, 110.0, 900.0 + 15.0 * (2.0 * phase(i)).sin()])
        .collect();
    let knee = (0..frames)
        .map(|i| [i as f64 * 12.0 + 120.0 * phase(i).sin(), 105.0, 480.0])
        .collect();

    let markers = MarkerSet::new(
        vec!["RHEE".to_string(), "RASI".to_string(), "RKNE".to_string()],
        vec![heel, hip, knee],
        rate,
        0,
    )?;
    println!(
        "Trial: {} markers, {} frames at {} Hz\n",
        markers.marker_count(),
        markers.frame_count(),
        markers.frame_rate()
    );

    let analyzer = GaitCycleAnalyzer::new(GaitAnalysisConfig::default())?;

    // Hip height over the gait cycle
    let report = analyzer.analyze_marker_axis(&markers, "RHEE", "RASI", Axis::Z)?;
    println!("Events on RHEE: {:?}", report.detection.events);
    println!("{}", report.summary());
    for cycle in report.detection.cycles() {
        print_cycle(*cycle, rate);
    }
    for rejection in &report.normalized.rejections {
        println!("  rejected {}: {}", rejection.cycle, rejection.reason);
    }

    if let Some(aggregate) = &report.aggregate {
        println!("\nRASI.Z mean at 0 / 25 / 50 / 75 %:");
        for idx in [0, 25, 50, 75] {
            println!(
                "  {:>3}%  {:8.2} mm  (SD {:.3})",
                idx, aggregate.mean[idx], aggregate.std_dev[idx]
            );
        }
    }

    // Thigh angle and angular velocity
    let thigh = analyzer.analyze_segment_angle(
        &markers,
        "RHEE",
        "RASI",
        "RKNE",
        Plane::SAGITTAL,
        PhaseUnwrap::Unwrapped,
    )?;
    println!("\nThigh angle: {:?}", thigh.kinematic_status);
    match thigh.angle_cycles.status {
        AnalysisStatus::Complete => {
            if let Some(aggregate) = &thigh.angle_cycles.aggregate {
                let (lo, hi) = aggregate.band();
                println!(
                    "  mean at heel strike {:.1} deg (band {:.1}..{:.1})",
                    aggregate.mean[0].to_degrees(),
                    lo[0].to_degrees(),
                    hi[0].to_degrees()
                );
            }
        }
        other => println!("  no cycles: {:?}", other),
    }

    Ok(())
}

fn print_cycle(cycle: Cycle, rate: f64) {
    println!(
        "  cycle {:>9}  {:>4} frames  {:.2} s",
        cycle.to_string(),
        cycle.frames(),
        cycle.duration_s(rate)
    );
}
