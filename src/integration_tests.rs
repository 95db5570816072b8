/// Integration tests for the complete gait analysis pipeline
/// Runs synthetic walking trials through detection, segmentation,
/// normalization and kinematics and checks the end-to-end guarantees.

#[cfg(test)]
mod integration_tests {
    use std::f64::consts::PI;

    use crate::cycle_segmentation::segment_cycles;
    use crate::event_detection::{ContactDetectorConfig, PeakDetector, PeakDetectorConfig};
    use crate::export::AnalysisExportBuilder;
    use crate::interpolation::InterpolationKind;
    use crate::kinematics::{angular_velocity, segment_angle, PhaseUnwrap, Plane};
    use crate::markers::{MarkerSet, TrialData};
    use crate::normalization::{normalize_cycles, NormalizerConfig};
    use crate::pipeline::*;
    use crate::types::*;

    /// Helper: heel trace `-cos(2πt)` sampled at `rate` for `frames` frames
    fn heel_trace(frames: usize, rate: f64) -> Vec<f64> {
        (0..frames)
            .map(|i| -(2.0 * PI * i as f64 / rate).cos())
            .collect()
    }

    /// Helper: trial with a -cos heel, a ramp marker and a fixed segment pair
    fn trial(frames: usize, rate: f64) -> MarkerSet {
        let heel: Vec<Point3> = heel_trace(frames, rate)
            .into_iter()
            .map(|z| [0.0, 0.0, z])
            .collect();
        let ramp: Vec<Point3> = (0..frames).map(|i| [i as f64, 0.0, 0.0]).collect();
        let a = vec![[0.0, 0.0, 0.0]; frames];
        let b = vec![[1.0, 0.0, 1.0]; frames];

        MarkerSet::from_trial(TrialData {
            labels: ["HEEL", "RAMP", "A", "B"].iter().map(|s| s.to_string()).collect(),
            frame_rate: rate,
            first_frame: 0,
            positions: vec![heel, ramp, a, b],
        })
        .unwrap()
    }

    fn analyzer() -> GaitCycleAnalyzer {
        GaitCycleAnalyzer::new(GaitAnalysisConfig::default()).unwrap()
    }

    #[test]
    fn test_cosine_heel_detects_every_stride() {
        let signal = heel_trace(1000, 100.0);
        let events = PeakDetector::new(PeakDetectorConfig::default())
            .detect(&signal, 100.0)
            .unwrap();

        // Minima at every whole second except the boundary frame.
        assert_eq!(events, vec![100, 200, 300, 400, 500, 600, 700, 800, 900]);

        let cycles = segment_cycles(&events, 0.5, 100.0).unwrap();
        assert_eq!(cycles.len(), 8);
        for pair in cycles.windows(2) {
            assert_eq!(pair[0].end, pair[1].start, "cycles must be contiguous");
        }
    }

    #[test]
    fn test_ramp_normalizes_to_straight_lines() {
        let markers = trial(1000, 100.0);
        let report = analyzer()
            .analyze_marker_axis(&markers, "HEEL", "RAMP", Axis::X)
            .unwrap();

        assert_eq!(report.status, AnalysisStatus::Complete);
        assert_eq!(report.retained(), 8);
        assert_eq!(report.total(), 8);

        for cycle in &report.normalized.accepted {
            assert_eq!(cycle.values.len(), 100);
            let start = cycle.cycle.start as f64;
            let step = (cycle.cycle.frames() - 1) as f64 / 99.0;
            for (k, v) in cycle.values.iter().enumerate() {
                let expected = start + k as f64 * step;
                assert!(
                    (v - expected).abs() < 1e-8,
                    "cycle {} sample {}: {} vs {}",
                    cycle.cycle,
                    k,
                    v,
                    expected
                );
            }
        }
    }

    #[test]
    fn test_linear_and_cubic_agree_on_ramp() {
        let signal: Vec<f64> = (0..500).map(|i| 3.0 * i as f64 - 7.0).collect();
        let cycles = vec![Cycle::new(0, 120), Cycle::new(120, 217), Cycle::new(217, 400)];

        let cubic = normalize_cycles(&signal, &cycles, &NormalizerConfig::default()).unwrap();
        let linear = normalize_cycles(
            &signal,
            &cycles,
            &NormalizerConfig {
                interpolation: InterpolationKind::Linear,
                ..Default::default()
            },
        )
        .unwrap();

        for (c, l) in cubic.accepted.iter().zip(&linear.accepted) {
            for (a, b) in c.values.iter().zip(&l.values) {
                assert!((a - b).abs() < 1e-8, "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_constant_segment_angle_and_zero_velocity() {
        let markers = trial(300, 100.0);
        let a = markers.trajectory("A").unwrap();
        let b = markers.trajectory("B").unwrap();

        let angles = segment_angle(&a, &b, Plane::SAGITTAL).unwrap();
        assert_eq!(angles.len(), 300);
        assert!(angles.values.iter().all(|v| (v - PI / 4.0).abs() < 1e-12));

        let velocity = angular_velocity(&angles, PhaseUnwrap::Raw).unwrap();
        assert!(velocity.values.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_segment_angle_pipeline() {
        let markers = trial(1000, 100.0);
        let report = analyzer()
            .analyze_segment_angle(&markers, "HEEL", "A", "B", Plane::SAGITTAL, PhaseUnwrap::Raw)
            .unwrap();

        assert_eq!(report.kinematic_status, KinematicStatus::Complete);
        assert_eq!(report.angle_cycles.retained(), 8);
        let aggregate = report.angle_cycles.aggregate.as_ref().unwrap();
        assert!(aggregate.mean.iter().all(|m| (m - PI / 4.0).abs() < 1e-9));
        assert!(aggregate.std_dev.iter().all(|s| s.abs() < 1e-9));

        let velocity_cycles = report.velocity_cycles.as_ref().unwrap();
        assert_eq!(velocity_cycles.retained(), 8);
    }

    #[test]
    fn test_contact_method_end_to_end() {
        let markers = trial(1000, 100.0);
        let config = GaitAnalysisConfig {
            event_method: EventMethod::Contacts(ContactDetectorConfig::default()),
            ..Default::default()
        };
        let report = GaitCycleAnalyzer::new(config)
            .unwrap()
            .analyze_marker_axis(&markers, "HEEL", "RAMP", Axis::X)
            .unwrap();

        // One threshold crossing per stride, just before each minimum.
        let events = &report.detection.events;
        assert!(events.len() >= 8, "found {} contacts", events.len());
        for pair in events.windows(2) {
            let gap = pair[1] - pair[0];
            assert!((95..=105).contains(&gap), "contact spacing {}", gap);
        }
        assert!(report.status.is_complete());
    }

    #[test]
    fn test_nan_gap_rejects_only_affected_cycle() {
        let mut signal: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        signal[350] = f64::NAN;
        let markers = trial(1000, 100.0);

        let report = analyzer().analyze_signal(&markers, "HEEL", &signal).unwrap();
        assert_eq!(report.retained(), 7);
        assert_eq!(report.normalized.rejections.len(), 1);
        assert_eq!(report.normalized.rejections[0].cycle, Cycle::new(300, 400));
        assert!(report.summary().starts_with("7 of 8 cycles retained"));
    }

    #[test]
    fn test_event_marker_sliced_angle_matches_full_trial() {
        let markers = trial(1000, 100.0);
        let analyzer = analyzer();
        let detection = analyzer.detect_cycles(&markers, "HEEL").unwrap();
        let cycle = detection.cycles()[2];

        let sliced = analyzer
            .cycle_angle(&markers, "A", "B", Plane::SAGITTAL, cycle)
            .unwrap();
        assert_eq!(sliced.len(), cycle.frames());
        assert_eq!(sliced.timing.first_frame, cycle.start as i64);
    }

    #[test]
    fn test_time_axis_follows_first_frame() {
        let mut data = TrialData {
            labels: vec!["A".to_string(), "B".to_string()],
            frame_rate: 200.0,
            first_frame: 400,
            positions: vec![vec![[0.0; 3]; 10], vec![[1.0, 0.0, 0.0]; 10]],
        };
        let markers = MarkerSet::from_trial(data.clone()).unwrap();
        let angles = segment_angle(
            &markers.trajectory("A").unwrap(),
            &markers.trajectory("B").unwrap(),
            Plane::SAGITTAL,
        )
        .unwrap();

        assert_eq!(angles.time_axis(false)[3], 0.015);
        assert_eq!(angles.time_axis(true)[0], 2.0);

        data.first_frame = 0;
        let relative = MarkerSet::from_trial(data).unwrap();
        assert_eq!(relative.time_axis(true), markers.time_axis(false));
    }

    #[test]
    fn test_export_of_full_pipeline() {
        let markers = trial(1000, 100.0);
        let report = analyzer()
            .analyze_segment_angle(&markers, "HEEL", "A", "B", Plane::SAGITTAL, PhaseUnwrap::Unwrapped)
            .unwrap();
        let export = AnalysisExportBuilder::new("synthetic", 100.0).export_segment_angle(&report);

        assert_eq!(export.retained_cycles, 8);
        assert_eq!(export.cycles.len(), 8);
        assert_eq!(export.cycles[0].duration_s, 1.0);
        let kinematics = export.kinematics.as_ref().unwrap();
        assert_eq!(kinematics.time_s.len(), 1000);
        assert!(kinematics.unwrapped);

        let value: serde_json::Value = serde_json::from_str(&export.to_json().unwrap()).unwrap();
        assert_eq!(value["signal"], "A->B angle");
        assert_eq!(value["waveform"]["cycle_count"], 8);
    }
}
