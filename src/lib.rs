//! Gait Phase Engine Library
//!
//! Turns motion-capture marker trajectories into per-cycle gait data: gait
//! events on a foot marker's vertical trace, cycles between consecutive
//! events, every cycle resampled onto a common 0-100 % axis, and planar
//! segment angles with their angular velocity.
//!
//! # Design Philosophy
//!
//! - **Report, don't guess**: cycles that cannot be normalized are listed with
//!   a reason instead of silently dropped.
//! - **Fail fast on configuration**: bad parameters are errors before any
//!   numeric work; data problems are statuses afterwards.
//! - **No global state**: every function takes its inputs explicitly, so
//!   trials can be processed in parallel.
//!
//! # Example
//!
//! ```ignore
//! use gait_phase::{GaitAnalysisConfig, GaitCycleAnalyzer, MarkerSet, Axis};
//!
//! let markers = MarkerSet::from_trial(trial)?;
//! let analyzer = GaitCycleAnalyzer::new(GaitAnalysisConfig::default())?;
//! let report = analyzer.analyze_marker_axis(&markers, "RHEE", "RASI", Axis::X)?;
//! println!("{}", report.summary());
//! ```

pub mod cycle_segmentation;
pub mod error;
pub mod event_detection;
pub mod export;
pub mod interpolation;
pub mod kinematics;
pub mod markers;
pub mod normalization;
pub mod pipeline;
pub mod types;

#[cfg(test)]
mod integration_tests;

// Re-export commonly used types
pub use cycle_segmentation::{segment_cycles, CycleSegmenter, Segmentation, SegmentationConfig};
pub use error::{GaitError, Result};
pub use event_detection::{
    detect_contacts, detect_events, ContactDetector, ContactDetectorConfig, EventPolarity,
    PeakDetector, PeakDetectorConfig,
};
pub use export::{AnalysisExport, AnalysisExportBuilder};
pub use interpolation::{CubicSpline, InterpolationKind, LinearInterpolant};
pub use kinematics::{angular_velocity, segment_angle, PhaseUnwrap, Plane};
pub use markers::{MarkerSet, TrialData};
pub use normalization::{
    normalize_cycle, normalize_cycles, CycleAggregate, CycleNormalizer, CycleRejection,
    NormalizationBatch, NormalizeOutcome, NormalizerConfig, RejectionReason,
};
pub use pipeline::{
    AnalysisStatus, CycleAnalysisReport, EventMethod, GaitAnalysisConfig, GaitCycleAnalyzer,
    KinematicStatus, SegmentAngleReport,
};
pub use types::{
    AngleSeries, AngularVelocitySeries, Axis, Cycle, FrameTiming, NormalizedCycle, Point3,
    Trajectory,
};
