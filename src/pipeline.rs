//! Complete gait analysis pipeline integrating all processing stages.
//!
//! This module wires the stages together for one trial: event detection on a
//! marker's vertical trace, cycle segmentation, per-cycle normalization of a
//! chosen signal and, for segment analyses, planar angle and angular velocity.
//!
//! # Architecture
//!
//! 1. **Event Detection**: peaks or threshold crossings on the event marker
//! 2. **Cycle Segmentation**: consecutive event pairs above a minimum duration
//! 3. **Normalization**: each cycle resampled onto 0-100 %
//! 4. **Aggregation**: mean and population SD over accepted cycles
//!
//! Configuration problems fail before any numeric work. Everything after that
//! reports through [`AnalysisStatus`] and per-cycle rejections, so a caller can
//! show "no usable cycles" without handling an error.
//!
//! # Concurrency
//! The analyzer holds only its configuration. Trials can be analyzed from
//! several threads at once with one analyzer each or a shared reference.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cycle_segmentation::{CycleSegmenter, Segmentation, SegmentationConfig};
use crate::error::{check_frame_rate, check_seconds, GaitError, Result};
use crate::event_detection::{
    ContactDetector, ContactDetectorConfig, EventPolarity, PeakDetector, PeakDetectorConfig,
};
use crate::interpolation::InterpolationKind;
use crate::kinematics::{angular_velocity, detect_vertical_axis, segment_angle, PhaseUnwrap, Plane};
use crate::markers::MarkerSet;
use crate::normalization::{CycleAggregate, CycleNormalizer, NormalizationBatch, NormalizerConfig};
use crate::types::{AngleSeries, AngularVelocitySeries, Axis, Cycle};

/// How gait events are found on the event marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventMethod {
    /// Prominence and distance constrained extrema.
    Peaks,
    /// Threshold crossings below a low percentile.
    Contacts(ContactDetectorConfig),
}

/// Configuration for the complete gait analysis pipeline.
///
/// Every field can be bound to one control of a presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaitAnalysisConfig {
    /// Axis of the event marker to detect events on.
    /// `None` picks the axis with the largest range.
    pub event_axis: Option<Axis>,

    /// Whether events are minima or maxima of the raw trace.
    pub event_polarity: EventPolarity,

    /// Event detector to use.
    pub event_method: EventMethod,

    /// Minimum time between peak events in seconds.
    pub min_interval_seconds: f64,

    /// Minimum peak prominence in the trace's unit.
    pub prominence: f64,

    /// Shortest accepted cycle in seconds.
    pub min_cycle_seconds: f64,

    /// Samples per normalized cycle.
    pub resample_resolution: usize,

    /// Interpolation used for normalization.
    pub interpolation: InterpolationKind,

    /// Reject normalized cycles containing NaN or infinity.
    pub reject_nonfinite: bool,
}

impl Default for GaitAnalysisConfig {
    fn default() -> Self {
        Self {
            event_axis: Some(Axis::Z),
            event_polarity: EventPolarity::Minimum,
            event_method: EventMethod::Peaks,
            min_interval_seconds: 0.8,
            prominence: 1.0,
            min_cycle_seconds: 0.5,
            resample_resolution: 100,
            interpolation: InterpolationKind::Cubic,
            reject_nonfinite: true,
        }
    }
}

impl GaitAnalysisConfig {
    pub fn peak_config(&self) -> PeakDetectorConfig {
        PeakDetectorConfig {
            min_interval_seconds: self.min_interval_seconds,
            prominence: self.prominence,
            polarity: self.event_polarity,
        }
    }

    pub fn segmentation_config(&self) -> SegmentationConfig {
        SegmentationConfig {
            min_cycle_seconds: self.min_cycle_seconds,
        }
    }

    pub fn normalizer_config(&self) -> NormalizerConfig {
        NormalizerConfig {
            resolution: self.resample_resolution,
            interpolation: self.interpolation,
            reject_nonfinite: self.reject_nonfinite,
        }
    }

    /// Check every field before any numeric work.
    pub fn validate(&self) -> Result<()> {
        self.peak_config().validate()?;
        if let EventMethod::Contacts(contacts) = &self.event_method {
            contacts.validate()?;
        }
        check_seconds("min_cycle_seconds", self.min_cycle_seconds)?;
        self.normalizer_config().validate()
    }
}

/// Why an analysis produced fewer results than hoped for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// At least one cycle was normalized.
    Complete,
    /// Fewer than two events, so no cycle can be formed.
    InsufficientEvents { found: usize },
    /// Events were found but every pair was shorter than the minimum.
    NoValidCycles { candidates: usize },
    /// Cycles were found but every one was rejected during normalization.
    NoUsableCycles { rejected: usize },
}

impl AnalysisStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, AnalysisStatus::Complete)
    }
}

/// Events and cycles found on the event marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleDetection {
    pub event_marker: String,
    /// Axis the events were detected on, `None` if none could be chosen.
    pub event_axis: Option<Axis>,
    pub events: Vec<usize>,
    pub segmentation: Segmentation,
}

impl CycleDetection {
    pub fn cycles(&self) -> &[Cycle] {
        &self.segmentation.cycles
    }
}

/// Outcome of normalizing one signal over the detected cycles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleAnalysisReport {
    pub detection: CycleDetection,
    pub normalized: NormalizationBatch,
    pub aggregate: Option<CycleAggregate>,
    pub status: AnalysisStatus,
}

impl CycleAnalysisReport {
    /// Cycles that survived normalization.
    pub fn retained(&self) -> usize {
        self.normalized.retained()
    }

    /// Candidate cycles (consecutive event pairs) considered.
    pub fn total(&self) -> usize {
        self.detection.segmentation.candidates
    }

    /// Human-readable count, e.g. "12 of 15 cycles retained".
    pub fn summary(&self) -> String {
        format!(
            "{} of {} cycles retained ({} too short, {} rejected)",
            self.retained(),
            self.total(),
            self.detection.segmentation.discarded(),
            self.normalized.rejections.len()
        )
    }
}

/// Whether the kinematic series carry usable data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KinematicStatus {
    Complete,
    /// No frame with finite coordinates for both markers in the plane.
    NoFiniteFrames,
    /// Fewer than two frames, so no velocity.
    TooFewFrames,
}

/// Segment angle analysis of one marker pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentAngleReport {
    pub marker_a: String,
    pub marker_b: String,
    pub plane: Plane,
    /// Full-trial angle.
    pub angles: AngleSeries,
    /// Full-trial angular velocity, absent with fewer than two frames.
    pub velocities: Option<AngularVelocitySeries>,
    pub kinematic_status: KinematicStatus,
    /// Angle normalized per cycle.
    pub angle_cycles: CycleAnalysisReport,
    /// Angular velocity normalized per cycle.
    pub velocity_cycles: Option<NormalizationBatch>,
}

/// Runs the gait pipeline on marker sets.
#[derive(Debug, Clone)]
pub struct GaitCycleAnalyzer {
    config: GaitAnalysisConfig,
    segmenter: CycleSegmenter,
    normalizer: CycleNormalizer,
}

impl GaitCycleAnalyzer {
    /// Creates an analyzer, validating the configuration up front.
    pub fn new(config: GaitAnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            segmenter: CycleSegmenter::new(config.segmentation_config()),
            normalizer: CycleNormalizer::new(config.normalizer_config())?,
            config,
        })
    }

    pub fn config(&self) -> &GaitAnalysisConfig {
        &self.config
    }

    /// Detects events in a raw trace with the configured method.
    pub fn detect_events(&self, signal: &[f64], sample_rate: f64) -> Result<Vec<usize>> {
        match &self.config.event_method {
            EventMethod::Peaks => PeakDetector::new(self.config.peak_config()).detect(signal, sample_rate),
            EventMethod::Contacts(contacts) => {
                ContactDetector::new(contacts.clone()).detect(signal, sample_rate)
            }
        }
    }

    /// Detects events on `event_marker` and pairs them into cycles.
    pub fn detect_cycles(&self, markers: &MarkerSet, event_marker: &str) -> Result<CycleDetection> {
        let frame_rate = markers.frame_rate();
        check_frame_rate(frame_rate)?;

        let trajectory = markers.trajectory(event_marker)?;
        let event_axis = match self.config.event_axis {
            Some(axis) => Some(axis),
            None => detect_vertical_axis(&trajectory),
        };

        let events = match event_axis {
            Some(axis) => self.detect_events(&trajectory.axis(axis), frame_rate)?,
            None => Vec::new(),
        };
        let segmentation = self.segmenter.segment(&events, frame_rate)?;

        debug!(
            marker = event_marker,
            axis = ?event_axis,
            events = events.len(),
            cycles = segmentation.cycles.len(),
            "cycle detection"
        );

        Ok(CycleDetection {
            event_marker: event_marker.to_string(),
            event_axis,
            events,
            segmentation,
        })
    }

    /// Normalizes `signal` over the cycles found on `event_marker`.
    ///
    /// `signal` must be co-indexed with the trial's frames.
    pub fn analyze_signal(&self, markers: &MarkerSet, event_marker: &str, signal: &[f64]) -> Result<CycleAnalysisReport> {
        if signal.len() != markers.frame_count() {
            return Err(GaitError::SignalLengthMismatch {
                expected: markers.frame_count(),
                got: signal.len(),
            });
        }
        let detection = self.detect_cycles(markers, event_marker)?;
        Ok(self.normalize_detection(detection, signal))
    }

    /// Normalizes one coordinate of `marker` over the detected cycles.
    pub fn analyze_marker_axis(
        &self,
        markers: &MarkerSet,
        event_marker: &str,
        marker: &str,
        axis: Axis,
    ) -> Result<CycleAnalysisReport> {
        let signal = markers.axis_signal(marker, axis)?;
        self.analyze_signal(markers, event_marker, &signal)
    }

    /// Segment angle of `marker_a`→`marker_b`, full trial and per cycle.
    pub fn analyze_segment_angle(
        &self,
        markers: &MarkerSet,
        event_marker: &str,
        marker_a: &str,
        marker_b: &str,
        plane: Plane,
        unwrap: PhaseUnwrap,
    ) -> Result<SegmentAngleReport> {
        plane.validate()?;
        let a = markers.trajectory(marker_a)?;
        let b = markers.trajectory(marker_b)?;
        let angles = segment_angle(&a, &b, plane)?;

        let (velocities, kinematic_status) = if angles.len() < 2 {
            (None, KinematicStatus::TooFewFrames)
        } else {
            let velocities = angular_velocity(&angles, unwrap)?;
            let status = if angles.finite_count() == 0 {
                KinematicStatus::NoFiniteFrames
            } else {
                KinematicStatus::Complete
            };
            (Some(velocities), status)
        };

        let detection = self.detect_cycles(markers, event_marker)?;
        let velocity_cycles = velocities
            .as_ref()
            .map(|v| self.normalizer.normalize_all(&v.values, detection.cycles()));
        let angle_cycles = self.normalize_detection(detection, &angles.values);

        info!(
            marker_a,
            marker_b,
            status = ?kinematic_status,
            "segment angle analysis: {}",
            angle_cycles.summary()
        );

        Ok(SegmentAngleReport {
            marker_a: marker_a.to_string(),
            marker_b: marker_b.to_string(),
            plane,
            angles,
            velocities,
            kinematic_status,
            angle_cycles,
            velocity_cycles,
        })
    }

    /// Segment angle of `marker_a`→`marker_b` restricted to one cycle.
    pub fn cycle_angle(
        &self,
        markers: &MarkerSet,
        marker_a: &str,
        marker_b: &str,
        plane: Plane,
        cycle: Cycle,
    ) -> Result<AngleSeries> {
        let a = markers.trajectory(marker_a)?.slice(cycle);
        let b = markers.trajectory(marker_b)?.slice(cycle);
        segment_angle(&a, &b, plane)
    }

    fn normalize_detection(&self, detection: CycleDetection, signal: &[f64]) -> CycleAnalysisReport {
        let normalized = self.normalizer.normalize_all(signal, detection.cycles());
        let aggregate = normalized.aggregate();

        let status = if detection.events.len() < 2 {
            AnalysisStatus::InsufficientEvents {
                found: detection.events.len(),
            }
        } else if detection.cycles().is_empty() {
            AnalysisStatus::NoValidCycles {
                candidates: detection.segmentation.candidates,
            }
        } else if normalized.accepted.is_empty() {
            AnalysisStatus::NoUsableCycles {
                rejected: normalized.rejections.len(),
            }
        } else {
            AnalysisStatus::Complete
        };

        let report = CycleAnalysisReport {
            detection,
            normalized,
            aggregate,
            status,
        };
        info!(status = ?report.status, "{}", report.summary());
        report
    }
}
