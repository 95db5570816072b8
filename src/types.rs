//! Core data types for the gait phase engine.
//!
//! This module defines the values that flow between the pipeline stages:
//! trajectories extracted from a marker set, cycles cut from detected events,
//! normalized cycles, and the angle series produced by the kinematic engine.
//!
//! Design principle: if a concept exists, it gets a type. Cycles are not
//! `(usize, usize)` tuples and angle series carry their own timing so the time
//! axis can always be reconstructed.
//!
//! All values use f64. Marker coordinates arrive in millimetres and angular
//! velocity is computed from differences of neighbouring frames, so the extra
//! precision is worth the memory.

use serde::{Deserialize, Serialize};

/// A single 3-D marker position `[x, y, z]`.
pub type Point3 = [f64; 3];

/// A coordinate axis of the motion-capture reference frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All axes in index order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Column index of this axis in a [`Point3`].
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Axis for a column index, if it is one of 0, 1, 2.
    pub fn from_index(index: usize) -> Option<Self> {
        Axis::ALL.get(index).copied()
    }
}

/// A single marker's positions over a trial.
///
/// Extracted on demand from a [`MarkerSet`](crate::markers::MarkerSet) and
/// owned by whoever asked for it. Carries the frame rate and first-frame offset
/// of the trial so two trajectories can be checked for time alignment before
/// they are combined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// Marker label this trajectory belongs to.
    pub label: String,
    /// One position per frame.
    points: Vec<Point3>,
    /// Frames per second.
    pub frame_rate: f64,
    /// Index of the first frame in the original recording.
    pub first_frame: i64,
}

impl Trajectory {
    /// Create a trajectory from its points and timing.
    pub fn new(label: impl Into<String>, points: Vec<Point3>, frame_rate: f64, first_frame: i64) -> Self {
        Self {
            label: label.into(),
            points,
            frame_rate,
            first_frame,
        }
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Positions, one per frame.
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// Extract one coordinate as a scalar signal.
    pub fn axis(&self, axis: Axis) -> Vec<f64> {
        let i = axis.index();
        self.points.iter().map(|p| p[i]).collect()
    }

    /// Sub-trajectory covering `cycle.start..cycle.end`, clamped to the
    /// available frames. The first-frame offset is shifted so absolute times
    /// stay correct.
    pub fn slice(&self, cycle: Cycle) -> Trajectory {
        let end = cycle.end.min(self.points.len());
        let start = cycle.start.min(end);
        Trajectory {
            label: self.label.clone(),
            points: self.points[start..end].to_vec(),
            frame_rate: self.frame_rate,
            first_frame: self.first_frame + start as i64,
        }
    }

    /// Peak-to-peak range of each axis over finite samples.
    /// `None` for an axis without a single finite sample.
    pub fn ranges(&self) -> [Option<f64>; 3] {
        let mut out = [None; 3];
        for axis in Axis::ALL {
            let i = axis.index();
            let mut lo = f64::INFINITY;
            let mut hi = f64::NEG_INFINITY;
            for p in &self.points {
                let v = p[i];
                if v.is_finite() {
                    lo = lo.min(v);
                    hi = hi.max(v);
                }
            }
            if lo.is_finite() && hi.is_finite() {
                out[i] = Some(hi - lo);
            }
        }
        out
    }
}

/// One gait cycle: frames `start..end` of the trial.
///
/// Canonical cycles are built from consecutive events, so neighbours share an
/// endpoint (`a.end == b.start`) but never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cycle {
    /// First frame of the cycle (inclusive).
    pub start: usize,
    /// Closing event frame (exclusive when slicing a signal).
    pub end: usize,
}

impl Cycle {
    /// Create a cycle. Callers are expected to pass `start < end`.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Duration in frames.
    pub fn frames(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Duration in seconds at the given frame rate.
    pub fn duration_s(&self, frame_rate: f64) -> f64 {
        self.frames() as f64 / frame_rate
    }
}

impl std::fmt::Display for Cycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// A cycle's signal resampled onto the 0-100 % axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedCycle {
    /// Source cycle.
    pub cycle: Cycle,
    /// Exactly `resolution` samples.
    pub values: Vec<f64>,
}

impl NormalizedCycle {
    pub fn new(cycle: Cycle, values: Vec<f64>) -> Self {
        Self { cycle, values }
    }

    /// Number of samples (the resolution it was produced at).
    pub fn resolution(&self) -> usize {
        self.values.len()
    }

    /// The percent-of-cycle axis matching `values`.
    pub fn percent_axis(&self) -> Vec<f64> {
        crate::interpolation::linspace(0.0, 100.0, self.values.len())
    }
}

/// Timing shared by frame-indexed series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameTiming {
    /// Frames per second.
    pub frame_rate: f64,
    /// Index of the first frame in the original recording.
    pub first_frame: i64,
}

impl FrameTiming {
    /// Time of each of `len` frames: `frame / frame_rate`, shifted by
    /// `first_frame / frame_rate` when `absolute` is set.
    pub fn time_axis(&self, len: usize, absolute: bool) -> Vec<f64> {
        let offset = if absolute {
            self.first_frame as f64 / self.frame_rate
        } else {
            0.0
        };
        (0..len).map(|i| i as f64 / self.frame_rate + offset).collect()
    }
}

/// Planar segment angle per frame, in radians within (-π, π].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleSeries {
    pub values: Vec<f64>,
    pub timing: FrameTiming,
}

impl AngleSeries {
    pub fn new(values: Vec<f64>, timing: FrameTiming) -> Self {
        Self { values, timing }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn time_axis(&self, absolute: bool) -> Vec<f64> {
        self.timing.time_axis(self.values.len(), absolute)
    }

    /// Count of frames with a finite angle.
    pub fn finite_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_finite()).count()
    }
}

/// Angular velocity per frame, in radians per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngularVelocitySeries {
    pub values: Vec<f64>,
    pub timing: FrameTiming,
    /// Whether the angle was unwrapped before differentiation.
    pub unwrapped: bool,
}

impl AngularVelocitySeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn time_axis(&self, absolute: bool) -> Vec<f64> {
        self.timing.time_axis(self.values.len(), absolute)
    }
}

// ============================================================================
// TESTS
// ============================================================================
