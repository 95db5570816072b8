//! Planar segment kinematics.
//!
//! Computes the orientation of the segment from marker A to marker B projected
//! onto a plane of the lab frame, and the angular velocity of that orientation.
//!
//! The angle is `atan2(vertical, horizontal)` of the projected vector and lives
//! in (-π, π]. It is **not** unwrapped by default: when the segment crosses the
//! branch cut the angle jumps by 2π and the raw angular velocity shows a large
//! spike at that frame. Relative-phase work sometimes needs the unwrapped
//! angle instead, so unwrapping is available through [`PhaseUnwrap::Unwrapped`]
//! and has to be asked for explicitly.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{GaitError, Result};
use crate::types::{AngleSeries, AngularVelocitySeries, Axis, FrameTiming, Trajectory};

/// Projection plane given by two lab axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plane {
    /// Axis for the first atan2 component (x argument).
    pub horizontal: Axis,
    /// Axis for the second atan2 component (y argument).
    pub vertical: Axis,
}

impl Plane {
    /// Sagittal plane for a lab frame with X forward and Z up.
    pub const SAGITTAL: Plane = Plane {
        horizontal: Axis::X,
        vertical: Axis::Z,
    };

    /// Frontal plane for a lab frame with Y lateral and Z up.
    pub const FRONTAL: Plane = Plane {
        horizontal: Axis::Y,
        vertical: Axis::Z,
    };

    pub fn new(horizontal: Axis, vertical: Axis) -> Result<Self> {
        let plane = Self { horizontal, vertical };
        plane.validate()?;
        Ok(plane)
    }

    pub fn validate(&self) -> Result<()> {
        if self.horizontal == self.vertical {
            return Err(GaitError::DegeneratePlane(self.horizontal));
        }
        Ok(())
    }
}

impl Default for Plane {
    fn default() -> Self {
        Plane::SAGITTAL
    }
}

/// Whether to unwrap the angle before differentiating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PhaseUnwrap {
    /// Differentiate the wrapped angle as is.
    #[default]
    Raw,
    /// Remove 2π jumps first.
    Unwrapped,
}

fn check_alignment(a: &Trajectory, b: &Trajectory) -> Result<()> {
    if a.len() != b.len() {
        return Err(GaitError::MismatchedTrajectoryLength {
            left: a.len(),
            right: b.len(),
        });
    }
    if a.frame_rate != b.frame_rate || a.first_frame != b.first_frame {
        return Err(GaitError::MismatchedTiming {
            left_rate: a.frame_rate,
            left_first: a.first_frame,
            right_rate: b.frame_rate,
            right_first: b.first_frame,
        });
    }
    Ok(())
}

/// Orientation of the segment A→B in `plane`, one angle per frame.
///
/// Translating both trajectories by the same vector leaves the angle
/// unchanged. Swapping A and B reverses the vector, which moves the angle by π.
/// Frames where either marker is missing (NaN) give a NaN angle.
pub fn segment_angle(a: &Trajectory, b: &Trajectory, plane: Plane) -> Result<AngleSeries> {
    plane.validate()?;
    check_alignment(a, b)?;

    let (h, v) = (plane.horizontal.index(), plane.vertical.index());
    let values = a
        .points()
        .iter()
        .zip(b.points())
        .map(|(pa, pb)| half_open((pb[v] - pa[v]).atan2(pb[h] - pa[h])))
        .collect();

    Ok(AngleSeries::new(
        values,
        FrameTiming {
            frame_rate: a.frame_rate,
            first_frame: a.first_frame,
        },
    ))
}

/// `atan2` gives -π for a zero vertical component of negative sign;
/// fold it onto π so every angle lies in (-π, π].
fn half_open(angle: f64) -> f64 {
    if angle == -PI {
        PI
    } else {
        angle
    }
}

/// Time derivative of an angle series in rad/s.
pub fn angular_velocity(angles: &AngleSeries, unwrap: PhaseUnwrap) -> Result<AngularVelocitySeries> {
    let values = match unwrap {
        PhaseUnwrap::Raw => gradient(&angles.values, angles.timing.frame_rate)?,
        PhaseUnwrap::Unwrapped => gradient(&unwrap_phase(&angles.values), angles.timing.frame_rate)?,
    };
    Ok(AngularVelocitySeries {
        values,
        timing: angles.timing,
        unwrapped: unwrap == PhaseUnwrap::Unwrapped,
    })
}

/// Numerical derivative of uniformly sampled values.
///
/// Central differences inside, one-sided differences at both ends, scaled by
/// `sample_rate`. Needs at least two samples.
pub fn gradient(values: &[f64], sample_rate: f64) -> Result<Vec<f64>> {
    crate::error::check_frame_rate(sample_rate)?;
    let n = values.len();
    if n < 2 {
        return Err(GaitError::InsufficientSamples { needed: 2, got: n });
    }

    let mut out = Vec::with_capacity(n);
    out.push((values[1] - values[0]) * sample_rate);
    for i in 1..n - 1 {
        out.push((values[i + 1] - values[i - 1]) * sample_rate / 2.0);
    }
    out.push((values[n - 1] - values[n - 2]) * sample_rate);
    Ok(out)
}

/// Remove jumps larger than π between consecutive samples by adding
/// multiples of 2π. A non-finite sample keeps the running correction.
pub fn unwrap_phase(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut correction = 0.0;
    let mut previous: Option<f64> = None;

    for &v in values {
        if let (Some(p), true) = (previous, v.is_finite()) {
            let delta = v - p;
            let mut wrapped = (delta + PI).rem_euclid(2.0 * PI) - PI;
            if wrapped == -PI && delta > 0.0 {
                wrapped = PI;
            }
            if delta.abs() >= PI {
                correction += wrapped - delta;
            }
        }
        if v.is_finite() {
            previous = Some(v);
        }
        out.push(v + correction);
    }
    out
}

/// Guess the vertical axis of a trajectory: the axis with the largest
/// peak-to-peak range over the trial.
///
/// This is a heuristic. It holds for heel and toe markers during walking,
/// whose vertical excursion dominates once the walkway axis is short, but a
/// long walkway along X will win over Z. Ties go to the lower axis index.
/// `None` when the trajectory has no finite samples.
pub fn detect_vertical_axis(trajectory: &Trajectory) -> Option<Axis> {
    let mut best: Option<(Axis, f64)> = None;
    for (axis, range) in Axis::ALL.into_iter().zip(trajectory.ranges()) {
        if let Some(r) = range {
            match best {
                Some((_, current)) if current >= r => {}
                _ => best = Some((axis, r)),
            }
        }
    }
    best.map(|(axis, _)| axis)
}

// ============================================================================
// TESTS
// ============================================================================
