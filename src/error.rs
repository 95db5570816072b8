//! Error types for the gait phase engine.
//!
//! Only configuration problems are errors. Per-cycle numerical failures are
//! recorded as [`RejectionReason`](crate::normalization::RejectionReason)
//! diagnostics and insufficient-data conditions are reported through status
//! values, so a whole-trial analysis never aborts because one cycle is bad.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GaitError>;

#[derive(Error, Debug)]
pub enum GaitError {
    #[error("unknown marker label: {0}")]
    UnknownMarker(String),

    #[error("trajectory lengths differ: {left} frames vs {right} frames")]
    MismatchedTrajectoryLength { left: usize, right: usize },

    #[error("trajectory timing differs: {left_rate} Hz from frame {left_first} vs {right_rate} Hz from frame {right_first}")]
    MismatchedTiming {
        left_rate: f64,
        left_first: i64,
        right_rate: f64,
        right_first: i64,
    },

    #[error("frame rate must be positive and finite, got {0}")]
    InvalidFrameRate(f64),

    #[error("resample resolution must be at least {min}, got {got}")]
    InvalidResolution { got: usize, min: usize },

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("{labels} marker labels but {markers} position tracks")]
    MarkerCountMismatch { labels: usize, markers: usize },

    #[error("marker `{label}` has {got} frames, expected {expected}")]
    InconsistentFrameCount {
        label: String,
        expected: usize,
        got: usize,
    },

    #[error("unsupported channel count {0}, expected 3 or 4")]
    UnsupportedChannelCount(usize),

    #[error("channel array holds {got} values, expected {expected}")]
    ChannelArrayLength { expected: usize, got: usize },

    #[error("plane axes must differ, both are {0:?}")]
    DegeneratePlane(crate::types::Axis),

    #[error("signal has {got} samples but the trial has {expected} frames")]
    SignalLengthMismatch { expected: usize, got: usize },

    #[error("normalized cycles disagree on resolution: {expected} vs {got}")]
    ResolutionMismatch { expected: usize, got: usize },

    #[error("need at least {needed} samples, got {got}")]
    InsufficientSamples { needed: usize, got: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GaitError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        GaitError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Rejects a non-positive or non-finite frame rate.
pub(crate) fn check_frame_rate(frame_rate: f64) -> Result<()> {
    if frame_rate.is_finite() && frame_rate > 0.0 {
        Ok(())
    } else {
        Err(GaitError::InvalidFrameRate(frame_rate))
    }
}

/// Rejects a negative or non-finite duration in seconds.
pub(crate) fn check_seconds(name: &'static str, seconds: f64) -> Result<()> {
    if seconds.is_finite() && seconds >= 0.0 {
        Ok(())
    } else {
        Err(GaitError::invalid(
            name,
            format!("must be a finite, non-negative number of seconds, got {seconds}"),
        ))
    }
}
