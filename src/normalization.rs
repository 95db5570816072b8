//! Cycle normalization onto a percent-of-cycle axis.
//!
//! Each cycle's slice of a signal is mapped onto `linspace(0, 100, len)` and
//! resampled at `linspace(0, 100, resolution)`, so cycles of different real
//! durations line up sample for sample and can be averaged.
//!
//! Failures are local to a cycle. A cycle that is too short for the chosen
//! interpolation or that the solver cannot fit is rejected with a
//! [`RejectionReason`] and the batch moves on. With `reject_nonfinite` set,
//! NaN or infinite samples in the input or the result also reject the cycle.
//! Without it, gaps flow through the interpolation and the cycle is kept
//! with NaN where the gap reached.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{GaitError, Result};
use crate::interpolation::{linspace, InterpolationError, InterpolationKind};
use crate::types::{Cycle, NormalizedCycle};

/// Smallest resolution accepted for the normalized axis.
pub const MIN_RESOLUTION: usize = 4;

/// Configuration for cycle normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Samples per normalized cycle.
    pub resolution: usize,
    /// Interpolation used to resample.
    pub interpolation: InterpolationKind,
    /// Reject cycles whose input or resampled values contain NaN or
    /// infinity. When off, such cycles are kept with their NaN samples.
    pub reject_nonfinite: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            resolution: 100,
            interpolation: InterpolationKind::Cubic,
            reject_nonfinite: true,
        }
    }
}

impl NormalizerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.resolution < MIN_RESOLUTION {
            return Err(GaitError::InvalidResolution {
                got: self.resolution,
                min: MIN_RESOLUTION,
            });
        }
        Ok(())
    }
}

/// Why a cycle was left out of the normalized set.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum RejectionReason {
    #[error("cycle ends at frame {end} but the signal has {len} samples")]
    OutOfBounds { end: usize, len: usize },

    #[error("segment has {len} samples, {needed} needed for {kind:?} interpolation")]
    TooShort {
        len: usize,
        needed: usize,
        kind: InterpolationKind,
    },

    #[error("signal is not finite at frame {frame}")]
    NonFiniteInput { frame: usize },

    #[error("interpolation failed: {0}")]
    Interpolation(#[serde(serialize_with = "serialize_display")] InterpolationError),

    #[error("normalized value at sample {index} is not finite")]
    NonFiniteOutput { index: usize },
}

fn serialize_display<S: serde::Serializer>(err: &InterpolationError, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.collect_str(err)
}

/// A rejected cycle and the reason it was rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleRejection {
    pub cycle: Cycle,
    pub reason: RejectionReason,
}

/// Outcome of normalizing a single cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizeOutcome {
    Accepted(NormalizedCycle),
    Rejected(RejectionReason),
}

impl NormalizeOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, NormalizeOutcome::Accepted(_))
    }
}

/// All cycles of one normalization run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizationBatch {
    pub resolution: usize,
    pub accepted: Vec<NormalizedCycle>,
    pub rejections: Vec<CycleRejection>,
}

impl NormalizationBatch {
    /// Cycles that made it through.
    pub fn retained(&self) -> usize {
        self.accepted.len()
    }

    /// Cycles submitted.
    pub fn total(&self) -> usize {
        self.accepted.len() + self.rejections.len()
    }

    /// Mean and spread of the accepted cycles.
    pub fn aggregate(&self) -> Option<CycleAggregate> {
        // Every accepted cycle has `resolution` samples by construction.
        CycleAggregate::from_cycles(&self.accepted).ok().flatten()
    }
}

/// Resamples cycles of a signal onto the percent-of-cycle axis.
#[derive(Debug, Clone)]
pub struct CycleNormalizer {
    config: NormalizerConfig,
    target_axis: Vec<f64>,
}

impl CycleNormalizer {
    /// Create a normalizer. Fails fast on a resolution below [`MIN_RESOLUTION`].
    pub fn new(config: NormalizerConfig) -> Result<Self> {
        config.validate()?;
        let target_axis = linspace(0.0, 100.0, config.resolution);
        Ok(Self { config, target_axis })
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// The 0-100 % axis every accepted cycle is sampled on.
    pub fn target_axis(&self) -> &[f64] {
        &self.target_axis
    }

    /// Normalize `signal[cycle.start..cycle.end]`.
    pub fn normalize(&self, signal: &[f64], cycle: Cycle) -> NormalizeOutcome {
        match self.try_normalize(signal, cycle) {
            Ok(values) => NormalizeOutcome::Accepted(NormalizedCycle::new(cycle, values)),
            Err(reason) => NormalizeOutcome::Rejected(reason),
        }
    }

    fn try_normalize(&self, signal: &[f64], cycle: Cycle) -> std::result::Result<Vec<f64>, RejectionReason> {
        if cycle.end > signal.len() || cycle.start > cycle.end {
            return Err(RejectionReason::OutOfBounds {
                end: cycle.end,
                len: signal.len(),
            });
        }

        let segment = &signal[cycle.start..cycle.end];
        let kind = self.config.interpolation;
        if segment.len() < kind.min_points() {
            return Err(RejectionReason::TooShort {
                len: segment.len(),
                needed: kind.min_points(),
                kind,
            });
        }
        let source_axis = linspace(0.0, 100.0, segment.len());
        let values = if self.config.reject_nonfinite {
            if let Some(offset) = segment.iter().position(|v| !v.is_finite()) {
                return Err(RejectionReason::NonFiniteInput {
                    frame: cycle.start + offset,
                });
            }
            kind.resample(&source_axis, segment, &self.target_axis)
        } else {
            kind.resample_propagating(&source_axis, segment, &self.target_axis)
        }
        .map_err(RejectionReason::Interpolation)?;

        if self.config.reject_nonfinite {
            if let Some(index) = values.iter().position(|v| !v.is_finite()) {
                return Err(RejectionReason::NonFiniteOutput { index });
            }
        }
        Ok(values)
    }

    /// Normalize every cycle, collecting rejections instead of failing.
    pub fn normalize_all(&self, signal: &[f64], cycles: &[Cycle]) -> NormalizationBatch {
        let mut batch = NormalizationBatch {
            resolution: self.config.resolution,
            ..Default::default()
        };

        for &cycle in cycles {
            match self.normalize(signal, cycle) {
                NormalizeOutcome::Accepted(normalized) => batch.accepted.push(normalized),
                NormalizeOutcome::Rejected(reason) => {
                    warn!(cycle = %cycle, %reason, "cycle rejected");
                    batch.rejections.push(CycleRejection { cycle, reason });
                }
            }
        }

        debug!(
            retained = batch.retained(),
            total = batch.total(),
            resolution = batch.resolution,
            "normalized cycles"
        );
        batch
    }
}

/// Normalize a single cycle with a one-off configuration.
pub fn normalize_cycle(signal: &[f64], cycle: Cycle, config: &NormalizerConfig) -> Result<NormalizeOutcome> {
    Ok(CycleNormalizer::new(config.clone())?.normalize(signal, cycle))
}

/// Normalize a list of cycles with a one-off configuration.
pub fn normalize_cycles(signal: &[f64], cycles: &[Cycle], config: &NormalizerConfig) -> Result<NormalizationBatch> {
    Ok(CycleNormalizer::new(config.clone())?.normalize_all(signal, cycles))
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Per-sample mean and population standard deviation across cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleAggregate {
    pub mean: Vec<f64>,
    pub std_dev: Vec<f64>,
    /// Number of cycles averaged.
    pub count: usize,
}

impl CycleAggregate {
    /// Aggregate `cycles`. `None` when there are none; an error when they
    /// were produced at different resolutions.
    pub fn from_cycles(cycles: &[NormalizedCycle]) -> Result<Option<Self>> {
        let Some(first) = cycles.first() else {
            return Ok(None);
        };
        let width = first.values.len();
        if let Some(odd) = cycles.iter().find(|c| c.values.len() != width) {
            return Err(GaitError::ResolutionMismatch {
                expected: width,
                got: odd.values.len(),
            });
        }

        let count = cycles.len() as f64;
        let mut mean = vec![0.0; width];
        for c in cycles {
            for (m, v) in mean.iter_mut().zip(&c.values) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= count);

        let mut variance = vec![0.0; width];
        for c in cycles {
            for ((acc, v), m) in variance.iter_mut().zip(&c.values).zip(&mean) {
                *acc += (v - m) * (v - m);
            }
        }
        let std_dev = variance.into_iter().map(|s| (s / count).sqrt()).collect();

        Ok(Some(Self {
            mean,
            std_dev,
            count: cycles.len(),
        }))
    }

    /// Mean minus and plus one standard deviation.
    pub fn band(&self) -> (Vec<f64>, Vec<f64>) {
        let lower = self.mean.iter().zip(&self.std_dev).map(|(m, s)| m - s).collect();
        let upper = self.mean.iter().zip(&self.std_dev).map(|(m, s)| m + s).collect();
        (lower, upper)
    }
}

/// Aggregate normalized cycles, see [`CycleAggregate::from_cycles`].
pub fn aggregate(cycles: &[NormalizedCycle]) -> Result<Option<CycleAggregate>> {
    CycleAggregate::from_cycles(cycles)
}

// ============================================================================
// TESTS
// ============================================================================
