//! Gait cycle segmentation.
//!
//! Turns an event list into cycles by pairing each event with the next one.
//! Pairs shorter than the configured minimum duration are dropped, so a
//! spurious event in the middle of a stride removes the two broken halves
//! instead of producing two short cycles.
//!
//! Events are sorted and de-duplicated before pairing. Detectors already emit
//! them in order, but hand-edited or merged event lists do not have to be.

use serde::{Deserialize, Serialize};

use crate::error::{check_frame_rate, check_seconds, Result};
use crate::types::Cycle;

/// Configuration for cycle segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Shortest accepted cycle in seconds.
    pub min_cycle_seconds: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            min_cycle_seconds: 0.5,
        }
    }
}

/// Result of segmenting one event list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segmentation {
    /// Retained cycles in chronological order.
    pub cycles: Vec<Cycle>,
    /// Number of consecutive event pairs considered.
    pub candidates: usize,
    /// Minimum duration that was applied, in frames.
    pub min_frames: usize,
}

impl Segmentation {
    /// Candidate pairs that failed the duration check.
    pub fn discarded(&self) -> usize {
        self.candidates - self.cycles.len()
    }
}

/// Pairs consecutive events into cycles.
#[derive(Debug, Clone, Default)]
pub struct CycleSegmenter {
    config: SegmentationConfig,
}

impl CycleSegmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        Self { config }
    }

    /// Minimum cycle length in frames at `sample_rate`.
    pub fn min_frames(&self, sample_rate: f64) -> usize {
        (self.config.min_cycle_seconds * sample_rate).floor() as usize
    }

    /// Segment `events` into cycles.
    ///
    /// Never fails on the events themselves: fewer than two events simply
    /// yield no cycles. Errors only for an invalid sample rate or duration.
    pub fn segment(&self, events: &[usize], sample_rate: f64) -> Result<Segmentation> {
        check_frame_rate(sample_rate)?;
        check_seconds("min_cycle_seconds", self.config.min_cycle_seconds)?;

        let min_frames = self.min_frames(sample_rate);

        let mut sorted = events.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let candidates = sorted.len().saturating_sub(1);
        let cycles = sorted
            .windows(2)
            .filter(|pair| pair[1] - pair[0] >= min_frames)
            .map(|pair| Cycle::new(pair[0], pair[1]))
            .collect();

        Ok(Segmentation {
            cycles,
            candidates,
            min_frames,
        })
    }
}

/// Segment `events` with a one-off minimum duration.
pub fn segment_cycles(events: &[usize], min_cycle_seconds: f64, sample_rate: f64) -> Result<Vec<Cycle>> {
    CycleSegmenter::new(SegmentationConfig { min_cycle_seconds })
        .segment(events, sample_rate)
        .map(|s| s.cycles)
}

// ============================================================================
// TESTS
// ============================================================================
