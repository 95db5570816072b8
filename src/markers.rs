//! Marker set storage and trajectory access.
//!
//! A [`MarkerSet`] wraps what a motion-capture reader hands over: an ordered
//! label list, per-marker positions for every frame, the frame rate and the
//! first-frame offset. The label index is built once at construction so every
//! lookup is O(1). When a label appears more than once the first occurrence
//! wins, which is what index-based lookups on the reader's label list do.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{check_frame_rate, GaitError, Result};
use crate::types::{Axis, FrameTiming, Point3, Trajectory};

/// In-memory trial as a reader would deliver it.
///
/// Serde-friendly so a trial can be dumped to and loaded from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialData {
    pub labels: Vec<String>,
    pub frame_rate: f64,
    #[serde(default)]
    pub first_frame: i64,
    /// One track per label, one point per frame.
    pub positions: Vec<Vec<Point3>>,
}

/// All markers of one trial with a label index.
#[derive(Debug, Clone)]
pub struct MarkerSet {
    labels: Vec<String>,
    index: HashMap<String, usize>,
    positions: Vec<Vec<Point3>>,
    frame_count: usize,
    timing: FrameTiming,
}

impl MarkerSet {
    /// Build a marker set from one position track per label.
    ///
    /// Fails when the frame rate is not positive, when label and track counts
    /// differ, or when the tracks disagree on frame count.
    pub fn new(
        labels: Vec<String>,
        positions: Vec<Vec<Point3>>,
        frame_rate: f64,
        first_frame: i64,
    ) -> Result<Self> {
        check_frame_rate(frame_rate)?;

        if labels.len() != positions.len() {
            return Err(GaitError::MarkerCountMismatch {
                labels: labels.len(),
                markers: positions.len(),
            });
        }

        let frame_count = positions.first().map_or(0, Vec::len);
        for (label, track) in labels.iter().zip(&positions) {
            if track.len() != frame_count {
                return Err(GaitError::InconsistentFrameCount {
                    label: label.clone(),
                    expected: frame_count,
                    got: track.len(),
                });
            }
        }

        let mut index = HashMap::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            index.entry(label.clone()).or_insert(i);
        }

        Ok(Self {
            labels,
            index,
            positions,
            frame_count,
            timing: FrameTiming {
                frame_rate,
                first_frame,
            },
        })
    }

    /// Build a marker set from a flat channel x marker x frame array.
    ///
    /// `data[(c * markers + m) * n_frames + f]` holds channel `c` of marker
    /// `m` at frame `f`. With four channels the last one (the reader's
    /// residual) is ignored.
    pub fn from_channel_array(
        labels: Vec<String>,
        channels: usize,
        n_frames: usize,
        data: &[f64],
        frame_rate: f64,
        first_frame: i64,
    ) -> Result<Self> {
        if channels != 3 && channels != 4 {
            return Err(GaitError::UnsupportedChannelCount(channels));
        }
        let markers = labels.len();
        let expected = channels * markers * n_frames;
        if data.len() != expected {
            return Err(GaitError::ChannelArrayLength {
                expected,
                got: data.len(),
            });
        }

        let at = |c: usize, m: usize, f: usize| data[(c * markers + m) * n_frames + f];
        let positions = (0..markers)
            .map(|m| {
                (0..n_frames)
                    .map(|f| [at(0, m, f), at(1, m, f), at(2, m, f)])
                    .collect()
            })
            .collect();

        Self::new(labels, positions, frame_rate, first_frame)
    }

    /// Build a marker set from a deserialized trial.
    pub fn from_trial(trial: TrialData) -> Result<Self> {
        Self::new(trial.labels, trial.positions, trial.frame_rate, trial.first_frame)
    }

    /// Marker labels in reader order (duplicates included).
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    pub fn marker_count(&self) -> usize {
        self.labels.len()
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn frame_rate(&self) -> f64 {
        self.timing.frame_rate
    }

    pub fn first_frame(&self) -> i64 {
        self.timing.first_frame
    }

    pub fn timing(&self) -> FrameTiming {
        self.timing
    }

    /// Time of every frame in seconds, see [`FrameTiming::time_axis`].
    pub fn time_axis(&self, absolute: bool) -> Vec<f64> {
        self.timing.time_axis(self.frame_count, absolute)
    }

    fn track(&self, label: &str) -> Result<&[Point3]> {
        self.index
            .get(label)
            .map(|&i| self.positions[i].as_slice())
            .ok_or_else(|| GaitError::UnknownMarker(label.to_string()))
    }

    /// Copy out one marker's trajectory.
    pub fn trajectory(&self, label: &str) -> Result<Trajectory> {
        let track = self.track(label)?;
        Ok(Trajectory::new(
            label,
            track.to_vec(),
            self.timing.frame_rate,
            self.timing.first_frame,
        ))
    }

    /// One coordinate of one marker as a scalar signal.
    pub fn axis_signal(&self, label: &str, axis: Axis) -> Result<Vec<f64>> {
        let i = axis.index();
        Ok(self.track(label)?.iter().map(|p| p[i]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn two_marker_set() -> MarkerSet {
        let heel = (0..5).map(|i| [i as f64, 0.0, 10.0 - i as f64]).collect();
        let hip = (0..5).map(|i| [i as f64, 1.0, 900.0]).collect();
        MarkerSet::new(labels(&["RHEE", "RASI"]), vec![heel, hip], 100.0, 12).unwrap()
    }

    #[test]
    fn test_lookup_by_label() {
        let set = two_marker_set();
        assert_eq!(set.frame_count(), 5);
        assert_eq!(set.marker_count(), 2);
        let hip = set.trajectory("RASI").unwrap();
        assert_eq!(hip.points()[2], [2.0, 1.0, 900.0]);
        assert_eq!(hip.first_frame, 12);
        assert_eq!(set.axis_signal("RHEE", Axis::Z).unwrap(), vec![10.0, 9.0, 8.0, 7.0, 6.0]);
    }

    #[test]
    fn test_unknown_marker() {
        let set = two_marker_set();
        match set.trajectory("LTOE") {
            Err(GaitError::UnknownMarker(label)) => assert_eq!(label, "LTOE"),
            other => panic!("expected UnknownMarker, got {:?}", other),
        }
        assert!(!set.contains("LTOE"));
    }

    #[test]
    fn test_duplicate_labels_resolve_to_first() {
        let first = vec![[1.0, 1.0, 1.0]; 3];
        let second = vec![[2.0, 2.0, 2.0]; 3];
        let set = MarkerSet::new(labels(&["TOE", "TOE"]), vec![first, second], 50.0, 0).unwrap();
        assert_eq!(set.trajectory("TOE").unwrap().points()[0], [1.0, 1.0, 1.0]);
        assert_eq!(set.labels().len(), 2);
    }

    #[test]
    fn test_invalid_frame_rate() {
        let result = MarkerSet::new(labels(&["A"]), vec![vec![[0.0; 3]; 2]], 0.0, 0);
        assert!(matches!(result, Err(GaitError::InvalidFrameRate(_))));
    }

    #[test]
    fn test_inconsistent_frame_counts() {
        let result = MarkerSet::new(
            labels(&["A", "B"]),
            vec![vec![[0.0; 3]; 4], vec![[0.0; 3]; 3]],
            100.0,
            0,
        );
        assert!(matches!(
            result,
            Err(GaitError::InconsistentFrameCount { expected: 4, got: 3, .. })
        ));
    }

    #[test]
    fn test_marker_count_mismatch() {
        let result = MarkerSet::new(labels(&["A", "B"]), vec![vec![[0.0; 3]; 4]], 100.0, 0);
        assert!(matches!(result, Err(GaitError::MarkerCountMismatch { .. })));
    }

    #[test]
    fn test_channel_array_ignores_residual() {
        // 4 channels, 2 markers, 2 frames
        let n_frames = 2;
        let markers = 2;
        let mut data = vec![0.0; 4 * markers * n_frames];
        for c in 0..4 {
            for m in 0..markers {
                for f in 0..n_frames {
                    data[(c * markers + m) * n_frames + f] = (c * 100 + m * 10 + f) as f64;
                }
            }
        }
        let set = MarkerSet::from_channel_array(labels(&["A", "B"]), 4, n_frames, &data, 100.0, 0).unwrap();
        let b = set.trajectory("B").unwrap();
        assert_eq!(b.points()[1], [11.0, 111.0, 211.0]);
    }

    #[test]
    fn test_channel_array_validation() {
        let err = MarkerSet::from_channel_array(labels(&["A"]), 2, 1, &[0.0, 0.0], 100.0, 0);
        assert!(matches!(err, Err(GaitError::UnsupportedChannelCount(2))));

        let err = MarkerSet::from_channel_array(labels(&["A"]), 3, 2, &[0.0; 5], 100.0, 0);
        assert!(matches!(err, Err(GaitError::ChannelArrayLength { expected: 6, got: 5 })));
    }

    #[test]
    fn test_trial_json_roundtrip_builds_set() {
        let json = r#"{"labels":["A"],"frame_rate":200.0,"positions":[[[0,0,0],[1,2,3]]]}"#;
        let trial: TrialData = serde_json::from_str(json).unwrap();
        let set = MarkerSet::from_trial(trial).unwrap();
        assert_eq!(set.first_frame(), 0);
        assert_eq!(set.time_axis(false), vec![0.0, 0.005]);
    }
}
