//! Gait Event Detection Module.
//!
//! Locates repeating gait events (heel contacts, toe-offs) in a 1-D signal
//! derived from a marker trajectory. Two detectors are provided and they are
//! deliberately kept separate:
//!
//! - [`PeakDetector`]: prominence and distance constrained peak picking on a
//!   polarity-adjusted signal. Heel contact is a minimum of heel height, so the
//!   default polarity inverts the signal first.
//! - [`ContactDetector`]: threshold crossings below a low percentile of the
//!   signal, with nearby crossings merged. Suited to ground-contact detection
//!   on noisy vertical traces.
//!
//! Neither detector treats "not enough events" as an error. A short or empty
//! event list is returned and the caller decides what that means.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{check_frame_rate, check_seconds, GaitError, Result};

/// Which extremum of the raw signal marks an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPolarity {
    /// Events are minima of the raw signal (e.g. heel height at contact).
    Minimum,
    /// Events are maxima of the raw signal.
    Maximum,
}

impl EventPolarity {
    fn apply(self, value: f64) -> f64 {
        match self {
            EventPolarity::Minimum => -value,
            EventPolarity::Maximum => value,
        }
    }
}

/// Configuration for peak-based event detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakDetectorConfig {
    /// Minimum time between accepted events in seconds.
    /// 0.8 s spaces full gait cycles, 0.5 s suits single contact events.
    pub min_interval_seconds: f64,
    /// Minimum prominence in the signal's native unit (mm for marker data).
    pub prominence: f64,
    /// Which extremum of the raw signal is the event.
    pub polarity: EventPolarity,
}

impl Default for PeakDetectorConfig {
    fn default() -> Self {
        Self {
            min_interval_seconds: 0.8, // One full stride at normal cadence
            prominence: 1.0,           // Rejects sub-millimetre jitter
            polarity: EventPolarity::Minimum,
        }
    }
}

impl PeakDetectorConfig {
    pub fn validate(&self) -> Result<()> {
        check_seconds("min_interval_seconds", self.min_interval_seconds)?;
        if !(self.prominence.is_finite() && self.prominence >= 0.0) {
            return Err(GaitError::invalid(
                "prominence",
                format!("must be finite and non-negative, got {}", self.prominence),
            ));
        }
        Ok(())
    }
}

/// Peak picker with minimum distance and minimum prominence.
///
/// Candidate peaks are visited from highest to lowest and every kept peak
/// suppresses the candidates closer than the minimum distance. Equal heights
/// are visited in ascending frame order, so the earlier peak wins a tie.
/// Prominence is then measured on the whole signal and weak peaks dropped.
#[derive(Debug, Clone, Default)]
pub struct PeakDetector {
    config: PeakDetectorConfig,
}

impl PeakDetector {
    pub fn new(config: PeakDetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PeakDetectorConfig {
        &self.config
    }

    /// Minimum distance in samples between accepted peaks, never below 1.
    pub fn min_distance(&self, sample_rate: f64) -> usize {
        ((sample_rate * self.config.min_interval_seconds).floor() as usize).max(1)
    }

    /// Detect events in `signal`, returning ascending frame indices.
    pub fn detect(&self, signal: &[f64], sample_rate: f64) -> Result<Vec<usize>> {
        check_frame_rate(sample_rate)?;
        self.config.validate()?;

        let adjusted: Vec<f64> = signal.iter().map(|&v| self.config.polarity.apply(v)).collect();
        let candidates = local_maxima(&adjusted);
        let distance = self.min_distance(sample_rate);
        let spaced = select_by_distance(&adjusted, &candidates, distance);

        let events: Vec<usize> = spaced
            .into_iter()
            .filter(|&p| prominence(&adjusted, p) >= self.config.prominence)
            .collect();

        debug!(
            candidates = candidates.len(),
            events = events.len(),
            distance,
            "peak event detection"
        );
        Ok(events)
    }
}

/// Configuration for threshold-crossing contact detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactDetectorConfig {
    /// Threshold percentile of the signal, in [0, 100].
    pub percentile: f64,
    /// Below-threshold runs closer than this are merged into one contact.
    pub min_gap_seconds: f64,
}

impl Default for ContactDetectorConfig {
    fn default() -> Self {
        Self {
            percentile: 5.0,
            min_gap_seconds: 0.5,
        }
    }
}

impl ContactDetectorConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.percentile) {
            return Err(GaitError::invalid(
                "percentile",
                format!("must lie in [0, 100], got {}", self.percentile),
            ));
        }
        check_seconds("min_gap_seconds", self.min_gap_seconds)
    }
}

/// Detects the frames where a signal drops below a low percentile.
#[derive(Debug, Clone, Default)]
pub struct ContactDetector {
    config: ContactDetectorConfig,
}

impl ContactDetector {
    pub fn new(config: ContactDetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ContactDetectorConfig {
        &self.config
    }

    /// Detect contact onsets in `signal`, returning ascending frame indices.
    ///
    /// An onset is a frame `i` with `signal[i - 1] >= threshold` and
    /// `signal[i] < threshold`. Below-threshold runs separated by less than
    /// the minimum gap form one contact, so an onset that follows the end of
    /// the previous run within the gap is dropped.
    pub fn detect(&self, signal: &[f64], sample_rate: f64) -> Result<Vec<usize>> {
        check_frame_rate(sample_rate)?;
        self.config.validate()?;

        let Some(threshold) = percentile(signal, self.config.percentile) else {
            return Ok(Vec::new());
        };
        let min_gap = (self.config.min_gap_seconds * sample_rate).floor() as usize;

        let mut onsets: Vec<usize> = Vec::new();
        // Last below-threshold frame of the previous run.
        let mut last_below: Option<usize> = None;
        for i in 0..signal.len() {
            let below = signal[i] < threshold;
            if !below {
                continue;
            }
            let onset = i > 0 && signal[i - 1] >= threshold;
            if onset {
                match last_below {
                    Some(prev) if i - prev < min_gap => {}
                    _ => onsets.push(i),
                }
            }
            last_below = Some(i);
        }

        debug!(threshold, onsets = onsets.len(), min_gap, "contact detection");
        Ok(onsets)
    }
}

/// Peak events with a one-off configuration.
pub fn detect_events(signal: &[f64], sample_rate: f64, config: &PeakDetectorConfig) -> Result<Vec<usize>> {
    PeakDetector::new(config.clone()).detect(signal, sample_rate)
}

/// Contact onsets with a one-off configuration.
pub fn detect_contacts(signal: &[f64], sample_rate: f64, config: &ContactDetectorConfig) -> Result<Vec<usize>> {
    ContactDetector::new(config.clone()).detect(signal, sample_rate)
}

// ============================================================================
// PEAK PICKING PRIMITIVES
// ============================================================================

/// Indices of strict local maxima. A flat-topped peak is reported at the
/// middle of its plateau (rounded down). Endpoints never qualify.
pub fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if x.len() < 3 {
        return peaks;
    }
    let last = x.len() - 1;
    let mut i = 1;
    while i < last {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < last && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    peaks
}

/// Keep the highest peaks that are at least `distance` samples apart.
fn select_by_distance(x: &[f64], peaks: &[usize], distance: usize) -> Vec<usize> {
    if distance <= 1 || peaks.len() < 2 {
        return peaks.to_vec();
    }

    let mut order: Vec<usize> = (0..peaks.len()).collect();
    // Stable sort on descending height keeps ascending index order for ties.
    order.sort_by(|&a, &b| x[peaks[b]].total_cmp(&x[peaks[a]]));

    let mut keep = vec![true; peaks.len()];
    for &j in &order {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }
        let mut k = j + 1;
        while k < peaks.len() && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, kept)| kept.then_some(p))
        .collect()
}

/// Height of the peak at `peak` above the higher of its two flanking minima.
///
/// Each flank extends from the peak until a strictly higher sample or the
/// signal boundary.
pub fn prominence(x: &[f64], peak: usize) -> f64 {
    let height = x[peak];

    let mut left_min = height;
    for &v in x[..peak].iter().rev() {
        if v > height {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = height;
    for &v in &x[peak + 1..] {
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }

    height - left_min.max(right_min)
}

/// Linear-interpolated percentile of the finite values of `values`.
/// `None` when there are no finite values.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let pos = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn heel_height(period_frames: usize, frames: usize, amplitude: f64) -> Vec<f64> {
        (0..frames)
            .map(|i| -amplitude * (2.0 * PI * i as f64 / period_frames as f64).cos())
            .collect()
    }

    #[test]
    fn test_local_maxima_plateau_and_edges() {
        let x = [3.0, 1.0, 2.0, 2.0, 2.0, 1.0, 0.0, 4.0];
        // Index 0 and 7 are endpoints; plateau 2..=4 reports its middle.
        assert_eq!(local_maxima(&x), vec![3]);

        let even_plateau = [0.0, 1.0, 1.0, 0.0];
        assert_eq!(local_maxima(&even_plateau), vec![1]);
    }

    #[test]
    fn test_local_maxima_ignores_nan() {
        let x = [0.0, f64::NAN, 0.0, 1.0, 0.0];
        assert_eq!(local_maxima(&x), vec![3]);
    }

    #[test]
    fn test_prominence_uses_higher_flank() {
        let x = [0.0, 5.0, 2.0, 3.0, 1.0, 6.0, 0.0];
        // Peak at 3 (height 3): left flank stops at 5 with min 2,
        // right flank stops at 6 with min 1 -> 3 - max(2, 1) = 1.
        assert!((prominence(&x, 3) - 1.0).abs() < 1e-12);
        // Highest peak: both flanks reach the boundary minima (0 and 0).
        assert!((prominence(&x, 5) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_distance_keeps_larger_peak() {
        let x = [0.0, 2.0, 0.0, 3.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let peaks = local_maxima(&x);
        assert_eq!(peaks, vec![1, 3, 8]);
        assert_eq!(select_by_distance(&x, &peaks, 4), vec![3, 8]);
    }

    #[test]
    fn test_distance_tie_prefers_earlier_peak() {
        let x = [0.0, 2.0, 0.0, 2.0, 0.0];
        let peaks = local_maxima(&x);
        assert_eq!(select_by_distance(&x, &peaks, 3), vec![1]);
    }

    #[test]
    fn test_detector_recovers_period() {
        let signal = heel_height(100, 1000, 20.0);
        let detector = PeakDetector::default();
        let events = detector.detect(&signal, 100.0).unwrap();

        assert_eq!(events.len(), 9, "events: {:?}", events);
        for pair in events.windows(2) {
            let spacing = pair[1] as i64 - pair[0] as i64;
            assert!((spacing - 100).abs() <= 1, "spacing {}", spacing);
        }
    }

    #[test]
    fn test_prominence_rejects_noise() {
        // 0.2 mm ripple on a flat trace
        let signal: Vec<f64> = (0..500).map(|i| 0.2 * (i as f64 * 0.3).sin()).collect();
        let events = PeakDetector::default().detect(&signal, 100.0).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_maximum_polarity() {
        let signal = heel_height(50, 400, 5.0);
        let config = PeakDetectorConfig {
            min_interval_seconds: 0.3,
            polarity: EventPolarity::Maximum,
            ..Default::default()
        };
        let events = PeakDetector::new(config).detect(&signal, 100.0).unwrap();
        // Maxima of -cos sit at half periods: 25, 75, ...
        assert_eq!(events.first(), Some(&25));
        assert!(events.iter().all(|e| e % 50 == 25));
    }

    #[test]
    fn test_short_signal_is_not_an_error() {
        let events = PeakDetector::default().detect(&[1.0, 0.0], 100.0).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_config_errors() {
        let detector = PeakDetector::default();
        assert!(matches!(
            detector.detect(&[0.0; 10], 0.0),
            Err(GaitError::InvalidFrameRate(_))
        ));

        let bad = PeakDetector::new(PeakDetectorConfig {
            prominence: -1.0,
            ..Default::default()
        });
        assert!(matches!(
            bad.detect(&[0.0; 10], 100.0),
            Err(GaitError::InvalidParameter { name: "prominence", .. })
        ));
    }

    #[test]
    fn test_min_distance_floor() {
        let detector = PeakDetector::default();
        assert_eq!(detector.min_distance(100.0), 80);
        assert_eq!(detector.min_distance(99.0), 79);
        assert_eq!(detector.min_distance(0.5), 1);
    }

    #[test]
    fn test_percentile_linear() {
        let values = [4.0, 1.0, 3.0, 2.0, f64::NAN];
        assert_eq!(percentile(&values, 0.0), Some(1.0));
        assert_eq!(percentile(&values, 100.0), Some(4.0));
        assert_eq!(percentile(&values, 50.0), Some(2.5));
        assert_eq!(percentile(&[f64::NAN], 5.0), None);
    }

    #[test]
    fn test_contact_detector_one_onset_per_contact() {
        let signal = heel_height(100, 1000, 20.0);
        let detector = ContactDetector::default();
        let onsets = detector.detect(&signal, 100.0).unwrap();

        assert!(onsets.len() >= 9 && onsets.len() <= 10, "onsets: {:?}", onsets);
        for pair in onsets.windows(2) {
            assert!(pair[1] - pair[0] >= 50);
        }
    }

    #[test]
    fn test_contact_detector_merges_chatter() {
        // The 5th percentile lands on the baseline, so every dip crosses it.
        // Dips at 5 and 8 are 3 frames apart and count as one contact.
        let mut signal = vec![10.0; 100];
        for &i in &[5, 8, 30] {
            signal[i] = 0.0;
        }
        let config = ContactDetectorConfig {
            percentile: 5.0,
            min_gap_seconds: 0.1,
        };
        let onsets = ContactDetector::new(config).detect(&signal, 100.0).unwrap();
        assert_eq!(onsets, vec![5, 30]);
    }

    #[test]
    fn test_contact_detector_bridges_blip_inside_long_contact() {
        // One 27-frame contact broken by a single frame above threshold.
        let mut signal = vec![10.0; 200];
        for v in &mut signal[50..77] {
            *v = 0.0;
        }
        signal[65] = 10.0;
        for v in &mut signal[150..160] {
            *v = 0.0;
        }
        let config = ContactDetectorConfig {
            percentile: 50.0,
            min_gap_seconds: 0.1,
        };
        let onsets = ContactDetector::new(config).detect(&signal, 100.0).unwrap();
        assert_eq!(onsets, vec![50, 150]);
    }

    #[test]
    fn test_contact_gap_measured_from_run_end() {
        // Runs 10..40 and 45..50: onsets are 35 frames apart but the runs
        // only 6, so a 10-frame gap merges them and a 5-frame gap does not.
        let mut signal = vec![10.0; 100];
        for v in &mut signal[10..40] {
            *v = 0.0;
        }
        for v in &mut signal[45..50] {
            *v = 0.0;
        }
        let merged = ContactDetector::new(ContactDetectorConfig {
            percentile: 50.0,
            min_gap_seconds: 0.1,
        })
        .detect(&signal, 100.0)
        .unwrap();
        assert_eq!(merged, vec![10]);

        let split = ContactDetector::new(ContactDetectorConfig {
            percentile: 50.0,
            min_gap_seconds: 0.05,
        })
        .detect(&signal, 100.0)
        .unwrap();
        assert_eq!(split, vec![10, 45]);
    }

    #[test]
    fn test_free_functions_match_detectors() {
        let signal = heel_height(100, 600, 20.0);
        let peaks = detect_events(&signal, 100.0, &PeakDetectorConfig::default()).unwrap();
        assert_eq!(peaks, PeakDetector::default().detect(&signal, 100.0).unwrap());

        let contacts = detect_contacts(&signal, 100.0, &ContactDetectorConfig::default()).unwrap();
        assert_eq!(contacts, ContactDetector::default().detect(&signal, 100.0).unwrap());
        assert!(!contacts.is_empty());
    }

    #[test]
    fn test_contact_config_errors() {
        let detector = ContactDetector::new(ContactDetectorConfig {
            percentile: 140.0,
            ..Default::default()
        });
        assert!(detector.detect(&[0.0; 4], 100.0).is_err());
    }
}
