//! Export Module for the presentation layer.
//!
//! Flattens analysis reports into a structured JSON document that a plotting
//! or table front end can consume without knowing the pipeline types:
//! - **Cycle table**: bounds and duration of every detected cycle
//! - **Diagnostics**: rejected cycles with their bounds and a reason string
//! - **Waveforms**: mean and SD over the percent-of-cycle axis
//! - **Kinematics**: optional angle and angular velocity with a time axis
//!
//! The retained/total counts are part of the document, not just the log.

use serde::Serialize;

use crate::error::Result;
use crate::pipeline::{AnalysisStatus, CycleAnalysisReport, SegmentAngleReport};
use crate::types::Cycle;

/// Complete analysis document for one trial.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisExport {
    /// Trial label (file name or subject/session id).
    pub trial: String,
    /// Name of the analyzed signal, e.g. "RASI.X" or "RASI->RKNE angle".
    pub signal: String,
    pub event_marker: String,
    pub status: AnalysisStatus,
    pub summary: String,
    pub retained_cycles: usize,
    pub total_cycles: usize,
    pub events: Vec<usize>,
    pub cycles: Vec<CycleExport>,
    pub rejections: Vec<RejectionExport>,
    pub waveform: Option<WaveformExport>,
    pub kinematics: Option<KinematicsExport>,
}

/// Cycle bounds for export.
#[derive(Debug, Clone, Serialize)]
pub struct CycleExport {
    pub start: usize,
    pub end: usize,
    pub duration_s: f64,
}

/// Rejected cycle for export.
#[derive(Debug, Clone, Serialize)]
pub struct RejectionExport {
    pub start: usize,
    pub end: usize,
    pub reason: String,
}

/// Aggregated waveform over the percent-of-cycle axis.
#[derive(Debug, Clone, Serialize)]
pub struct WaveformExport {
    pub percent: Vec<f64>,
    pub mean: Vec<f64>,
    pub std_dev: Vec<f64>,
    pub cycle_count: usize,
    /// Every accepted normalized cycle, in chronological order.
    pub cycles: Vec<Vec<f64>>,
}

/// Full-trial kinematic series.
#[derive(Debug, Clone, Serialize)]
pub struct KinematicsExport {
    pub marker_a: String,
    pub marker_b: String,
    pub time_s: Vec<f64>,
    pub angle_rad: Vec<f64>,
    pub angular_velocity_rad_s: Option<Vec<f64>>,
    pub unwrapped: bool,
}

impl AnalysisExport {
    /// Serialize to compact JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to indented JSON.
    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Export only the cycle table and diagnostics.
    pub fn cycles_only_json(&self) -> Result<String> {
        #[derive(Serialize)]
        struct CyclesOnly<'a> {
            trial: &'a str,
            summary: &'a str,
            cycles: &'a [CycleExport],
            rejections: &'a [RejectionExport],
        }
        Ok(serde_json::to_string(&CyclesOnly {
            trial: &self.trial,
            summary: &self.summary,
            cycles: &self.cycles,
            rejections: &self.rejections,
        })?)
    }
}

// ============================================================================
// EXPORT BUILDER
// ============================================================================

/// Builds an export document from pipeline reports.
pub struct AnalysisExportBuilder {
    trial: String,
    frame_rate: f64,
    absolute_time: bool,
}

impl AnalysisExportBuilder {
    /// `frame_rate` converts cycle bounds to durations.
    pub fn new(trial: &str, frame_rate: f64) -> Self {
        Self {
            trial: trial.to_string(),
            frame_rate,
            absolute_time: false,
        }
    }

    /// Offset kinematic time axes by the first-frame offset.
    pub fn absolute_time(mut self, absolute: bool) -> Self {
        self.absolute_time = absolute;
        self
    }

    /// Export a signal analysis.
    pub fn export_cycles(&self, signal: &str, report: &CycleAnalysisReport) -> AnalysisExport {
        let cycles = report
            .detection
            .cycles()
            .iter()
            .map(|c| self.cycle_export(*c))
            .collect();

        let rejections = report
            .normalized
            .rejections
            .iter()
            .map(|r| RejectionExport {
                start: r.cycle.start,
                end: r.cycle.end,
                reason: r.reason.to_string(),
            })
            .collect();

        let waveform = report.aggregate.as_ref().map(|agg| WaveformExport {
            percent: crate::interpolation::linspace(0.0, 100.0, agg.mean.len()),
            mean: agg.mean.clone(),
            std_dev: agg.std_dev.clone(),
            cycle_count: agg.count,
            cycles: report
                .normalized
                .accepted
                .iter()
                .map(|c| c.values.clone())
                .collect(),
        });

        AnalysisExport {
            trial: self.trial.clone(),
            signal: signal.to_string(),
            event_marker: report.detection.event_marker.clone(),
            status: report.status,
            summary: report.summary(),
            retained_cycles: report.retained(),
            total_cycles: report.total(),
            events: report.detection.events.clone(),
            cycles,
            rejections,
            waveform,
            kinematics: None,
        }
    }

    /// Export a segment angle analysis, including the full-trial series.
    pub fn export_segment_angle(&self, report: &SegmentAngleReport) -> AnalysisExport {
        let signal = format!("{}->{} angle", report.marker_a, report.marker_b);
        let mut export = self.export_cycles(&signal, &report.angle_cycles);

        export.kinematics = Some(KinematicsExport {
            marker_a: report.marker_a.clone(),
            marker_b: report.marker_b.clone(),
            time_s: report.angles.time_axis(self.absolute_time),
            angle_rad: report.angles.values.clone(),
            angular_velocity_rad_s: report.velocities.as_ref().map(|v| v.values.clone()),
            unwrapped: report.velocities.as_ref().is_some_and(|v| v.unwrapped),
        });
        export
    }

    fn cycle_export(&self, cycle: Cycle) -> CycleExport {
        CycleExport {
            start: cycle.start,
            end: cycle.end,
            duration_s: cycle.duration_s(self.frame_rate),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
