//! Gait Phase Engine
//!
//! Runs the gait pipeline on one trial and prints the JSON report.
//! Without `--trial` a synthetic ten-second walk is analyzed.
//!
//! This is the entry point for the standalone binary. For library use, see lib.rs.

use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use gait_phase::{
    AnalysisExportBuilder, Axis, GaitAnalysisConfig, GaitCycleAnalyzer, MarkerSet, PhaseUnwrap,
    Plane, TrialData,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gait-phase", version, about = "Gait-cycle detection and phase normalization")]
struct Args {
    /// Trial as JSON (`labels`, `frame_rate`, `first_frame`, `positions`)
    #[arg(short, long)]
    trial: Option<PathBuf>,

    /// Analysis configuration as JSON, missing fields take their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Marker whose vertical trace defines gait events
    #[arg(long, default_value = "RHEE")]
    event_marker: String,

    /// Marker whose coordinate is normalized per cycle
    #[arg(long, default_value = "RASI")]
    marker: String,

    /// Coordinate of `--marker` to normalize
    #[arg(long, value_enum, default_value_t = AxisArg::X)]
    axis: AxisArg,

    /// Segment as two markers, proximal then distal (e.g. RASI RKNE)
    #[arg(long, num_args = 2, value_names = ["A", "B"])]
    segment: Option<Vec<String>>,

    /// Lab axis used as the horizontal component of the segment angle
    #[arg(long, value_enum, default_value_t = AxisArg::X)]
    plane_horizontal: AxisArg,

    /// Lab axis used as the vertical component of the segment angle
    #[arg(long, value_enum, default_value_t = AxisArg::Z)]
    plane_vertical: AxisArg,

    /// Unwrap the angle before differentiating
    #[arg(long)]
    unwrap: bool,

    /// Offset time axes by the trial's first frame
    #[arg(long)]
    absolute_time: bool,

    /// Pretty-print the JSON report
    #[arg(short, long)]
    pretty: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AxisArg {
    X,
    Y,
    Z,
}

impl Args {
    fn plane(&self) -> gait_phase::Result<Plane> {
        Plane::new(self.plane_horizontal.into(), self.plane_vertical.into())
    }
}

impl From<AxisArg> for Axis {
    fn from(axis: AxisArg) -> Self {
        match axis {
            AxisArg::X => Axis::X,
            AxisArg::Y => Axis::Y,
            AxisArg::Z => Axis::Z,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let plane = args.plane().context("invalid --plane-horizontal/--plane-vertical")?;

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GaitAnalysisConfig::default(),
    };
    let analyzer = GaitCycleAnalyzer::new(config).context("invalid analysis configuration")?;

    let (label, trial) = match &args.trial {
        Some(path) => (path.display().to_string(), load_trial(path)?),
        None => {
            info!("no trial given, analyzing a synthetic walk");
            ("synthetic".to_string(), synthetic_trial(1000, 100.0, 1.0))
        }
    };
    let markers = MarkerSet::from_trial(trial).context("malformed trial")?;
    info!(
        markers = markers.marker_count(),
        frames = markers.frame_count(),
        frame_rate = markers.frame_rate(),
        "trial loaded"
    );

    let builder =
        AnalysisExportBuilder::new(&label, markers.frame_rate()).absolute_time(args.absolute_time);

    let export = match &args.segment {
        Some(pair) => {
            let [a, b] = pair.as_slice() else {
                bail!("--segment takes exactly two markers");
            };
            let unwrap = if args.unwrap {
                PhaseUnwrap::Unwrapped
            } else {
                PhaseUnwrap::Raw
            };
            let report = analyzer.analyze_segment_angle(
                &markers,
                &args.event_marker,
                a,
                b,
                plane,
                unwrap,
            )?;
            builder.export_segment_angle(&report)
        }
        None => {
            let axis = Axis::from(args.axis);
            let report =
                analyzer.analyze_marker_axis(&markers, &args.event_marker, &args.marker, axis)?;
            builder.export_cycles(&format!("{}.{:?}", args.marker, axis), &report)
        }
    };

    if !export.status.is_complete() {
        warn!(status = ?export.status, "analysis incomplete");
    }

    let json = if args.pretty {
        export.to_pretty_json()?
    } else {
        export.to_json()?
    };
    println!("{}", json);

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<GaitAnalysisConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))
}

fn load_trial(path: &Path) -> anyhow::Result<TrialData> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read trial {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse trial {}", path.display()))
}

/// Heel, hip and knee markers of a steady walk, millimetres.
fn synthetic_trial(frames: usize, frame_rate: f64, stride_seconds: f64) -> TrialData {
    let speed = 1200.0 / frame_rate;
    let phase = |i: usize| 2.0 * PI * i as f64 / (frame_rate * stride_seconds);

    let heel = (0..frames)
        .map(|i| [i as f64 * speed, 100.0, 60.0 - 40.0 * phase(i).cos()])
        .collect();
    let hip = (0..frames)
        .map(|i| [i as f64 * speed, 110.0, 900.0 + 15.0 * (2.0 * phase(i)).sin()])
        .collect();
    let knee = (0..frames)
        .map(|i| [i as f64 * speed + 120.0 * phase(i).sin(), 105.0, 480.0])
        .collect();

    TrialData {
        labels: vec!["RHEE".to_string(), "RASI".to_string(), "RKNE".to_string()],
        frame_rate,
        first_frame: 0,
        positions: vec![heel, hip, knee],
    }
}
