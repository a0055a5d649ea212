use std::time::{Duration, Instant};

use clap::ValueEnum;
use glam::DVec3;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::info;
use windtunnel_lbm::{Solver, SolverError};

use crate::{
    export::{ForceLogger, SnapshotExporter},
    record::FrameRecorder,
    schedule::{ExportSchedule, Trigger},
};

/// How the simulation is driven once the domain is set up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// Step to the end of the configured duration, writing snapshots and force rows on schedule.
    #[default]
    Batch,
    /// Hand control to the solver's own open-ended loop.
    Interactive,
}

/// Output channels of a batch run.
pub struct Exports {
    pub snapshots: SnapshotExporter,
    pub forces: ForceLogger,
    /// Log a force row at every scheduled step. The log keeps only its header otherwise.
    pub force_field: bool,
    pub recorder: Option<FrameRecorder>,
}

/// What a finished run produced.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunSummary {
    /// Steps taken.
    pub steps: u64,
    /// Snapshot files written.
    pub snapshots: usize,
    /// Force log rows written.
    pub rows: u64,
    pub frames: u64,
    /// Mean logged boundary force, in newtons.
    pub mean_force_si: Option<DVec3>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn report(&self) {
        info!(
            steps = self.steps,
            snapshots = self.snapshots,
            rows = self.rows,
            frames = self.frames,
            "run finished in {:.2?}", self.elapsed
        );

        if let Some(f) = self.mean_force_si {
            info!("mean force [{:.6e}, {:.6e}, {:.6e}] N", f.x, f.y, f.z);
        }
    }
}

/// Initializes the solver and drives it in the given mode.
pub fn dispatch<S: Solver>(
    mode: ExecutionMode,
    solver: &mut S,
    horizon: u64,
    exports: &mut Exports,
) -> Result<RunSummary, SolverError> {
    solver.initialize();

    match mode {
        ExecutionMode::Batch => run_batch(solver, horizon, exports),
        ExecutionMode::Interactive => {
            let start = Instant::now();
            solver.run_interactive()?;

            Ok(RunSummary {
                steps: solver.t(),
                elapsed: start.elapsed(),
                ..RunSummary::default()
            })
        }
    }
}

/// Steps until the solver has passed `horizon`, exporting on schedule after each step.
///
/// The loop condition is checked before stepping, so the run takes `horizon + 1` steps and the
/// last triggers are evaluated at `t = horizon + 1`. Frames are taken before a step, exports after.
/// Export failures are logged and skipped; only the solver can end the run early.
pub fn run_batch<S: Solver>(solver: &mut S, horizon: u64, exports: &mut Exports) -> Result<RunSummary, SolverError> {
    let schedule = ExportSchedule::new(horizon);
    info!(
        horizon,
        snapshot_interval = schedule.snapshot_interval(),
        log_interval = schedule.log_interval(),
        "starting batch run"
    );

    let bar_template = "Running Simulation {spinner:.green} [{elapsed}] [{bar:50.white/white}] {pos}/{len} ({eta})";
    let style = ProgressStyle::with_template(bar_template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let progress = ProgressBar::new(horizon.saturating_add(1)).with_style(style);

    let start = Instant::now();
    let mut snapshots = 0;

    while solver.t() <= horizon {
        if let Some(recorder) = &mut exports.recorder {
            if recorder.next_frame(solver.t()) {
                recorder.write_frame(solver.domain());
            }
        }

        solver.step()?;

        for trigger in schedule.triggers(solver.t()) {
            match trigger {
                Trigger::Snapshot => snapshots += exports.snapshots.export(solver),
                Trigger::ForceLog if exports.force_field => {
                    exports.forces.log(solver);
                }
                Trigger::ForceLog => (),
            }
        }

        progress.inc(1);
    }

    progress.finish();

    Ok(RunSummary {
        steps: solver.t(),
        snapshots,
        rows: exports.forces.rows(),
        frames: exports.recorder.as_ref().map_or(0, FrameRecorder::frames),
        mean_force_si: exports.forces.mean_force_si(),
        elapsed: start.elapsed(),
    })
}
