use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use thiserror::Error;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use windtunnel_io::{DecodingError, EncodingError};
use windtunnel_lbm::{resolution::ResolutionError, solver::LbmD3Q19, units::UnitError, SolverError};

use config::{Config, ConfigError};
use export::{ForceLogger, SnapshotExporter};
use record::{FrameRecorder, VisModes};
use run::{ExecutionMode, Exports};

mod config;
mod export;
mod record;
mod run;
mod schedule;
mod setup;

/// Lattice Boltzmann wind tunnel
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Run configuration (TOML). Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides the configured execution mode.
    #[arg(short, long, value_enum)]
    mode: Option<ExecutionMode>,

    /// Overrides the configured output directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    log_level: Level,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_target(false)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install logger: {e}");
        return ExitCode::FAILURE;
    }

    match start(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn start(cli: Cli) -> Result<(), RunError> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(mode) = cli.mode {
        config.run.mode = mode;
    }
    if let Some(output) = cli.output {
        config.run.output = output;
    }

    let plan = setup::plan(&config)?;
    let mesh = config
        .geometry
        .as_ref()
        .map(|geometry| setup::load_geometry(geometry, &plan))
        .transpose()?;

    let output = &config.run.output;
    let snapshots = SnapshotExporter::new(output.join("vtk"), plan.horizon, plan.units, config.run.force_field)?;
    let forces = ForceLogger::create(output.join("forces.csv"), plan.units)?;

    let vis = &config.visualization;
    let recorder = if vis.record && config.run.mode == ExecutionMode::Batch {
        let modes: VisModes = vis.modes.iter().copied().collect();
        let recorder = FrameRecorder::new(output.join("frames"), plan.horizon, vis.video_seconds, modes)?;
        info!(interval = recorder.interval(), ?modes, "recording frames");
        Some(recorder)
    } else {
        None
    };

    let mut solver = LbmD3Q19::new(plan.size, plan.nu as f32).with_subgrid(config.run.subgrid);
    setup::prepare_domain(&mut solver, mesh.as_ref(), config.units.lbm_velocity as f32);

    if let (Some(mesh), Some(geometry)) = (&mesh, &config.geometry) {
        if geometry.export_mesh {
            snapshots.export_mesh(mesh);
        }
    }

    let mut exports = Exports {
        snapshots,
        forces,
        force_field: config.run.force_field,
        recorder,
    };

    info!(
        mode = ?config.run.mode,
        output = %output.display(),
        fields = ?exports.snapshots.fields(),
        "starting"
    );
    let summary = run::dispatch(config.run.mode, &mut solver, plan.horizon, &mut exports)?;
    summary.report();

    Ok(())
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Units(#[from] UnitError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("failed to load geometry {path}: {source}")]
    Geometry { path: PathBuf, source: DecodingError },
    #[error("failed to prepare output: {0}")]
    Output(#[from] EncodingError),
    #[error(transparent)]
    Solver(#[from] SolverError),
}
