use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{record::VisMode, run::ExecutionMode};

/// Lattice speed of sound. Flow speeds must stay well below it.
const LATTICE_SOUND_SPEED: f64 = 0.577_350_27;

/// Everything that defines a run. Fixed before the first step.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub domain: DomainConfig,
    pub units: UnitsConfig,
    pub geometry: Option<GeometryConfig>,
    pub run: RunConfig,
    pub visualization: VisualizationConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DomainConfig {
    /// Relative extents of the box along x, y and z.
    pub aspect: [f32; 3],
    /// Upper bound on the total number of cells.
    pub cell_budget: u64,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            aspect: [1.0, 2.0, 1.0],
            cell_budget: 1_000_000,
        }
    }
}

/// Reference values tying lattice units to SI units.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct UnitsConfig {
    /// Characteristic length of the geometry, in metres.
    pub si_length: f64,
    /// Free-stream velocity, in m/s.
    pub si_velocity: f64,
    /// Simulated duration, in seconds.
    pub si_time: f64,
    /// Fluid density, in kg/m³.
    pub si_density: f64,
    /// Kinematic viscosity, in m²/s.
    pub si_viscosity: f64,
    /// Free-stream velocity in lattice units. Also the initial velocity of every fluid cell.
    pub lbm_velocity: f64,
    /// Characteristic length as a fraction of the grid's y extent.
    pub lbm_length_fraction: f64,
}

impl Default for UnitsConfig {
    fn default() -> Self {
        Self {
            si_length: 2.4,
            si_velocity: 1.0,
            si_time: 10.0,
            si_density: 1.225,
            si_viscosity: 1.48e-5,
            lbm_velocity: 0.075,
            lbm_length_fraction: 0.65,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeometryConfig {
    /// STL file to voxelize.
    pub path: PathBuf,
    /// Rotations about x, y and z, in degrees, composed as `Rx * Ry * Rz`.
    pub rotation: [f32; 3],
    /// Position of the mesh centre as a fraction of the grid extent.
    pub center: [f32; 3],
    /// Write the transformed mesh next to the snapshots.
    pub export_mesh: bool,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("stl/geometry.stl"),
            rotation: [90.0, 90.0, 0.0],
            center: [0.5, 0.5, 0.5],
            export_mesh: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub mode: ExecutionMode,
    /// Compute boundary forces, export them with snapshots and log them to `forces.csv`.
    pub force_field: bool,
    /// Use the Smagorinsky subgrid model.
    pub subgrid: bool,
    /// Directory for snapshots, frames and the force log.
    pub output: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Batch,
            force_field: true,
            subgrid: true,
            output: PathBuf::from("export"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct VisualizationConfig {
    pub modes: Vec<VisMode>,
    /// Record slice frames during batch runs.
    pub record: bool,
    /// Length of the recording at 60 frames per second.
    pub video_seconds: f32,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            modes: vec![VisMode::FlagSurface, VisMode::QCriterion],
            record: false,
            video_seconds: 10.0,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(toml::from_str(&text)?)
    }

    /// Rejects values no run can start from. Unit and grid constructors check the rest.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let u = &self.units;

        for (name, value) in [
            ("units.si_time", u.si_time),
            ("units.si_viscosity", u.si_viscosity),
            ("units.lbm_length_fraction", u.lbm_length_fraction),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid { name, reason: format!("must be positive, got {value}") });
            }
        }

        if u.lbm_velocity >= LATTICE_SOUND_SPEED {
            return Err(ConfigError::Invalid {
                name: "units.lbm_velocity",
                reason: format!("{} is not below the lattice speed of sound", u.lbm_velocity),
            });
        }

        if let Some(geometry) = &self.geometry {
            if geometry.center.iter().any(|c| !c.is_finite()) || geometry.rotation.iter().any(|r| !r.is_finite()) {
                return Err(ConfigError::Invalid {
                    name: "geometry",
                    reason: "rotation and center must be finite".to_string(),
                });
            }
        }

        let v = &self.visualization;
        if v.record && !(v.video_seconds > 0.0) {
            return Err(ConfigError::Invalid {
                name: "visualization.video_seconds",
                reason: format!("must be positive when recording, got {}", v.video_seconds),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error(transparent)]
    Parse(#[from] toml::de::Error),
    #[error("invalid `{name}`: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [domain]
            cell_budget = 2000

            [geometry]
            path = "stl/cow.stl"

            [run]
            mode = "interactive"
            force_field = false
            "#,
        )
        .unwrap();

        assert_eq!(config.domain.cell_budget, 2000);
        assert_eq!(config.domain.aspect, [1.0, 2.0, 1.0]);
        assert_eq!(config.run.mode, ExecutionMode::Interactive);
        assert!(!config.run.force_field);
        assert_eq!(config.units, UnitsConfig::default());

        let geometry = config.geometry.unwrap();
        assert_eq!(geometry.path, PathBuf::from("stl/cow.stl"));
        assert_eq!(geometry.rotation, [90.0, 90.0, 0.0]);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(toml::from_str::<Config>("[domain]\nbudget = 5\n").is_err());
    }

    #[test]
    fn test_rejects_supersonic_lattice_velocity() {
        let mut config = Config::default();
        config.units.lbm_velocity = 0.6;

        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { name: "units.lbm_velocity", .. })
        ));
    }

    #[test]
    fn test_rejects_non_positive_duration() {
        let mut config = Config::default();
        config.units.si_time = 0.0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/nonexistent/windtunnel.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
