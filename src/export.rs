use std::path::PathBuf;

use glam::DVec3;
use smallvec::SmallVec;
use tracing::{debug, warn};
use windtunnel_io::{forces::{ForceLogEncoder, ForceRecord}, vtk::VtkEncoder, EncodingError};
use windtunnel_lbm::{force::solid_force, geometry::Mesh, units::{Dimension, UnitSystem}, Solver};

/// A grid field that can be written to a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Density,
    Velocity,
    Flags,
    Force,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::Density => "rho",
            Field::Velocity => "u",
            Field::Flags => "flags",
            Field::Force => "F",
        }
    }

    fn dimension(self) -> Option<Dimension> {
        match self {
            Field::Density => Some(Dimension::Density),
            Field::Velocity => Some(Dimension::Velocity),
            Field::Flags => None,
            Field::Force => Some(Dimension::Force),
        }
    }
}

/// Writes density, velocity and flags (plus boundary forces when enabled) at scheduled steps.
pub struct SnapshotExporter {
    encoder: VtkEncoder,
    units: UnitSystem,
    fields: SmallVec<[Field; 4]>,
}

impl SnapshotExporter {
    pub fn new(
        path: PathBuf,
        horizon: u64,
        units: UnitSystem,
        force_field: bool,
    ) -> Result<SnapshotExporter, EncodingError> {
        // The batch loop's last triggers fire at `horizon + 1`.
        let encoder = VtkEncoder::new(path, horizon.saturating_add(1), units.factor(Dimension::Length) as f32)?;

        let mut fields: SmallVec<[Field; 4]> = SmallVec::from_slice(&[Field::Density, Field::Velocity, Field::Flags]);
        if force_field {
            fields.push(Field::Force);
        }

        Ok(Self { encoder, units, fields })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Writes every field at the solver's current step and returns how many files were written.
    /// A field that fails to write is logged and skipped.
    pub fn export<S: Solver>(&self, solver: &mut S) -> usize {
        if self.fields.contains(&Field::Force) {
            solver.update_force_field();
        }

        let t = solver.t();
        let domain = solver.domain();
        let mut written = 0;

        for &field in &self.fields {
            let scale = field.dimension().map_or(1.0, |dim| self.units.factor(dim) as f32);

            let result = match field {
                Field::Density => self.encoder.encode_field(field.name(), t, &domain.density, scale),
                Field::Velocity => self.encoder.encode_field(field.name(), t, &domain.velocity, scale),
                Field::Flags => self.encoder.encode_field(field.name(), t, &domain.flags, scale),
                Field::Force => self.encoder.encode_field(field.name(), t, &domain.force, scale),
            };

            match result {
                Ok(path) => {
                    debug!(path = %path.display(), "wrote snapshot field");
                    written += 1;
                }
                Err(e) => warn!(t, field = field.name(), "skipping snapshot field: {e}"),
            }
        }

        written
    }

    /// Writes the placed geometry as `mesh.vtk`, scaled to metres.
    pub fn export_mesh(&self, mesh: &Mesh) {
        match self.encoder.encode_mesh("mesh", mesh) {
            Ok(path) => debug!(path = %path.display(), "wrote mesh"),
            Err(e) => warn!("skipping mesh export: {e}"),
        }
    }
}

/// Appends the total boundary force to the force log at scheduled steps.
pub struct ForceLogger {
    encoder: ForceLogEncoder,
    units: UnitSystem,
    rows: u64,
    total_si: DVec3,
}

impl ForceLogger {
    /// Starts a fresh log at `path`, discarding whatever a previous run left there.
    pub fn create(path: PathBuf, units: UnitSystem) -> Result<ForceLogger, EncodingError> {
        Ok(Self {
            encoder: ForceLogEncoder::create(path)?,
            units,
            rows: 0,
            total_si: DVec3::ZERO,
        })
    }

    /// Rows written so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Mean of the logged forces, in newtons.
    pub fn mean_force_si(&self) -> Option<DVec3> {
        (self.rows > 0).then(|| self.total_si / self.rows as f64)
    }

    /// Refreshes the force field, sums it over all solid cells and appends a row. A row that
    /// fails to write is logged and skipped; the next scheduled step tries again.
    pub fn log<S: Solver>(&mut self, solver: &mut S) -> Option<ForceRecord> {
        solver.update_force_field();

        let t = solver.t();
        let force = solid_force(solver.domain());
        let record = ForceRecord {
            t,
            t_si: self.units.si_time(t as f64),
            force,
            force_si: force * self.units.factor(Dimension::Force),
        };

        if let Err(e) = self.encoder.append(&record) {
            warn!(t, path = %self.encoder.path().display(), "skipping force log row: {e}");
            return None;
        }

        self.rows += 1;
        self.total_si += record.force_si;

        Some(record)
    }
}
