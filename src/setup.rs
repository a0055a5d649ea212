use glam::{UVec3, Vec3};
use tracing::{info, warn};
use windtunnel_io::stl::read_stl;
use windtunnel_lbm::{
    classify::Classifier,
    domain::CellFlag,
    geometry::{rotation_from_degrees, Mesh, MeshSize, Placement, ParityVoxelizer, Voxelizer},
    resolution::resolution,
    units::UnitSystem,
    Solver,
};

use crate::{config::{Config, GeometryConfig}, RunError};

/// Grid size, unit system and run length derived from a configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plan {
    pub size: UVec3,
    pub units: UnitSystem,
    /// Characteristic length, in cells.
    pub length: f64,
    /// Kinematic viscosity, in lattice units.
    pub nu: f64,
    /// Number of steps covering the configured duration.
    pub horizon: u64,
}

/// Works out everything the run needs before any field is allocated.
pub fn plan(config: &Config) -> Result<Plan, RunError> {
    config.validate()?;

    let d = &config.domain;
    let size = resolution(Vec3::from(d.aspect), d.cell_budget)?;

    let u = &config.units;
    let length = u.lbm_length_fraction * size.y as f64;
    let units = UnitSystem::new(length, u.lbm_velocity, 1.0, u.si_length, u.si_velocity, u.si_density)?;
    let nu = units.viscosity(u.si_viscosity);
    let horizon = units.steps(u.si_time);

    info!(
        cells = size.x as u64 * size.y as u64 * size.z as u64,
        "grid {} x {} x {}", size.x, size.y, size.z
    );
    info!(
        re = units.si_reynolds(u.si_length, u.si_velocity, u.si_viscosity),
        nu,
        horizon,
        "{length:.1} cells per {} m",
        u.si_length
    );

    Ok(Plan { size, units, length, nu, horizon })
}

/// Reads the geometry and moves it into place: rotated, scaled so its longest side spans the
/// characteristic length, and centred at the configured fraction of the grid.
pub fn load_geometry(geometry: &GeometryConfig, plan: &Plan) -> Result<Mesh, RunError> {
    let mut mesh = read_stl(&geometry.path).map_err(|source| RunError::Geometry {
        path: geometry.path.clone(),
        source,
    })?;

    let placement = Placement {
        rotation: rotation_from_degrees(geometry.rotation),
        size: MeshSize::LargestSide(plan.length as f32),
        center: (plan.size.as_vec3() - 1.0) * Vec3::from(geometry.center),
    };
    placement.apply(&mut mesh, plan.size);

    info!(triangles = mesh.len(), path = %geometry.path.display(), "loaded geometry");

    Ok(mesh)
}

/// Voxelizes `mesh` (if any) and applies the wind tunnel boundary rules. Returns the number of
/// solid cells.
pub fn prepare_domain<S: Solver>(solver: &mut S, mesh: Option<&Mesh>, initial_velocity: f32) -> usize {
    let domain = solver.domain_mut();

    if let Some(mesh) = mesh {
        let marked = ParityVoxelizer.voxelize(mesh, domain);
        if marked == 0 {
            warn!("geometry does not cover any cell centre");
        }
    }

    Classifier::wind_tunnel(initial_velocity).apply(domain);

    let solid = domain.count(CellFlag::Solid);
    info!(
        solid,
        boundary = domain.count(CellFlag::DomainBoundary),
        fluid = domain.count(CellFlag::Fluid),
        "classified cells"
    );

    solid
}
