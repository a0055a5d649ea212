use glam::{UVec3, Vec3};
use ndarray::Array3;

/// The role a grid cell plays for the solver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CellFlag {
    /// Regular fluid cell.
    #[default]
    Fluid = 0,
    /// Impermeable wall (floor or voxelized geometry).
    Solid = 1,
    /// Open inflow/outflow cell held at its prescribed density and velocity.
    DomainBoundary = 2,
}

impl CellFlag {
    #[inline]
    pub fn is_solid(self) -> bool {
        self == CellFlag::Solid
    }
}

/// The computational grid and its per-cell fields, all in lattice units.
///
/// Fields are indexed as `[(x, y, z)]`. The grid size is fixed on creation.
#[derive(Debug, Clone)]
pub struct Domain {
    size: UVec3,
    /// Cell roles.
    pub flags: Array3<CellFlag>,
    /// Cell densities.
    pub density: Array3<f32>,
    /// Cell velocities.
    pub velocity: Array3<Vec3>,
    /// Boundary force acting on each solid cell. Zero elsewhere.
    pub force: Array3<Vec3>,
}

impl Domain {
    pub fn new(size: UVec3) -> Self {
        let shape = (size.x as usize, size.y as usize, size.z as usize);

        Self {
            size,
            flags: Array3::from_elem(shape, CellFlag::Fluid),
            density: Array3::from_elem(shape, 1.0),
            velocity: Array3::from_elem(shape, Vec3::ZERO),
            force: Array3::from_elem(shape, Vec3::ZERO),
        }
    }

    /// Size of the grid, in cells.
    #[inline]
    pub fn size(&self) -> UVec3 {
        self.size
    }

    /// Total number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Geometric centre of the grid in lattice units, with cell centres at integer coordinates.
    pub fn center(&self) -> Vec3 {
        (self.size.as_vec3() - 1.0) * 0.5
    }

    /// Number of cells carrying the given flag.
    pub fn count(&self, flag: CellFlag) -> usize {
        self.flags.iter().filter(|&&f| f == flag).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_domain_is_fluid_at_rest() {
        let domain = Domain::new(UVec3::new(4, 5, 6));

        assert_eq!(domain.len(), 120);
        assert_eq!(domain.flags.dim(), (4, 5, 6));
        assert_eq!(domain.count(CellFlag::Fluid), 120);
        assert!(domain.density.iter().all(|&rho| rho == 1.0));
        assert!(domain.velocity.iter().all(|&u| u == Vec3::ZERO));
    }

    #[test]
    fn test_center_is_between_cell_centres() {
        assert_eq!(Domain::new(UVec3::new(3, 3, 3)).center(), Vec3::ONE);
        assert_eq!(Domain::new(UVec3::new(4, 2, 1)).center(), Vec3::new(1.5, 0.5, 0.0));
    }
}
