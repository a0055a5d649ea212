//! One-time boundary classification of every grid cell.
//!
//! Classification is an ordered list of [`Step`]s evaluated per cell. Later marks overwrite
//! earlier ones, so the order of the list *is* the precedence between flags. For the wind tunnel
//! the open faces are marked after the floor, which makes [`CellFlag::DomainBoundary`] win over
//! [`CellFlag::Solid`] where the floor meets an x or y face.

use glam::UVec3;
use ndarray::Zip;

use crate::domain::{CellFlag, Domain};

/// A set of cells picked out by their coordinates alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// The bottom layer, `z = 0`.
    Floor,
    /// The inflow/outflow faces: `x = 0`, `x = Nx - 1`, `y = 0`, `y = Ny - 1` and `z = Nz - 1`.
    OpenFaces,
}

impl Region {
    #[inline]
    pub fn contains(self, p: UVec3, size: UVec3) -> bool {
        match self {
            Region::Floor => p.z == 0,
            Region::OpenFaces => {
                p.x == 0 || p.x == size.x - 1 || p.y == 0 || p.y == size.y - 1 || p.z == size.z - 1
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Flag every cell in the region, replacing whatever flag it had.
    Mark(Region, CellFlag),
    /// Give every cell that is not solid *at this point in the list* the initial velocity.
    SeedVelocity,
}

/// Floor first, then the initial flow, then the open faces.
pub const WIND_TUNNEL: [Step; 3] = [
    Step::Mark(Region::Floor, CellFlag::Solid),
    Step::SeedVelocity,
    Step::Mark(Region::OpenFaces, CellFlag::DomainBoundary),
];

/// The outcome of classifying a single cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellInit {
    pub flag: CellFlag,
    /// New value for the y velocity component, if the cell was seeded.
    pub velocity_y: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    steps: Vec<Step>,
    /// Initial flow speed along +y, in lattice units.
    initial_velocity: f32,
}

impl Classifier {
    pub fn new(steps: impl Into<Vec<Step>>, initial_velocity: f32) -> Self {
        Self {
            steps: steps.into(),
            initial_velocity,
        }
    }

    pub fn wind_tunnel(initial_velocity: f32) -> Self {
        Self::new(WIND_TUNNEL, initial_velocity)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Classifies the cell at `p` in a grid of `size` cells, starting from the flag it already
    /// carries (e.g. [`CellFlag::Solid`] from voxelized geometry).
    pub fn classify(&self, p: UVec3, size: UVec3, prior: CellFlag) -> CellInit {
        let mut cell = CellInit {
            flag: prior,
            velocity_y: None,
        };

        for step in &self.steps {
            match *step {
                Step::Mark(region, flag) => {
                    if region.contains(p, size) {
                        cell.flag = flag;
                    }
                }
                Step::SeedVelocity => {
                    if !cell.flag.is_solid() {
                        cell.velocity_y = Some(self.initial_velocity);
                    }
                }
            }
        }

        cell
    }

    /// Classifies every cell of the domain in parallel.
    pub fn apply(&self, domain: &mut Domain) {
        let size = domain.size();

        Zip::indexed(&mut domain.flags)
            .and(&mut domain.velocity)
            .par_for_each(|(x, y, z), flag, u| {
                let p = UVec3::new(x as u32, y as u32, z as u32);
                let cell = self.classify(p, size, *flag);

                *flag = cell.flag;
                if let Some(v) = cell.velocity_y {
                    u.y = v;
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    const U0: f32 = 0.075;

    fn classified(size: UVec3) -> Domain {
        let mut domain = Domain::new(size);
        Classifier::wind_tunnel(U0).apply(&mut domain);
        domain
    }

    #[test]
    fn test_floor_is_solid_away_from_faces() {
        let size = UVec3::new(6, 7, 5);
        let domain = classified(size);

        for x in 1..5 {
            for y in 1..6 {
                assert_eq!(domain.flags[(x, y, 0)], CellFlag::Solid, "floor cell ({x}, {y}, 0)");
                assert_eq!(domain.velocity[(x, y, 0)], Vec3::ZERO);
            }
        }
    }

    #[test]
    fn test_open_faces_win_over_floor() {
        let size = UVec3::new(6, 7, 5);
        let domain = classified(size);

        for ((x, y, z), &flag) in domain.flags.indexed_iter() {
            let p = UVec3::new(x as u32, y as u32, z as u32);
            if Region::OpenFaces.contains(p, size) {
                assert_eq!(flag, CellFlag::DomainBoundary, "face cell {p}");
            }
        }

        // Floor cells on an x/y face were solid when velocities were seeded.
        assert_eq!(domain.flags[(0, 3, 0)], CellFlag::DomainBoundary);
        assert_eq!(domain.velocity[(0, 3, 0)], Vec3::ZERO);
        assert_eq!(domain.velocity[(0, 3, 2)], Vec3::new(0.0, U0, 0.0));
    }

    #[test]
    fn test_interior_cells_get_initial_velocity() {
        let size = UVec3::new(5, 5, 5);
        let domain = classified(size);

        for x in 1..4 {
            for y in 1..4 {
                for z in 1..4 {
                    assert_eq!(domain.flags[(x, y, z)], CellFlag::Fluid);
                    assert_eq!(domain.velocity[(x, y, z)], Vec3::new(0.0, U0, 0.0));
                }
            }
        }
    }

    #[test]
    fn test_voxelized_geometry_is_not_seeded() {
        let size = UVec3::new(5, 5, 5);
        let mut domain = Domain::new(size);
        domain.flags[(2, 2, 2)] = CellFlag::Solid;
        domain.velocity[(2, 2, 2)] = Vec3::new(0.5, 0.0, 0.0);

        Classifier::wind_tunnel(U0).apply(&mut domain);

        assert_eq!(domain.flags[(2, 2, 2)], CellFlag::Solid);
        assert_eq!(domain.velocity[(2, 2, 2)], Vec3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn test_order_of_steps_is_the_precedence() {
        let size = UVec3::new(4, 4, 4);
        let edge = UVec3::new(0, 2, 0);
        let reversed = Classifier::new(
            [
                Step::Mark(Region::OpenFaces, CellFlag::DomainBoundary),
                Step::SeedVelocity,
                Step::Mark(Region::Floor, CellFlag::Solid),
            ],
            U0,
        );

        let tunnel = Classifier::wind_tunnel(U0).classify(edge, size, CellFlag::Fluid);
        assert_eq!(tunnel, CellInit { flag: CellFlag::DomainBoundary, velocity_y: None });

        let swapped = reversed.classify(edge, size, CellFlag::Fluid);
        assert_eq!(swapped, CellInit { flag: CellFlag::Solid, velocity_y: Some(U0) });
    }

    #[test]
    fn test_single_layer_grid() {
        // With one layer the floor and the top face coincide.
        let size = UVec3::new(3, 3, 1);
        let domain = classified(size);

        assert!(domain.flags.iter().all(|&f| f == CellFlag::DomainBoundary));
        assert!(domain.velocity.iter().all(|&u| u == Vec3::ZERO));
    }
}
