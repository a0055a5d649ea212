use glam::{Mat3, UVec3, Vec3};
use ndarray::{Axis, Zip};
use tracing::debug;

use crate::domain::{CellFlag, Domain};

/// A triangulated surface.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub triangles: Vec<[Vec3; 3]>,
}

impl Mesh {
    pub fn new(triangles: Vec<[Vec3; 3]>) -> Self {
        Self { triangles }
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn vertices(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.triangles.iter().flatten().copied()
    }

    /// Axis-aligned bounding box as `(min, max)`. Degenerate at the origin for an empty mesh.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        if self.is_empty() {
            return (Vec3::ZERO, Vec3::ZERO);
        }

        self.vertices().fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |(min, max), v| (min.min(v), max.max(v)),
        )
    }

    pub fn center(&self) -> Vec3 {
        let (min, max) = self.bounds();
        (min + max) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        let (min, max) = self.bounds();
        max - min
    }

    /// Applies `f` to every vertex.
    pub fn map_vertices(&mut self, f: impl Fn(Vec3) -> Vec3) {
        for tri in &mut self.triangles {
            for v in tri {
                *v = f(*v);
            }
        }
    }

    /// Rotates the mesh about its bounding box centre.
    pub fn rotate(&mut self, rotation: Mat3) {
        let c = self.center();
        self.map_vertices(|v| c + rotation * (v - c));
    }

    /// Scales the mesh uniformly about its bounding box centre.
    pub fn scale(&mut self, factor: f32) {
        let c = self.center();
        self.map_vertices(|v| c + factor * (v - c));
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.map_vertices(|v| v + offset);
    }
}

/// Composes three rotations about the x, y and z axes (in degrees) as `Rx * Ry * Rz`.
pub fn rotation_from_degrees(angles: [f32; 3]) -> Mat3 {
    let [rx, ry, rz] = angles.map(f32::to_radians);

    Mat3::from_axis_angle(Vec3::X, rx)
        * Mat3::from_axis_angle(Vec3::Y, ry)
        * Mat3::from_axis_angle(Vec3::Z, rz)
}

/// How large the mesh should end up, in lattice units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeshSize {
    /// Scale so the longest side of the bounding box spans this many cells.
    LargestSide(f32),
    /// Multiply every coordinate by this factor.
    Factor(f32),
    /// Scale to the largest size that still fits the grid.
    FitBox,
}

/// Maps a mesh from its file coordinates into the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub rotation: Mat3,
    pub size: MeshSize,
    /// Where the bounding box centre ends up, in lattice units.
    pub center: Vec3,
}

impl Placement {
    /// Rotates, scales and moves `mesh` into place inside a grid of `grid` cells.
    pub fn apply(&self, mesh: &mut Mesh, grid: UVec3) {
        mesh.rotate(self.rotation);

        let extent = mesh.extent();
        let factor = match self.size {
            MeshSize::LargestSide(side) => side / extent.max_element(),
            MeshSize::Factor(f) => f,
            MeshSize::FitBox => ((grid.as_vec3() - 1.0) / extent).min_element(),
        };

        if factor.is_finite() {
            mesh.scale(factor);
        }

        mesh.translate(self.center - mesh.center());
    }
}

/// Rasterizes a surface mesh into solid cells.
pub trait Voxelizer {
    /// Marks every cell whose centre lies inside `mesh` as [`CellFlag::Solid`]. Returns the
    /// number of cells marked.
    fn voxelize(&self, mesh: &Mesh, domain: &mut Domain) -> usize;
}

/// Voxelizes a closed mesh by casting one ray per `(y, z)` column along +x and counting surface
/// crossings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParityVoxelizer;

impl Voxelizer for ParityVoxelizer {
    fn voxelize(&self, mesh: &Mesh, domain: &mut Domain) -> usize {
        let size = domain.size();
        let (ny, nz) = (size.y as usize, size.z as usize);

        // Crossings per column, gathered triangle by triangle.
        let mut hits: Vec<Vec<f32>> = vec![Vec::new(); ny * nz];

        for tri in &mesh.triangles {
            let lo = tri[0].min(tri[1]).min(tri[2]);
            let hi = tri[0].max(tri[1]).max(tri[2]);

            // Spans are taken in ray coordinates so every column whose ray can hit is tested.
            let Some((y0, y1)) = cell_span(lo.y - RAY_JITTER.0, hi.y - RAY_JITTER.0, ny) else { continue };
            let Some((z0, z1)) = cell_span(lo.z - RAY_JITTER.1, hi.z - RAY_JITTER.1, nz) else { continue };

            for y in y0..=y1 {
                for z in z0..=z1 {
                    if let Some(x) = ray_x(tri, y as f32 + RAY_JITTER.0, z as f32 + RAY_JITTER.1) {
                        hits[y * nz + z].push(x);
                    }
                }
            }
        }

        for column in &mut hits {
            column.sort_by(f32::total_cmp);
        }

        let counts = Zip::indexed(domain.flags.lanes_mut(Axis(0))).par_map_collect(|(y, z), mut lane| {
            let column = &hits[y * nz + z];
            let mut count: usize = 0;

            for pair in column.chunks_exact(2) {
                let x0 = pair[0].ceil().max(0.0) as usize;
                let x1 = pair[1].floor();
                if x1 < 0.0 {
                    continue;
                }

                for x in x0..=(x1 as usize).min(lane.len().saturating_sub(1)) {
                    if (x as f32) >= pair[0] && (x as f32) <= pair[1] {
                        lane[x] = CellFlag::Solid;
                        count += 1;
                    }
                }
            }

            count
        });

        let marked = counts.sum();
        debug!(triangles = mesh.len(), marked, "voxelized mesh");

        marked
    }
}

/// Tiny offset so rays don't pass exactly through shared edges and vertices.
const RAY_JITTER: (f32, f32) = (1.3e-4, 2.9e-4);

/// Range of integer cell coordinates in `[lo, hi]`, clipped to `0..n`.
fn cell_span(lo: f32, hi: f32, n: usize) -> Option<(usize, usize)> {
    let a = lo.ceil().max(0.0);
    let b = hi.floor().min(n as f32 - 1.0);

    (a <= b).then_some((a as usize, b as usize))
}

/// X coordinate where the ray `(y, z) + t * x̂` crosses the triangle, if it does.
fn ray_x(tri: &[Vec3; 3], y: f32, z: f32) -> Option<f32> {
    let [a, b, c] = *tri;

    let d = (b.y - a.y) * (c.z - a.z) - (c.y - a.y) * (b.z - a.z);
    if d.abs() < f32::EPSILON {
        return None;
    }

    let u = ((b.y - y) * (c.z - z) - (c.y - y) * (b.z - z)) / d;
    let v = ((c.y - y) * (a.z - z) - (a.y - y) * (c.z - z)) / d;
    let w = 1.0 - u - v;

    (u >= 0.0 && v >= 0.0 && w >= 0.0).then(|| u * a.x + v * b.x + w * c.x)
}
