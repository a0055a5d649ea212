use std::sync::atomic::{AtomicBool, Ordering};

use glam::{IVec3, UVec3, Vec3};
use indicatif::ProgressBar;
use ndarray::{Array3, Zip};
use tracing::info;

use crate::{domain::{CellFlag, Domain}, Solver, SolverError};

const Q: usize = 19;

/// Lattice velocities. Every odd direction is followed by its opposite.
const C: [IVec3; Q] = [
    IVec3::new(0, 0, 0),
    IVec3::new(1, 0, 0), IVec3::new(-1, 0, 0),
    IVec3::new(0, 1, 0), IVec3::new(0, -1, 0),
    IVec3::new(0, 0, 1), IVec3::new(0, 0, -1),
    IVec3::new(1, 1, 0), IVec3::new(-1, -1, 0),
    IVec3::new(1, 0, 1), IVec3::new(-1, 0, -1),
    IVec3::new(0, 1, 1), IVec3::new(0, -1, -1),
    IVec3::new(1, -1, 0), IVec3::new(-1, 1, 0),
    IVec3::new(1, 0, -1), IVec3::new(-1, 0, 1),
    IVec3::new(0, 1, -1), IVec3::new(0, -1, 1),
];

const W0: f32 = 1.0 / 3.0;
const WS: f32 = 1.0 / 18.0;
const WE: f32 = 1.0 / 36.0;

const W: [f32; Q] = [
    W0,
    WS, WS, WS, WS, WS, WS,
    WE, WE, WE, WE, WE, WE, WE, WE, WE, WE, WE, WE,
];

/// Smagorinsky-Lilly coefficient `18 * sqrt(2) * (C * Δ)²` for `C ≈ 0.173`, `Δ = 1`.
const SMAGORINSKY: f32 = 0.764_212_2;

/// How often the interactive monitor refreshes, in steps.
const MONITOR_INTERVAL: u64 = 100;

/// Single-relaxation-time D3Q19 lattice Boltzmann solver on the CPU.
///
/// - [`CellFlag::Fluid`] cells stream and collide.
/// - [`CellFlag::Solid`] cells are walls with half-way bounce-back.
/// - [`CellFlag::DomainBoundary`] cells are held at the equilibrium of their density and velocity.
///
/// Neighbours outside the grid wrap around periodically.
#[derive(Debug, Clone)]
pub struct LbmD3Q19 {
    domain: Domain,
    /// Kinematic viscosity, in lattice units.
    nu: f32,
    /// Whether to add Smagorinsky-Lilly eddy viscosity.
    subgrid: bool,
    t: u64,

    /// Post-collision distributions of the last completed step.
    f: Array3<[f32; Q]>,
    /// Scratch buffer the next step writes into.
    f_next: Array3<[f32; Q]>,
}

impl LbmD3Q19 {
    pub fn new(size: UVec3, nu: f32) -> Self {
        let domain = Domain::new(size);
        let f = Array3::from_elem(domain.flags.raw_dim(), [0.0; Q]);

        Self {
            domain,
            nu,
            subgrid: true,
            t: 0,
            f_next: f.clone(),
            f,
        }
    }

    pub fn with_subgrid(mut self, subgrid: bool) -> Self {
        self.subgrid = subgrid;
        self
    }

    pub fn nu(&self) -> f32 {
        self.nu
    }

    /// Relaxation rate `1 / τ` for the molecular viscosity alone.
    pub fn omega(&self) -> f32 {
        1.0 / (3.0 * self.nu + 0.5)
    }

    /// Largest velocity magnitude in the domain.
    pub fn max_speed(&self) -> f32 {
        self.domain.velocity.iter().map(|u| u.length()).fold(0.0, f32::max)
    }
}

impl Solver for LbmD3Q19 {
    fn domain(&self) -> &Domain {
        &self.domain
    }

    fn domain_mut(&mut self) -> &mut Domain {
        &mut self.domain
    }

    fn t(&self) -> u64 {
        self.t
    }

    fn initialize(&mut self) {
        Zip::from(&mut self.f)
            .and(&self.domain.flags)
            .and(&self.domain.density)
            .and(&mut self.domain.velocity)
            .par_for_each(|f, &flag, &rho, u| {
                if flag.is_solid() {
                    *u = Vec3::ZERO;
                }
                *f = equilibrium(rho, *u);
            });

        self.t = 0;
    }

    fn step(&mut self) -> Result<(), SolverError> {
        let size = self.domain.size();
        let omega = self.omega();
        let subgrid = self.subgrid;
        let diverged = AtomicBool::new(false);

        let f = &self.f;
        let flags = &self.domain.flags;

        Zip::indexed(&mut self.f_next)
            .and(flags)
            .and(&mut self.domain.density)
            .and(&mut self.domain.velocity)
            .par_for_each(|(x, y, z), out, &flag, rho, u| match flag {
                CellFlag::Solid => *out = f[(x, y, z)],
                CellFlag::DomainBoundary => *out = equilibrium(*rho, *u),
                CellFlag::Fluid => {
                    let p = IVec3::new(x as i32, y as i32, z as i32);
                    let here = &f[(x, y, z)];

                    let fi: [f32; Q] = std::array::from_fn(|i| {
                        let n = wrap(p - C[i], size);
                        if flags[n].is_solid() {
                            here[opposite(i)]
                        } else {
                            f[n][i]
                        }
                    });

                    let (r, v) = moments(&fi);
                    if !r.is_finite() {
                        diverged.store(true, Ordering::Relaxed);
                    }

                    let feq = equilibrium(r, v);
                    let w = if subgrid { subgrid_omega(omega, &fi, &feq, r) } else { omega };

                    for i in 0..Q {
                        out[i] = fi[i] + w * (feq[i] - fi[i]);
                    }

                    *rho = r;
                    *u = v;
                }
            });

        std::mem::swap(&mut self.f, &mut self.f_next);
        self.t += 1;

        if diverged.into_inner() {
            return Err(SolverError::Diverged { t: self.t });
        }

        Ok(())
    }

    fn update_force_field(&mut self) {
        let size = self.domain.size();
        let f = &self.f;
        let flags = &self.domain.flags;

        Zip::indexed(&mut self.domain.force)
            .and(flags)
            .par_for_each(|(x, y, z), force, &flag| {
                if !flag.is_solid() {
                    *force = Vec3::ZERO;
                    return;
                }

                let p = IVec3::new(x as i32, y as i32, z as i32);
                let mut sum = Vec3::ZERO;

                // Every population heading into this cell from a non-solid neighbour is
                // reflected, transferring twice its momentum.
                for i in 1..Q {
                    let Some(n) = neighbor(p - C[i], size) else { continue };
                    if !flags[n].is_solid() {
                        sum += 2.0 * f[n][i] * C[i].as_vec3();
                    }
                }

                *force = sum;
            });
    }

    fn run_interactive(&mut self) -> Result<(), SolverError> {
        info!(nu = self.nu, subgrid = self.subgrid, "running interactively, interrupt to stop");

        let monitor = ProgressBar::new_spinner();

        loop {
            self.step()?;

            if self.t % MONITOR_INTERVAL == 0 {
                monitor.set_message(format!("t = {}  max |u| = {:.4}", self.t, self.max_speed()));
                monitor.tick();
            }
        }
    }
}

#[inline]
fn opposite(i: usize) -> usize {
    match i {
        0 => 0,
        i if i % 2 == 1 => i + 1,
        i => i - 1,
    }
}

#[inline]
fn wrap(p: IVec3, size: UVec3) -> (usize, usize, usize) {
    let s = size.as_ivec3();
    (
        p.x.rem_euclid(s.x) as usize,
        p.y.rem_euclid(s.y) as usize,
        p.z.rem_euclid(s.z) as usize,
    )
}

#[inline]
fn neighbor(p: IVec3, size: UVec3) -> Option<(usize, usize, usize)> {
    let inside = p.cmpge(IVec3::ZERO).all() && p.cmplt(size.as_ivec3()).all();
    inside.then_some((p.x as usize, p.y as usize, p.z as usize))
}

fn equilibrium(rho: f32, u: Vec3) -> [f32; Q] {
    let uu = 1.5 * u.length_squared();

    std::array::from_fn(|i| {
        let cu = 3.0 * C[i].as_vec3().dot(u);
        W[i] * rho * (1.0 + cu + 0.5 * cu * cu - uu)
    })
}

/// Density and velocity of a set of distributions.
fn moments(f: &[f32; Q]) -> (f32, Vec3) {
    let mut rho = 0.0;
    let mut j = Vec3::ZERO;

    for i in 0..Q {
        rho += f[i];
        j += f[i] * C[i].as_vec3();
    }

    (rho, j / rho)
}

/// Relaxation rate including the eddy viscosity from the local non-equilibrium stress.
fn subgrid_omega(omega: f32, f: &[f32; Q], feq: &[f32; Q], rho: f32) -> f32 {
    let tau0 = 1.0 / omega;
    let (mut hxx, mut hyy, mut hzz, mut hxy, mut hxz, mut hyz) = (0.0, 0.0, 0.0, 0.0, 0.0, 0.0);

    for i in 1..Q {
        let neq = f[i] - feq[i];
        let c = C[i].as_vec3();
        hxx += c.x * c.x * neq;
        hyy += c.y * c.y * neq;
        hzz += c.z * c.z * neq;
        hxy += c.x * c.y * neq;
        hxz += c.x * c.z * neq;
        hyz += c.y * c.z * neq;
    }

    let q: f32 = hxx * hxx + hyy * hyy + hzz * hzz + 2.0 * (hxy * hxy + hxz * hxz + hyz * hyz);

    2.0 / (tau0 + (tau0 * tau0 + SMAGORINSKY * q.sqrt() / rho).sqrt())
}
