use domain::Domain;
use thiserror::Error;

pub mod classify;
pub mod domain;
pub mod force;
pub mod geometry;
pub mod resolution;
pub mod solver;
pub mod units;

/// A lattice solver that owns the domain fields and advances them in time.
pub trait Solver {
    fn domain(&self) -> &Domain;

    fn domain_mut(&mut self) -> &mut Domain;

    /// Number of completed time steps.
    fn t(&self) -> u64;

    /// Builds the solver state from the current flags, densities and velocities. Called once
    /// after the domain is set up and before the first step.
    fn initialize(&mut self);

    /// Advances the simulation by one time step.
    fn step(&mut self) -> Result<(), SolverError>;

    /// Recomputes [`Domain::force`] from the current state.
    fn update_force_field(&mut self);

    /// Hands control to the solver's own open-ended run loop. Only returns on error.
    fn run_interactive(&mut self) -> Result<(), SolverError>;
}

#[derive(Debug, Error, PartialEq)]
pub enum SolverError {
    #[error("simulation diverged at t = {t}")]
    Diverged { t: u64 },
}
