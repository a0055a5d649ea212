use glam::DVec3;
use ndarray::Zip;
use rayon::prelude::*;

use crate::domain::{CellFlag, Domain};

/// Total boundary force on all solid cells, in lattice units.
///
/// Partial sums are accumulated in `f64` per worker and combined at the end.
pub fn solid_force(domain: &Domain) -> DVec3 {
    Zip::from(&domain.flags)
        .and(&domain.force)
        .into_par_iter()
        .fold(
            || DVec3::ZERO,
            |acc, (&flag, force)| {
                if flag == CellFlag::Solid {
                    acc + force.as_dvec3()
                } else {
                    acc
                }
            },
        )
        .reduce(|| DVec3::ZERO, |a, b| a + b)
}
