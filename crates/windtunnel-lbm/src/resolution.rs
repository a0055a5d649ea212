use glam::{UVec3, Vec3};
use thiserror::Error;

/// Computes integer grid dimensions with the given aspect ratio whose cell count does not exceed
/// `budget`.
///
/// Every dimension is at least one cell. If that floor pushes the cell count over the budget, the
/// largest dimension is shrunk until the grid fits.
pub fn resolution(aspect: Vec3, budget: u64) -> Result<UVec3, ResolutionError> {
    if budget == 0 {
        return Err(ResolutionError::EmptyBudget);
    }

    if !aspect.is_finite() || aspect.min_element() <= 0.0 {
        return Err(ResolutionError::InvalidAspect(aspect));
    }

    let a = aspect.as_dvec3();
    let scale = (budget as f64 / (a.x * a.y * a.z)).cbrt();

    // Nudge so that exact products like cbrt(1000) * 2 don't floor to one cell short.
    let mut n = (a * scale * (1.0 + 1e-9)).floor().max(glam::DVec3::ONE).as_uvec3();

    while cells(n) > budget {
        let axis = (0..3).max_by_key(|&i| (n[i], std::cmp::Reverse(i))).unwrap_or(0);
        if n[axis] == 1 {
            break;
        }
        n[axis] -= 1;
    }

    Ok(n)
}

#[inline]
fn cells(n: UVec3) -> u64 {
    n.x as u64 * n.y as u64 * n.z as u64
}

#[derive(Debug, Error, PartialEq)]
pub enum ResolutionError {
    #[error("cell budget must be at least one cell")]
    EmptyBudget,
    #[error("aspect ratio components must be positive and finite, got {0}")]
    InvalidAspect(Vec3),
}
