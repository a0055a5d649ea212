use thiserror::Error;

/// A physical dimension that can be converted between SI and lattice units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Length,
    Velocity,
    Density,
    Viscosity,
    Time,
    Force,
    Mass,
}

/// Fixed mapping between SI and lattice units.
///
/// Built once from a reference length, velocity and density given in both unit systems. Every
/// other conversion factor follows from the three base scales (metre, second and kilogram per
/// lattice unit).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitSystem {
    /// Metres per lattice length unit.
    m: f64,
    /// Seconds per lattice time step.
    s: f64,
    /// Kilograms per lattice mass unit.
    kg: f64,
}

impl UnitSystem {
    /// Creates a unit system such that `lbm_length` lattice cells span `si_length` metres, a
    /// lattice velocity of `lbm_velocity` corresponds to `si_velocity` m/s and a lattice density
    /// of `lbm_density` corresponds to `si_density` kg/m³.
    pub fn new(
        lbm_length: f64,
        lbm_velocity: f64,
        lbm_density: f64,
        si_length: f64,
        si_velocity: f64,
        si_density: f64,
    ) -> Result<UnitSystem, UnitError> {
        for (name, value) in [
            ("lbm_length", lbm_length),
            ("lbm_velocity", lbm_velocity),
            ("lbm_density", lbm_density),
            ("si_length", si_length),
            ("si_velocity", si_velocity),
            ("si_density", si_density),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(UnitError::NonPositive { name, value });
            }
        }

        let m = si_length / lbm_length;
        let s = lbm_velocity / si_velocity * m;
        let kg = si_density / lbm_density * m * m * m;

        Ok(UnitSystem { m, s, kg })
    }

    /// How many SI units one lattice unit of `dim` is worth.
    pub fn factor(&self, dim: Dimension) -> f64 {
        let Self { m, s, kg } = *self;

        match dim {
            Dimension::Length => m,
            Dimension::Velocity => m / s,
            Dimension::Density => kg / (m * m * m),
            Dimension::Viscosity => m * m / s,
            Dimension::Time => s,
            Dimension::Force => kg * m / (s * s),
            Dimension::Mass => kg,
        }
    }

    #[inline]
    pub fn to_native(&self, dim: Dimension, si: f64) -> f64 {
        si / self.factor(dim)
    }

    #[inline]
    pub fn to_si(&self, dim: Dimension, native: f64) -> f64 {
        native * self.factor(dim)
    }

    pub fn length(&self, si: f64) -> f64 {
        self.to_native(Dimension::Length, si)
    }

    pub fn si_length(&self, x: f64) -> f64 {
        self.to_si(Dimension::Length, x)
    }

    pub fn velocity(&self, si: f64) -> f64 {
        self.to_native(Dimension::Velocity, si)
    }

    pub fn si_velocity(&self, u: f64) -> f64 {
        self.to_si(Dimension::Velocity, u)
    }

    pub fn density(&self, si: f64) -> f64 {
        self.to_native(Dimension::Density, si)
    }

    pub fn si_density(&self, rho: f64) -> f64 {
        self.to_si(Dimension::Density, rho)
    }

    pub fn viscosity(&self, si: f64) -> f64 {
        self.to_native(Dimension::Viscosity, si)
    }

    pub fn si_viscosity(&self, nu: f64) -> f64 {
        self.to_si(Dimension::Viscosity, nu)
    }

    pub fn time(&self, si: f64) -> f64 {
        self.to_native(Dimension::Time, si)
    }

    pub fn si_time(&self, t: f64) -> f64 {
        self.to_si(Dimension::Time, t)
    }

    /// Number of whole lattice steps covering `si` seconds, rounded to the nearest step.
    pub fn steps(&self, si: f64) -> u64 {
        (self.time(si) + 0.5).max(0.0) as u64
    }

    pub fn force(&self, si: f64) -> f64 {
        self.to_native(Dimension::Force, si)
    }

    pub fn si_force(&self, f: f64) -> f64 {
        self.to_si(Dimension::Force, f)
    }

    /// Reynolds number `U·L/ν` from SI quantities.
    pub fn si_reynolds(&self, si_length: f64, si_velocity: f64, si_viscosity: f64) -> f64 {
        si_length * si_velocity / si_viscosity
    }

    /// Reynolds number `U·L/ν` from lattice quantities. Agrees with [`Self::si_reynolds`] for the
    /// same physical setup since the number is dimensionless.
    pub fn reynolds(&self, length: f64, velocity: f64, viscosity: f64) -> f64 {
        length * velocity / viscosity
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum UnitError {
    #[error("reference value `{name}` must be positive and finite, got {value}")]
    NonPositive { name: &'static str, value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn air() -> UnitSystem {
        UnitSystem::new(26.0, 0.075, 1.0, 2.4, 1.0, 1.225).unwrap()
    }

    #[test]
    fn test_round_trip_every_dimension() {
        let units = air();
        let dims = [
            Dimension::Length,
            Dimension::Velocity,
            Dimension::Density,
            Dimension::Viscosity,
            Dimension::Time,
            Dimension::Force,
            Dimension::Mass,
        ];

        for dim in dims {
            for v in [-3.5, 0.0, 1e-7, 0.075, 42.0, 1.5e6] {
                let back = units.to_si(dim, units.to_native(dim, v));
                assert!(
                    (back - v).abs() <= 1e-12 * v.abs().max(1.0),
                    "{dim:?}: {v} came back as {back}"
                );
            }
        }
    }

    #[test]
    fn test_reference_values_map_onto_each_other() {
        let units = air();

        assert!((units.si_length(26.0) - 2.4).abs() < 1e-12);
        assert!((units.velocity(1.0) - 0.075).abs() < 1e-12);
        assert!((units.density(1.225) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_reynolds_is_unit_independent() {
        let units = air();
        let si_nu = 1.48e-5;
        let si_re = units.si_reynolds(2.4, 1.0, si_nu);
        let re = units.reynolds(26.0, 0.075, units.viscosity(si_nu));

        assert!((si_re - 2.4 / 1.48e-5).abs() < 1e-6);
        assert!((si_re - re).abs() / si_re < 1e-9, "si Re {si_re} vs lattice Re {re}");
    }

    #[test]
    fn test_steps_rounds_to_nearest() {
        let units = air();
        let s = units.si_time(1.0);

        assert_eq!(units.steps(10.4 * s), 10);
        assert_eq!(units.steps(10.6 * s), 11);
        assert_eq!(units.steps(0.0), 0);
    }

    #[test]
    fn test_rejects_non_positive_reference() {
        assert_eq!(
            UnitSystem::new(26.0, 0.0, 1.0, 2.4, 1.0, 1.225),
            Err(UnitError::NonPositive { name: "lbm_velocity", value: 0.0 }),
        );
        assert!(UnitSystem::new(26.0, 0.075, 1.0, -2.4, 1.0, 1.225).is_err());
        assert!(UnitSystem::new(f64::NAN, 0.075, 1.0, 2.4, 1.0, 1.225).is_err());
    }
}
