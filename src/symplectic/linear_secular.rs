//! Exact propagator of the Laplace–Lagrange linear secular dynamics.
//!
//! The complex combinations `x = (κ - iη)/√2`, `y = (σ - iρ)/√2` obey
//! `dx/dt = -iA x`, `dy/dt = -iB y` with `A`, `B` the real symmetric
//! coupling matrices; the exact finite-step map is the unitary rotation
//! `exp(-i·dt·A)` applied to `x` (and likewise for `y`). The exponentials
//! are built once from the symmetric eigendecomposition
//! `U · diag(e^(-iλdt)) · Uᵀ` and rebuilt only when the timestep changes,
//! so the operator composes exactly: applying `dt₁` then `dt₂` equals a
//! single application of `dt₁+dt₂`.

use nalgebra::{Complex, DMatrix, DVector};

use super::{EvolutionOperator, SLOT_ETA, SLOT_KAPPA, SLOT_RHO, SLOT_SIGMA};
use crate::constants::{RT2, RT2_INV};
use crate::poincare_errors::PoincareError;
use crate::secular::LaplaceLagrangeSystem;
use crate::system::PoincareSystem;

#[derive(Debug, Clone)]
pub struct LinearSecularOperator {
    dt: f64,
    ecc_vectors: DMatrix<f64>,
    ecc_freqs: DVector<f64>,
    inc_vectors: DMatrix<f64>,
    inc_freqs: DVector<f64>,
    ecc_rotation: DMatrix<Complex<f64>>,
    inc_rotation: DMatrix<Complex<f64>>,
}

/// `U · diag(e^(-iλdt)) · Uᵀ` for a real symmetric eigendecomposition.
fn rotation_matrix(
    vectors: &DMatrix<f64>,
    freqs: &DVector<f64>,
    dt: f64,
) -> DMatrix<Complex<f64>> {
    let n = freqs.len();
    DMatrix::from_fn(n, n, |r, c| {
        let mut value = Complex::new(0.0, 0.0);
        for m in 0..n {
            let phase = Complex::new(0.0, -freqs[m] * dt).exp();
            value += Complex::new(vectors[(r, m)] * vectors[(c, m)], 0.0) * phase;
        }
        value
    })
}

impl LinearSecularOperator {
    /// Build from a system by deriving its Laplace–Lagrange matrices.
    pub fn from_system(system: &PoincareSystem, dt: f64) -> Result<Self, PoincareError> {
        let ll = LaplaceLagrangeSystem::from_system(system)?;
        Ok(Self::from_matrices(
            ll.eccentricity_matrix().clone(),
            ll.inclination_matrix().clone(),
            dt,
        ))
    }

    /// Build from explicit real symmetric coupling matrices (for instance
    /// the ones extracted from a [`PoincareHamiltonian`]
    /// (crate::hamiltonian::PoincareHamiltonian)).
    pub fn from_matrices(ecc: DMatrix<f64>, inc: DMatrix<f64>, dt: f64) -> Self {
        let ecc_eig = ecc.symmetric_eigen();
        let inc_eig = inc.symmetric_eigen();
        let ecc_rotation = rotation_matrix(&ecc_eig.eigenvectors, &ecc_eig.eigenvalues, dt);
        let inc_rotation = rotation_matrix(&inc_eig.eigenvectors, &inc_eig.eigenvalues, dt);
        LinearSecularOperator {
            dt,
            ecc_vectors: ecc_eig.eigenvectors,
            ecc_freqs: ecc_eig.eigenvalues,
            inc_vectors: inc_eig.eigenvectors,
            inc_freqs: inc_eig.eigenvalues,
            ecc_rotation,
            inc_rotation,
        }
    }

    /// Operator identical to this one except for its timestep.
    pub fn with_dt(&self, dt: f64) -> Self {
        let mut op = self.clone();
        op.set_dt(dt);
        op
    }

    fn n_planets(&self) -> usize {
        self.ecc_freqs.len()
    }
}

impl EvolutionOperator for LinearSecularOperator {
    fn dt(&self) -> f64 {
        self.dt
    }

    fn set_dt(&mut self, dt: f64) {
        self.dt = dt;
        self.ecc_rotation = rotation_matrix(&self.ecc_vectors, &self.ecc_freqs, dt);
        self.inc_rotation = rotation_matrix(&self.inc_vectors, &self.inc_freqs, dt);
    }

    fn apply_to_state_vector(&self, state: &mut [f64]) {
        let n = self.n_planets();
        let x = DVector::from_fn(n, |j, _| {
            Complex::new(state[6 * j + SLOT_KAPPA], -state[6 * j + SLOT_ETA]) * RT2_INV
        });
        let y = DVector::from_fn(n, |j, _| {
            Complex::new(state[6 * j + SLOT_SIGMA], -state[6 * j + SLOT_RHO]) * RT2_INV
        });
        let x_new = &self.ecc_rotation * x;
        let y_new = &self.inc_rotation * y;
        for j in 0..n {
            state[6 * j + SLOT_KAPPA] = RT2 * x_new[j].re;
            state[6 * j + SLOT_ETA] = -RT2 * x_new[j].im;
            state[6 * j + SLOT_SIGMA] = RT2 * y_new[j].re;
            state[6 * j + SLOT_RHO] = -RT2 * y_new[j].im;
        }
    }
}

#[cfg(test)]
mod linear_secular_test {
    use super::*;
    use crate::particle::Coordinates;
    use crate::snapshot::{BodyState, SystemSnapshot};
    use approx::assert_relative_eq;

    fn system() -> PoincareSystem {
        let mut snap = SystemSnapshot::new(1.0, 1.0);
        snap.add_body(BodyState {
            mass: 1e-5,
            semi_major_axis: 1.0,
            eccentricity: 0.03,
            inclination: 0.02,
            mean_longitude: 0.4,
            pomega: 0.9,
            ascending_node_longitude: 0.2,
        });
        snap.add_body(BodyState {
            mass: 2e-5,
            semi_major_axis: 1.9,
            eccentricity: 0.01,
            inclination: 0.04,
            mean_longitude: 5.5,
            pomega: -2.1,
            ascending_node_longitude: 1.4,
        });
        PoincareSystem::from_snapshot(&snap, Coordinates::CanonicalHeliocentric).unwrap()
    }

    #[test]
    fn test_composition_law() {
        let sys = system();
        let (dt1, dt2) = (431.7, 1002.3);
        let op1 = LinearSecularOperator::from_system(&sys, dt1).unwrap();
        let op2 = op1.with_dt(dt2);
        let op12 = op1.with_dt(dt1 + dt2);

        let mut split = sys.operator_state_vector();
        op1.apply_to_state_vector(&mut split);
        op2.apply_to_state_vector(&mut split);

        let mut joint = sys.operator_state_vector();
        op12.apply_to_state_vector(&mut joint);

        for (a, b) in split.iter().zip(&joint) {
            assert_relative_eq!(a, b, epsilon = 1e-12, max_relative = 1e-10);
        }
    }

    #[test]
    fn test_amd_conserved() {
        // the rotation is unitary: Σ|x|² and Σ|y|² are invariants
        let mut sys = system();
        let amd_of = |s: &PoincareSystem| {
            s.particles()
                .iter()
                .map(|p| p.gamma() + p.q())
                .sum::<f64>()
        };
        let before = amd_of(&sys);
        LinearSecularOperator::from_system(&sys, 2.5e3)
            .unwrap()
            .apply(&mut sys)
            .unwrap();
        assert_relative_eq!(amd_of(&sys), before, max_relative = 1e-11);
    }

    #[test]
    fn test_lambda_and_longitude_untouched() {
        let mut sys = system();
        let lambda = sys.particle(1).unwrap().lambda();
        let l = sys.particle(2).unwrap().mean_longitude();
        LinearSecularOperator::from_system(&sys, 1e3)
            .unwrap()
            .apply(&mut sys)
            .unwrap();
        assert_eq!(sys.particle(1).unwrap().lambda(), lambda);
        assert_eq!(sys.particle(2).unwrap().mean_longitude(), l);
    }
}
