//! # Laplace–Lagrange secular system
//!
//! Direct construction of the linearized secular dynamics: the Hermitian
//! eccentricity and inclination coupling matrices built from masses,
//! geometry and the classic secular disturbing-function coefficients,
//! together with their eigen-decompositions and the closed-form
//! mode-superposition solution.
//!
//! The same matrices are obtainable by differentiating a Hamiltonian that
//! carries the full second-order secular term set
//! ([`PoincareHamiltonian::laplace_lagrange_matrices`]
//! (crate::hamiltonian::PoincareHamiltonian::laplace_lagrange_matrices));
//! the two constructions agree to rounding error, which the integration
//! tests pin down.
//!
//! The complex secular equations of motion read
//! `d/dt (η + iκ) = i A (η + iκ)` and `d/dt (ρ + iσ) = i B (ρ + iσ)` with
//! `A`, `B` the matrices assembled here; the linear secular evolution
//! operator exponentiates them.

use nalgebra::{DMatrix, DVector};

use crate::constants::DPI;
use crate::disturbing::{ClassicCoefficients, DfCoefficientProvider};
use crate::poincare_errors::PoincareError;
use crate::system::PoincareSystem;

/// Canonical secular state advanced by the closed-form solution.
#[derive(Debug, Clone, PartialEq)]
pub struct SecularModeState {
    pub kappa: DVector<f64>,
    pub eta: DVector<f64>,
    pub sigma: DVector<f64>,
    pub rho: DVector<f64>,
}

/// The Laplace–Lagrange linear secular system of one canonical system.
#[derive(Debug, Clone)]
pub struct LaplaceLagrangeSystem {
    g: f64,
    /// per-planet masses, mean motions, actions and geometry frozen at
    /// construction
    masses: Vec<f64>,
    lambdas: Vec<f64>,
    mean_motions: Vec<f64>,
    semi_major_axes: Vec<f64>,
    ecc_matrix: DMatrix<f64>,
    inc_matrix: DMatrix<f64>,
    /// initial canonical state for the closed-form solution
    kappa0: DVector<f64>,
    eta0: DVector<f64>,
    sigma0: DVector<f64>,
    rho0: DVector<f64>,
    /// numerical chop threshold scaled to the smallest planet mass
    tol: f64,
}

impl LaplaceLagrangeSystem {
    /// Build the secular matrices from a system's particles. Particles must
    /// be ordered by increasing semi-major axis.
    pub fn from_system(system: &PoincareSystem) -> Result<Self, PoincareError> {
        let np = system.n_planets();
        let particles = system.particles();
        let coefficients = ClassicCoefficients;

        let ecc_diag = coefficients.coefficient([0; 6], [0, 0, 1, 0])?;
        let inc_diag = coefficients.coefficient([0; 6], [1, 0, 0, 0])?;
        let ecc_off = coefficients.coefficient([0, 0, 1, -1, 0, 0], [0; 4])?;
        let inc_off = coefficients.coefficient([0, 0, 0, 0, 1, -1], [0; 4])?;

        let mut ecc_matrix = DMatrix::zeros(np, np);
        let mut inc_matrix = DMatrix::zeros(np, np);

        for i in 0..np {
            for j in 0..np {
                if j == i {
                    continue;
                }
                let (idx_in, idx_out) = (i.min(j), i.max(j));
                let p_in = &particles[idx_in];
                let p_out = &particles[idx_out];
                let alpha = p_in.semi_major_axis() / p_out.semi_major_axis();
                if alpha >= 1.0 {
                    return Err(PoincareError::UnorderedSemiMajorAxes(alpha));
                }
                let prefactor =
                    -system.g() * p_in.m() * p_out.m() / p_out.semi_major_axis();
                let lambda_i = particles[i].lambda();

                ecc_matrix[(i, i)] += 2.0 * prefactor * ecc_diag.eval(alpha)? / lambda_i;
                inc_matrix[(i, i)] += 2.0 * prefactor * inc_diag.eval(alpha)? / lambda_i / 4.0;

                if i > j {
                    let coupling = prefactor / (p_in.lambda() * p_out.lambda()).sqrt();
                    let ecc_entry = coupling * ecc_off.eval(alpha)?;
                    let inc_entry = coupling * inc_off.eval(alpha)? / 4.0;
                    ecc_matrix[(i, j)] = ecc_entry;
                    ecc_matrix[(j, i)] = ecc_entry;
                    inc_matrix[(i, j)] = inc_entry;
                    inc_matrix[(j, i)] = inc_entry;
                }
            }
        }

        let tol = particles
            .iter()
            .map(|p| p.m())
            .fold(f64::INFINITY, f64::min)
            * f64::EPSILON;

        Ok(LaplaceLagrangeSystem {
            g: system.g(),
            masses: particles.iter().map(|p| p.m()).collect(),
            lambdas: particles.iter().map(|p| p.lambda()).collect(),
            mean_motions: particles.iter().map(|p| p.mean_motion()).collect(),
            semi_major_axes: particles.iter().map(|p| p.semi_major_axis()).collect(),
            ecc_matrix,
            inc_matrix,
            kappa0: DVector::from_iterator(np, particles.iter().map(|p| p.kappa())),
            eta0: DVector::from_iterator(np, particles.iter().map(|p| p.eta())),
            sigma0: DVector::from_iterator(np, particles.iter().map(|p| p.sigma())),
            rho0: DVector::from_iterator(np, particles.iter().map(|p| p.rho())),
            tol,
        })
    }

    pub fn n_planets(&self) -> usize {
        self.lambdas.len()
    }

    /// The eccentricity coupling matrix (real symmetric).
    pub fn eccentricity_matrix(&self) -> &DMatrix<f64> {
        &self.ecc_matrix
    }

    /// The inclination coupling matrix (real symmetric).
    pub fn inclination_matrix(&self) -> &DMatrix<f64> {
        &self.inc_matrix
    }

    fn chop(&self, mut values: DVector<f64>) -> DVector<f64> {
        for v in values.iter_mut() {
            if v.abs() < self.tol {
                *v = 0.0;
            }
        }
        values
    }

    /// Secular eccentricity eigenfrequencies.
    pub fn eccentricity_eigenvalues(&self) -> DVector<f64> {
        self.ecc_matrix.clone().symmetric_eigen().eigenvalues
    }

    /// Secular inclination eigenfrequencies (one vanishes by angular-momentum
    /// conservation; values below the mass-scaled tolerance are chopped).
    pub fn inclination_eigenvalues(&self) -> DVector<f64> {
        self.chop(self.inc_matrix.clone().symmetric_eigen().eigenvalues)
    }

    /// Shortest secular timescale, `2π / max |eigenfrequency|`.
    pub fn secular_period(&self) -> f64 {
        let omega_e = self
            .eccentricity_eigenvalues()
            .iter()
            .fold(0.0f64, |acc, v| acc.max(v.abs()));
        let omega_i = self
            .inclination_eigenvalues()
            .iter()
            .fold(0.0f64, |acc, v| acc.max(v.abs()));
        DPI / omega_e.max(omega_i)
    }

    /// Orthogonal mode matrix `T` and eigenfrequencies of the eccentricity
    /// block: `Tᵀ A T` is diagonal and `H + iK = Tᵀ(η + iκ)` are decoupled
    /// oscillators.
    pub fn diagonalize_eccentricity(&self) -> (DMatrix<f64>, DVector<f64>) {
        let eig = self.ecc_matrix.clone().symmetric_eigen();
        (eig.eigenvectors, eig.eigenvalues)
    }

    /// Same for the inclination block.
    pub fn diagonalize_inclination(&self) -> (DMatrix<f64>, DVector<f64>) {
        let eig = self.inc_matrix.clone().symmetric_eigen();
        (eig.eigenvectors, self.chop(eig.eigenvalues))
    }

    /// Closed-form solution of the linear secular equations at time `t`
    /// past the stored epoch state.
    pub fn secular_solution(&self, t: f64) -> SecularModeState {
        let (t_ecc, freqs_ecc) = self.diagonalize_eccentricity();
        let (t_inc, freqs_inc) = self.diagonalize_inclination();
        let (kappa, eta) = rotate_modes(&t_ecc, &freqs_ecc, &self.kappa0, &self.eta0, t);
        let (sigma, rho) = rotate_modes(&t_inc, &freqs_inc, &self.sigma0, &self.rho0, t);
        SecularModeState {
            kappa,
            eta,
            sigma,
            rho,
        }
    }

    /// Second-order secular correction to the eccentricity matrix from a
    /// nearby first-order `kres : kres-1` mean-motion resonance between the
    /// two bodies (1-based indices, `index_in < index_out`).
    pub fn add_first_order_resonance_term(
        &mut self,
        index_in: usize,
        index_out: usize,
        kres: u32,
    ) -> Result<(), PoincareError> {
        if index_in < 1 || index_out <= index_in || index_out > self.n_planets() {
            return Err(PoincareError::ParticleIndexOutOfRange(
                index_out as isize,
                self.n_planets() + 1,
            ));
        }
        let (i, o) = (index_in - 1, index_out - 1);
        let alpha = self.semi_major_axes[i] / self.semi_major_axes[o];
        let j = kres as i32;
        let coefficients = ClassicCoefficients;
        let c_in = coefficients
            .coefficient([j, 1 - j, -1, 0, 0, 0], [0; 4])?
            .eval(alpha)?;
        let c_out = coefficients
            .coefficient([j, 1 - j, 0, -1, 0, 0], [0; 4])?
            .eval(alpha)?;

        // the resonant denominator structure of canonical second-order
        // perturbation theory
        let eps = -self.g * self.masses[i] * self.masses[o] / self.semi_major_axes[o];
        let omega_in = self.mean_motions[i];
        let omega_out = self.mean_motions[o];
        let domega_in = -3.0 * omega_in / self.lambdas[i];
        let domega_out = -3.0 * omega_out / self.lambdas[o];
        let k_in = 1.0 - kres as f64;
        let k_out = kres as f64;
        let k_domega_k = k_in * k_in * domega_in + k_out * k_out * domega_out;
        let prefactor = k_domega_k / (k_in * omega_in + k_out * omega_out).powi(2);
        let x_to_big_x_in = (2.0 / self.lambdas[i]).sqrt();
        let x_to_big_x_out = (2.0 / self.lambdas[o]).sqrt();

        let in_in = eps * eps * prefactor * c_in * c_in * x_to_big_x_in * x_to_big_x_in / 4.0;
        let in_out = eps * eps * prefactor * c_in * c_out * x_to_big_x_in * x_to_big_x_out / 4.0;
        let out_out = eps * eps * prefactor * c_out * c_out * x_to_big_x_out * x_to_big_x_out / 4.0;

        self.ecc_matrix[(i, i)] += in_in;
        self.ecc_matrix[(o, i)] += in_out;
        self.ecc_matrix[(i, o)] += in_out;
        self.ecc_matrix[(o, o)] += out_out;
        Ok(())
    }
}

/// Rotate `(p0, q0)` through the decoupled oscillator phases `νt` in the
/// eigenframe `T` and transform back.
fn rotate_modes(
    t_matrix: &DMatrix<f64>,
    freqs: &DVector<f64>,
    p0: &DVector<f64>,
    q0: &DVector<f64>,
    t: f64,
) -> (DVector<f64>, DVector<f64>) {
    let k0 = t_matrix.transpose() * p0;
    let h0 = t_matrix.transpose() * q0;
    let mut k = DVector::zeros(k0.len());
    let mut h = DVector::zeros(h0.len());
    for m in 0..k0.len() {
        let (sin, cos) = (freqs[m] * t).sin_cos();
        k[m] = k0[m] * cos - h0[m] * sin;
        h[m] = k0[m] * sin + h0[m] * cos;
    }
    (t_matrix * k, t_matrix * h)
}

#[cfg(test)]
mod secular_test {
    use super::*;
    use crate::particle::Coordinates;
    use crate::snapshot::{BodyState, SystemSnapshot};
    use approx::assert_relative_eq;

    fn test_system() -> PoincareSystem {
        let mut snap = SystemSnapshot::new(1.0, 1.0);
        snap.add_body(BodyState {
            mass: 1e-5,
            semi_major_axis: 1.0,
            eccentricity: 0.02,
            inclination: 0.01,
            mean_longitude: 0.1,
            pomega: 0.7,
            ascending_node_longitude: -0.3,
        });
        snap.add_body(BodyState {
            mass: 3e-5,
            semi_major_axis: 1.8,
            eccentricity: 0.015,
            inclination: 0.03,
            mean_longitude: 2.9,
            pomega: -1.2,
            ascending_node_longitude: 0.8,
        });
        PoincareSystem::from_snapshot(&snap, Coordinates::CanonicalHeliocentric).unwrap()
    }

    #[test]
    fn test_matrices_are_symmetric() {
        let ll = LaplaceLagrangeSystem::from_system(&test_system()).unwrap();
        let e = ll.eccentricity_matrix();
        let i = ll.inclination_matrix();
        assert_relative_eq!(e[(0, 1)], e[(1, 0)], max_relative = 1e-15);
        assert_relative_eq!(i[(0, 1)], i[(1, 0)], max_relative = 1e-15);
        assert!(e[(0, 0)] != 0.0 && i[(1, 1)] != 0.0);
    }

    #[test]
    fn test_inclination_has_null_mode() {
        // angular momentum conservation leaves one zero inclination
        // eigenfrequency after the mass-scaled chop
        let ll = LaplaceLagrangeSystem::from_system(&test_system()).unwrap();
        let eigs = ll.inclination_eigenvalues();
        assert!(eigs.iter().any(|&v| v == 0.0));
    }

    #[test]
    fn test_secular_solution_at_epoch() {
        let system = test_system();
        let ll = LaplaceLagrangeSystem::from_system(&system).unwrap();
        let state = ll.secular_solution(0.0);
        let particles = system.particles();
        for (j, p) in particles.iter().enumerate() {
            assert_relative_eq!(state.kappa[j], p.kappa(), max_relative = 1e-12);
            assert_relative_eq!(state.eta[j], p.eta(), max_relative = 1e-12);
            assert_relative_eq!(state.rho[j], p.rho(), max_relative = 1e-12);
        }
    }

    #[test]
    fn test_secular_solution_preserves_amd() {
        let ll = LaplaceLagrangeSystem::from_system(&test_system()).unwrap();
        let amd = |s: &SecularModeState| {
            (s.kappa.norm_squared() + s.eta.norm_squared()) / 2.0
                + (s.sigma.norm_squared() + s.rho.norm_squared()) / 2.0
        };
        let initial = amd(&ll.secular_solution(0.0));
        let later = amd(&ll.secular_solution(1.7e4));
        assert_relative_eq!(initial, later, max_relative = 1e-10);
    }

    #[test]
    fn test_resonance_correction_keeps_symmetry() {
        let mut ll = LaplaceLagrangeSystem::from_system(&test_system()).unwrap();
        let before = ll.eccentricity_matrix().clone();
        ll.add_first_order_resonance_term(1, 2, 2).unwrap();
        let after = ll.eccentricity_matrix();
        assert_relative_eq!(after[(0, 1)], after[(1, 0)], max_relative = 1e-15);
        assert!(after[(0, 0)] != before[(0, 0)]);
    }
}
