//! Resonant evolution operators.
//!
//! Each operator propagates the reduced two-planet, one-angle subsystem of a
//! first- or second-order mean-motion resonance: with the resonance angle
//! `θ = resVec·(λ_in, λ_out)` frozen over one step, the equations of motion
//! of the eccentricity (or inclination) pair are bilinear,
//!
//! ```text
//! dx/dt = -i e^(2iθ) A x*  - (i/2) e^(iθ) b
//! ```
//!
//! and solve in closed form after rotating by θ and diagonalizing the
//! symmetric 2×2 interaction matrix `A`: the eigenmodes evolve through
//! `cosh/sinh(dt·λ)` factors. After the hyperbolic map, the operator
//! reconstructs both Λ from the two linear invariants of the resonant
//! structure — `resVec·Λ` and `ΣΛ - Σ(conserved action)` — enforcing their
//! conservation to machine precision each step. Composition with the
//! Keplerian drift, which advances θ, is left to the splitting scheme.

use nalgebra::{Matrix2, Vector2};

use super::{
    EvolutionOperator, SLOT_ETA, SLOT_KAPPA, SLOT_L, SLOT_LAMBDA, SLOT_RHO, SLOT_SIGMA,
};
use crate::constants::RT2;
use crate::disturbing::{ClassicCoefficients, DfCoefficientProvider};
use crate::particle::PoincareParticle;
use crate::poincare_errors::PoincareError;
use crate::system::PoincareSystem;

/// Self-consistent reference semi-major axes and Λ0 for a chain of bodies at
/// assumed resonance spacings.
///
/// `period_ratio_offsets[k] = s` fixes `P_(k+2)/P_(k+1) = (1+s)/s` for each
/// adjacent pair; the chain accumulates a mass-weighted sum over the current
/// Λ and solves for the innermost reference semi-major axis. Returns
/// `(a0, Λ0)` with index 0 (the central body) zeroed.
pub fn resonance_chain_reference_lambdas(
    system: &PoincareSystem,
    period_ratio_offsets: &[f64],
) -> Result<(Vec<f64>, Vec<f64>), PoincareError> {
    let n = system.n_bodies();
    if period_ratio_offsets.len() != n - 2 {
        return Err(PoincareError::MismatchedChainLength {
            expected: n - 2,
            got: period_ratio_offsets.len(),
            bodies: n,
        });
    }
    for &s in period_ratio_offsets {
        if s <= 0.0 {
            return Err(PoincareError::InvalidResonanceSpacing(s));
        }
    }
    let particles = system.particles();
    let g = system.g();

    let mut coeffs = vec![0.0; n];
    let mut alpha_inv = vec![0.0; n];
    coeffs[1] = 1.0 + period_ratio_offsets.first().copied().unwrap_or(0.0);
    alpha_inv[1] = 1.0;
    let mut tot = coeffs[1] * particles[0].mu() * (g * particles[0].m_total()).sqrt();
    for i in 2..n {
        let s = period_ratio_offsets[i - 2];
        coeffs[i] = coeffs[i - 1] * s / (1.0 + s);
        alpha_inv[i] = alpha_inv[i - 1] * ((1.0 + s) / s).powf(2.0 / 3.0);
        tot += coeffs[i]
            * particles[i - 1].mu()
            * (g * particles[i - 1].m_total() * alpha_inv[i]).sqrt();
    }

    let weighted: f64 = (1..n).map(|i| coeffs[i] * particles[i - 1].lambda()).sum();
    let a1_0 = (weighted / tot).powi(2);

    let mut a0 = vec![0.0; n];
    let mut lambda0 = vec![0.0; n];
    for i in 1..n {
        a0[i] = a1_0 * alpha_inv[i];
        lambda0[i] = particles[i - 1].mu() * (g * particles[i - 1].m_total() * a0[i]).sqrt();
    }
    Ok((a0, lambda0))
}

fn reference_semi_major_axis(g: f64, p: &PoincareParticle, lambda0: f64) -> f64 {
    (lambda0 / p.mu()).powi(2) / (g * p.m_total())
}

fn pair_alpha(
    g: f64,
    p_in: &PoincareParticle,
    p_out: &PoincareParticle,
    lambda0_in: f64,
    lambda0_out: f64,
) -> Result<(f64, f64), PoincareError> {
    let a_in0 = reference_semi_major_axis(g, p_in, lambda0_in);
    let a_out0 = reference_semi_major_axis(g, p_out, lambda0_out);
    let alpha0 = a_in0 / a_out0;
    if alpha0 >= 1.0 {
        return Err(PoincareError::UnorderedSemiMajorAxes(alpha0));
    }
    Ok((alpha0, a_out0))
}

/// Interaction matrix of the second-order eccentricity resonance
/// `j : j-2` between two bodies, in the canonical `(κ-iη)` variables:
/// classic coefficients, `√(2/Λ0)` scaling and the pair prefactor
/// `-G m_in m_out / a_out0`.
pub fn second_order_eccentricity_resonance_matrix(
    j: u32,
    g: f64,
    p_in: &PoincareParticle,
    p_out: &PoincareParticle,
    lambda0_in: f64,
    lambda0_out: f64,
) -> Result<Matrix2<f64>, PoincareError> {
    let (alpha0, a_out0) = pair_alpha(g, p_in, p_out, lambda0_in, lambda0_out)?;
    let jv = j as i32;
    let classic = ClassicCoefficients;
    let c_in_in = classic
        .coefficient([jv, 2 - jv, -2, 0, 0, 0], [0; 4])?
        .eval(alpha0)?;
    let c_out_out = classic
        .coefficient([jv, 2 - jv, 0, -2, 0, 0], [0; 4])?
        .eval(alpha0)?;
    let c_cross = classic
        .coefficient([jv, 2 - jv, -1, -1, 0, 0], [0; 4])?
        .eval(alpha0)?
        / 2.0;

    let scale_in = (2.0 / lambda0_in).sqrt();
    let scale_out = (2.0 / lambda0_out).sqrt();
    let prefactor = -g * p_in.m() * p_out.m() / a_out0;
    Ok(prefactor
        * Matrix2::new(
            c_in_in * scale_in * scale_in,
            c_cross * scale_in * scale_out,
            c_cross * scale_in * scale_out,
            c_out_out * scale_out * scale_out,
        ))
}

/// Interaction matrix and forcing vector of the first-order eccentricity
/// resonance `j : j-1`: the matrix is the second-order one of the doubled
/// harmonic `2j`, the forcing comes from the linear `e` coefficients.
pub fn first_order_eccentricity_resonance_matrix_and_vector(
    j: u32,
    g: f64,
    p_in: &PoincareParticle,
    p_out: &PoincareParticle,
    lambda0_in: f64,
    lambda0_out: f64,
) -> Result<(Matrix2<f64>, Vector2<f64>), PoincareError> {
    let a = second_order_eccentricity_resonance_matrix(
        2 * j,
        g,
        p_in,
        p_out,
        lambda0_in,
        lambda0_out,
    )?;
    let (alpha0, a_out0) = pair_alpha(g, p_in, p_out, lambda0_in, lambda0_out)?;
    let jv = j as i32;
    let classic = ClassicCoefficients;
    let b_in = classic
        .coefficient([jv, 1 - jv, -1, 0, 0, 0], [0; 4])?
        .eval(alpha0)?;
    let b_out = classic
        .coefficient([jv, 1 - jv, 0, -1, 0, 0], [0; 4])?
        .eval(alpha0)?;
    let prefactor = -g * p_in.m() * p_out.m() / a_out0;
    let b = prefactor
        * Vector2::new(
            b_in * (2.0 / lambda0_in).sqrt(),
            b_out * (2.0 / lambda0_out).sqrt(),
        );
    Ok((a, b))
}

/// Interaction matrix of the second-order inclination resonance `j : j-2`,
/// with the `√(1/(2Λ0))` scaling of the inclination variables.
pub fn second_order_inclination_resonance_matrix(
    j: u32,
    g: f64,
    p_in: &PoincareParticle,
    p_out: &PoincareParticle,
    lambda0_in: f64,
    lambda0_out: f64,
) -> Result<Matrix2<f64>, PoincareError> {
    let (alpha0, a_out0) = pair_alpha(g, p_in, p_out, lambda0_in, lambda0_out)?;
    let jv = j as i32;
    let classic = ClassicCoefficients;
    let c_in_in = classic
        .coefficient([jv, 2 - jv, 0, 0, -2, 0], [0; 4])?
        .eval(alpha0)?;
    let c_out_out = classic
        .coefficient([jv, 2 - jv, 0, 0, 0, -2], [0; 4])?
        .eval(alpha0)?;
    let c_cross = classic
        .coefficient([jv, 2 - jv, 0, 0, -1, -1], [0; 4])?
        .eval(alpha0)?
        / 2.0;

    let scale_in = (0.5 / lambda0_in).sqrt();
    let scale_out = (0.5 / lambda0_out).sqrt();
    let prefactor = -g * p_in.m() * p_out.m() / a_out0;
    Ok(prefactor
        * Matrix2::new(
            c_in_in * scale_in * scale_in,
            c_cross * scale_in * scale_out,
            c_cross * scale_in * scale_out,
            c_out_out * scale_out * scale_out,
        ))
}

/// The frozen-angle hyperbolic eigenmode map shared by both resonance cores.
fn hyperbolic_map(
    cosh_dt: &Vector2<f64>,
    sinh_dt: &Vector2<f64>,
    h: Vector2<f64>,
    k: Vector2<f64>,
    sin_theta: f64,
    cos_theta: f64,
) -> (Vector2<f64>, Vector2<f64>) {
    let s2 = 2.0 * sin_theta * cos_theta;
    let c2 = cos_theta * cos_theta - sin_theta * sin_theta;
    let k1 = cosh_dt.component_mul(&k)
        + sinh_dt.component_mul(&(s2 * k + c2 * h));
    let h1 = cosh_dt.component_mul(&h)
        + sinh_dt.component_mul(&(c2 * k - s2 * h));
    (h1, k1)
}

/// Shared geometry of the reduced two-body resonance cores.
#[derive(Debug, Clone)]
struct ResonanceCore {
    dt: f64,
    index_in: usize,
    index_out: usize,
    res_vec: Vector2<f64>,
    t: Matrix2<f64>,
    eigs: Vector2<f64>,
    cosh_dt: Vector2<f64>,
    sinh_dt: Vector2<f64>,
    lambdas_vec: Vector2<f64>,
    lambdas_mtrx: Matrix2<f64>,
}

impl ResonanceCore {
    fn new(
        index_in: usize,
        index_out: usize,
        res_vec: Vector2<f64>,
        a: &Matrix2<f64>,
        dt: f64,
    ) -> Result<Self, PoincareError> {
        let eig = a.symmetric_eigen();
        let lambdas_vec = Vector2::new(-res_vec[1], res_vec[0]);
        let lambdas_mtrx = Matrix2::new(lambdas_vec[0], lambdas_vec[1], 1.0, 1.0)
            .try_inverse()
            .ok_or(PoincareError::SingularInteractionMatrix)?;
        let mut core = ResonanceCore {
            dt,
            index_in,
            index_out,
            res_vec,
            t: eig.eigenvectors,
            eigs: eig.eigenvalues,
            cosh_dt: Vector2::zeros(),
            sinh_dt: Vector2::zeros(),
            lambdas_vec,
            lambdas_mtrx,
        };
        core.set_dt(dt);
        Ok(core)
    }

    fn set_dt(&mut self, dt: f64) {
        self.dt = dt;
        self.cosh_dt = self.eigs.map(|v| (dt * v).cosh());
        self.sinh_dt = self.eigs.map(|v| (dt * v).sinh());
    }

    fn slots(&self) -> (usize, usize) {
        (6 * (self.index_in - 1), 6 * (self.index_out - 1))
    }

    fn theta(&self, state: &[f64]) -> f64 {
        let (i, o) = self.slots();
        self.res_vec[0] * state[i + SLOT_L] + self.res_vec[1] * state[o + SLOT_L]
    }

    /// Rebuild both Λ from the conserved combinations after the map changed
    /// the eccentricity/inclination actions from `actions0` to `actions1`.
    fn restore_lambdas(&self, state: &mut [f64], c1: f64, c2: f64, actions1_sum: f64) {
        let (i, o) = self.slots();
        let lambdas1 = self.lambdas_mtrx * Vector2::new(c1, c2 + actions1_sum);
        state[i + SLOT_LAMBDA] = lambdas1[0];
        state[o + SLOT_LAMBDA] = lambdas1[1];
    }

    fn lambda_invariants(&self, state: &[f64], actions0_sum: f64) -> (f64, f64) {
        let (i, o) = self.slots();
        let lambdas = Vector2::new(state[i + SLOT_LAMBDA], state[o + SLOT_LAMBDA]);
        let c1 = self.lambdas_vec.dot(&lambdas);
        let c2 = lambdas.sum() - actions0_sum;
        (c1, c2)
    }
}

/// Evolution operator of the linear eccentricity-resonance equations
/// `dx/dt = -i e^(2iθ) A x* - (i/2) e^(iθ) b` at frozen θ.
#[derive(Debug, Clone)]
pub struct LinearEccentricityResonanceOperator {
    core: ResonanceCore,
    a: Matrix2<f64>,
    b: Vector2<f64>,
    ainv_dot_b: Vector2<f64>,
}

impl LinearEccentricityResonanceOperator {
    pub fn new(
        index_in: usize,
        index_out: usize,
        res_vec: Vector2<f64>,
        a: Matrix2<f64>,
        b: Vector2<f64>,
        dt: f64,
    ) -> Result<Self, PoincareError> {
        let ainv = a
            .try_inverse()
            .ok_or(PoincareError::SingularInteractionMatrix)?;
        Ok(LinearEccentricityResonanceOperator {
            core: ResonanceCore::new(index_in, index_out, res_vec, &a, dt)?,
            a,
            b,
            ainv_dot_b: ainv * b,
        })
    }

    pub fn interaction_matrix(&self) -> &Matrix2<f64> {
        &self.a
    }

    pub fn forcing_vector(&self) -> &Vector2<f64> {
        &self.b
    }
}

impl EvolutionOperator for LinearEccentricityResonanceOperator {
    fn dt(&self) -> f64 {
        self.core.dt
    }

    fn set_dt(&mut self, dt: f64) {
        self.core.set_dt(dt);
    }

    fn apply_to_state_vector(&self, state: &mut [f64]) {
        let (i, o) = self.core.slots();
        let kappa = Vector2::new(state[i + SLOT_KAPPA], state[o + SLOT_KAPPA]);
        let eta = Vector2::new(state[i + SLOT_ETA], state[o + SLOT_ETA]);
        let gammas0 = 0.5 * (kappa.component_mul(&kappa) + eta.component_mul(&eta));
        let (c1, c2) = self.core.lambda_invariants(state, gammas0.sum());

        let theta = self.core.theta(state);
        let (sin_theta, cos_theta) = theta.sin_cos();
        let offset = 0.5 * RT2 * self.ainv_dot_b;

        let h = self.core.t.transpose() * (eta - offset * sin_theta);
        let k = self.core.t.transpose() * (kappa + offset * cos_theta);
        let (h1, k1) = hyperbolic_map(
            &self.core.cosh_dt,
            &self.core.sinh_dt,
            h,
            k,
            sin_theta,
            cos_theta,
        );
        let eta1 = self.core.t * h1 + offset * sin_theta;
        let kappa1 = self.core.t * k1 - offset * cos_theta;

        state[i + SLOT_KAPPA] = kappa1[0];
        state[o + SLOT_KAPPA] = kappa1[1];
        state[i + SLOT_ETA] = eta1[0];
        state[o + SLOT_ETA] = eta1[1];

        let gammas1 = 0.5 * (kappa1.component_mul(&kappa1) + eta1.component_mul(&eta1));
        self.core.restore_lambdas(state, c1, c2, gammas1.sum());
    }
}

/// Evolution operator of the linear inclination-resonance equations
/// `dy/dt = -i e^(2iθ) A y*` at frozen θ.
#[derive(Debug, Clone)]
pub struct LinearInclinationResonanceOperator {
    core: ResonanceCore,
    a: Matrix2<f64>,
}

impl LinearInclinationResonanceOperator {
    pub fn new(
        index_in: usize,
        index_out: usize,
        res_vec: Vector2<f64>,
        a: Matrix2<f64>,
        dt: f64,
    ) -> Result<Self, PoincareError> {
        a.try_inverse()
            .ok_or(PoincareError::SingularInteractionMatrix)?;
        Ok(LinearInclinationResonanceOperator {
            core: ResonanceCore::new(index_in, index_out, res_vec, &a, dt)?,
            a,
        })
    }

    pub fn interaction_matrix(&self) -> &Matrix2<f64> {
        &self.a
    }
}

impl EvolutionOperator for LinearInclinationResonanceOperator {
    fn dt(&self) -> f64 {
        self.core.dt
    }

    fn set_dt(&mut self, dt: f64) {
        self.core.set_dt(dt);
    }

    fn apply_to_state_vector(&self, state: &mut [f64]) {
        let (i, o) = self.core.slots();
        let sigma = Vector2::new(state[i + SLOT_SIGMA], state[o + SLOT_SIGMA]);
        let rho = Vector2::new(state[i + SLOT_RHO], state[o + SLOT_RHO]);
        let qs0 = 0.5 * (sigma.component_mul(&sigma) + rho.component_mul(&rho));
        let (c1, c2) = self.core.lambda_invariants(state, qs0.sum());

        let theta = self.core.theta(state);
        let (sin_theta, cos_theta) = theta.sin_cos();

        let r = self.core.t.transpose() * rho;
        let s = self.core.t.transpose() * sigma;
        let (r1, s1) = hyperbolic_map(
            &self.core.cosh_dt,
            &self.core.sinh_dt,
            r,
            s,
            sin_theta,
            cos_theta,
        );
        let rho1 = self.core.t * r1;
        let sigma1 = self.core.t * s1;

        state[i + SLOT_SIGMA] = sigma1[0];
        state[o + SLOT_SIGMA] = sigma1[1];
        state[i + SLOT_RHO] = rho1[0];
        state[o + SLOT_RHO] = rho1[1];

        let qs1 = 0.5 * (sigma1.component_mul(&sigma1) + rho1.component_mul(&rho1));
        self.core.restore_lambdas(state, c1, c2, qs1.sum());
    }
}

fn chain_lambda0_for_pair(
    system: &PoincareSystem,
    index_in: usize,
    index_out: usize,
    spacing: f64,
) -> Result<(f64, f64), PoincareError> {
    let p_in = system.particle(index_in as isize)?;
    let p_out = system.particle(index_out as isize)?;
    let pair = PoincareSystem::from_particles(
        system.g(),
        &[p_in, p_out],
        system.coordinates(),
    )?;
    let (_, lambda0) = resonance_chain_reference_lambdas(&pair, &[spacing])?;
    Ok((lambda0[1], lambda0[2]))
}

macro_rules! delegate_operator {
    ($name:ident) => {
        impl EvolutionOperator for $name {
            fn dt(&self) -> f64 {
                self.inner.dt()
            }

            fn set_dt(&mut self, dt: f64) {
                self.inner.set_dt(dt);
            }

            fn apply_to_state_vector(&self, state: &mut [f64]) {
                self.inner.apply_to_state_vector(state);
            }
        }
    };
}

/// First-order eccentricity resonance `j : j-1` (resonance vector
/// `[1-j, j]`), with the forcing vector of the linear `e` terms.
#[derive(Debug, Clone)]
pub struct FirstOrderEccentricityResonanceOperator {
    inner: LinearEccentricityResonanceOperator,
    lambda0: (f64, f64),
}

impl FirstOrderEccentricityResonanceOperator {
    pub fn new(
        system: &PoincareSystem,
        dt: f64,
        j: u32,
        index_in: usize,
        index_out: usize,
        lambda0: Option<(f64, f64)>,
    ) -> Result<Self, PoincareError> {
        let spacing = j as f64 - 1.0;
        let (l0_in, l0_out) = match lambda0 {
            Some(pair) => pair,
            None => chain_lambda0_for_pair(system, index_in, index_out, spacing)?,
        };
        let p_in = system.particle(index_in as isize)?;
        let p_out = system.particle(index_out as isize)?;
        let (a, b) = first_order_eccentricity_resonance_matrix_and_vector(
            j,
            system.g(),
            &p_in,
            &p_out,
            l0_in,
            l0_out,
        )?;
        let res_vec = Vector2::new(1.0 - j as f64, j as f64);
        Ok(FirstOrderEccentricityResonanceOperator {
            inner: LinearEccentricityResonanceOperator::new(
                index_in, index_out, res_vec, a, b, dt,
            )?,
            lambda0: (l0_in, l0_out),
        })
    }

    pub fn reference_lambdas(&self) -> (f64, f64) {
        self.lambda0
    }

    pub fn interaction_matrix(&self) -> &Matrix2<f64> {
        self.inner.interaction_matrix()
    }

    pub fn forcing_vector(&self) -> &Vector2<f64> {
        self.inner.forcing_vector()
    }
}

delegate_operator!(FirstOrderEccentricityResonanceOperator);

/// Second-order eccentricity resonance `j : j-2` (resonance vector
/// `[(2-j)/2, j/2]`, no forcing).
#[derive(Debug, Clone)]
pub struct SecondOrderEccentricityResonanceOperator {
    inner: LinearEccentricityResonanceOperator,
    lambda0: (f64, f64),
}

impl SecondOrderEccentricityResonanceOperator {
    pub fn new(
        system: &PoincareSystem,
        dt: f64,
        j: u32,
        index_in: usize,
        index_out: usize,
        lambda0: Option<(f64, f64)>,
    ) -> Result<Self, PoincareError> {
        let spacing = (j as f64 - 2.0) / 2.0;
        let (l0_in, l0_out) = match lambda0 {
            Some(pair) => pair,
            None => chain_lambda0_for_pair(system, index_in, index_out, spacing)?,
        };
        let p_in = system.particle(index_in as isize)?;
        let p_out = system.particle(index_out as isize)?;
        let a = second_order_eccentricity_resonance_matrix(
            j,
            system.g(),
            &p_in,
            &p_out,
            l0_in,
            l0_out,
        )?;
        let res_vec = Vector2::new((2.0 - j as f64) / 2.0, j as f64 / 2.0);
        Ok(SecondOrderEccentricityResonanceOperator {
            inner: LinearEccentricityResonanceOperator::new(
                index_in,
                index_out,
                res_vec,
                a,
                Vector2::zeros(),
                dt,
            )?,
            lambda0: (l0_in, l0_out),
        })
    }

    pub fn reference_lambdas(&self) -> (f64, f64) {
        self.lambda0
    }

    pub fn interaction_matrix(&self) -> &Matrix2<f64> {
        self.inner.interaction_matrix()
    }
}

delegate_operator!(SecondOrderEccentricityResonanceOperator);

/// Second-order inclination resonance `j : j-2`.
#[derive(Debug, Clone)]
pub struct SecondOrderInclinationResonanceOperator {
    inner: LinearInclinationResonanceOperator,
    lambda0: (f64, f64),
}

impl SecondOrderInclinationResonanceOperator {
    pub fn new(
        system: &PoincareSystem,
        dt: f64,
        j: u32,
        index_in: usize,
        index_out: usize,
        lambda0: Option<(f64, f64)>,
    ) -> Result<Self, PoincareError> {
        let spacing = (j as f64 - 2.0) / 2.0;
        let (l0_in, l0_out) = match lambda0 {
            Some(pair) => pair,
            None => chain_lambda0_for_pair(system, index_in, index_out, spacing)?,
        };
        let p_in = system.particle(index_in as isize)?;
        let p_out = system.particle(index_out as isize)?;
        let a = second_order_inclination_resonance_matrix(
            j,
            system.g(),
            &p_in,
            &p_out,
            l0_in,
            l0_out,
        )?;
        let res_vec = Vector2::new((2.0 - j as f64) / 2.0, j as f64 / 2.0);
        Ok(SecondOrderInclinationResonanceOperator {
            inner: LinearInclinationResonanceOperator::new(index_in, index_out, res_vec, a, dt)?,
            lambda0: (l0_in, l0_out),
        })
    }

    pub fn reference_lambdas(&self) -> (f64, f64) {
        self.lambda0
    }

    pub fn interaction_matrix(&self) -> &Matrix2<f64> {
        self.inner.interaction_matrix()
    }
}

delegate_operator!(SecondOrderInclinationResonanceOperator);
