//! Keplerian drift: the flow of `H_kep = -Σ G²M_i²μ_i³/(2Λ_i²)`.
//!
//! Advances every mean longitude by `dt · (GM_i)²μ_i³/Λ_i³` — exact for the
//! unperturbed problem and leaving every other variable, Λ included,
//! untouched.

use super::{EvolutionOperator, SLOT_L, SLOT_LAMBDA};
use crate::poincare_errors::PoincareError;
use crate::system::PoincareSystem;

#[derive(Debug, Clone)]
pub struct KeplerianOperator {
    dt: f64,
    /// `(G M_i)² μ_i³` per body
    gm2_mu3: Vec<f64>,
}

impl KeplerianOperator {
    pub fn new(system: &PoincareSystem, dt: f64) -> Result<Self, PoincareError> {
        let mut gm2_mu3 = Vec::with_capacity(system.n_planets());
        for p in system.particles() {
            let gm = system.g() * p.m_total();
            gm2_mu3.push(gm * gm * p.mu().powi(3));
        }
        Ok(KeplerianOperator { dt, gm2_mu3 })
    }

    /// Current mean-longitude rates `(GM)²μ³/Λ³` for a state vector.
    pub fn mean_longitude_rates(&self, state: &[f64]) -> Vec<f64> {
        state
            .chunks_exact(6)
            .zip(&self.gm2_mu3)
            .map(|(body, &c)| c / body[SLOT_LAMBDA].powi(3))
            .collect()
    }
}

impl EvolutionOperator for KeplerianOperator {
    fn dt(&self) -> f64 {
        self.dt
    }

    fn set_dt(&mut self, dt: f64) {
        self.dt = dt;
    }

    fn apply_to_state_vector(&self, state: &mut [f64]) {
        for (body, &c) in state.chunks_exact_mut(6).zip(&self.gm2_mu3) {
            let lambda = body[SLOT_LAMBDA];
            body[SLOT_L] += self.dt * c / (lambda * lambda * lambda);
        }
    }
}
