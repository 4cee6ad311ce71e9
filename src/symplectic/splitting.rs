//! Strang-splitting driver.
//!
//! Composes a drift operator `A` with one or more kick operators `B_k` as
//! the symmetric second-order scheme
//!
//! ```text
//! A(dt/2) · B_1(dt) · ... · B_n(dt) · A(dt/2)
//! ```
//!
//! per step. Every piece is an exact flow of its own Hamiltonian part, so
//! the composition is symplectic by construction; the drift is typically a
//! [`KeplerianOperator`](super::keplerian::KeplerianOperator) (resonance
//! splitting) or a
//! [`LinearSecularOperator`](super::linear_secular::LinearSecularOperator)
//! (secular splitting).

use super::EvolutionOperator;
use crate::poincare_errors::PoincareError;
use crate::system::PoincareSystem;

pub struct SplittingIntegrator {
    drift: Box<dyn EvolutionOperator>,
    kicks: Vec<Box<dyn EvolutionOperator>>,
    dt: f64,
}

impl SplittingIntegrator {
    /// Build the scheme; the drift is reconfigured to half steps, the kicks
    /// to full steps.
    pub fn new(
        mut drift: Box<dyn EvolutionOperator>,
        mut kicks: Vec<Box<dyn EvolutionOperator>>,
        dt: f64,
    ) -> Self {
        drift.set_dt(dt / 2.0);
        for kick in &mut kicks {
            kick.set_dt(dt);
        }
        SplittingIntegrator { drift, kicks, dt }
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn set_dt(&mut self, dt: f64) {
        self.dt = dt;
        self.drift.set_dt(dt / 2.0);
        for kick in &mut self.kicks {
            kick.set_dt(dt);
        }
    }

    /// One symmetric step on a flat operator-layout state vector.
    pub fn step_state_vector(&self, state: &mut [f64]) {
        self.drift.apply_to_state_vector(state);
        for kick in &self.kicks {
            kick.apply_to_state_vector(state);
        }
        self.drift.apply_to_state_vector(state);
    }

    /// One symmetric step on the live system.
    pub fn step(&self, system: &mut PoincareSystem) -> Result<(), PoincareError> {
        let mut state = system.operator_state_vector();
        self.step_state_vector(&mut state);
        system.set_operator_state_vector(&state)?;
        system.set_time(system.time() + self.dt);
        Ok(())
    }

    /// Advance the system to `time` (forward only) in whole steps, rounding
    /// the step count up.
    pub fn integrate(
        &self,
        system: &mut PoincareSystem,
        time: f64,
    ) -> Result<(), PoincareError> {
        let remaining = time - system.time();
        if remaining <= 0.0 {
            return Ok(());
        }
        let n_steps = (remaining / self.dt).ceil() as usize;
        let mut state = system.operator_state_vector();
        for _ in 0..n_steps {
            self.step_state_vector(&mut state);
        }
        system.set_operator_state_vector(&state)?;
        system.set_time(system.time() + n_steps as f64 * self.dt);
        Ok(())
    }
}
