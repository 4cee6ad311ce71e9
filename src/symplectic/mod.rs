//! # Symplectic evolution operators
//!
//! Each operator advances the canonical state by one exactly-solvable piece
//! of the Hamiltonian for a fixed timestep; a splitting scheme composes them.
//! All operators implement the same two-method contract
//! ([`EvolutionOperator`]): mutate a system in place, or transform a flat
//! state vector in the 6-per-body layout
//!
//! ```text
//! (κ, η, Λ, l, σ, ρ)  per body, bodies in system order
//! ```
//!
//! Cached matrices (eigen-decompositions, exponentials, hyperbolic factors)
//! are derived once at construction and only recomputed when the timestep
//! changes.

pub mod keplerian;
pub mod linear_secular;
pub mod resonance;
pub mod splitting;

use crate::poincare_errors::PoincareError;
use crate::system::PoincareSystem;

/// Slot offsets of the operator state-vector layout.
pub(crate) const SLOT_KAPPA: usize = 0;
pub(crate) const SLOT_ETA: usize = 1;
pub(crate) const SLOT_LAMBDA: usize = 2;
pub(crate) const SLOT_L: usize = 3;
pub(crate) const SLOT_SIGMA: usize = 4;
pub(crate) const SLOT_RHO: usize = 5;

/// One exactly-solvable propagation piece with a fixed timestep.
pub trait EvolutionOperator {
    /// Current timestep.
    fn dt(&self) -> f64;

    /// Change the timestep, recomputing any cached matrices.
    fn set_dt(&mut self, dt: f64);

    /// Advance a flat state vector (operator layout) by one timestep.
    fn apply_to_state_vector(&self, state: &mut [f64]);

    /// Advance the system's live state by one timestep through the
    /// equivalent flat-vector transformation.
    fn apply(&self, system: &mut PoincareSystem) -> Result<(), PoincareError> {
        let mut state = system.operator_state_vector();
        self.apply_to_state_vector(&mut state);
        system.set_operator_state_vector(&state)
    }
}
