//! The two routes to the Laplace–Lagrange matrices — direct construction
//! from masses and geometry, and second differentiation of a Hamiltonian
//! carrying the full second-order secular term set — must agree to rounding
//! error, and the linear secular operator built from either must behave
//! identically.

mod common;

use approx::assert_relative_eq;

use poincare::hamiltonian::PoincareHamiltonian;
use poincare::secular::LaplaceLagrangeSystem;
use poincare::symplectic::linear_secular::LinearSecularOperator;
use poincare::symplectic::EvolutionOperator;

use common::secular_pair_system;

/// Install the complete second-order secular term set for one pair.
fn add_secular_terms(h: &mut PoincareHamiltonian, index_in: usize, index_out: usize) {
    let zero = [0i32; 6];
    h.add_monomial_term(zero, [0, 0, 1, 0], index_in, index_out, 0).unwrap();
    h.add_monomial_term(zero, [0, 0, 0, 1], index_in, index_out, 0).unwrap();
    h.add_monomial_term(zero, [1, 0, 0, 0], index_in, index_out, 0).unwrap();
    h.add_monomial_term(zero, [0, 1, 0, 0], index_in, index_out, 0).unwrap();
    h.add_monomial_term([0, 0, 1, -1, 0, 0], [0; 4], index_in, index_out, 0).unwrap();
    h.add_monomial_term([0, 0, 0, 0, 1, -1], [0; 4], index_in, index_out, 0).unwrap();
}

#[test]
fn hamiltonian_linearization_matches_direct_construction() {
    let system = secular_pair_system();

    let mut h = PoincareHamiltonian::new(&system).unwrap();
    add_secular_terms(&mut h, 1, 2);
    h.finalize();
    let (ecc_h, inc_h) = h.laplace_lagrange_matrices(&system).unwrap();

    let ll = LaplaceLagrangeSystem::from_system(&system).unwrap();
    let ecc_d = ll.eccentricity_matrix();
    let inc_d = ll.inclination_matrix();

    for r in 0..2 {
        for c in 0..2 {
            assert_relative_eq!(ecc_h[(r, c)], ecc_d[(r, c)], max_relative = 1e-10);
            assert_relative_eq!(inc_h[(r, c)], inc_d[(r, c)], max_relative = 1e-10);
        }
    }
}

#[test]
fn operator_from_extracted_matrices_matches_direct_operator() {
    let system = secular_pair_system();

    let mut h = PoincareHamiltonian::new(&system).unwrap();
    add_secular_terms(&mut h, 1, 2);
    h.finalize();
    let (ecc, inc) = h.laplace_lagrange_matrices(&system).unwrap();

    let dt = 4.2e3;
    let from_h = LinearSecularOperator::from_matrices(ecc, inc, dt);
    let direct = LinearSecularOperator::from_system(&system, dt).unwrap();

    let mut state_a = system.operator_state_vector();
    let mut state_b = state_a.clone();
    from_h.apply_to_state_vector(&mut state_a);
    direct.apply_to_state_vector(&mut state_b);
    for (a, b) in state_a.iter().zip(&state_b) {
        assert_relative_eq!(a, b, epsilon = 1e-13, max_relative = 1e-8);
    }
}

#[test]
fn secular_frequencies_scale_with_perturber_mass() {
    // doubling the perturbing masses doubles every secular eigenfrequency in
    // the linear theory
    let system = secular_pair_system();
    let ll = LaplaceLagrangeSystem::from_system(&system).unwrap();
    let base = ll.eccentricity_eigenvalues();

    let mut snapshot = system.to_snapshot().unwrap();
    for body in &mut snapshot.bodies {
        body.mass *= 2.0;
    }
    let doubled = poincare::system::PoincareSystem::from_snapshot(
        &snapshot,
        poincare::particle::Coordinates::CanonicalHeliocentric,
    )
    .unwrap();
    let ll2 = LaplaceLagrangeSystem::from_system(&doubled).unwrap();
    let scaled = ll2.eccentricity_eigenvalues();

    // eigenvalue order is not specified: compare as sorted sets, with
    // O(m/M) slack from the canonical-mass corrections
    let mut base: Vec<f64> = base.iter().copied().collect();
    let mut scaled: Vec<f64> = scaled.iter().copied().collect();
    base.sort_by(|a, b| a.partial_cmp(b).unwrap());
    scaled.sort_by(|a, b| a.partial_cmp(b).unwrap());
    for (a, b) in base.iter().zip(&scaled) {
        assert_relative_eq!(2.0 * a, b, max_relative = 1e-3);
    }
}
