//! # poincare
//!
//! Symbolic construction and semi-analytic propagation of planetary-system
//! Hamiltonians in Poincaré canonical elements.
//!
//! The crate has two halves. The *construction* half assembles a perturbative
//! Hamiltonian as a sum of symbolic terms — Keplerian pieces, disturbing
//! function monomials parameterized by integer harmonic vectors, and
//! orbit-averaged perturbations (oblateness, relativistic precession) — over
//! a purpose-built sparse polynomial/trigonometric representation, with all
//! numeric parameters routed through a single symbol → value map. The
//! *propagation* half turns the integrable pieces of that Hamiltonian into
//! exact finite-step evolution operators (Keplerian drift, Laplace–Lagrange
//! secular rotation, first- and second-order resonance maps) composed under
//! a symplectic splitting scheme.
//!
//! ```no_run
//! use poincare::particle::Coordinates;
//! use poincare::snapshot::{BodyState, SystemSnapshot};
//! use poincare::system::PoincareSystem;
//! use poincare::hamiltonian::PoincareHamiltonian;
//!
//! let mut snapshot = SystemSnapshot::new(1.0, 1.0);
//! snapshot.add_body(BodyState {
//!     mass: 1e-5,
//!     semi_major_axis: 1.0,
//!     eccentricity: 0.01,
//!     inclination: 0.0,
//!     mean_longitude: 0.0,
//!     pomega: 0.0,
//!     ascending_node_longitude: 0.0,
//! });
//! snapshot.add_body(BodyState {
//!     mass: 1e-5,
//!     semi_major_axis: 1.587,
//!     eccentricity: 0.01,
//!     inclination: 0.0,
//!     mean_longitude: 0.0,
//!     pomega: 0.0,
//!     ascending_node_longitude: 0.0,
//! });
//!
//! let system = PoincareSystem::from_snapshot(&snapshot, Coordinates::CanonicalHeliocentric)
//!     .unwrap();
//! let mut hamiltonian = PoincareHamiltonian::new(&system).unwrap();
//! hamiltonian
//!     .add_eccentricity_mmr_terms(2, 1, 2, 1, 2, 0)
//!     .unwrap();
//! hamiltonian.finalize();
//! let energy = hamiltonian.numerical_value(&system);
//! ```

pub mod constants;
pub mod disturbing;
pub mod hamiltonian;
pub mod laplace;
pub mod particle;
pub mod poincare_errors;
pub mod secular;
pub mod snapshot;
pub mod symbolic;
pub mod symplectic;
pub mod system;

pub use hamiltonian::PoincareHamiltonian;
pub use particle::{Coordinates, MassSpec, OrbitSpec, PoincareParticle};
pub use poincare_errors::PoincareError;
pub use secular::LaplaceLagrangeSystem;
pub use snapshot::{BodyState, SystemSnapshot};
pub use symplectic::EvolutionOperator;
pub use system::PoincareSystem;
