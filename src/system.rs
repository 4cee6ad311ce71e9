//! # Canonical system container
//!
//! [`PoincareSystem`] holds an ordered collection of Poincaré particles plus
//! the global parameters (gravitational constant, coordinate convention,
//! physical masses with the central body at index 0) and the flat phase-space
//! vector every symbolic and numeric layer reads.
//!
//! The flat vector groups the variables by kind, coordinates first:
//!
//! ```text
//! [l_1..l_(N-1), η_1..η_(N-1), ρ_1..ρ_(N-1), Λ_1..Λ_(N-1), κ_1..κ_(N-1), σ_1..σ_(N-1)]
//! ```
//!
//! and particle index `i` (1-based) maps to slot `i-1` of each block. The
//! evolution operators instead consume the per-body interleaved layout
//! `(κ, η, Λ, l, σ, ρ)` produced by
//! [`operator_state_vector`](PoincareSystem::operator_state_vector); the two
//! layouts are bijective and conversion is exact.
//!
//! Particles are accessed, never added or removed, after construction: the
//! central-body bookkeeping couples every particle and incremental addition
//! is not supported.

use crate::particle::{Coordinates, MassSpec, PoincareParticle};
use crate::poincare_errors::PoincareError;
use crate::snapshot::{BodyState, SystemSnapshot};
use crate::symbolic::StateVar;

/// Ordered collection of canonical particles plus global parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PoincareSystem {
    g: f64,
    coordinates: Coordinates,
    /// physical masses, index 0 = central body
    masses: Vec<f64>,
    time: f64,
    /// flat phase-space vector, see module docs for the layout
    values: Vec<f64>,
}

impl PoincareSystem {
    /// Build a system from explicit particles (ordered by increasing
    /// semi-major axis by convention; nothing is re-sorted here).
    pub fn from_particles(
        g: f64,
        particles: &[PoincareParticle],
        coordinates: Coordinates,
    ) -> Result<Self, PoincareError> {
        if particles.is_empty() {
            return Err(PoincareError::EmptySystem);
        }
        let mut masses = Vec::with_capacity(particles.len() + 1);
        masses.push(particles[0].m_star());
        for p in particles {
            masses.push(p.m());
        }

        let np = particles.len();
        let mut values = vec![0.0; 6 * np];
        for (j, p) in particles.iter().enumerate() {
            values[j] = p.mean_longitude();
            values[np + j] = p.eta();
            values[2 * np + j] = p.rho();
            values[3 * np + j] = p.lambda();
            values[4 * np + j] = p.kappa();
            values[5 * np + j] = p.sigma();
        }

        Ok(PoincareSystem {
            g,
            coordinates,
            masses,
            time: 0.0,
            values,
        })
    }

    /// Convert an external snapshot (barycentric osculating elements) into a
    /// canonical system. Fails on any non-elliptical orbit.
    pub fn from_snapshot(
        snapshot: &SystemSnapshot,
        coordinates: Coordinates,
    ) -> Result<Self, PoincareError> {
        let mut particles = Vec::with_capacity(snapshot.bodies.len());
        for (j, body) in snapshot.bodies.iter().enumerate() {
            if body.semi_major_axis <= 0.0 || body.eccentricity >= 1.0 {
                return Err(PoincareError::NonEllipticalOrbit {
                    index: j + 1,
                    a: body.semi_major_axis,
                    e: body.eccentricity,
                });
            }
            particles.push(PoincareParticle::from_elements(
                coordinates,
                snapshot.g,
                MassSpec::Physical {
                    m: body.mass,
                    m_star: snapshot.central_mass,
                },
                crate::particle::OrbitSpec {
                    semi_major_axis: crate::particle::SemiMajorAxisSpec::SemiMajorAxis(
                        body.semi_major_axis,
                    ),
                    eccentricity: crate::particle::EccentricitySpec::Eccentricity(
                        body.eccentricity,
                    ),
                    inclination: crate::particle::InclinationSpec::Inclination(body.inclination),
                    mean_longitude: body.mean_longitude,
                    pomega: body.pomega,
                    ascending_node_longitude: body.ascending_node_longitude,
                },
            )?);
        }
        let mut system = PoincareSystem::from_particles(snapshot.g, &particles, coordinates)?;
        system.time = snapshot.time;
        Ok(system)
    }

    /// Reconstruct an external snapshot, central body first.
    pub fn to_snapshot(&self) -> Result<SystemSnapshot, PoincareError> {
        let mut snapshot = SystemSnapshot::new(self.g, self.masses[0]);
        snapshot.time = self.time;
        for i in 1..self.n_bodies() {
            let p = self.particle(i as isize)?;
            snapshot.add_body(BodyState {
                mass: p.m(),
                semi_major_axis: p.semi_major_axis(),
                eccentricity: p.eccentricity()?,
                inclination: p.inclination()?,
                mean_longitude: p.mean_longitude(),
                pomega: p.pomega(),
                ascending_node_longitude: p.ascending_node_longitude(),
            });
        }
        Ok(snapshot)
    }

    // ---------------------------------------------------------------------
    // Global parameters
    // ---------------------------------------------------------------------

    pub fn g(&self) -> f64 {
        self.g
    }

    pub fn coordinates(&self) -> Coordinates {
        self.coordinates
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    /// Physical masses, central body at index 0.
    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    /// Total number of bodies, central body included.
    pub fn n_bodies(&self) -> usize {
        self.masses.len()
    }

    /// Number of non-central bodies.
    pub fn n_planets(&self) -> usize {
        self.masses.len() - 1
    }

    // ---------------------------------------------------------------------
    // Particle access
    // ---------------------------------------------------------------------

    /// Materialize a read-only particle view by 1-based index. Negative
    /// indices count from the end; index 0 fails because the central body
    /// carries no Poincaré state. Mutation goes through the state vectors,
    /// never through the returned view.
    pub fn particle(&self, index: isize) -> Result<PoincareParticle, PoincareError> {
        if index == 0 {
            return Err(PoincareError::CentralBodyHasNoElements);
        }
        let n = self.n_bodies() as isize;
        let mut i = index;
        if i < 0 {
            i += n;
        }
        if i < 1 || i >= n {
            return Err(PoincareError::ParticleIndexOutOfRange(
                index,
                self.n_bodies(),
            ));
        }
        let i = i as usize;
        let np = self.n_planets();
        let j = i - 1;
        Ok(PoincareParticle::from_actions(
            self.coordinates,
            self.g,
            MassSpec::Physical {
                m: self.masses[i],
                m_star: self.masses[0],
            },
            self.values[3 * np + j],
            self.values[j],
            self.values[4 * np + j],
            self.values[np + j],
            self.values[5 * np + j],
            self.values[2 * np + j],
        ))
    }

    /// All particle views in order (1-based indices `1..N`).
    pub fn particles(&self) -> Vec<PoincareParticle> {
        (1..self.n_bodies() as isize)
            .map(|i| self.particle(i).expect("index in range"))
            .collect()
    }

    /// Materialized views for the 1-based index range `start..end`
    /// (exclusive end, negative indices counting from the end). A range
    /// crossing index 0 fails like the single-index accessor does.
    pub fn particle_slice(
        &self,
        start: isize,
        end: isize,
    ) -> Result<Vec<PoincareParticle>, PoincareError> {
        let n = self.n_bodies() as isize;
        let resolve = |i: isize| if i < 0 { i + n } else { i };
        (resolve(start)..resolve(end))
            .map(|i| self.particle(i))
            .collect()
    }

    // ---------------------------------------------------------------------
    // Flat state vectors
    // ---------------------------------------------------------------------

    fn slot(&self, var: StateVar) -> usize {
        let np = self.n_planets();
        match var {
            StateVar::MeanLongitude(i) => i - 1,
            StateVar::Eta(i) => np + i - 1,
            StateVar::Rho(i) => 2 * np + i - 1,
            StateVar::Lambda(i) => 3 * np + i - 1,
            StateVar::Kappa(i) => 4 * np + i - 1,
            StateVar::Sigma(i) => 5 * np + i - 1,
        }
    }

    /// Current value of one dynamical variable.
    pub fn state_value(&self, var: StateVar) -> f64 {
        self.values[self.slot(var)]
    }

    /// Overwrite one dynamical variable.
    pub fn set_state_value(&mut self, var: StateVar, value: f64) {
        let slot = self.slot(var);
        self.values[slot] = value;
    }

    /// The flat phase-space vector in the grouped layout.
    pub fn phase_space_vector(&self) -> &[f64] {
        &self.values
    }

    pub fn set_phase_space_vector(&mut self, values: &[f64]) -> Result<(), PoincareError> {
        if values.len() != self.values.len() {
            return Err(PoincareError::MismatchedStateLength {
                got: values.len(),
                expected: self.values.len(),
            });
        }
        self.values.copy_from_slice(values);
        Ok(())
    }

    /// State in the operator layout: six contiguous slots
    /// `(κ, η, Λ, l, σ, ρ)` per body.
    pub fn operator_state_vector(&self) -> Vec<f64> {
        let np = self.n_planets();
        let mut out = Vec::with_capacity(6 * np);
        for j in 0..np {
            out.push(self.values[4 * np + j]);
            out.push(self.values[np + j]);
            out.push(self.values[3 * np + j]);
            out.push(self.values[j]);
            out.push(self.values[5 * np + j]);
            out.push(self.values[2 * np + j]);
        }
        out
    }

    /// Write back a state in the operator layout.
    pub fn set_operator_state_vector(&mut self, state: &[f64]) -> Result<(), PoincareError> {
        let np = self.n_planets();
        if state.len() != 6 * np {
            return Err(PoincareError::MismatchedStateLength {
                got: state.len(),
                expected: 6 * np,
            });
        }
        for j in 0..np {
            self.values[4 * np + j] = state[6 * j];
            self.values[np + j] = state[6 * j + 1];
            self.values[3 * np + j] = state[6 * j + 2];
            self.values[j] = state[6 * j + 3];
            self.values[5 * np + j] = state[6 * j + 4];
            self.values[2 * np + j] = state[6 * j + 5];
        }
        Ok(())
    }
}
