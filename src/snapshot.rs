//! # External snapshot interface
//!
//! The engine exchanges state with an external N-body environment through
//! plain element records: a central mass plus one osculating-element row per
//! non-central body, ordered by increasing semi-major axis and already
//! re-centered to the barycentric frame (the re-centering itself is the
//! external integrator's responsibility).

use serde::{Deserialize, Serialize};

/// Osculating elements and mass of one non-central body.
///
/// Units
/// -----------------
/// * `mass`: same system as the snapshot's `central_mass`
/// * `semi_major_axis`: length unit consistent with `g`
/// * `eccentricity`: unitless
/// * all angles: radians
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyState {
    pub mass: f64,
    pub semi_major_axis: f64,
    pub eccentricity: f64,
    pub inclination: f64,
    pub mean_longitude: f64,
    pub pomega: f64,
    pub ascending_node_longitude: f64,
}

/// A full system snapshot: gravitational constant, central body first, then
/// the orbiting bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub g: f64,
    pub central_mass: f64,
    pub time: f64,
    pub bodies: Vec<BodyState>,
}

impl SystemSnapshot {
    pub fn new(g: f64, central_mass: f64) -> Self {
        SystemSnapshot {
            g,
            central_mass,
            time: 0.0,
            bodies: Vec::new(),
        }
    }

    /// Append one body row.
    pub fn add_body(&mut self, body: BodyState) -> &mut Self {
        self.bodies.push(body);
        self
    }
}
