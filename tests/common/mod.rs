use poincare::particle::Coordinates;
use poincare::snapshot::{BodyState, SystemSnapshot};
use poincare::system::PoincareSystem;

/// Two planets near the 2:1 commensurability with small eccentricities, the
/// reference configuration of most end-to-end checks.
pub fn near_two_to_one_system() -> PoincareSystem {
    let mut snapshot = SystemSnapshot::new(1.0, 1.0);
    snapshot.add_body(BodyState {
        mass: 1e-5,
        semi_major_axis: 1.0,
        eccentricity: 0.01,
        inclination: 0.0,
        mean_longitude: 0.8,
        pomega: 2.4,
        ascending_node_longitude: 0.0,
    });
    snapshot.add_body(BodyState {
        mass: 1e-5,
        semi_major_axis: 1.587,
        eccentricity: 0.01,
        inclination: 0.0,
        mean_longitude: 5.1,
        pomega: -1.1,
        ascending_node_longitude: 0.0,
    });
    PoincareSystem::from_snapshot(&snapshot, Coordinates::CanonicalHeliocentric).unwrap()
}

/// Two inclined, eccentric planets well away from low-order resonances, used
/// by the secular checks.
pub fn secular_pair_system() -> PoincareSystem {
    let mut snapshot = SystemSnapshot::new(1.0, 1.0);
    snapshot.add_body(BodyState {
        mass: 2e-5,
        semi_major_axis: 1.0,
        eccentricity: 0.03,
        inclination: 0.02,
        mean_longitude: 1.2,
        pomega: 0.4,
        ascending_node_longitude: -0.9,
    });
    snapshot.add_body(BodyState {
        mass: 4e-5,
        semi_major_axis: 2.31,
        eccentricity: 0.02,
        inclination: 0.035,
        mean_longitude: 4.0,
        pomega: -2.3,
        ascending_node_longitude: 1.8,
    });
    PoincareSystem::from_snapshot(&snapshot, Coordinates::CanonicalHeliocentric).unwrap()
}
