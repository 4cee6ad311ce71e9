//! # Canonical particle model
//!
//! [`PoincareParticle`] represents one non-central body of a planetary system
//! in Poincaré canonical variables. The only stored, mutable ground truth is
//! the set of *specific* actions (normalized by canonical mass) together with
//! the mean longitude:
//!
//! ```text
//! sΛ, l, sκ, sη, sσ, sρ
//! ```
//!
//! Everything else — `Λ, κ, η, σ, ρ, Γ, Q, a, e, inc, ϖ, Ω, n, P, x, y, X, Y`
//! — is a derived, read-only projection computed on demand; mutating a
//! derived quantity goes through an explicit `set_*` method that back-solves
//! into the stored variables.
//!
//! The canonical-mass convention is fixed for the particle's lifetime:
//! canonical heliocentric coordinates (`μ = m M*/(M*+m)`, `M = M*+m`, the
//! default throughout the crate) or democratic heliocentric coordinates
//! (`μ = m`, `M = M*`). Physical masses are only mutable under the
//! democratic convention.
//!
//! Units
//! -----------------
//! * angles: radians
//! * `G`, masses, semi-major axes: any mutually consistent system
//! * actions: mass × √(G · mass × length)

use nalgebra::Complex;

use crate::constants::{DPI, RT2_INV};
use crate::poincare_errors::PoincareError;

/// Canonical coordinate convention, fixed per particle lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Coordinates {
    /// Canonical heliocentric coordinates in the center-of-mass frame
    #[default]
    CanonicalHeliocentric,
    /// Democratic heliocentric coordinates
    DemocraticHeliocentric,
}

/// Mass specification: physical pair or canonical pair, never a mix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MassSpec {
    /// Physical particle and central masses `(m, M*)`
    Physical { m: f64, m_star: f64 },
    /// Canonical masses `(μ, M)` as defined by the coordinate convention
    Canonical { mu: f64, m_total: f64 },
}

impl MassSpec {
    fn resolve(self, coordinates: Coordinates) -> (f64, f64) {
        match self {
            MassSpec::Physical { m, m_star } => match coordinates {
                Coordinates::CanonicalHeliocentric => (m * m_star / (m_star + m), m_star + m),
                Coordinates::DemocraticHeliocentric => (m, m_star),
            },
            MassSpec::Canonical { mu, m_total } => (mu, m_total),
        }
    }
}

/// The one orbital element without a default: exactly one of the
/// semi-major-axis parameterizations must be supplied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SemiMajorAxisSpec {
    SemiMajorAxis(f64),
    Lambda(f64),
    SLambda(f64),
}

/// Eccentricity parameterization; defaults to a circular orbit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EccentricitySpec {
    Eccentricity(f64),
    Gamma(f64),
    SGamma(f64),
}

impl Default for EccentricitySpec {
    fn default() -> Self {
        EccentricitySpec::SGamma(0.0)
    }
}

/// Inclination parameterization; defaults to a coplanar orbit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InclinationSpec {
    Inclination(f64),
    Q(f64),
    SQ(f64),
}

impl Default for InclinationSpec {
    fn default() -> Self {
        InclinationSpec::SQ(0.0)
    }
}

/// Classical orbital-element inputs for [`PoincareParticle::from_elements`].
/// Unsupplied eccentricity, inclination and angles default to zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitSpec {
    pub semi_major_axis: SemiMajorAxisSpec,
    pub eccentricity: EccentricitySpec,
    pub inclination: InclinationSpec,
    pub mean_longitude: f64,
    pub pomega: f64,
    pub ascending_node_longitude: f64,
}

impl OrbitSpec {
    /// Spec with the required semi-major-axis element and zero defaults for
    /// everything else.
    pub fn new(semi_major_axis: SemiMajorAxisSpec) -> Self {
        OrbitSpec {
            semi_major_axis,
            eccentricity: EccentricitySpec::default(),
            inclination: InclinationSpec::default(),
            mean_longitude: 0.0,
            pomega: 0.0,
            ascending_node_longitude: 0.0,
        }
    }
}

/// One non-central body in Poincaré canonical variables.
#[derive(Debug, Clone, PartialEq)]
pub struct PoincareParticle {
    coordinates: Coordinates,
    g: f64,
    mu: f64,
    m_total: f64,
    // stored state: specific actions and mean longitude
    s_lambda: f64,
    l: f64,
    s_kappa: f64,
    s_eta: f64,
    s_sigma: f64,
    s_rho: f64,
}

impl PoincareParticle {
    /// Construct from the raw stored state (tier i): all six stored
    /// quantities are required together.
    pub fn from_specific_actions(
        coordinates: Coordinates,
        g: f64,
        mass: MassSpec,
        s_lambda: f64,
        l: f64,
        s_kappa: f64,
        s_eta: f64,
        s_sigma: f64,
        s_rho: f64,
    ) -> Self {
        let (mu, m_total) = mass.resolve(coordinates);
        PoincareParticle {
            coordinates,
            g,
            mu,
            m_total,
            s_lambda,
            l,
            s_kappa,
            s_eta,
            s_sigma,
            s_rho,
        }
    }

    /// Construct from the massive canonical actions (tier ii): normalized
    /// internally by the canonical mass.
    #[allow(clippy::too_many_arguments)]
    pub fn from_actions(
        coordinates: Coordinates,
        g: f64,
        mass: MassSpec,
        lambda: f64,
        l: f64,
        kappa: f64,
        eta: f64,
        sigma: f64,
        rho: f64,
    ) -> Self {
        let (mu, m_total) = mass.resolve(coordinates);
        let rt_mu = mu.sqrt();
        PoincareParticle {
            coordinates,
            g,
            mu,
            m_total,
            s_lambda: lambda / mu,
            l,
            s_kappa: kappa / rt_mu,
            s_eta: eta / rt_mu,
            s_sigma: sigma / rt_mu,
            s_rho: rho / rt_mu,
        }
    }

    /// Construct from classical orbital-element-style inputs (tier iii).
    ///
    /// Each element is given through exactly one of its alternative
    /// parameterizations ([`OrbitSpec`]); the semi-major axis has no default.
    /// Fails if the inputs imply an eccentricity outside `[0, 1)` or negative
    /// eccentricity/inclination actions.
    pub fn from_elements(
        coordinates: Coordinates,
        g: f64,
        mass: MassSpec,
        orbit: OrbitSpec,
    ) -> Result<Self, PoincareError> {
        let (mu, m_total) = mass.resolve(coordinates);

        let s_lambda = match orbit.semi_major_axis {
            SemiMajorAxisSpec::SemiMajorAxis(a) => (g * m_total * a).sqrt(),
            SemiMajorAxisSpec::Lambda(lambda) => lambda / mu,
            SemiMajorAxisSpec::SLambda(s_lambda) => s_lambda,
        };

        let s_gamma = match orbit.eccentricity {
            EccentricitySpec::Eccentricity(e) => {
                if !(0.0..1.0).contains(&e) {
                    return Err(PoincareError::EccentricityOutOfRange {
                        s_gamma: f64::NAN,
                        s_lambda,
                        ratio: e,
                    });
                }
                s_lambda * (1.0 - (1.0 - e * e).sqrt())
            }
            EccentricitySpec::Gamma(gamma) => gamma / mu,
            EccentricitySpec::SGamma(s_gamma) => s_gamma,
        };
        if s_gamma < 0.0 {
            return Err(PoincareError::EccentricityOutOfRange {
                s_gamma,
                s_lambda,
                ratio: s_gamma / s_lambda,
            });
        }

        let s_q = match orbit.inclination {
            InclinationSpec::Inclination(inc) => (s_lambda - s_gamma) * (1.0 - inc.cos()),
            InclinationSpec::Q(q) => q / mu,
            InclinationSpec::SQ(s_q) => s_q,
        };
        if s_q < 0.0 {
            return Err(PoincareError::InclinationOutOfRange {
                s_q,
                s_lambda,
                s_gamma,
                cos_inc: f64::NAN,
            });
        }

        // canonical angles are the negatives of the longitudes
        let gamma_angle = -orbit.pomega;
        let node_angle = -orbit.ascending_node_longitude;

        let rt_two_gamma = (2.0 * s_gamma).sqrt();
        let rt_two_q = (2.0 * s_q).sqrt();

        Ok(PoincareParticle {
            coordinates,
            g,
            mu,
            m_total,
            s_lambda,
            l: orbit.mean_longitude,
            s_kappa: rt_two_gamma * gamma_angle.cos(),
            s_eta: rt_two_gamma * gamma_angle.sin(),
            s_sigma: rt_two_q * node_angle.cos(),
            s_rho: rt_two_q * node_angle.sin(),
        })
    }

    // ---------------------------------------------------------------------
    // Masses
    // ---------------------------------------------------------------------

    pub fn coordinates(&self) -> Coordinates {
        self.coordinates
    }

    pub fn g(&self) -> f64 {
        self.g
    }

    /// Canonical mass μ.
    pub fn mu(&self) -> f64 {
        self.mu
    }

    /// Canonical central mass M.
    pub fn m_total(&self) -> f64 {
        self.m_total
    }

    /// Inverts `μ = m M*/(M*+m)`, `M = M*+m` back to the physical masses.
    fn physical_masses(&self) -> (f64, f64) {
        // discriminant = M* - m, non-negative for any physical pair
        let d = (self.m_total * self.m_total - 4.0 * self.mu * self.m_total).sqrt();
        let m_star = (self.m_total + d) / 2.0;
        (self.mu * self.m_total / m_star, m_star)
    }

    /// Physical mass of the particle.
    pub fn m(&self) -> f64 {
        match self.coordinates {
            Coordinates::DemocraticHeliocentric => self.mu,
            Coordinates::CanonicalHeliocentric => self.physical_masses().0,
        }
    }

    /// Physical mass of the central body.
    pub fn m_star(&self) -> f64 {
        match self.coordinates {
            Coordinates::DemocraticHeliocentric => self.m_total,
            Coordinates::CanonicalHeliocentric => self.physical_masses().1,
        }
    }

    /// Change the particle's physical mass. Only allowed under democratic
    /// heliocentric coordinates: the canonical heliocentric masses are
    /// entangled with the stored actions.
    pub fn set_m(&mut self, value: f64) -> Result<(), PoincareError> {
        match self.coordinates {
            Coordinates::DemocraticHeliocentric => {
                self.mu = value;
                Ok(())
            }
            Coordinates::CanonicalHeliocentric => Err(PoincareError::ImmutablePhysicalMass),
        }
    }

    /// Change the central body's physical mass (democratic heliocentric only).
    pub fn set_m_star(&mut self, value: f64) -> Result<(), PoincareError> {
        match self.coordinates {
            Coordinates::DemocraticHeliocentric => {
                self.m_total = value;
                Ok(())
            }
            Coordinates::CanonicalHeliocentric => Err(PoincareError::ImmutablePhysicalMass),
        }
    }

    // ---------------------------------------------------------------------
    // Stored state
    // ---------------------------------------------------------------------

    pub fn s_lambda(&self) -> f64 {
        self.s_lambda
    }

    /// Mean longitude λ.
    pub fn mean_longitude(&self) -> f64 {
        self.l
    }

    pub fn set_mean_longitude(&mut self, value: f64) {
        self.l = value;
    }

    pub fn s_kappa(&self) -> f64 {
        self.s_kappa
    }

    pub fn s_eta(&self) -> f64 {
        self.s_eta
    }

    pub fn s_sigma(&self) -> f64 {
        self.s_sigma
    }

    pub fn s_rho(&self) -> f64 {
        self.s_rho
    }

    // ---------------------------------------------------------------------
    // Massive canonical variables (derived, with back-solving setters)
    // ---------------------------------------------------------------------

    pub fn lambda(&self) -> f64 {
        self.mu * self.s_lambda
    }

    pub fn set_lambda(&mut self, value: f64) {
        self.s_lambda = value / self.mu;
    }

    pub fn kappa(&self) -> f64 {
        self.mu.sqrt() * self.s_kappa
    }

    pub fn set_kappa(&mut self, value: f64) {
        self.s_kappa = value / self.mu.sqrt();
    }

    pub fn eta(&self) -> f64 {
        self.mu.sqrt() * self.s_eta
    }

    pub fn set_eta(&mut self, value: f64) {
        self.s_eta = value / self.mu.sqrt();
    }

    pub fn sigma(&self) -> f64 {
        self.mu.sqrt() * self.s_sigma
    }

    pub fn set_sigma(&mut self, value: f64) {
        self.s_sigma = value / self.mu.sqrt();
    }

    pub fn rho(&self) -> f64 {
        self.mu.sqrt() * self.s_rho
    }

    pub fn set_rho(&mut self, value: f64) {
        self.s_rho = value / self.mu.sqrt();
    }

    /// Eccentricity action `Γ = (κ² + η²)/2`.
    pub fn gamma(&self) -> f64 {
        self.mu * (self.s_kappa * self.s_kappa + self.s_eta * self.s_eta) / 2.0
    }

    /// Rescale the `(κ, η)` pair to the eccentricity action `value`,
    /// preserving the pericenter angle.
    pub fn set_gamma(&mut self, value: f64) {
        let s_gamma_new = value / self.mu;
        let s_gamma_old = self.s_gamma();
        if s_gamma_old == 0.0 {
            self.s_kappa = (2.0 * s_gamma_new).sqrt();
            self.s_eta = 0.0;
        } else {
            let factor = (s_gamma_new / s_gamma_old).sqrt();
            self.s_kappa *= factor;
            self.s_eta *= factor;
        }
    }

    /// Inclination action `Q = (σ² + ρ²)/2`.
    pub fn q(&self) -> f64 {
        self.mu * (self.s_sigma * self.s_sigma + self.s_rho * self.s_rho) / 2.0
    }

    /// Rescale the `(σ, ρ)` pair to the inclination action `value`,
    /// preserving the node angle.
    pub fn set_q(&mut self, value: f64) {
        let s_q_new = value / self.mu;
        let s_q_old = self.s_q();
        if s_q_old == 0.0 {
            self.s_sigma = (2.0 * s_q_new).sqrt();
            self.s_rho = 0.0;
        } else {
            let factor = (s_q_new / s_q_old).sqrt();
            self.s_sigma *= factor;
            self.s_rho *= factor;
        }
    }

    pub fn s_gamma(&self) -> f64 {
        (self.s_kappa * self.s_kappa + self.s_eta * self.s_eta) / 2.0
    }

    pub fn s_q(&self) -> f64 {
        (self.s_sigma * self.s_sigma + self.s_rho * self.s_rho) / 2.0
    }

    // ---------------------------------------------------------------------
    // Orbital elements (derived projections)
    // ---------------------------------------------------------------------

    pub fn semi_major_axis(&self) -> f64 {
        self.s_lambda * self.s_lambda / (self.g * self.m_total)
    }

    /// Mean motion `n = G²M²/sΛ³`.
    pub fn mean_motion(&self) -> f64 {
        let gm = self.g * self.m_total;
        gm * gm / self.s_lambda.powi(3)
    }

    pub fn period(&self) -> f64 {
        DPI / self.mean_motion()
    }

    /// Eccentricity, failing when the stored actions imply a value outside
    /// `[0, 1)` instead of returning NaN.
    pub fn eccentricity(&self) -> Result<f64, PoincareError> {
        let ratio = self.s_gamma() / self.s_lambda;
        if !(0.0..1.0).contains(&ratio) {
            return Err(PoincareError::EccentricityOutOfRange {
                s_gamma: self.s_gamma(),
                s_lambda: self.s_lambda,
                ratio,
            });
        }
        Ok((1.0 - (1.0 - ratio) * (1.0 - ratio)).sqrt())
    }

    /// Inclination in `[0, π]`, failing when the implied cosine leaves
    /// `[-1, 1]`.
    pub fn inclination(&self) -> Result<f64, PoincareError> {
        let denom = self.s_lambda - self.s_gamma();
        let cos_inc = 1.0 - self.s_q() / denom;
        if denom <= 0.0 || !(-1.0..=1.0).contains(&cos_inc) {
            return Err(PoincareError::InclinationOutOfRange {
                s_q: self.s_q(),
                s_lambda: self.s_lambda,
                s_gamma: self.s_gamma(),
                cos_inc,
            });
        }
        Ok(cos_inc.acos())
    }

    /// Longitude of pericenter `ϖ` (the negative of the canonical angle γ).
    pub fn pomega(&self) -> f64 {
        -self.s_eta.atan2(self.s_kappa)
    }

    /// Longitude of the ascending node `Ω` (the negative of the canonical
    /// angle q).
    pub fn ascending_node_longitude(&self) -> f64 {
        -self.s_rho.atan2(self.s_sigma)
    }

    // ---------------------------------------------------------------------
    // Complex combinations
    // ---------------------------------------------------------------------

    /// `x = (κ - iη)/√2`
    pub fn x(&self) -> Complex<f64> {
        Complex::new(self.kappa(), -self.eta()) * RT2_INV
    }

    /// `X = x √(2/Λ)`
    pub fn scaled_x(&self) -> Complex<f64> {
        self.x() * (2.0 / self.lambda()).sqrt()
    }

    /// `y = (σ - iρ)/√2`
    pub fn y(&self) -> Complex<f64> {
        Complex::new(self.sigma(), -self.rho()) * RT2_INV
    }

    /// `Y = y √(1/(2Λ))`
    pub fn scaled_y(&self) -> Complex<f64> {
        self.y() * (0.5 / self.lambda()).sqrt()
    }
}

#[cfg(test)]
mod particle_test {
    use super::*;
    use approx::assert_relative_eq;

    fn earthlike() -> PoincareParticle {
        PoincareParticle::from_elements(
            Coordinates::CanonicalHeliocentric,
            1.0,
            MassSpec::Physical {
                m: 3e-6,
                m_star: 1.0,
            },
            OrbitSpec {
                semi_major_axis: SemiMajorAxisSpec::SemiMajorAxis(1.0),
                eccentricity: EccentricitySpec::Eccentricity(0.0167),
                inclination: InclinationSpec::Inclination(0.03),
                mean_longitude: 2.1,
                pomega: 1.7967674211761813,
                ascending_node_longitude: -1.9760931953208377,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_element_round_trip() {
        let p = earthlike();
        assert_relative_eq!(p.semi_major_axis(), 1.0, max_relative = 1e-14);
        assert_relative_eq!(p.eccentricity().unwrap(), 0.0167, max_relative = 1e-12);
        assert_relative_eq!(p.inclination().unwrap(), 0.03, max_relative = 1e-12);
        assert_relative_eq!(p.mean_longitude(), 2.1);
        assert_relative_eq!(p.pomega(), 1.7967674211761813, max_relative = 1e-12);
        assert_relative_eq!(
            p.ascending_node_longitude(),
            -1.9760931953208377,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_action_identities() {
        let p = earthlike();
        let kappa = p.kappa();
        let eta = p.eta();
        let sigma = p.sigma();
        let rho = p.rho();
        assert_relative_eq!(
            kappa * kappa + eta * eta,
            2.0 * p.gamma(),
            max_relative = 1e-14
        );
        assert_relative_eq!(sigma * sigma + rho * rho, 2.0 * p.q(), max_relative = 1e-14);
        assert_relative_eq!(p.gamma(), p.mu() * p.s_gamma(), max_relative = 1e-14);
    }

    #[test]
    fn test_set_lambda_back_solves() {
        let mut p = earthlike();
        p.set_lambda(0.25);
        assert_relative_eq!(p.lambda(), 0.25, max_relative = 1e-15);
        assert_relative_eq!(p.s_lambda(), 0.25 / p.mu(), max_relative = 1e-15);
    }

    #[test]
    fn test_canonical_mass_resolution() {
        let p = earthlike();
        // canonical heliocentric: mu = m M*/(M*+m), M = M*+m
        assert_relative_eq!(p.m(), 3e-6, max_relative = 1e-10);
        assert_relative_eq!(p.m_star(), 1.0, max_relative = 1e-12);
        assert_relative_eq!(p.m_total(), 1.0 + 3e-6, max_relative = 1e-14);
    }

    #[test]
    fn test_physical_mass_immutable_under_canonical_heliocentric() {
        let mut p = earthlike();
        assert_eq!(p.set_m(1e-5), Err(PoincareError::ImmutablePhysicalMass));
        let mut q = PoincareParticle::from_specific_actions(
            Coordinates::DemocraticHeliocentric,
            1.0,
            MassSpec::Physical {
                m: 1e-5,
                m_star: 1.0,
            },
            1.0,
            0.0,
            0.0,
            0.0,
            0.0,
            0.0,
        );
        assert!(q.set_m(2e-5).is_ok());
        assert_eq!(q.mu(), 2e-5);
    }

    #[test]
    fn test_parabolic_input_rejected() {
        let result = PoincareParticle::from_elements(
            Coordinates::CanonicalHeliocentric,
            1.0,
            MassSpec::Physical {
                m: 1e-5,
                m_star: 1.0,
            },
            OrbitSpec {
                eccentricity: EccentricitySpec::Eccentricity(1.0),
                ..OrbitSpec::new(SemiMajorAxisSpec::SemiMajorAxis(1.0))
            },
        );
        assert!(matches!(
            result,
            Err(PoincareError::EccentricityOutOfRange { .. })
        ));
    }

    #[test]
    fn test_overflowing_gamma_fails_on_read() {
        // sGamma > sLambda puts the implied eccentricity outside [0, 1)
        let p = PoincareParticle::from_specific_actions(
            Coordinates::CanonicalHeliocentric,
            1.0,
            MassSpec::Physical {
                m: 1e-5,
                m_star: 1.0,
            },
            1.0,
            0.0,
            1.5,
            0.1,
            0.0,
            0.0,
        );
        assert!(matches!(
            p.eccentricity(),
            Err(PoincareError::EccentricityOutOfRange { .. })
        ));
    }

    #[test]
    fn test_inclination_cosine_domain() {
        let p = PoincareParticle::from_specific_actions(
            Coordinates::CanonicalHeliocentric,
            1.0,
            MassSpec::Physical {
                m: 1e-5,
                m_star: 1.0,
            },
            1.0,
            0.0,
            0.0,
            0.0,
            3.0,
            0.0,
        );
        assert!(matches!(
            p.inclination(),
            Err(PoincareError::InclinationOutOfRange { .. })
        ));
    }

    #[test]
    fn test_set_gamma_preserves_pomega() {
        let mut p = earthlike();
        let pomega = p.pomega();
        p.set_gamma(2.0 * p.gamma());
        assert_relative_eq!(p.pomega(), pomega, max_relative = 1e-12);
    }
}
