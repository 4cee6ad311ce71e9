use thiserror::Error;

/// Crate-wide error type.
///
/// The variants fall into the failure classes of the engine:
/// invalid configuration (construction/mutation misuse), invalid physical
/// state (a derived orbital element outside its domain), invalid orbit
/// geometry on import, and symbolic-layer failures (missing disturbing
/// function coefficients, stale equations of motion). All of them are fatal
/// for the operation that raised them; advisory conditions go through
/// `log::warn!` instead and never surface here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoincareError {
    #[error("physical masses cannot be changed after initialization with canonical heliocentric coordinates")]
    ImmutablePhysicalMass,

    #[error("the central body carries no Poincare elements")]
    CentralBodyHasNoElements,

    #[error("particle index {0} out of range for a system of {1} bodies")]
    ParticleIndexOutOfRange(isize, usize),

    #[error("a system requires at least one non-central body")]
    EmptySystem,

    #[error("state vector has length {got}, expected {expected}")]
    MismatchedStateLength { got: usize, expected: usize },

    #[error(
        "eccentricity out of [0, 1): sGamma={s_gamma}, sLambda={s_lambda} imply Gamma/Lambda={ratio}"
    )]
    EccentricityOutOfRange {
        s_gamma: f64,
        s_lambda: f64,
        ratio: f64,
    },

    #[error("inclination cosine {cos_inc} outside [-1, 1] (sQ={s_q}, sLambda={s_lambda}, sGamma={s_gamma})")]
    InclinationOutOfRange {
        s_q: f64,
        s_lambda: f64,
        s_gamma: f64,
        cos_inc: f64,
    },

    #[error("only elliptical orbits are supported: body {index} has a={a}, e={e}")]
    NonEllipticalOrbit { index: usize, a: f64, e: f64 },

    #[error("no closed-form disturbing function coefficient for k={k:?}, nu={nu:?}")]
    UnsupportedDfCoefficient { k: [i32; 6], nu: [u32; 4] },

    #[error("harmonic vector {0:?} violates the d'Alembert relations")]
    DAlembertViolation([i32; 6]),

    #[error("Laplace coefficient b_s^(j) requires 0 < alpha < 1, got {0}")]
    LaplaceCoefficientDomain(f64),

    #[error("equations of motion are stale; call finalize() after the last term addition")]
    StaleEquationsOfMotion,

    #[error("interaction matrix is singular and cannot define a resonance operator")]
    SingularInteractionMatrix,

    #[error("bodies must be ordered by increasing semi-major axis: alpha={0} >= 1")]
    UnorderedSemiMajorAxes(f64),

    #[error("resonance chain needs {expected} period ratios for {bodies} bodies, got {got}")]
    MismatchedChainLength {
        expected: usize,
        got: usize,
        bodies: usize,
    },

    #[error("resonance spacing must be a positive period-ratio offset, got {0}")]
    InvalidResonanceSpacing(f64),
}
