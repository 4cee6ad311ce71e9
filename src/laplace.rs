//! # Laplace coefficients
//!
//! The disturbing-function coefficients are linear combinations of Laplace
//! coefficients `b_s^(j)(α)` and their α-derivatives. This module evaluates
//! them through the hypergeometric power series
//!
//! ```text
//! b_s^(j)(α) = 2 α^j Σ_{n≥0} [(s)_n (s)_{n+j} / (n! (n+j)!)] α^(2n)
//! ```
//!
//! (`(s)_n` the Pochhammer symbol), which converges for `0 < α < 1` — the
//! only regime meaningful for a pair of distinct bounded orbits.
//! α-derivatives of any order are taken term by term, so no finite
//! differencing is involved anywhere.

use crate::constants::SERIES_EPS;
use crate::poincare_errors::PoincareError;

const NMAX: usize = 2000;

/// Laplace coefficient `b_s^(j)(α)`.
pub fn laplace_coefficient(s: f64, j: i32, alpha: f64) -> Result<f64, PoincareError> {
    laplace_coefficient_derivative(s, j, 0, alpha)
}

/// `d^order/dα^order  b_s^(j)(α)`, by term-by-term differentiation of the
/// defining series.
pub fn laplace_coefficient_derivative(
    s: f64,
    j: i32,
    order: u32,
    alpha: f64,
) -> Result<f64, PoincareError> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(PoincareError::LaplaceCoefficientDomain(alpha));
    }
    let j = j.unsigned_abs() as usize;

    // c_n α^(j+2n) series coefficients by recurrence
    let mut c = pochhammer(s, j) / factorial(j);
    let mut total = 0.0;
    for n in 0..NMAX {
        let exponent = (j + 2 * n) as i64;
        let term = c * derivative_factor(exponent, order) * power(alpha, exponent - order as i64);
        total += term;
        // the series terms decrease like α^(2n) once n is past the
        // derivative-factor growth; stop when negligible
        if n > order as usize && term.abs() < SERIES_EPS * total.abs().max(1.0) {
            break;
        }
        c *= (s + n as f64) * (s + (j + n) as f64) / ((n + 1) as f64 * (j + n + 1) as f64);
    }
    Ok(2.0 * total)
}

/// Falling-factorial factor from differentiating α^exponent `order` times.
fn derivative_factor(exponent: i64, order: u32) -> f64 {
    let mut factor = 1.0;
    for i in 0..order as i64 {
        factor *= (exponent - i) as f64;
    }
    factor
}

fn power(alpha: f64, exponent: i64) -> f64 {
    if exponent < 0 {
        // only reached with a zero derivative_factor alongside; the value is
        // irrelevant but must stay finite
        0.0
    } else {
        alpha.powi(exponent as i32)
    }
}

fn pochhammer(s: f64, n: usize) -> f64 {
    let mut value = 1.0;
    for i in 0..n {
        value *= s + i as f64;
    }
    value
}

fn factorial(n: usize) -> f64 {
    let mut value = 1.0;
    for i in 1..=n {
        value *= i as f64;
    }
    value
}

#[cfg(test)]
mod laplace_test {
    use super::*;
    use approx::assert_relative_eq;

    /// Direct quadrature of the defining integral,
    /// `b_s^(j)(α) = (2/π) ∫ cos(jψ) (1 - 2α cos ψ + α²)^(-s) dψ`.
    fn quadrature(s: f64, j: i32, alpha: f64) -> f64 {
        let n = 200_000;
        let h = std::f64::consts::PI / n as f64;
        let f = |psi: f64| {
            (j as f64 * psi).cos() / (1.0 - 2.0 * alpha * psi.cos() + alpha * alpha).powf(s)
        };
        // composite Simpson rule
        let mut total = f(0.0) + f(std::f64::consts::PI);
        for i in 1..n {
            let w = if i % 2 == 1 { 4.0 } else { 2.0 };
            total += w * f(i as f64 * h);
        }
        total * h / 3.0 * 2.0 / std::f64::consts::PI
    }

    #[test]
    fn test_against_quadrature() {
        for &(s, j, alpha) in &[
            (0.5, 0, 0.4),
            (0.5, 1, 0.4),
            (0.5, 2, 0.63),
            (0.5, 3, 0.63),
            (1.5, 1, 0.5),
            (1.5, 2, 0.7),
        ] {
            let series = laplace_coefficient(s, j, alpha).unwrap();
            let integral = quadrature(s, j, alpha);
            assert_relative_eq!(series, integral, max_relative = 1e-10);
        }
    }

    #[test]
    fn test_negative_index_symmetry() {
        let a = laplace_coefficient(0.5, 3, 0.6).unwrap();
        let b = laplace_coefficient(0.5, -3, 0.6).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_derivative_against_finite_difference() {
        let alpha = 0.55;
        let h = 1e-6;
        for &(s, j) in &[(0.5, 1), (0.5, 2), (1.5, 1)] {
            let d = laplace_coefficient_derivative(s, j, 1, alpha).unwrap();
            let fd = (laplace_coefficient(s, j, alpha + h).unwrap()
                - laplace_coefficient(s, j, alpha - h).unwrap())
                / (2.0 * h);
            assert_relative_eq!(d, fd, max_relative = 1e-8);
        }
        let d2 = laplace_coefficient_derivative(0.5, 2, 2, alpha).unwrap();
        let fd2 = (laplace_coefficient(0.5, 2, alpha + h).unwrap()
            - 2.0 * laplace_coefficient(0.5, 2, alpha).unwrap()
            + laplace_coefficient(0.5, 2, alpha - h).unwrap())
            / (h * h);
        assert_relative_eq!(d2, fd2, max_relative = 1e-4);
    }

    #[test]
    fn test_domain_error() {
        assert!(matches!(
            laplace_coefficient(0.5, 0, 1.2),
            Err(PoincareError::LaplaceCoefficientDomain(_))
        ));
    }
}
