//! # Disturbing-function coefficients
//!
//! The Hamiltonian term generator consumes disturbing-function coefficients
//! as a pure function `(harmonic vector, expansion-order vector) → C(α)`.
//! This module defines that interface ([`DfCoefficientProvider`]), a closed
//! representation of one coefficient as a linear combination of Laplace
//! coefficients and their derivatives ([`DfCoefficient`]), and a built-in
//! provider covering the classic literature families through second order in
//! eccentricities and inclinations (Murray & Dermott 1999 normalization,
//! `R = (G m m'/a') Σ C(α) · e/s amplitudes · cos(argument)`).
//!
//! Arbitrary-order closed forms are deliberately out of scope; harmonic
//! vectors outside the supported families yield
//! [`PoincareError::UnsupportedDfCoefficient`] and batch term generators skip
//! them with a warning.

use crate::laplace::laplace_coefficient_derivative;
use crate::poincare_errors::PoincareError;

/// One `factor · α^p · d^n b_s^(j)/dα^n` contribution.
#[derive(Debug, Clone, PartialEq)]
pub struct LaplaceTerm {
    pub factor: f64,
    pub alpha_power: i32,
    pub s: f64,
    pub j: i32,
    pub derivative: u32,
}

/// A disturbing-function coefficient: direct Laplace-coefficient terms plus
/// indirect contributions that are pure powers of α.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DfCoefficient {
    direct: Vec<LaplaceTerm>,
    /// `(factor, alpha_power)` pairs
    indirect: Vec<(f64, i32)>,
}

impl DfCoefficient {
    /// `c0·b + c1·α·Db + c2·α²·D²b` for the Laplace coefficient `b_s^(j)`.
    fn from_operator(c0: f64, c1: f64, c2: f64, s: f64, j: i32) -> Self {
        let mut direct = Vec::new();
        for (factor, alpha_power, derivative) in [(c0, 0, 0), (c1, 1, 1), (c2, 2, 2)] {
            if factor != 0.0 {
                direct.push(LaplaceTerm {
                    factor,
                    alpha_power,
                    s,
                    j,
                    derivative,
                });
            }
        }
        DfCoefficient {
            direct,
            indirect: Vec::new(),
        }
    }

    fn with_indirect(mut self, factor: f64, alpha_power: i32) -> Self {
        self.indirect.push((factor, alpha_power));
        self
    }

    /// Numeric value at semi-major axis ratio `alpha`.
    pub fn eval(&self, alpha: f64) -> Result<f64, PoincareError> {
        let mut total = 0.0;
        for term in &self.direct {
            let b = laplace_coefficient_derivative(term.s, term.j, term.derivative, alpha)?;
            total += term.factor * alpha.powi(term.alpha_power) * b;
        }
        for &(factor, alpha_power) in &self.indirect {
            total += factor * alpha.powi(alpha_power);
        }
        Ok(total)
    }

    /// Analytic α-derivative, still a [`DfCoefficient`].
    pub fn derivative(&self) -> DfCoefficient {
        let mut direct = Vec::new();
        let mut indirect = Vec::new();
        for term in &self.direct {
            if term.alpha_power != 0 {
                direct.push(LaplaceTerm {
                    factor: term.factor * term.alpha_power as f64,
                    alpha_power: term.alpha_power - 1,
                    ..term.clone()
                });
            }
            direct.push(LaplaceTerm {
                derivative: term.derivative + 1,
                ..term.clone()
            });
        }
        for &(factor, alpha_power) in &self.indirect {
            if alpha_power != 0 {
                indirect.push((factor * alpha_power as f64, alpha_power - 1));
            }
        }
        DfCoefficient { direct, indirect }
    }
}

/// Pure-function source of disturbing-function coefficients.
///
/// `k = [k1..k6]` weights `(λ_out, λ_in, ϖ_in, ϖ_out, Ω_in, Ω_out)` in the
/// cosine argument; `nu = [ν1..ν4]` are the extra expansion orders in
/// `s_in², s_out², e_in², e_out²`.
pub trait DfCoefficientProvider {
    fn coefficient(&self, k: [i32; 6], nu: [u32; 4]) -> Result<DfCoefficient, PoincareError>;
}

/// Built-in provider implementing the classic expansion families.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassicCoefficients;

impl ClassicCoefficients {
    /// Secular `e²` coefficient, `(1/8)(2αD + α²D²) b_{1/2}^{(0)}`.
    fn secular_ecc_diagonal() -> DfCoefficient {
        DfCoefficient::from_operator(0.0, 0.25, 0.125, 0.5, 0)
    }

    /// Secular `s²` coefficient, `-(α/2) b_{3/2}^{(1)}`.
    fn secular_inc_diagonal() -> DfCoefficient {
        DfCoefficient {
            direct: vec![LaplaceTerm {
                factor: -0.5,
                alpha_power: 1,
                s: 1.5,
                j: 1,
                derivative: 0,
            }],
            indirect: Vec::new(),
        }
    }

    /// Secular `e e' cos(ϖ_in - ϖ_out)`, `(1/4)(2 - 2αD - α²D²) b_{1/2}^{(1)}`.
    fn secular_ecc_off_diagonal() -> DfCoefficient {
        DfCoefficient::from_operator(0.5, -0.5, -0.25, 0.5, 1)
    }

    /// Secular `s s' cos(Ω_in - Ω_out)`, `α b_{3/2}^{(1)}`.
    fn secular_inc_off_diagonal() -> DfCoefficient {
        DfCoefficient {
            direct: vec![LaplaceTerm {
                factor: 1.0,
                alpha_power: 1,
                s: 1.5,
                j: 1,
                derivative: 0,
            }],
            indirect: Vec::new(),
        }
    }

    /// First-order `e_in` coefficient of `j λ_out + (1-j) λ_in - ϖ_in`.
    fn first_order_inner(j: i32) -> DfCoefficient {
        let c = DfCoefficient::from_operator(-(j as f64), -0.5, 0.0, 0.5, j);
        if j == 1 {
            c.with_indirect(-0.5, 1)
        } else {
            c
        }
    }

    /// First-order `e_out` coefficient of `j λ_out + (1-j) λ_in - ϖ_out`.
    fn first_order_outer(j: i32) -> DfCoefficient {
        let c = DfCoefficient::from_operator(j as f64 - 0.5, 0.5, 0.0, 0.5, j - 1);
        if j == 2 {
            c.with_indirect(-2.0, 1)
        } else {
            c
        }
    }

    /// Second-order `e_in²` coefficient of `j λ_out + (2-j) λ_in - 2ϖ_in`.
    fn second_order_inner(j: i32) -> DfCoefficient {
        let jf = j as f64;
        let c = DfCoefficient::from_operator(
            (4.0 * jf * jf - 5.0 * jf) / 8.0,
            (4.0 * jf - 2.0) / 8.0,
            0.125,
            0.5,
            j,
        );
        if j == 1 {
            c.with_indirect(-0.375, 1)
        } else {
            c
        }
    }

    /// Second-order `e_in e_out` coefficient of
    /// `j λ_out + (2-j) λ_in - ϖ_in - ϖ_out`.
    fn second_order_cross(j: i32) -> DfCoefficient {
        let jf = j as f64;
        let c = DfCoefficient::from_operator(
            (-4.0 * jf * jf + 6.0 * jf - 2.0) / 4.0,
            (2.0 - 4.0 * jf) / 4.0,
            -0.25,
            0.5,
            j - 1,
        );
        if j == 2 {
            c.with_indirect(1.0, 1)
        } else {
            c
        }
    }

    /// Second-order `e_out²` coefficient of `j λ_out + (2-j) λ_in - 2ϖ_out`.
    fn second_order_outer(j: i32) -> DfCoefficient {
        let jf = j as f64;
        let c = DfCoefficient::from_operator(
            (4.0 * jf * jf - 7.0 * jf + 2.0) / 8.0,
            (4.0 * jf - 2.0) / 8.0,
            0.125,
            0.5,
            j - 2,
        );
        match j {
            1 => c.with_indirect(-0.125, 1),
            3 => c.with_indirect(-27.0 / 8.0, 1),
            _ => c,
        }
    }

    /// Second-order `s_in²` (and `s_out²`) coefficient,
    /// `(α/2) b_{3/2}^{(j-1)}`.
    fn second_order_inc_diagonal(j: i32) -> DfCoefficient {
        DfCoefficient {
            direct: vec![LaplaceTerm {
                factor: 0.5,
                alpha_power: 1,
                s: 1.5,
                j: j - 1,
                derivative: 0,
            }],
            indirect: Vec::new(),
        }
    }

    /// Second-order `s_in s_out` coefficient, `-α b_{3/2}^{(j-1)}`.
    fn second_order_inc_cross(j: i32) -> DfCoefficient {
        DfCoefficient {
            direct: vec![LaplaceTerm {
                factor: -1.0,
                alpha_power: 1,
                s: 1.5,
                j: j - 1,
                derivative: 0,
            }],
            indirect: Vec::new(),
        }
    }
}

impl DfCoefficientProvider for ClassicCoefficients {
    fn coefficient(&self, k: [i32; 6], nu: [u32; 4]) -> Result<DfCoefficient, PoincareError> {
        // d'Alembert relations: rotation invariance and nodal parity
        if k.iter().sum::<i32>() != 0 || (k[4] + k[5]).rem_euclid(2) != 0 {
            return Err(PoincareError::DAlembertViolation(k));
        }
        // cos is even: bring the leading nonzero weight positive
        let mut k = k;
        if k.iter().find(|&&v| v != 0).map_or(false, |&v| v < 0) {
            for v in &mut k {
                *v = -*v;
            }
        }

        let unsupported = || PoincareError::UnsupportedDfCoefficient { k, nu };

        if nu != [0, 0, 0, 0] {
            // expansion-order corrections are only tabulated for the secular
            // quadratic terms
            if k != [0; 6] {
                return Err(unsupported());
            }
            return match nu {
                [0, 0, 1, 0] | [0, 0, 0, 1] => Ok(Self::secular_ecc_diagonal()),
                [1, 0, 0, 0] | [0, 1, 0, 0] => Ok(Self::secular_inc_diagonal()),
                _ => Err(unsupported()),
            };
        }

        match k {
            [0, 0, 0, 0, 0, 0] => Ok(DfCoefficient::from_operator(0.5, 0.0, 0.0, 0.5, 0)),
            [0, 0, 1, -1, 0, 0] => Ok(Self::secular_ecc_off_diagonal()),
            [0, 0, 0, 0, 1, -1] => Ok(Self::secular_inc_off_diagonal()),
            [j, k2, -1, 0, 0, 0] if j >= 1 && k2 == 1 - j => Ok(Self::first_order_inner(j)),
            [j, k2, 0, -1, 0, 0] if j >= 1 && k2 == 1 - j => Ok(Self::first_order_outer(j)),
            [j, k2, -2, 0, 0, 0] if j >= 1 && k2 == 2 - j => Ok(Self::second_order_inner(j)),
            [j, k2, -1, -1, 0, 0] if j >= 1 && k2 == 2 - j => Ok(Self::second_order_cross(j)),
            [j, k2, 0, -2, 0, 0] if j >= 1 && k2 == 2 - j => Ok(Self::second_order_outer(j)),
            [j, k2, 0, 0, -2, 0] if j >= 1 && k2 == 2 - j => Ok(Self::second_order_inc_diagonal(j)),
            [j, k2, 0, 0, -1, -1] if j >= 1 && k2 == 2 - j => Ok(Self::second_order_inc_cross(j)),
            [j, k2, 0, 0, 0, -2] if j >= 1 && k2 == 2 - j => Ok(Self::second_order_inc_diagonal(j)),
            _ => Err(unsupported()),
        }
    }
}

/// Two-variable truncated Taylor series in `(δ_in, δ_out)`, total degree ≤ n.
#[derive(Debug, Clone)]
struct Jet2 {
    n: usize,
    c: Vec<f64>,
}

impl Jet2 {
    fn zero(n: usize) -> Self {
        Jet2 {
            n,
            c: vec![0.0; (n + 1) * (n + 1)],
        }
    }

    fn constant(n: usize, value: f64) -> Self {
        let mut jet = Jet2::zero(n);
        jet.c[0] = value;
        jet
    }

    fn coeff(&self, i: usize, j: usize) -> f64 {
        self.c[i * (self.n + 1) + j]
    }

    fn coeff_mut(&mut self, i: usize, j: usize) -> &mut f64 {
        &mut self.c[i * (self.n + 1) + j]
    }

    /// The variable δ_in (axis 0) or δ_out (axis 1).
    fn delta(n: usize, axis: usize) -> Self {
        let mut jet = Jet2::zero(n);
        if n >= 1 {
            if axis == 0 {
                *jet.coeff_mut(1, 0) = 1.0;
            } else {
                *jet.coeff_mut(0, 1) = 1.0;
            }
        }
        jet
    }

    fn add(&self, other: &Jet2) -> Jet2 {
        let mut out = self.clone();
        for (a, b) in out.c.iter_mut().zip(&other.c) {
            *a += b;
        }
        out
    }

    fn scale(&self, factor: f64) -> Jet2 {
        let mut out = self.clone();
        for a in &mut out.c {
            *a *= factor;
        }
        out
    }

    fn mul(&self, other: &Jet2) -> Jet2 {
        let n = self.n;
        let mut out = Jet2::zero(n);
        for i1 in 0..=n {
            for j1 in 0..=(n - i1) {
                let a = self.coeff(i1, j1);
                if a == 0.0 {
                    continue;
                }
                for i2 in 0..=(n - i1 - j1) {
                    for j2 in 0..=(n - i1 - j1 - i2) {
                        let b = other.coeff(i2, j2);
                        if b != 0.0 {
                            *out.coeff_mut(i1 + i2, j1 + j2) += a * b;
                        }
                    }
                }
            }
        }
        out
    }

    /// `(1 + x)^p` for a jet `x` with zero constant term, via the generalized
    /// binomial series (exact to the truncation order).
    fn one_plus_pow(x: &Jet2, p: i32) -> Jet2 {
        let n = x.n;
        let mut out = Jet2::constant(n, 1.0);
        let mut x_pow = Jet2::constant(n, 1.0);
        let mut binom = 1.0;
        for m in 1..=n {
            x_pow = x_pow.mul(x);
            binom *= (p as f64 - (m as f64 - 1.0)) / m as f64;
            out = out.add(&x_pow.scale(binom));
        }
        out
    }
}

/// Taylor coefficients `C_{l1,l2}` (`l1 + l2 ≤ lmax`) of the δ-expansion
///
/// ```text
/// (1+δ_in)^p1 (1+δ_out)^p2 · C(α0 (1+δ_in)² (1+δ_out)^{-2})
/// ```
///
/// with `p1 = -(|k3|+|k5|+2ν3+2ν1)` and `p2 = -(|k4|+|k6|+2ν4+2ν2) - 2`, the
/// powers restoring the true-Λ dependence of the Λ0-normalized canonical
/// amplitudes and of the `1/a_out` prefactor.
pub fn delta_expansion(
    coefficient: &DfCoefficient,
    k: [i32; 6],
    nu: [u32; 4],
    lmax: u32,
    alpha0: f64,
) -> Result<Vec<((u8, u8), f64)>, PoincareError> {
    let n = lmax as usize;
    let p1 = -(k[2].abs() + k[4].abs()) - 2 * (nu[2] + nu[0]) as i32;
    let p2 = -(k[3].abs() + k[5].abs()) - 2 * (nu[3] + nu[1]) as i32 - 2;

    let d_in = Jet2::delta(n, 0);
    let d_out = Jet2::delta(n, 1);

    let amplitude = Jet2::one_plus_pow(&d_in, p1).mul(&Jet2::one_plus_pow(&d_out, p2));

    // α(δ) - α0 as a jet with zero constant term
    let alpha_jet = Jet2::one_plus_pow(&d_in, 2)
        .mul(&Jet2::one_plus_pow(&d_out, -2))
        .scale(alpha0);
    let mut t = alpha_jet;
    *t.coeff_mut(0, 0) -= alpha0;

    // compose C around α0
    let mut composed = Jet2::zero(n);
    let mut c_deriv = coefficient.clone();
    let mut t_pow = Jet2::constant(n, 1.0);
    let mut m_factorial = 1.0;
    for m in 0..=n {
        if m > 0 {
            t_pow = t_pow.mul(&t);
            m_factorial *= m as f64;
        }
        composed = composed.add(&t_pow.scale(c_deriv.eval(alpha0)? / m_factorial));
        c_deriv = c_deriv.derivative();
    }

    let full = amplitude.mul(&composed);
    let mut out = Vec::new();
    for l1 in 0..=n {
        for l2 in 0..=(n - l1) {
            out.push(((l1 as u8, l2 as u8), full.coeff(l1, l2)));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod disturbing_test {
    use super::*;
    use approx::assert_relative_eq;
    use crate::laplace::laplace_coefficient;

    #[test]
    fn test_coefficient_eval_matches_operator() {
        // f27(2) = (1/2)(-4 - αD) b_{1/2}^{(2)}
        let alpha: f64 = 0.63;
        let c = ClassicCoefficients
            .coefficient([2, -1, -1, 0, 0, 0], [0; 4])
            .unwrap();
        let b = laplace_coefficient(0.5, 2, alpha).unwrap();
        let db = crate::laplace::laplace_coefficient_derivative(0.5, 2, 1, alpha).unwrap();
        assert_relative_eq!(
            c.eval(alpha).unwrap(),
            -2.0 * b - 0.5 * alpha * db,
            max_relative = 1e-14
        );
    }

    #[test]
    fn test_sign_normalization() {
        let alpha = 0.55;
        let plain = ClassicCoefficients
            .coefficient([0, 0, 1, -1, 0, 0], [0; 4])
            .unwrap();
        let flipped = ClassicCoefficients
            .coefficient([0, 0, -1, 1, 0, 0], [0; 4])
            .unwrap();
        assert_eq!(plain.eval(alpha).unwrap(), flipped.eval(alpha).unwrap());
    }

    #[test]
    fn test_dalembert_rejection() {
        assert!(matches!(
            ClassicCoefficients.coefficient([2, -1, 0, 0, 0, 0], [0; 4]),
            Err(PoincareError::DAlembertViolation(_))
        ));
        assert!(matches!(
            ClassicCoefficients.coefficient([2, -2, 0, 0, 1, -1], [0; 4]),
            Ok(_) | Err(PoincareError::UnsupportedDfCoefficient { .. })
        ));
    }

    #[test]
    fn test_unsupported_high_order() {
        assert!(matches!(
            ClassicCoefficients.coefficient([6, -3, -2, -1, 0, 0], [0; 4]),
            Err(PoincareError::UnsupportedDfCoefficient { .. })
        ));
    }

    #[test]
    fn test_derivative_against_finite_difference() {
        let c = ClassicCoefficients
            .coefficient([2, -1, 0, -1, 0, 0], [0; 4])
            .unwrap();
        let d = c.derivative();
        let alpha = 0.6;
        let h = 1e-6;
        let fd = (c.eval(alpha + h).unwrap() - c.eval(alpha - h).unwrap()) / (2.0 * h);
        assert_relative_eq!(d.eval(alpha).unwrap(), fd, max_relative = 1e-7);
    }

    #[test]
    fn test_delta_expansion_against_direct_evaluation() {
        let k = [2, -1, -1, 0, 0, 0];
        let nu = [0u32; 4];
        let alpha0 = 0.6299605249474366; // 2:1 commensurability
        let c = ClassicCoefficients.coefficient(k, nu).unwrap();
        let expansion = delta_expansion(&c, k, nu, 2, alpha0).unwrap();

        let p1 = -1.0;
        let p2 = -2.0;
        let direct = |d1: f64, d2: f64| -> f64 {
            let alpha = alpha0 * (1.0 + d1).powi(2) / (1.0 + d2).powi(2);
            (1.0 + d1).powf(p1) * (1.0 + d2).powf(p2) * c.eval(alpha).unwrap()
        };

        let (d1, d2): (f64, f64) = (1.7e-3, -1.1e-3);
        let mut taylor = 0.0;
        for ((l1, l2), value) in expansion {
            taylor += value * d1.powi(l1 as i32) * d2.powi(l2 as i32);
        }
        // truncation error is O(δ³)
        assert_relative_eq!(taylor, direct(d1, d2), max_relative = 1e-7);
    }
}
