//! Sparse multivariate (Laurent) polynomials over structured symbols.
//!
//! A monomial is a map from symbol to integer exponent (negative exponents
//! are allowed — `Λ⁻²`, `a₀⁻³`, `√Λ₀⁻¹` all occur in Hamiltonian terms), a
//! polynomial a map from monomial to `f64` coefficient. `BTreeMap` keys keep
//! both in canonical order so equality and term merging need no separate
//! normalization pass.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use super::{Sym, SymResolver};

/// Exponent map of one monomial. Zero exponents are never stored.
pub type Monomial = BTreeMap<Sym, i32>;

/// A sparse multivariate polynomial with `f64` coefficients.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Poly {
    terms: BTreeMap<Monomial, f64>,
}

impl Poly {
    pub fn zero() -> Self {
        Poly::default()
    }

    pub fn constant(c: f64) -> Self {
        let mut p = Poly::default();
        if c != 0.0 {
            p.terms.insert(Monomial::new(), c);
        }
        p
    }

    pub fn one() -> Self {
        Poly::constant(1.0)
    }

    /// The polynomial consisting of a single symbol.
    pub fn var(sym: impl Into<Sym>) -> Self {
        Poly::var_pow(sym, 1)
    }

    /// A single symbol raised to an integer (possibly negative) power.
    pub fn var_pow(sym: impl Into<Sym>, exp: i32) -> Self {
        if exp == 0 {
            return Poly::one();
        }
        let mut mono = Monomial::new();
        mono.insert(sym.into(), exp);
        let mut p = Poly::default();
        p.terms.insert(mono, 1.0);
        p
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn n_terms(&self) -> usize {
        self.terms.len()
    }

    fn insert_term(&mut self, mono: Monomial, coeff: f64) {
        if coeff == 0.0 {
            return;
        }
        match self.terms.entry(mono) {
            Entry::Occupied(mut slot) => {
                *slot.get_mut() += coeff;
                if *slot.get() == 0.0 {
                    slot.remove();
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(coeff);
            }
        }
    }

    pub fn add_assign(&mut self, other: &Poly) {
        for (mono, &c) in &other.terms {
            self.insert_term(mono.clone(), c);
        }
    }

    pub fn add(&self, other: &Poly) -> Poly {
        let mut out = self.clone();
        out.add_assign(other);
        out
    }

    pub fn sub(&self, other: &Poly) -> Poly {
        self.add(&other.scale(-1.0))
    }

    pub fn scale(&self, factor: f64) -> Poly {
        if factor == 0.0 {
            return Poly::zero();
        }
        let mut out = Poly::default();
        for (mono, &c) in &self.terms {
            out.terms.insert(mono.clone(), c * factor);
        }
        out
    }

    pub fn neg(&self) -> Poly {
        self.scale(-1.0)
    }

    pub fn mul(&self, other: &Poly) -> Poly {
        let mut out = Poly::default();
        for (ma, &ca) in &self.terms {
            for (mb, &cb) in &other.terms {
                let mut mono = ma.clone();
                for (&sym, &exp) in mb {
                    let e = mono.entry(sym).or_insert(0);
                    *e += exp;
                    if *e == 0 {
                        mono.remove(&sym);
                    }
                }
                out.insert_term(mono, ca * cb);
            }
        }
        out
    }

    /// Integer power by repeated multiplication (exponents stay small here).
    pub fn powi(&self, n: u32) -> Poly {
        let mut out = Poly::one();
        for _ in 0..n {
            out = out.mul(self);
        }
        out
    }

    /// Partial derivative with respect to one symbol.
    pub fn diff(&self, sym: impl Into<Sym>) -> Poly {
        let sym = sym.into();
        let mut out = Poly::default();
        for (mono, &c) in &self.terms {
            if let Some(&exp) = mono.get(&sym) {
                let mut dm = mono.clone();
                if exp == 1 {
                    dm.remove(&sym);
                } else {
                    dm.insert(sym, exp - 1);
                }
                out.insert_term(dm, c * exp as f64);
            }
        }
        out
    }

    /// Numeric evaluation against a symbol resolver.
    pub fn eval(&self, resolver: &dyn SymResolver) -> f64 {
        let mut total = 0.0;
        for (mono, &c) in &self.terms {
            let mut value = c;
            for (&sym, &exp) in mono {
                value *= resolver.resolve(sym).powi(exp);
            }
            total += value;
        }
        total
    }

    /// Total degree of a monomial in the eccentricity/inclination variables.
    fn ei_degree(mono: &Monomial) -> i64 {
        mono.iter()
            .filter(|(sym, _)| matches!(sym, Sym::Var(v) if v.is_ecc_inc()))
            .map(|(_, &e)| e as i64)
            .sum()
    }

    /// Drop every monomial of eccentricity/inclination order above `max`.
    pub fn truncate_ei(&self, max: u32) -> Poly {
        let mut out = Poly::default();
        for (mono, &c) in &self.terms {
            if Poly::ei_degree(mono) <= max as i64 {
                out.terms.insert(mono.clone(), c);
            }
        }
        out
    }

    /// Largest eccentricity/inclination order present.
    pub fn max_ei_degree(&self) -> i64 {
        self.terms.keys().map(Poly::ei_degree).max().unwrap_or(0)
    }
}

fn binomial(n: u32, k: u32) -> f64 {
    let mut value = 1.0;
    for i in 0..k.min(n - k) {
        value = value * (n - i) as f64 / (i + 1) as f64;
    }
    value
}

/// Real and imaginary components of `(x + sign(k)·i·y)^|k|` by binomial
/// expansion; `k = 0` yields `(1, 0)`.
///
/// Even powers of the imaginary-axis variable land in the real part with sign
/// `(-1)^⌊l/2⌋`, odd powers in the imaginary part with sign `(-1)^⌊(l-1)/2⌋`.
pub fn re_im_components(x: &Poly, y: &Poly, k: i32) -> (Poly, Poly) {
    if k == 0 {
        return (Poly::one(), Poly::zero());
    }
    let absk = k.unsigned_abs();
    let sy = if k > 0 { y.clone() } else { y.neg() };
    let mut re = Poly::zero();
    let mut im = Poly::zero();
    for l in 0..=absk {
        let term = sy.powi(l).mul(&x.powi(absk - l)).scale(binomial(absk, l));
        if l % 2 == 0 {
            let sign = if (l / 2) % 2 == 0 { 1.0 } else { -1.0 };
            re.add_assign(&term.scale(sign));
        } else {
            let sign = if ((l - 1) / 2) % 2 == 0 { 1.0 } else { -1.0 };
            im.add_assign(&term.scale(sign));
        }
    }
    (re, im)
}

#[cfg(test)]
mod poly_test {
    use super::*;
    use crate::symbolic::{Param, StateVar};

    struct MapResolver(std::collections::HashMap<Sym, f64>);

    impl SymResolver for MapResolver {
        fn resolve(&self, sym: Sym) -> f64 {
            self.0[&sym]
        }
    }

    #[test]
    fn test_mul_and_diff() {
        let kappa = Poly::var(StateVar::Kappa(1));
        let eta = Poly::var(StateVar::Eta(1));
        // Gamma = (kappa^2 + eta^2)/2
        let gamma = kappa.powi(2).add(&eta.powi(2)).scale(0.5);
        let dk = gamma.diff(StateVar::Kappa(1));
        assert_eq!(dk, kappa);

        let lambda_inv = Poly::var_pow(StateVar::Lambda(1), -2);
        let d = lambda_inv.diff(StateVar::Lambda(1));
        assert_eq!(d, Poly::var_pow(StateVar::Lambda(1), -3).scale(-2.0));
    }

    #[test]
    fn test_eval() {
        let mut vals = std::collections::HashMap::new();
        vals.insert(Sym::Var(StateVar::Kappa(1)), 0.5);
        vals.insert(Sym::Par(Param::G), 2.0);
        let p = Poly::var(StateVar::Kappa(1))
            .powi(2)
            .mul(&Poly::var_pow(Param::G, -1))
            .scale(4.0);
        // 4 * 0.25 / 2 = 0.5
        assert_eq!(p.eval(&MapResolver(vals)), 0.5);
    }

    #[test]
    fn test_truncate_ei() {
        let kappa = Poly::var(StateVar::Kappa(1));
        let lam = Poly::var(StateVar::Lambda(1));
        let p = kappa.powi(4).add(&kappa.powi(2)).add(&lam.powi(3));
        let t = p.truncate_ei(2);
        assert_eq!(t, kappa.powi(2).add(&lam.powi(3)));
    }

    #[test]
    fn test_re_im_zero_power() {
        let x = Poly::var(StateVar::Kappa(1));
        let y = Poly::var(StateVar::Eta(1));
        let (re, im) = re_im_components(&x, &y, 0);
        assert_eq!(re, Poly::one());
        assert!(im.is_zero());
    }
}
