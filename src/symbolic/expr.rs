//! Trigonometric expressions: sums of `poly · cos/sin(Σ kᵢ·λᵢ)`.
//!
//! Angle arguments only ever involve the mean longitudes, so an argument is
//! stored as a map from body index to integer coefficient. The polynomial
//! factors never contain a mean longitude; differentiation with respect to a
//! mean longitude therefore acts on the trigonometric factor alone.

use std::collections::BTreeMap;

use super::poly::Poly;
use super::{StateVar, Sym, SymResolver};

/// Integer-weighted combination of mean longitudes, `Σ kᵢ·λᵢ`.
///
/// Canonical form: no zero coefficients, and the first (lowest body index)
/// nonzero coefficient is positive — `cos` is even and `sin` odd, so any
/// argument can be brought to this form by flipping the sign of the `sin`
/// amplitude.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct AngleCombo(BTreeMap<usize, i32>);

impl AngleCombo {
    pub fn new() -> Self {
        AngleCombo::default()
    }

    /// Build from `(body, coefficient)` pairs; zero coefficients are dropped.
    pub fn from_pairs(pairs: &[(usize, i32)]) -> Self {
        let mut map = BTreeMap::new();
        for &(body, k) in pairs {
            if k != 0 {
                *map.entry(body).or_insert(0) += k;
            }
        }
        map.retain(|_, k| *k != 0);
        AngleCombo(map)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn coefficient(&self, body: usize) -> i32 {
        self.0.get(&body).copied().unwrap_or(0)
    }

    fn leading_sign(&self) -> i32 {
        self.0.values().next().map(|k| k.signum()).unwrap_or(0)
    }

    fn negated(&self) -> AngleCombo {
        AngleCombo(self.0.iter().map(|(&b, &k)| (b, -k)).collect())
    }

    /// Numeric value of the argument given the mean longitudes.
    pub fn eval(&self, resolver: &dyn SymResolver) -> f64 {
        self.0
            .iter()
            .map(|(&body, &k)| k as f64 * resolver.resolve(Sym::Var(StateVar::MeanLongitude(body))))
            .sum()
    }
}

/// Phase of one trigonometric term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Cos,
    Sin,
}

/// A sum of trigonometric terms with polynomial amplitudes.
#[derive(Debug, Clone, Default)]
pub struct Expr {
    terms: BTreeMap<(AngleCombo, Phase), Poly>,
}

impl Expr {
    pub fn zero() -> Self {
        Expr::default()
    }

    /// Purely polynomial expression (`cos` of the empty argument).
    pub fn from_poly(poly: Poly) -> Self {
        let mut e = Expr::zero();
        e.add_term(AngleCombo::new(), Phase::Cos, poly);
        e
    }

    pub fn n_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    /// Add `poly · phase(combo)`, normalizing the argument sign and dropping
    /// vanishing terms (`sin 0`, zero polynomials).
    pub fn add_term(&mut self, combo: AngleCombo, phase: Phase, poly: Poly) {
        if poly.is_zero() {
            return;
        }
        let (combo, phase, poly) = if combo.leading_sign() < 0 {
            match phase {
                Phase::Cos => (combo.negated(), Phase::Cos, poly),
                Phase::Sin => (combo.negated(), Phase::Sin, poly.neg()),
            }
        } else {
            (combo, phase, poly)
        };
        if combo.is_empty() && phase == Phase::Sin {
            return;
        }
        let slot = self.terms.entry((combo, phase)).or_insert_with(Poly::zero);
        slot.add_assign(&poly);
        let empty = slot.is_zero();
        if empty {
            self.terms.retain(|_, p| !p.is_zero());
        }
    }

    pub fn add_expr(&mut self, other: &Expr) {
        for ((combo, phase), poly) in &other.terms {
            self.add_term(combo.clone(), *phase, poly.clone());
        }
    }

    pub fn scale(&self, factor: f64) -> Expr {
        let mut out = Expr::zero();
        for ((combo, phase), poly) in &self.terms {
            out.add_term(combo.clone(), *phase, poly.scale(factor));
        }
        out
    }

    pub fn neg(&self) -> Expr {
        self.scale(-1.0)
    }

    /// Exact partial derivative with respect to any state variable.
    pub fn diff(&self, var: StateVar) -> Expr {
        let mut out = Expr::zero();
        for ((combo, phase), poly) in &self.terms {
            match var {
                StateVar::MeanLongitude(body) => {
                    let k = combo.coefficient(body);
                    if k != 0 {
                        // d cos θ/dλ = -k sin θ ; d sin θ/dλ = k cos θ
                        match phase {
                            Phase::Cos => out.add_term(
                                combo.clone(),
                                Phase::Sin,
                                poly.scale(-(k as f64)),
                            ),
                            Phase::Sin => {
                                out.add_term(combo.clone(), Phase::Cos, poly.scale(k as f64))
                            }
                        }
                    }
                }
                _ => {
                    out.add_term(combo.clone(), *phase, poly.diff(var));
                }
            }
        }
        out
    }

    /// Numeric evaluation against a symbol resolver.
    pub fn eval(&self, resolver: &dyn SymResolver) -> f64 {
        let mut total = 0.0;
        for ((combo, phase), poly) in &self.terms {
            let theta = combo.eval(resolver);
            let trig = match phase {
                Phase::Cos => theta.cos(),
                Phase::Sin => theta.sin(),
            };
            total += poly.eval(resolver) * trig;
        }
        total
    }
}
