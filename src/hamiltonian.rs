//! # Hamiltonian term generator
//!
//! [`PoincareHamiltonian`] accumulates the symbolic Hamiltonian of a
//! planetary system as
//!
//! ```text
//! H = Σ_i Keplerian(i) + Σ resonant/secular monomials + Σ perturbations
//! ```
//!
//! together with the parameter map feeding numeric values to the symbolic
//! layer. Terms are only ever added, each keyed by
//! `(index_in, index_out, harmonic vector, expansion-order vector)`;
//! re-adding an existing key warns and leaves the Hamiltonian unchanged.
//!
//! The accumulator follows an explicit builder protocol: every term addition
//! marks the cached equations of motion stale, and [`finalize`]
//! (PoincareHamiltonian::finalize) must run after the last addition before
//! anything derivative-based (equations of motion, Laplace–Lagrange
//! extraction) is evaluated — stale use fails loudly instead of silently
//! reusing outdated derivatives. Plain numeric evaluation of `H` needs no
//! derivatives and is always available.

use std::collections::{HashMap, HashSet};

use itertools::iproduct;
use nalgebra::DMatrix;

use crate::disturbing::{delta_expansion, ClassicCoefficients, DfCoefficientProvider};
use crate::poincare_errors::PoincareError;
use crate::symbolic::{re_im_components, AngleCombo, Expr, Param, Phase, Poly, StateVar, Sym,
    SymResolver};
use crate::system::PoincareSystem;

/// Ledger key of one monomial term.
pub type TermKey = (usize, usize, [i32; 6], [u32; 4]);

/// Resolves state variables from a live system and parameters from the map.
struct SystemResolver<'a> {
    system: &'a PoincareSystem,
    params: &'a HashMap<Param, f64>,
}

impl SymResolver for SystemResolver<'_> {
    fn resolve(&self, sym: Sym) -> f64 {
        match sym {
            Sym::Var(v) => self.system.state_value(v),
            Sym::Par(p) => *self
                .params
                .get(&p)
                .expect("parameter missing from the Hamiltonian parameter map"),
        }
    }
}

/// Same as [`SystemResolver`] with all eccentricity/inclination variables
/// pinned to zero — the linearization point of the secular dynamics.
struct LinearizedResolver<'a>(SystemResolver<'a>);

impl SymResolver for LinearizedResolver<'_> {
    fn resolve(&self, sym: Sym) -> f64 {
        match sym {
            Sym::Var(v) if v.is_ecc_inc() => 0.0,
            other => self.0.resolve(other),
        }
    }
}

/// Truncated series in δ with polynomial coefficients, used by the
/// perturbation-term expansions. Index = power of δ.
type DeltaSeries = Vec<Poly>;

fn series_mul(a: &DeltaSeries, b: &DeltaSeries, dmax: usize, ei_max: u32) -> DeltaSeries {
    let mut out = vec![Poly::zero(); dmax + 1];
    for (i, pa) in a.iter().enumerate().take(dmax + 1) {
        if pa.is_zero() {
            continue;
        }
        for (j, pb) in b.iter().enumerate().take(dmax + 1 - i) {
            if !pb.is_zero() {
                out[i + j].add_assign(&pa.mul(pb).truncate_ei(ei_max));
            }
        }
    }
    out
}

fn series_scale(a: &DeltaSeries, factor: &Poly, ei_max: u32) -> DeltaSeries {
    a.iter()
        .map(|p| p.mul(factor).truncate_ei(ei_max))
        .collect()
}

fn series_add(a: &mut DeltaSeries, b: &DeltaSeries) {
    for (pa, pb) in a.iter_mut().zip(b) {
        pa.add_assign(pb);
    }
}

/// Symbolic Hamiltonian accumulator for one canonical system.
///
/// Construction freezes the parameter map (masses, reference actions and
/// semi-major axes, pairwise α ratios) from the system's state and installs
/// the Keplerian term `-G²M_i²μ_i³/(2Λ_i²)` for every body.
pub struct PoincareHamiltonian<P = ClassicCoefficients> {
    expr: Expr,
    params: HashMap<Param, f64>,
    provider: P,
    n_planets: usize,
    term_keys: HashSet<TermKey>,
    derivs: Option<HashMap<StateVar, Expr>>,
}

impl PoincareHamiltonian<ClassicCoefficients> {
    /// Accumulator with the built-in classic coefficient families.
    pub fn new(system: &PoincareSystem) -> Result<Self, PoincareError> {
        PoincareHamiltonian::with_provider(system, ClassicCoefficients)
    }
}

impl<P: DfCoefficientProvider> PoincareHamiltonian<P> {
    /// Accumulator with a caller-supplied disturbing-function coefficient
    /// source.
    pub fn with_provider(system: &PoincareSystem, provider: P) -> Result<Self, PoincareError> {
        let n_planets = system.n_planets();
        let mut params = HashMap::new();
        params.insert(Param::G, system.g());
        for i in 1..=n_planets {
            let p = system.particle(i as isize)?;
            params.insert(Param::Mu(i), p.mu());
            params.insert(Param::Mass(i), p.m());
            params.insert(Param::MTotal(i), p.m_total());
            params.insert(Param::Lambda0(i), p.lambda());
            params.insert(Param::RootLambda0(i), p.lambda().sqrt());
            params.insert(Param::A0(i), p.semi_major_axis());
            for j in (i + 1)..=n_planets {
                let q = system.particle(j as isize)?;
                params.insert(Param::Alpha(i, j), p.semi_major_axis() / q.semi_major_axis());
            }
        }

        let mut expr = Expr::zero();
        for i in 1..=n_planets {
            expr.add_term(AngleCombo::new(), Phase::Cos, keplerian_poly(i));
        }

        Ok(PoincareHamiltonian {
            expr,
            params,
            provider,
            n_planets,
            term_keys: HashSet::new(),
            derivs: None,
        })
    }

    pub fn n_planets(&self) -> usize {
        self.n_planets
    }

    /// Number of monomial terms recorded so far (Keplerian and perturbation
    /// terms are not monomials and are not counted).
    pub fn term_count(&self) -> usize {
        self.term_keys.len()
    }

    /// The resonance-key ledger.
    pub fn term_keys(&self) -> Vec<TermKey> {
        let mut keys: Vec<_> = self.term_keys.iter().copied().collect();
        keys.sort();
        keys
    }

    /// The symbol → value map exposed to the numeric layer.
    pub fn params(&self) -> &HashMap<Param, f64> {
        &self.params
    }

    /// True once [`finalize`](Self::finalize) has run after the last term
    /// addition.
    pub fn is_finalized(&self) -> bool {
        self.derivs.is_some()
    }

    fn validate_pair(&self, index_in: usize, index_out: usize) -> Result<(), PoincareError> {
        if index_in < 1 || index_out <= index_in || index_out > self.n_planets {
            return Err(PoincareError::ParticleIndexOutOfRange(
                index_out as isize,
                self.n_planets + 1,
            ));
        }
        Ok(())
    }

    /// Add one disturbing-function monomial.
    ///
    /// `kvec = [k1..k6]` fixes the cosine argument
    /// `k1·λ_out + k2·λ_in + k3·ϖ_in + k4·ϖ_out + k5·Ω_in + k6·Ω_out` (the
    /// longitude weights enter through the complex-component expansion of the
    /// Cartesian variables), `nuvec = [ν1..ν4]` the extra expansion orders in
    /// `s_in², s_out², e_in², e_out²`, and `lmax` the degree of the cosine
    /// coefficient's expansion in `δ = (Λ-Λ0)/Λ0`.
    ///
    /// Re-adding an existing `(index_in, index_out, kvec, nuvec)` key warns
    /// and is a no-op.
    pub fn add_monomial_term(
        &mut self,
        kvec: [i32; 6],
        nuvec: [u32; 4],
        index_in: usize,
        index_out: usize,
        lmax: u32,
    ) -> Result<(), PoincareError> {
        self.validate_pair(index_in, index_out)?;
        let key = (index_in, index_out, kvec, nuvec);
        if self.term_keys.contains(&key) {
            log::warn!(
                "monomial term k={kvec:?}, nu={nuvec:?} for pair ({index_in}, {index_out}) \
                 already included in the Hamiltonian; no new term added"
            );
            return Ok(());
        }

        let alpha0 = self.params[&Param::Alpha(index_in, index_out)];
        let coefficient = self.provider.coefficient(kvec, nuvec)?;
        let expansion = delta_expansion(&coefficient, kvec, nuvec, lmax, alpha0)?;

        let [k1, k2, k3, k4, k5, k6] = kvec;
        let [nu1, nu2, nu3, nu4] = nuvec;

        // cosine-coefficient polynomial Σ C_(l1,l2) δ_in^l1 δ_out^l2
        let delta_in = delta_poly(index_in);
        let delta_out = delta_poly(index_out);
        let mut ctot = Poly::zero();
        let k_key: [i16; 6] = kvec.map(|v| v as i16);
        let nu_key: [u8; 4] = nuvec.map(|v| v as u8);
        for ((l1, l2), value) in expansion {
            let sym = Param::DfCoeff {
                k: k_key,
                nu: nu_key,
                l: (l1, l2),
                pair: (index_in as u8, index_out as u8),
            };
            self.params.insert(sym, value);
            ctot.add_assign(
                &Poly::var(sym)
                    .mul(&delta_in.powi(l1 as u32))
                    .mul(&delta_out.powi(l2 as u32)),
            );
        }

        // real/imaginary components of the complex eccentricity and
        // inclination variables raised to the harmonic powers
        let rt_in = Poly::var_pow(Param::RootLambda0(index_in), -1);
        let rt_out = Poly::var_pow(Param::RootLambda0(index_out), -1);
        let (xin, yin) = re_im_components(
            &Poly::var(StateVar::Kappa(index_in)).mul(&rt_in),
            &Poly::var(StateVar::Eta(index_in)).mul(&rt_in).neg(),
            k3,
        );
        let (xout, yout) = re_im_components(
            &Poly::var(StateVar::Kappa(index_out)).mul(&rt_out),
            &Poly::var(StateVar::Eta(index_out)).mul(&rt_out).neg(),
            k4,
        );
        let (uin, vin) = re_im_components(
            &Poly::var(StateVar::Sigma(index_in)).mul(&rt_in).scale(0.5),
            &Poly::var(StateVar::Rho(index_in)).mul(&rt_in).scale(-0.5),
            k5,
        );
        let (uout, vout) = re_im_components(
            &Poly::var(StateVar::Sigma(index_out)).mul(&rt_out).scale(0.5),
            &Poly::var(StateVar::Rho(index_out)).mul(&rt_out).scale(-0.5),
            k6,
        );

        // Re and Im of the product (x_in + i y_in)(x_out + i y_out)(u_in + i v_in)(u_out + i v_out)
        let re = uin.mul(&uout).mul(&xin).mul(&xout)
            .sub(&vin.mul(&vout).mul(&xin).mul(&xout))
            .sub(&uout.mul(&vin).mul(&xout).mul(&yin))
            .sub(&uin.mul(&vout).mul(&xout).mul(&yin))
            .sub(&uout.mul(&vin).mul(&xin).mul(&yout))
            .sub(&uin.mul(&vout).mul(&xin).mul(&yout))
            .sub(&uin.mul(&uout).mul(&yin).mul(&yout))
            .add(&vin.mul(&vout).mul(&yin).mul(&yout));
        let im = uout.mul(&vin).mul(&xin).mul(&xout)
            .add(&uin.mul(&vout).mul(&xin).mul(&xout))
            .add(&uin.mul(&uout).mul(&xout).mul(&yin))
            .sub(&vin.mul(&vout).mul(&xout).mul(&yin))
            .add(&uin.mul(&uout).mul(&xin).mul(&yout))
            .sub(&vin.mul(&vout).mul(&xin).mul(&yout))
            .sub(&uout.mul(&vin).mul(&yin).mul(&yout))
            .sub(&uin.mul(&vout).mul(&yin).mul(&yout));

        // eccentricity/inclination power factors (2Γ/Λ0)^ν and (Q/2Λ0)^ν
        let two_gamma_in = two_gamma_poly(index_in);
        let two_gamma_out = two_gamma_poly(index_out);
        let two_q_in = two_q_poly(index_in);
        let two_q_out = two_q_poly(index_out);
        let l0_in = |p: u32| Poly::var_pow(Param::Lambda0(index_in), -(p as i32));
        let l0_out = |p: u32| Poly::var_pow(Param::Lambda0(index_out), -(p as i32));

        let power_factors = two_gamma_in
            .powi(nu3)
            .mul(&l0_in(nu3))
            .mul(&two_gamma_out.powi(nu4))
            .mul(&l0_out(nu4))
            .mul(&two_q_in.powi(nu1).scale(0.25f64.powi(nu1 as i32)))
            .mul(&l0_in(nu1))
            .mul(&two_q_out.powi(nu2).scale(0.25f64.powi(nu2 as i32)))
            .mul(&l0_out(nu2));

        // -G m_in m_out / a_out
        let prefactor = Poly::var(Param::G)
            .mul(&Poly::var(Param::Mass(index_in)))
            .mul(&Poly::var(Param::Mass(index_out)))
            .mul(&Poly::var_pow(Param::A0(index_out), -1))
            .neg();

        let amplitude = prefactor.mul(&ctot).mul(&power_factors);
        let combo = AngleCombo::from_pairs(&[(index_out, k1), (index_in, k2)]);
        self.expr
            .add_term(combo.clone(), Phase::Cos, amplitude.mul(&re));
        self.expr
            .add_term(combo, Phase::Sin, amplitude.mul(&im).neg());

        self.term_keys.insert(key);
        self.derivs = None;
        Ok(())
    }

    /// Add the cosine term of `jvec` with every expansion-order quadruple
    /// `(z1..z4)` satisfying `Σz ≤ (max_order - Σ|j3..j6|)/2`.
    ///
    /// Monomials whose coefficient the provider cannot supply are skipped
    /// with a warning; the result is documented as possibly incomplete.
    pub fn add_cos_term_to_max_order(
        &mut self,
        jvec: [i32; 6],
        max_order: u32,
        index_in: usize,
        index_out: usize,
        lmax: u32,
    ) -> Result<(), PoincareError> {
        let harmonic_order: u32 = jvec[2..].iter().map(|k| k.unsigned_abs()).sum();
        if harmonic_order > max_order {
            return Ok(());
        }
        let by2 = (max_order - harmonic_order) / 2;
        for (z1, z2, z3, z4) in iproduct!(0..=by2, 0..=by2, 0..=by2, 0..=by2)
            .filter(|(z1, z2, z3, z4)| z1 + z2 + z3 + z4 <= by2)
        {
            match self.add_monomial_term(jvec, [z1, z2, z3, z4], index_in, index_out, lmax) {
                Ok(()) => {}
                Err(PoincareError::UnsupportedDfCoefficient { k, nu }) => {
                    log::warn!(
                        "no closed-form coefficient for k={k:?}, nu={nu:?}; term omitted"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Add all eccentricity-type disturbing-function terms of the `p:p-q`
    /// mean-motion resonance up to `max_order`.
    ///
    /// `p < q`, `max_order < q` and `p, q` sharing a common factor are
    /// advisory conditions: the enumeration proceeds but terms may be
    /// omitted, exactly as documented by the term loops.
    pub fn add_eccentricity_mmr_terms(
        &mut self,
        p: u32,
        q: u32,
        max_order: u32,
        index_in: usize,
        index_out: usize,
        lmax: u32,
    ) -> Result<(), PoincareError> {
        if q == 0 || p < q {
            log::warn!(
                "mean-motion resonances with p < q or q = 0 are not supported; \
                 add such terms individually with add_monomial_term"
            );
            if q == 0 {
                return Ok(());
            }
        }
        if max_order < q {
            log::warn!("maximum order {max_order} is lower than the resonance order {q}");
        }
        if q != 1 && p % q == 0 {
            log::warn!("p and q share a common divisor; some important terms may be omitted");
        }
        for n in 1..=(max_order / q) {
            let k1 = (n * p) as i32;
            let k2 = n as i32 * (q as i32 - p as i32);
            for l in 0..=(n * q) {
                let k3 = -(l as i32);
                let k4 = l as i32 - (n * q) as i32;
                self.add_cos_term_to_max_order(
                    [k1, k2, k3, k4, 0, 0],
                    max_order,
                    index_in,
                    index_out,
                    lmax,
                )?;
            }
        }
        Ok(())
    }

    /// Add every disturbing-function term of a `p:p-q` mean-motion resonance
    /// together with all secular terms up to `max_order`: the enumeration
    /// walks the integer quadruples `(h, k, s, s1)` and keeps each harmonic
    /// vector whose cosine argument reduces to an integer multiple of the
    /// resonance angle modulo the resonance order.
    pub fn add_all_mmr_and_secular_terms(
        &mut self,
        p: u32,
        q: u32,
        max_order: u32,
        index_in: usize,
        index_out: usize,
        lmax: u32,
    ) -> Result<(), PoincareError> {
        if q == 0 || p < q {
            log::warn!(
                "mean-motion resonances with p < q or q = 0 are not supported; \
                 add such terms individually with add_monomial_term"
            );
            if q == 0 {
                return Ok(());
            }
        }
        if max_order < q {
            log::warn!("maximum order {max_order} is lower than the resonance order {q}");
        }
        if q != 1 && p % q == 0 {
            log::warn!("p and q share a common divisor; some important terms may be omitted");
        }
        let (p, q) = (p as i64, q as i64);
        let m2 = (max_order / 2) as i64;
        for h in 0..=m2 {
            let k_lo = if h == 0 { 0 } else { -2 * m2 };
            for k in k_lo..=(2 * m2) {
                let s_hi = max_order as i64 - (h + k).abs() - (h - k).abs();
                let s_lo = if h == 0 && k == 0 { 0 } else { -s_hi };
                for s in s_lo..=s_hi {
                    let s1_hi = s_hi - s.abs();
                    let s1_lo = if h == 0 && k == 0 && s == 0 { 0 } else { -s1_hi };
                    for s1 in s1_lo..=s1_hi {
                        let k3 = -s;
                        let k5 = -h - k;
                        let k6 = k - h;
                        let k4 = -s1;
                        let tot = k3 + k4 + k5 + k6;
                        if (-p * tot).rem_euclid(q) == 0 {
                            let k1 = -p * tot / q;
                            let k2 = (p - q) * tot / q;
                            let mut kvec =
                                [k1 as i32, k2 as i32, k3 as i32, k4 as i32, k5 as i32, k6 as i32];
                            if kvec[0] < 0 {
                                for v in &mut kvec {
                                    *v = -*v;
                                }
                            }
                            self.add_cos_term_to_max_order(
                                kvec, max_order, index_in, index_out, lmax,
                            )?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Add the orbit-averaged oblateness potential of the central body,
    /// expanded to `max_ei_order` in eccentricity/inclination and
    /// `max_delta_order` in `δ = (Λ-Λ0)/Λ0`, as `M·μ·term` for each selected
    /// body (`None` = every body).
    pub fn add_orbit_average_j2_terms(
        &mut self,
        j2: f64,
        central_radius: f64,
        max_ei_order: u32,
        max_delta_order: u32,
        bodies: Option<&[usize]>,
    ) -> Result<(), PoincareError> {
        self.params.insert(Param::J2, j2);
        self.params.insert(Param::CentralRadius, central_radius);
        let selected: Vec<usize> = match bodies {
            Some(ids) => ids.to_vec(),
            None => (1..=self.n_planets).collect(),
        };
        let dmax = max_delta_order as usize;
        for &i in &selected {
            if i < 1 || i > self.n_planets {
                return Err(PoincareError::ParticleIndexOutOfRange(
                    i as isize,
                    self.n_planets + 1,
                ));
            }
            let gamma = two_gamma_poly(i).scale(0.5);
            let q_action = two_q_poly(i).scale(0.5);
            let l0_inv = Poly::var_pow(Param::Lambda0(i), -1);

            // 1/G_ang = (1/Λ0) Σ (-v)^k with v = δ - Γ/Λ0
            let mut v = vec![gamma.mul(&l0_inv).neg()];
            if dmax >= 1 {
                v.push(Poly::one());
                v.extend(std::iter::repeat(Poly::zero()).take(dmax - 1));
            }
            let k_max = dmax + max_ei_order as usize;
            let mut inv = {
                let mut unit = vec![Poly::zero(); dmax + 1];
                unit[0] = Poly::one();
                unit
            };
            let mut v_pow = inv.clone();
            let neg_v: DeltaSeries = v.iter().map(|p| p.neg()).collect();
            for _ in 0..k_max {
                v_pow = series_mul(&v_pow, &neg_v, dmax, max_ei_order);
                series_add(&mut inv, &v_pow);
            }
            let s1 = series_scale(&inv, &l0_inv, max_ei_order);

            let s3 = series_mul(&series_mul(&s1, &s1, dmax, max_ei_order), &s1, dmax, max_ei_order);
            let s4 = series_mul(&s3, &s1, dmax, max_ei_order);
            let s5 = series_mul(&s4, &s1, dmax, max_ei_order);

            // [3(Q²/4G² - Q/2G) + 1/2] / G³
            let mut numerator = series_scale(&s5, &q_action.powi(2).scale(0.75), max_ei_order);
            series_add(
                &mut numerator,
                &series_scale(&s4, &q_action.scale(-1.5), max_ei_order),
            );
            series_add(&mut numerator, &series_scale(&s3, &Poly::constant(0.5), max_ei_order));

            // Λ³/a³ = Λ0³/a0³ (1+δ)^{-3}
            let mut shrink = vec![Poly::zero(); dmax + 1];
            let mut binom = 1.0;
            for (k, slot) in shrink.iter_mut().enumerate() {
                if k > 0 {
                    binom *= (-3.0 - (k as f64 - 1.0)) / k as f64;
                }
                *slot = Poly::constant(binom);
            }
            let scale = Poly::var_pow(Param::Lambda0(i), 3).mul(&Poly::var_pow(Param::A0(i), -3));
            let full = series_scale(
                &series_mul(&numerator, &shrink, dmax, max_ei_order),
                &scale,
                max_ei_order,
            );

            // substitute δ = (Λ - Λ0)/Λ0 and apply the body prefactor
            let delta = delta_poly(i);
            let mut total = Poly::zero();
            let mut delta_pow = Poly::one();
            for (k, coeff) in full.iter().enumerate() {
                if k > 0 {
                    delta_pow = delta_pow.mul(&delta);
                }
                total.add_assign(&coeff.mul(&delta_pow));
            }
            let prefactor = Poly::var(Param::G)
                .mul(&Poly::var(Param::J2))
                .mul(&Poly::var_pow(Param::CentralRadius, 2))
                .mul(&Poly::var(Param::MTotal(i)))
                .mul(&Poly::var(Param::Mu(i)))
                .neg();
            self.expr
                .add_term(AngleCombo::new(), Phase::Cos, total.mul(&prefactor));
        }
        self.derivs = None;
        Ok(())
    }

    /// Add the orbit-averaged relativistic-precession potential
    /// `-3G²M²μ/(c²a0²) (1 - Γ/Λ0)^{-1}`, expanded to `max_e_order` in
    /// eccentricity, as `M²·μ·term` for each selected body.
    pub fn add_gr_potential_terms(
        &mut self,
        speed_of_light: f64,
        max_e_order: u32,
        bodies: Option<&[usize]>,
    ) -> Result<(), PoincareError> {
        self.params.insert(Param::SpeedOfLight, speed_of_light);
        let selected: Vec<usize> = match bodies {
            Some(ids) => ids.to_vec(),
            None => (1..=self.n_planets).collect(),
        };
        for &i in &selected {
            if i < 1 || i > self.n_planets {
                return Err(PoincareError::ParticleIndexOutOfRange(
                    i as isize,
                    self.n_planets + 1,
                ));
            }
            let gamma_by_l0 =
                two_gamma_poly(i).scale(0.5).mul(&Poly::var_pow(Param::Lambda0(i), -1));
            let mut geometric = Poly::zero();
            for k in 0..=(max_e_order / 2) {
                geometric.add_assign(&gamma_by_l0.powi(k));
            }
            let term = Poly::var_pow(Param::G, 2)
                .mul(&Poly::var_pow(Param::SpeedOfLight, -2))
                .mul(&Poly::var_pow(Param::A0(i), -2))
                .mul(&Poly::var_pow(Param::MTotal(i), 2))
                .mul(&Poly::var(Param::Mu(i)))
                .mul(&geometric)
                .scale(-3.0);
            self.expr.add_term(AngleCombo::new(), Phase::Cos, term);
        }
        self.derivs = None;
        Ok(())
    }

    /// Rebuild the cached canonical equations of motion
    /// (`dq/dt = ∂H/∂p`, `dp/dt = -∂H/∂q` for the pairs `(λ,Λ), (η,κ), (ρ,σ)`).
    /// Must run after the last term addition and before any derivative-based
    /// evaluation.
    pub fn finalize(&mut self) {
        let mut derivs = HashMap::new();
        for i in 1..=self.n_planets {
            derivs.insert(
                StateVar::MeanLongitude(i),
                self.expr.diff(StateVar::Lambda(i)),
            );
            derivs.insert(StateVar::Eta(i), self.expr.diff(StateVar::Kappa(i)));
            derivs.insert(StateVar::Rho(i), self.expr.diff(StateVar::Sigma(i)));
            derivs.insert(
                StateVar::Lambda(i),
                self.expr.diff(StateVar::MeanLongitude(i)).neg(),
            );
            derivs.insert(StateVar::Kappa(i), self.expr.diff(StateVar::Eta(i)).neg());
            derivs.insert(StateVar::Sigma(i), self.expr.diff(StateVar::Rho(i)).neg());
        }
        self.derivs = Some(derivs);
    }

    /// Numeric value of `H` at the container's live state.
    pub fn numerical_value(&self, system: &PoincareSystem) -> f64 {
        self.expr.eval(&SystemResolver {
            system,
            params: &self.params,
        })
    }

    /// Numeric right-hand side of the equations of motion, in the grouped
    /// phase-space layout `[dl.., dη.., dρ.., dΛ.., dκ.., dσ..]`. Fails while
    /// the cache is stale.
    pub fn equations_of_motion(
        &self,
        system: &PoincareSystem,
    ) -> Result<Vec<f64>, PoincareError> {
        let derivs = self
            .derivs
            .as_ref()
            .ok_or(PoincareError::StaleEquationsOfMotion)?;
        let resolver = SystemResolver {
            system,
            params: &self.params,
        };
        let np = self.n_planets;
        let mut out = vec![0.0; 6 * np];
        for i in 1..=np {
            let j = i - 1;
            out[j] = derivs[&StateVar::MeanLongitude(i)].eval(&resolver);
            out[np + j] = derivs[&StateVar::Eta(i)].eval(&resolver);
            out[2 * np + j] = derivs[&StateVar::Rho(i)].eval(&resolver);
            out[3 * np + j] = derivs[&StateVar::Lambda(i)].eval(&resolver);
            out[4 * np + j] = derivs[&StateVar::Kappa(i)].eval(&resolver);
            out[5 * np + j] = derivs[&StateVar::Sigma(i)].eval(&resolver);
        }
        Ok(out)
    }

    /// Laplace–Lagrange coupling matrices from the second derivatives of the
    /// cached equations of motion, evaluated at zero eccentricity and
    /// inclination for every body (and at the container's current Λ and λ).
    ///
    /// Returns `(eccentricity matrix, inclination matrix)` with entries
    /// `∂(dη_i/dt)/∂κ_j` and `∂(dρ_i/dt)/∂σ_j`.
    pub fn laplace_lagrange_matrices(
        &self,
        system: &PoincareSystem,
    ) -> Result<(DMatrix<f64>, DMatrix<f64>), PoincareError> {
        let derivs = self
            .derivs
            .as_ref()
            .ok_or(PoincareError::StaleEquationsOfMotion)?;
        let resolver = LinearizedResolver(SystemResolver {
            system,
            params: &self.params,
        });
        let np = self.n_planets;
        let mut ecc = DMatrix::zeros(np, np);
        let mut inc = DMatrix::zeros(np, np);
        for i in 1..=np {
            for j in 1..=np {
                ecc[(i - 1, j - 1)] = derivs[&StateVar::Eta(i)]
                    .diff(StateVar::Kappa(j))
                    .eval(&resolver);
                inc[(i - 1, j - 1)] = derivs[&StateVar::Rho(i)]
                    .diff(StateVar::Sigma(j))
                    .eval(&resolver);
            }
        }
        Ok((ecc, inc))
    }
}

/// `-G²M_i²μ_i³/(2Λ_i²)`
fn keplerian_poly(i: usize) -> Poly {
    Poly::var_pow(Param::G, 2)
        .mul(&Poly::var_pow(Param::MTotal(i), 2))
        .mul(&Poly::var_pow(Param::Mu(i), 3))
        .mul(&Poly::var_pow(StateVar::Lambda(i), -2))
        .scale(-0.5)
}

/// `δ_i = Λ_i/Λ0_i - 1`
fn delta_poly(i: usize) -> Poly {
    Poly::var(StateVar::Lambda(i))
        .mul(&Poly::var_pow(Param::Lambda0(i), -1))
        .sub(&Poly::one())
}

/// `2Γ_i = κ_i² + η_i²`
fn two_gamma_poly(i: usize) -> Poly {
    Poly::var(StateVar::Kappa(i))
        .powi(2)
        .add(&Poly::var(StateVar::Eta(i)).powi(2))
}

/// `2Q_i = σ_i² + ρ_i²`
fn two_q_poly(i: usize) -> Poly {
    Poly::var(StateVar::Sigma(i))
        .powi(2)
        .add(&Poly::var(StateVar::Rho(i)).powi(2))
}
