//! Two-time correlation functions and the power spectra derived from them.
//!
//! Correlations `⟨A(τ) B(0)⟩` are computed with the quantum regression
//! theorem: the operator `B ρ₀` is propagated under the same Lindblad
//! generator as the state, and `A` is traced against the result.

use std::f64::consts::TAU;
use itertools::Itertools;
use ndarray as nd;
use ndarray_linalg::Solve;
use num_complex::Complex64 as C64;
use rayon::iter::{ IntoParallelRefIterator, ParallelIterator };
use rustfft::FftPlanner;
use serde::{ Deserialize, Serialize };
use tracing::debug;
use crate::{
    dynamics::{
        HBuild,
        LOp,
        hamiltonians::{ CouplingKind, HBuilderJC, JCParams },
        lindbladians::{ DecayRates, LOperatorJC },
    },
    error::{ Error, Result },
    observables::expect,
    rabi::{
        IntegratorConfig,
        check_density,
        lindblad::evolve_operator,
        liouville::{ liouvillian, steady_state, vectorize },
        trace,
    },
    time::TimeGrid,
};

/// Entries of `B ρ₀` below this are treated as zero.
const VANISHING: f64 = 1e-12;

/// Initial state `ρ₀` from which a correlation function is computed.
#[derive(Clone, Debug, PartialEq)]
pub enum CorrelationStart {
    /// The steady state of the dissipative dynamics.
    SteadyState,
    /// An explicit density matrix.
    State(nd::Array2<C64>),
}

/// Compute `⟨A(τ) B(0)⟩ = tr[A exp(𝓛 τ)(B ρ₀)]` on a grid of delays starting
/// at `τ = 0`.
///
/// Fails with [`Error::Configuration`] if `B ρ₀` vanishes, e.g. when `B = a`
/// and the steady state is the vacuum, since the correlation is then zero
/// at every delay.
pub fn correlation_2op_1t<H, L, SA, SB>(
    hbuilder: &H,
    loperator: &L,
    start: &CorrelationStart,
    tau: &TimeGrid,
    A: &nd::ArrayBase<SA, nd::Ix2>,
    B: &nd::ArrayBase<SB, nd::Ix2>,
    config: &IntegratorConfig,
) -> Result<nd::Array1<C64>>
where
    H: HBuild,
    L: LOp,
    SA: nd::Data<Elem = C64>,
    SB: nd::Data<Elem = C64>,
{
    if tau.start() != 0.0 {
        return Err(Error::config(format!(
            "correlation delays must start at 0, got {}", tau.start())));
    }
    let n = hbuilder.dims().joint();
    if A.shape() != [n, n] || B.shape() != [n, n] {
        return Err(Error::config(format!(
            "correlation operators must have shape [{}, {}]", n, n)));
    }
    let H = hbuilder.build_static();
    let rho0: nd::Array2<C64>
        = match start {
            CorrelationStart::SteadyState => steady_state(&H, loperator)?,
            CorrelationStart::State(rho) => {
                check_density(rho, n, config.state_tolerance)?;
                rho.clone()
            },
        };
    let X0 = B.dot(&rho0);
    if X0.iter().all(|x| x.norm() < VANISHING) {
        return Err(Error::config(
            "B ρ₀ vanishes, so the correlation is identically zero; the \
            starting state needs population that B can act on"));
    }
    let corr: Vec<C64>
        = evolve_operator(&X0, &H, loperator, tau, config, |X| expect(A, X))?;
    Ok(corr.into())
}

/// A sampled power spectrum.
#[derive(Clone, Debug, PartialEq)]
pub struct Spectrum {
    /// Angular frequencies in ascending order.
    pub omega: nd::Array1<f64>,
    /// Non-negative spectral density at each frequency.
    pub density: nd::Array1<f64>,
}

impl Spectrum {
    /// Local maxima at least `min_rel_height` times the global maximum, in
    /// order of ascending frequency.
    pub fn peaks(&self, min_rel_height: f64) -> Vec<(f64, f64)> {
        let max = self.density.iter().copied().fold(0.0, f64::max);
        self.omega.iter().zip(self.density.iter())
            .tuple_windows()
            .filter(|((_, l), (_, c), (_, r))| {
                c > l && c >= r && **c >= min_rel_height * max
            })
            .map(|(_, (w, s), _)| (*w, *s))
            .collect()
    }

    /// Distance between the two highest peaks, if there are at least two.
    pub fn splitting(&self, min_rel_height: f64) -> Option<f64> {
        let mut peaks = self.peaks(min_rel_height);
        if peaks.len() < 2 { return None; }
        peaks.sort_by(|l, r| r.1.total_cmp(&l.1));
        Some((peaks[0].0 - peaks[1].0).abs())
    }
}

/// Compute the power spectrum of a correlation function sampled on a uniform
/// grid,
/// ```text
/// S(ω) = 2 Re ∫ dτ e^(-iωτ) C(τ)
/// ```
/// using a discrete Fourier transform.
///
/// Frequencies are angular (`2π` times the FFT bin frequency) and sorted in
/// ascending order. Small negative values left over from discretization are
/// clamped to zero. Fails if `tau` is not uniform or `corr` does not match it
/// in length.
pub fn spectrum_fft(tau: &TimeGrid, corr: &nd::Array1<C64>) -> Result<Spectrum> {
    let dt = tau.uniform_step()?;
    let n = tau.len();
    if corr.len() != n {
        return Err(Error::config(format!(
            "correlation has {} samples for a grid of {} points", corr.len(), n)));
    }
    let mut buf: Vec<C64> = corr.to_vec();
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buf);
    let mut bins: Vec<(f64, f64)>
        = buf.iter().enumerate()
        .map(|(k, F)| {
            let k_signed: f64
                = if k < (n + 1) / 2 { k as f64 } else { k as f64 - n as f64 };
            (TAU * k_signed / (n as f64 * dt), 2.0 * dt * F.re)
        })
        .collect();
    bins.sort_by(|l, r| l.0.total_cmp(&r.0));
    let min = bins.iter().map(|(_, s)| *s).fold(f64::INFINITY, f64::min);
    if min < 0.0 {
        debug!(min, "clamping negative spectral density to zero");
    }
    let (omega, density): (Vec<f64>, Vec<f64>)
        = bins.into_iter().map(|(w, s)| (w, s.max(0.0))).unzip();
    Ok(Spectrum { omega: omega.into(), density: density.into() })
}

/// Compute the stationary power spectrum of `⟨A(τ) B(0)⟩` directly from the
/// Liouvillian at each requested angular frequency,
/// ```text
/// S(ω) = 2 Re tr[A (iω - 𝓛)⁻¹ (B ρ_ss - ⟨B⟩ ρ_ss)]
/// ```
/// where the subtraction removes the delta peak at zero frequency.
///
/// This requires an `n² x n²` linear solve per frequency and is only suitable
/// for small truncations.
pub fn spectrum_direct<H, L, SA, SB>(
    hbuilder: &H,
    loperator: &L,
    A: &nd::ArrayBase<SA, nd::Ix2>,
    B: &nd::ArrayBase<SB, nd::Ix2>,
    omega: &[f64],
) -> Result<Spectrum>
where
    H: HBuild,
    L: LOp,
    SA: nd::Data<Elem = C64>,
    SB: nd::Data<Elem = C64>,
{
    let n = hbuilder.dims().joint();
    if A.shape() != [n, n] || B.shape() != [n, n] {
        return Err(Error::config(format!(
            "correlation operators must have shape [{}, {}]", n, n)));
    }
    let H = hbuilder.build_static();
    let rho_ss = steady_state(&H, loperator)?;
    let sup = liouvillian(&H, loperator);
    let X0 = B.dot(&rho_ss);
    let X0 = &X0 - &(&rho_ss * trace(&X0));
    let x0 = vectorize(&X0);
    let a_t = vectorize(&A.t());
    let mut density: Vec<f64> = Vec::with_capacity(omega.len());
    for &w in omega.iter() {
        let mut M: nd::Array2<C64> = &sup * C64::from(-1.0);
        M.diag_mut().mapv_inplace(|x| x + C64::new(0.0, w));
        let y = M.solve(&x0)?;
        density.push((2.0 * a_t.dot(&y).re).max(0.0));
    }
    Ok(Spectrum {
        omega: omega.iter().copied().collect(),
        density: density.into(),
    })
}

/// Which pair of operators enters a correlation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Correlator {
    /// Cavity field, `⟨a†(τ) a(0)⟩`.
    Cavity,
    /// Atomic dipole, `⟨σ₊(τ) σ₋(0)⟩`.
    #[default]
    Atom,
}

/// Everything needed to compute one spectrum per coupling strength.
#[derive(Clone, Debug)]
pub struct SpectrumSetup {
    /// Base parameters; `g` is overridden by each sweep value.
    pub params: JCParams,
    pub cavity_dim: usize,
    pub rates: DecayRates,
    pub coupling: CouplingKind,
    pub correlator: Correlator,
    pub start: CorrelationStart,
    pub tau: TimeGrid,
    pub integrator: IntegratorConfig,
}

/// Spectrum computed for a single coupling strength.
#[derive(Clone, Debug, PartialEq)]
pub struct SweepPoint {
    pub g: f64,
    pub correlation: nd::Array1<C64>,
    pub spectrum: Spectrum,
}

impl SpectrumSetup {
    /// Build the system for coupling `g`, compute the correlation function, and
    /// transform it.
    pub fn run(&self, g: f64) -> Result<SweepPoint> {
        let hbuilder
            = HBuilderJC::with_coupling(
                self.params.with_g(g), self.cavity_dim, &self.coupling)?;
        let loperator = LOperatorJC::from_hbuilder(&hbuilder, self.rates)?;
        let ops = hbuilder.ops();
        let (A, B)
            = match self.correlator {
                Correlator::Cavity => (&ops.ad, &ops.a),
                Correlator::Atom => (&ops.sp, &ops.sm),
            };
        let correlation
            = correlation_2op_1t(
                &hbuilder, &loperator, &self.start, &self.tau, A, B,
                &self.integrator,
            )?;
        let spectrum = spectrum_fft(&self.tau, &correlation)?;
        debug!(g, "computed spectrum");
        Ok(SweepPoint { g, correlation, spectrum })
    }
}

/// Compute spectra for a sweep of coupling strengths.
///
/// Each value of `g` is an independent run with its own Hamiltonian,
/// dissipators, and trajectory; runs execute in parallel and results are
/// returned in the order of `g_values`.
pub fn sweep_coupling(setup: &SpectrumSetup, g_values: &[f64])
    -> Result<Vec<SweepPoint>>
{
    setup.tau.uniform_step()?;
    g_values.par_iter()
        .map(|g| setup.run(*g))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fft_of_damped_cosine() {
        // C(τ) = cos(ω₀ τ) exp(-Γ τ) has Lorentzian peaks at ±ω₀
        let (w0, gam) = (2.0, 0.2);
        let tau = TimeGrid::linspace(0.0, 60.0, 1201).unwrap();
        let corr: nd::Array1<C64>
            = tau.iter().map(|t| C64::from((w0 * t).cos() * (-gam * t).exp()))
            .collect();
        let spec = spectrum_fft(&tau, &corr).unwrap();
        assert_eq!(spec.omega.len(), 1201);
        assert!(spec.omega.iter().zip(spec.omega.iter().skip(1)).all(|(a, b)| a < b));
        assert!(spec.density.iter().all(|s| *s >= 0.0));
        let peaks = spec.peaks(0.5);
        assert_eq!(peaks.len(), 2);
        let resolution = TAU / 60.05;
        assert!((peaks[0].0 + w0).abs() < resolution);
        assert!((peaks[1].0 - w0).abs() < resolution);
        // peak height ≈ 1/Γ
        assert!((peaks[1].1 - 1.0 / gam).abs() < 0.15 / gam);
        assert!((spec.splitting(0.5).unwrap() - 2.0 * w0).abs() < 2.0 * resolution);
    }

    #[test]
    fn non_uniform_grid_rejected() {
        let tau = TimeGrid::try_from(vec![0.0, 0.1, 0.3, 0.4]).unwrap();
        let corr: nd::Array1<C64> = nd::Array1::zeros(4);
        assert!(matches!(spectrum_fft(&tau, &corr), Err(Error::Configuration(_))));

        let tau = TimeGrid::linspace(0.0, 1.0, 5).unwrap();
        assert!(matches!(spectrum_fft(&tau, &corr), Err(Error::Configuration(_))));
    }

    #[test]
    fn direct_spectrum_of_driven_cavity_is_nonnegative() {
        // thermal bath keeps the cavity populated in the steady state
        let hbuilder = HBuilderJC::new(JCParams::new(0.0, 0.0, 1.0), 3).unwrap();
        let lop = LOperatorJC::from_hbuilder(
            &hbuilder, DecayRates::new(0.2, 0.2, 0.0).with_thermal(0.1),
        ).unwrap();
        let ops = hbuilder.ops();
        let omega: Vec<f64> = (0..41).map(|k| -2.0 + 0.1 * k as f64 + 0.05).collect();
        let spec = spectrum_direct(&hbuilder, &lop, &ops.ad, &ops.a, &omega).unwrap();
        assert_eq!(spec.density.len(), 41);
        assert!(spec.density.iter().all(|s| s.is_finite() && *s >= 0.0));
        assert!(spec.density.iter().any(|s| *s > 0.0));
    }
}
