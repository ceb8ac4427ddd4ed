//! Functions for numerical integration of the Lindblad master equation.
//!
//! Where unspecified, the last index of a 3D array corresponds to time, all
//! Hamiltonians and decay rates should be in units of angular frequency, and
//! integration is via fourth-order Runge-Kutta with step-doubling error
//! control.

use ndarray::{ self as nd, Zip };
use ndarray_linalg::{ EigValsh, UPLO };
use num_complex::Complex64 as C64;
use serde::{ Deserialize, Serialize };
use tracing::{ debug, warn };
use crate::{
    dynamics::LOp,
    error::{ Error, Result },
    hilbert::{ dagger, hermitian_defect },
    time::TimeGrid,
};

pub mod lindblad;
pub mod liouville;

/// Compute the commutator `[A, B] = A B - B A`.
pub fn commutator<SA, SB>(
    A: &nd::ArrayBase<SA, nd::Ix2>,
    B: &nd::ArrayBase<SB, nd::Ix2>,
) -> nd::Array2<C64>
where
    SA: nd::Data<Elem = C64>,
    SB: nd::Data<Elem = C64>,
{
    A.dot(B) - B.dot(A)
}

/// Compute the anti-commutator `{A, B} = A B + B A`.
pub fn anti_commutator<SA, SB>(
    A: &nd::ArrayBase<SA, nd::Ix2>,
    B: &nd::ArrayBase<SB, nd::Ix2>,
) -> nd::Array2<C64>
where
    SA: nd::Data<Elem = C64>,
    SB: nd::Data<Elem = C64>,
{
    A.dot(B) + B.dot(A)
}

/// Sum of the main diagonal.
pub fn trace<S>(A: &nd::ArrayBase<S, nd::Ix2>) -> C64
where S: nd::Data<Elem = C64>
{
    A.diag().iter().sum()
}

/// Compute the full RHS of the Lindblad master equation,
/// ```text
/// dρ/dt = -i [H, ρ] + D(ρ)
/// ```
/// with `D` the dissipator of `L`.
pub fn lindblad_rhs<L, S>(
    H: &nd::Array2<C64>,
    L: &L,
    rho: &nd::ArrayBase<S, nd::Ix2>,
) -> nd::Array2<C64>
where
    L: LOp,
    S: nd::Data<Elem = C64>,
{
    commutator(H, rho) * (-C64::i()) + L.op(rho)
}

/// Smallest eigenvalue of a Hermitian matrix.
pub fn min_eigenvalue<S>(A: &nd::ArrayBase<S, nd::Ix2>) -> Result<f64>
where S: nd::Data<Elem = C64>
{
    let evals: nd::Array1<f64> = A.eigvalsh(UPLO::Lower)?;
    Ok(evals.iter().copied().fold(f64::INFINITY, f64::min))
}

/// Check that `rho` is a valid `dim`-dimensional density matrix to within
/// `tol`: square, finite, Hermitian, unit trace, and positive semi-definite.
///
/// Fails with [`Error::InvalidState`] naming the first check that failed.
pub fn check_density<S>(rho: &nd::ArrayBase<S, nd::Ix2>, dim: usize, tol: f64)
    -> Result<()>
where S: nd::Data<Elem = C64>
{
    if rho.shape() != [dim, dim] {
        return Err(Error::state(format!(
            "density matrix has shape {:?}; expected [{}, {}]",
            rho.shape(), dim, dim,
        )));
    }
    if rho.iter().any(|x| !x.re.is_finite() || !x.im.is_finite()) {
        return Err(Error::state("density matrix has non-finite entries"));
    }
    let defect = hermitian_defect(rho);
    if defect > tol {
        return Err(Error::state(format!(
            "density matrix is not Hermitian (max |ρ - ρ†| = {:.3e})", defect)));
    }
    let tr = trace(rho);
    if (tr - 1.0).norm() > tol {
        return Err(Error::state(format!(
            "density matrix has trace {} (expected 1)", tr)));
    }
    let hermitian = (rho + &dagger(rho)) / C64::from(2.0);
    let lmin = min_eigenvalue(&hermitian)?;
    if lmin < -tol {
        return Err(Error::state(format!(
            "density matrix is not positive semi-definite (min eigenvalue \
            {:.3e})",
            lmin,
        )));
    }
    Ok(())
}

/// Project onto the Hermitian part and rescale to unit trace, in place.
///
/// Returns the trace found before rescaling.
pub fn hermitize_normalize(rho: &mut nd::Array2<C64>) -> C64 {
    let tr = trace(rho);
    let rho_dag = dagger(rho);
    Zip::from(&mut *rho).and(&rho_dag)
        .for_each(|r, rd| { *r = (*r + *rd) / 2.0; });
    let tr_herm = trace(rho).re;
    if tr_herm != 0.0 {
        rho.mapv_inplace(|r| r / tr_herm);
    }
    tr
}

/// Settings for the adaptive integrator.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntegratorConfig {
    /// Local error tolerance per step, relative to the state's largest
    /// element (or absolute, for states with all elements below 1).
    pub tolerance: f64,
    /// Re-Hermitize and renormalize the state every this many accepted steps.
    pub correct_every: usize,
    /// Maximum number of attempted steps within a single grid interval.
    pub max_substeps: usize,
    /// Largest trace deviation tolerated before a correction; anything beyond
    /// is treated as a blow-up.
    pub instability_threshold: f64,
    /// Initial step size; estimated from the generator if absent.
    pub initial_step: Option<f64>,
    /// Tolerance for checks on caller-supplied density matrices.
    pub state_tolerance: f64,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            correct_every: 1,
            max_substeps: 100_000,
            instability_threshold: 1e-2,
            initial_step: None,
            state_tolerance: 1e-8,
        }
    }
}

impl IntegratorConfig {
    /// Fail if any setting is out of range.
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(Error::config("integrator tolerance must be positive"));
        }
        if self.correct_every == 0 {
            return Err(Error::config("correct_every must be at least 1"));
        }
        if self.max_substeps == 0 {
            return Err(Error::config("max_substeps must be at least 1"));
        }
        if !(self.instability_threshold.is_finite()
            && self.instability_threshold > 0.0)
        {
            return Err(Error::config(
                "instability_threshold must be positive"));
        }
        if let Some(h) = self.initial_step {
            if !(h.is_finite() && h > 0.0) {
                return Err(Error::config("initial_step must be positive"));
            }
        }
        if !(self.state_tolerance.is_finite() && self.state_tolerance > 0.0) {
            return Err(Error::config("state_tolerance must be positive"));
        }
        Ok(())
    }

    /// Set the local error tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the drift-correction period.
    pub fn with_correct_every(mut self, correct_every: usize) -> Self {
        self.correct_every = correct_every;
        self
    }
}

/// How accumulated drift in the propagated matrix is handled.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Drift {
    /// The matrix is a density matrix: periodically re-Hermitize and
    /// renormalize it, and treat large trace excursions as blow-ups.
    Density,
    /// The matrix is an arbitrary operator (e.g. in a quantum regression
    /// calculation): leave it alone apart from checking for non-finite
    /// entries.
    Raw,
}

fn max_abs(a: &nd::Array2<C64>) -> f64 {
    a.iter().map(|x| x.norm()).fold(0.0, f64::max)
}

fn max_abs_diff(a: &nd::Array2<C64>, b: &nd::Array2<C64>) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).norm()).fold(0.0, f64::max)
}

fn all_finite(a: &nd::Array2<C64>) -> bool {
    a.iter().all(|x| x.re.is_finite() && x.im.is_finite())
}

fn rk4_step<F>(rhs: &F, z: &nd::Array2<C64>, h: f64) -> nd::Array2<C64>
where F: Fn(&nd::Array2<C64>) -> nd::Array2<C64>
{
    let k1 = rhs(z);
    let k2 = rhs(&(z + &(&k1 * C64::from(h / 2.0))));
    let k3 = rhs(&(z + &(&k2 * C64::from(h / 2.0))));
    let k4 = rhs(&(z + &(&k3 * C64::from(h))));
    z + &((k1 + k2 * C64::from(2.0) + k3 * C64::from(2.0) + k4) * C64::from(h / 6.0))
}

// failure inside a single integration attempt, carrying the last grid time
// reached with a valid state
struct Blowup {
    last_stable_time: f64,
    reason: String,
}

impl From<Blowup> for Error {
    fn from(b: Blowup) -> Self {
        Error::NumericalInstability {
            last_stable_time: b.last_stable_time,
            reason: b.reason,
        }
    }
}

fn estimate_step<F>(rhs: &F, z0: &nd::Array2<C64>, dt0: f64) -> f64
where F: Fn(&nd::Array2<C64>) -> nd::Array2<C64>
{
    let scale = max_abs(z0);
    if scale == 0.0 { return dt0; }
    let rate = max_abs(&rhs(z0)) / scale;
    if rate > 0.0 { dt0.min(0.5 / rate) } else { dt0 }
}

// fourth-order Runge-Kutta for a time-independent generator with reduced
// integration output and adaptive sub-stepping between grid points; steps
// never grow beyond `h_max`
fn do_evolve_attempt<F, X, T>(
    z0: &nd::Array2<C64>,
    rhs: &F,
    t: &TimeGrid,
    config: &IntegratorConfig,
    drift: Drift,
    h0: f64,
    h_max: f64,
    x: &mut X,
) -> std::result::Result<Vec<T>, Blowup>
where
    F: Fn(&nd::Array2<C64>) -> nd::Array2<C64>,
    X: FnMut(&nd::Array2<C64>) -> T,
{
    let tol = config.tolerance;
    let mut z: nd::Array2<C64> = z0.clone();
    let mut x_t: Vec<T> = Vec::with_capacity(t.len());
    x_t.push(x(&z));
    let mut h: f64 = h0.min(h_max);
    let mut since_correction: usize = 0;
    let mut accepted: usize = 0;
    let mut rejected: usize = 0;
    for (tk, dtk) in t.iter().zip(t.steps()) {
        let mut remaining: f64 = dtk;
        let mut attempts: usize = 0;
        while remaining > 0.0 {
            attempts += 1;
            if attempts > config.max_substeps {
                return Err(Blowup {
                    last_stable_time: *tk,
                    reason: format!(
                        "exceeded {} sub-steps in one grid interval",
                        config.max_substeps,
                    ),
                });
            }
            // land exactly on the grid point instead of leaving a sliver
            let snapped = h >= remaining * (1.0 - 1e-9);
            let hk = if snapped { remaining } else { h };
            if hk <= f64::EPSILON * tk.abs().max(1.0) {
                return Err(Blowup {
                    last_stable_time: *tk,
                    reason: format!("step size underflow (h = {:.3e})", hk),
                });
            }
            let full = rk4_step(rhs, &z, hk);
            let half = rk4_step(rhs, &z, hk / 2.0);
            let two_half = rk4_step(rhs, &half, hk / 2.0);
            let err = max_abs_diff(&full, &two_half);
            if !err.is_finite() {
                return Err(Blowup {
                    last_stable_time: *tk,
                    reason: "non-finite local error estimate".into(),
                });
            }
            let bound = tol * max_abs(&two_half).max(1.0);
            let factor
                = if err == 0.0 {
                    5.0
                } else {
                    (0.9 * (bound / err).powf(0.2)).clamp(0.2, 5.0)
                };
            if err <= bound {
                // Richardson extrapolation of the two estimates
                z = &two_half + &((&two_half - &full) / C64::from(15.0));
                remaining -= hk;
                accepted += 1;
                since_correction += 1;
                if !all_finite(&z) {
                    return Err(Blowup {
                        last_stable_time: *tk,
                        reason: "state acquired non-finite entries".into(),
                    });
                }
                if drift == Drift::Density
                    && since_correction >= config.correct_every
                {
                    let tr = hermitize_normalize(&mut z);
                    if (tr - 1.0).norm() > config.instability_threshold {
                        return Err(Blowup {
                            last_stable_time: *tk,
                            reason: format!("trace drifted to {}", tr),
                        });
                    }
                    since_correction = 0;
                }
                h = if snapped { h.max(hk * factor) } else { hk * factor };
            } else {
                rejected += 1;
                h = hk * factor;
            }
            h = h.min(h_max);
        }
        x_t.push(x(&z));
    }
    debug!(accepted, rejected, "finished integration");
    Ok(x_t)
}

// integrate with one retry on blow-up, starting from a tenth of the initial
// step and never growing past it
pub(crate) fn do_evolve_reduced<F, X, T>(
    z0: &nd::Array2<C64>,
    rhs: F,
    t: &TimeGrid,
    config: &IntegratorConfig,
    drift: Drift,
    mut x: X,
) -> Result<Vec<T>>
where
    F: Fn(&nd::Array2<C64>) -> nd::Array2<C64>,
    X: FnMut(&nd::Array2<C64>) -> T,
{
    config.validate()?;
    let dt0 = t.steps().first().copied().unwrap_or(1.0);
    let h0 = config.initial_step.unwrap_or_else(|| estimate_step(&rhs, z0, dt0));
    match do_evolve_attempt(z0, &rhs, t, config, drift, h0, f64::INFINITY, &mut x) {
        Ok(x_t) => Ok(x_t),
        Err(blowup) => {
            warn!(
                last_stable_time = blowup.last_stable_time,
                reason = %blowup.reason,
                "integration unstable; retrying with a smaller step",
            );
            let h_retry = h0 / 10.0;
            do_evolve_attempt(z0, &rhs, t, config, drift, h_retry, h_retry, &mut x)
                .map_err(Error::from)
        },
    }
}
