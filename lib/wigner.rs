//! Wigner quasi-probability distribution of the cavity field.
//!
//! Quadratures are scaled so that `a = (x + i p) / sqrt(2)`; the vacuum is
//! then `W(x, p) = exp(-x² - p²) / π`.

use std::f64::consts::PI;
use ndarray::{ self as nd, s, Zip };
use num_complex::Complex64 as C64;
use tracing::debug;
use crate::{
    error::{ Error, Result },
    hilbert::Subsystem,
    observables::partial_trace,
    rabi::{ check_density, lindblad::Trajectory },
};

/// Tolerance for the density-matrix checks on the input state.
const STATE_TOL: f64 = 1e-6;

/// Default quadrature axis, 200 points over `[-5, 5]`.
pub fn default_axis() -> nd::Array1<f64> { nd::Array1::linspace(-5.0, 5.0, 200) }

/// Wigner function sampled on a rectangular phase-space grid.
#[derive(Clone, Debug, PartialEq)]
pub struct WignerGrid {
    pub x: nd::Array1<f64>,
    pub p: nd::Array1<f64>,
    /// `w[[i, j]]` is the value at `(x[i], p[j])`.
    pub w: nd::Array2<f64>,
}

fn trapz_weights(x: &nd::Array1<f64>) -> nd::Array1<f64> {
    let n = x.len();
    let mut wts: nd::Array1<f64> = nd::Array1::zeros(n);
    for k in 0..n.saturating_sub(1) {
        let h = x[k + 1] - x[k];
        wts[k] += h / 2.0;
        wts[k + 1] += h / 2.0;
    }
    wts
}

fn integrate2(x: &nd::Array1<f64>, p: &nd::Array1<f64>, w: nd::ArrayView2<f64>)
    -> f64
{
    let wx = trapz_weights(x);
    let wp = trapz_weights(p);
    wx.dot(&w.dot(&wp))
}

impl WignerGrid {
    /// Integral over the sampled window by the trapezoidal rule.
    pub fn integral(&self) -> f64 { integrate2(&self.x, &self.p, self.w.view()) }

    /// Smallest sampled value; negative values mark non-classical states.
    pub fn min(&self) -> f64 { self.w.iter().copied().fold(f64::INFINITY, f64::min) }

    /// Largest sampled value.
    pub fn max(&self) -> f64 { self.w.iter().copied().fold(f64::NEG_INFINITY, f64::max) }
}

fn check_axis(name: &str, axis: &nd::Array1<f64>) -> Result<()> {
    if axis.is_empty() || axis.iter().any(|v| !v.is_finite()) {
        return Err(Error::config(format!(
            "{} axis must be non-empty and finite", name)));
    }
    if axis.iter().zip(axis.iter().skip(1)).any(|(a, b)| b <= a) {
        return Err(Error::config(format!(
            "{} axis must be strictly increasing", name)));
    }
    Ok(())
}

// iterative evaluation in the Fock basis, using the recurrence relations of
// the Laguerre-polynomial kernels W_mn(x, p)
fn wigner_iterative<S>(
    rho: &nd::ArrayBase<S, nd::Ix2>,
    x: &nd::Array1<f64>,
    p: &nd::Array1<f64>,
) -> nd::Array2<f64>
where S: nd::Data<Elem = C64>
{
    let M = rho.nrows();
    let A: nd::Array2<C64>
        = nd::Array2::from_shape_fn((x.len(), p.len()), |(i, j)| {
            C64::new(x[i], p[j]) / 2.0_f64.sqrt()
        });
    let A_conj = A.mapv(|a| a.conj());
    let mut Wlist: Vec<nd::Array2<C64>>
        = vec![nd::Array2::zeros(A.raw_dim()); M];
    Wlist[0] = A.mapv(|a| C64::from((-2.0 * a.norm_sqr()).exp() / PI));
    let mut W: nd::Array2<f64> = Wlist[0].mapv(|w| rho[[0, 0]].re * w.re);
    let accumulate = |W: &mut nd::Array2<f64>, r: C64, Wmn: &nd::Array2<C64>, mult: f64| {
        Zip::from(W).and(Wmn).for_each(|w, z| { *w += mult * (r * z).re; });
    };
    for n in 1..M {
        Wlist[n] = (&A * &Wlist[n - 1]) * C64::from(2.0 / (n as f64).sqrt());
        accumulate(&mut W, rho[[0, n]], &Wlist[n], 2.0);
    }
    for m in 1..M {
        let sqrt_m = (m as f64).sqrt();
        let mut temp: nd::Array2<C64> = Wlist[m].clone();
        Wlist[m]
            = ((&A_conj * &temp) * C64::from(2.0) - &Wlist[m - 1] * C64::from(sqrt_m))
            / C64::from(sqrt_m);
        accumulate(&mut W, rho[[m, m]], &Wlist[m], 1.0);
        for n in m + 1..M {
            let temp2: nd::Array2<C64>
                = ((&A * &Wlist[n - 1]) * C64::from(2.0) - &temp * C64::from(sqrt_m))
                / C64::from((n as f64).sqrt());
            temp = std::mem::replace(&mut Wlist[n], temp2);
            accumulate(&mut W, rho[[m, n]], &Wlist[n], 2.0);
        }
    }
    W
}

/// Compute the Wigner function of a cavity density matrix on the grid
/// spanned by `x` and `p`.
///
/// Fails if `rho` is not a valid density matrix or either axis is empty or
/// not strictly increasing. Negative values in the result are physical.
pub fn wigner<S>(
    rho: &nd::ArrayBase<S, nd::Ix2>,
    x: &nd::Array1<f64>,
    p: &nd::Array1<f64>,
) -> Result<WignerGrid>
where S: nd::Data<Elem = C64>
{
    check_axis("x", x)?;
    check_axis("p", p)?;
    check_density(rho, rho.nrows(), STATE_TOL)?;
    let w = wigner_iterative(rho, x, p);
    Ok(WignerGrid { x: x.clone(), p: p.clone(), w })
}

/// Wigner functions of the cavity field at several times.
#[derive(Clone, Debug, PartialEq)]
pub struct WignerSeries {
    /// Trajectory times actually used, closest to the requested ones.
    pub t: nd::Array1<f64>,
    pub x: nd::Array1<f64>,
    pub p: nd::Array1<f64>,
    /// `w[[i, j, k]]` is the value at `(x[i], p[j])` and time `t[k]`.
    pub w: nd::Array3<f64>,
}

impl WignerSeries {
    /// Return the grid for the `k`-th time.
    pub fn grid(&self, k: usize) -> Option<WignerGrid> {
        (k < self.t.len()).then(|| {
            WignerGrid {
                x: self.x.clone(),
                p: self.p.clone(),
                w: self.w.slice(s![.., .., k]).to_owned(),
            }
        })
    }

    /// Trapezoidal integrals of every grid.
    pub fn integrals(&self) -> nd::Array1<f64> {
        self.w.axis_iter(nd::Axis(2))
            .map(|wk| integrate2(&self.x, &self.p, wk))
            .collect()
    }
}

/// Compute the cavity Wigner function at each requested time, using the
/// trajectory state closest to that time.
pub fn wigner_series(
    traj: &Trajectory,
    times: &[f64],
    x: &nd::Array1<f64>,
    p: &nd::Array1<f64>,
) -> Result<WignerSeries> {
    check_axis("x", x)?;
    check_axis("p", p)?;
    let mut t: Vec<f64> = Vec::with_capacity(times.len());
    let mut w: nd::Array3<f64> = nd::Array3::zeros((x.len(), p.len(), times.len()));
    for (k, &tk) in times.iter().enumerate() {
        let (tk_used, rho) = traj.state_at(tk);
        let rho_c = partial_trace(&rho, traj.dims(), Subsystem::Cavity)?;
        let grid = wigner(&rho_c, x, p)?;
        w.slice_mut(s![.., .., k]).assign(&grid.w);
        t.push(tk_used);
    }
    debug!(num_times = times.len(), "computed Wigner grids");
    Ok(WignerSeries { t: t.into(), x: x.clone(), p: p.clone(), w })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hilbert::{ coherent_vector, fock_density, outer_prod, thermal_density };

    fn axis() -> nd::Array1<f64> { nd::Array1::linspace(-5.0, 5.0, 201) }

    #[test]
    fn vacuum_is_gaussian() {
        let x = axis();
        let grid = wigner(&fock_density(6, 0).unwrap(), &x, &x).unwrap();
        for (i, xi) in x.iter().enumerate().step_by(20) {
            for (j, pj) in x.iter().enumerate().step_by(20) {
                let expected = (-xi * xi - pj * pj).exp() / PI;
                assert!((grid.w[[i, j]] - expected).abs() < 1e-12);
            }
        }
        assert!((grid.integral() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn single_photon_is_negative_at_origin() {
        let x = axis();
        let grid = wigner(&fock_density(4, 1).unwrap(), &x, &x).unwrap();
        assert!((grid.w[[100, 100]] + 1.0 / PI).abs() < 1e-12);
        assert!(grid.min() < 0.0);
        assert!((grid.integral() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normalized_for_mixed_and_displaced_states() {
        let x = axis();
        let thermal = thermal_density(15, 0.5).unwrap();
        assert!((wigner(&thermal, &x, &x).unwrap().integral() - 1.0).abs() < 1e-4);

        let psi = coherent_vector(15, C64::from(1.0)).unwrap();
        let grid = wigner(&outer_prod(&psi, &psi), &x, &x).unwrap();
        assert!((grid.integral() - 1.0).abs() < 1e-4);
        // peak sits at x = sqrt(2) Re(α), p = 0
        let (imax, jmax)
            = grid.w.indexed_iter()
            .fold(((0, 0), f64::NEG_INFINITY), |(kmax, wmax), (k, w)| {
                if *w > wmax { (k, *w) } else { (kmax, wmax) }
            })
            .0;
        assert!((x[imax] - 2.0_f64.sqrt()).abs() < 0.06);
        assert!(x[jmax].abs() < 0.06);
    }

    #[test]
    fn rejects_bad_input() {
        let x = axis();
        let half = fock_density(3, 0).unwrap() * C64::from(0.5);
        assert!(matches!(wigner(&half, &x, &x), Err(Error::InvalidState(_))));
        let empty: nd::Array1<f64> = nd::Array1::zeros(0);
        let vac = fock_density(3, 0).unwrap();
        assert!(matches!(wigner(&vac, &empty, &x), Err(Error::Configuration(_))));
    }
}
