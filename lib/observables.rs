//! Expectation values, reduced states, and Bloch vectors computed from
//! propagated density matrices.

use ndarray::{ self as nd, s };
use num_complex::Complex64 as C64;
use tracing::warn;
use crate::{
    error::{ Error, Result },
    hilbert::{ AtomLevel, Dims, Subsystem, sigma_x, sigma_y, sigma_z },
    rabi::lindblad::Trajectory,
};

/// Largest imaginary part of an expectation value that is silently dropped.
pub const IMAG_TOL: f64 = 1e-8;

/// Slack allowed on the unit-norm bound of a Bloch vector before a warning is
/// logged.
pub const BLOCH_TOL: f64 = 1e-8;

/// Compute `tr(O ρ)`.
pub fn expect<SO, SR>(
    op: &nd::ArrayBase<SO, nd::Ix2>,
    rho: &nd::ArrayBase<SR, nd::Ix2>,
) -> C64
where
    SO: nd::Data<Elem = C64>,
    SR: nd::Data<Elem = C64>,
{
    op.outer_iter().zip(rho.axis_iter(nd::Axis(1)))
        .map(|(op_i, rho_i)| op_i.dot(&rho_i))
        .sum()
}

/// Purity `tr(ρ²)` of a Hermitian matrix.
pub fn purity<S>(rho: &nd::ArrayBase<S, nd::Ix2>) -> f64
where S: nd::Data<Elem = C64>
{
    rho.iter().map(|x| x.norm_sqr()).sum()
}

/// Real expectation values over a trajectory.
#[derive(Clone, Debug, PartialEq)]
pub struct Expectation {
    /// Real parts, one per time point.
    pub values: nd::Array1<f64>,
    /// Largest magnitude of a discarded imaginary part.
    pub max_imag: f64,
}

impl Expectation {
    /// Return `true` if any discarded imaginary part exceeded [`IMAG_TOL`].
    pub fn flagged(&self) -> bool { self.max_imag > IMAG_TOL }
}

fn check_op_shape<S>(op: &nd::ArrayBase<S, nd::Ix2>, n: usize) -> Result<()>
where S: nd::Data<Elem = C64>
{
    if op.shape() != [n, n] {
        return Err(Error::config(format!(
            "observable has shape {:?}; expected [{}, {}]", op.shape(), n, n)));
    }
    Ok(())
}

/// Compute `⟨O(t)⟩ = tr(ρ(t) O)` at every time point of a trajectory.
///
/// A non-negligible imaginary part is not an error; it is recorded in the
/// output and logged.
pub fn expect_series<S>(traj: &Trajectory, op: &nd::ArrayBase<S, nd::Ix2>)
    -> Result<Expectation>
where S: nd::Data<Elem = C64>
{
    check_op_shape(op, traj.dims().joint())?;
    let raw: Vec<C64> = traj.iter().map(|(_, rho)| expect(op, &rho)).collect();
    let max_imag: f64 = raw.iter().map(|x| x.im.abs()).fold(0.0, f64::max);
    let values: nd::Array1<f64> = raw.iter().map(|x| x.re).collect();
    let ex = Expectation { values, max_imag };
    if ex.flagged() {
        warn!(max_imag, "expectation value has a significant imaginary part");
    }
    Ok(ex)
}

/// Mean photon number and atomic excited-state population over a trajectory.
#[derive(Clone, Debug, PartialEq)]
pub struct Populations {
    pub photon_number: nd::Array1<f64>,
    pub excited: nd::Array1<f64>,
}

/// Compute the cavity and atomic populations directly from the diagonals.
pub fn populations(traj: &Trajectory) -> Populations {
    let dims = traj.dims();
    let (photon_number, excited): (Vec<f64>, Vec<f64>)
        = traj.iter()
        .map(|(_, rho)| {
            let mut n_mean: f64 = 0.0;
            let mut p_e: f64 = 0.0;
            for n in 0..dims.cavity() {
                for level in [AtomLevel::Ground, AtomLevel::Excited] {
                    let k = dims.index(n, level);
                    let p = rho[[k, k]].re;
                    n_mean += n as f64 * p;
                    if level == AtomLevel::Excited { p_e += p; }
                }
            }
            (n_mean, p_e)
        })
        .unzip();
    Populations {
        photon_number: photon_number.into(),
        excited: excited.into(),
    }
}

/// Trace out one subsystem of a joint-space matrix, keeping the other.
///
/// The result is square with the dimension of the kept subsystem, and is
/// Hermitian with unit trace whenever `rho` is.
pub fn partial_trace<S>(
    rho: &nd::ArrayBase<S, nd::Ix2>,
    dims: Dims,
    keep: Subsystem,
) -> Result<nd::Array2<C64>>
where S: nd::Data<Elem = C64>
{
    let n = dims.joint();
    if rho.shape() != [n, n] {
        return Err(Error::config(format!(
            "matrix has shape {:?}; expected [{}, {}]", rho.shape(), n, n)));
    }
    let na = dims.atom();
    let nc = dims.cavity();
    let reduced: nd::Array2<C64>
        = match keep {
            Subsystem::Cavity => {
                nd::Array2::from_shape_fn((nc, nc), |(i, j)| {
                    (0..na).map(|s| rho[[i * na + s, j * na + s]]).sum()
                })
            },
            Subsystem::Atom => {
                nd::Array2::from_shape_fn((na, na), |(s, r)| {
                    (0..nc).map(|m| rho[[m * na + s, m * na + r]]).sum()
                })
            },
        };
    Ok(reduced)
}

/// Reduced states over a whole trajectory, with time along the last axis.
pub fn reduced_series(traj: &Trajectory, keep: Subsystem)
    -> Result<nd::Array3<C64>>
{
    let dims = traj.dims();
    let m = dims.of(keep);
    let mut out: nd::Array3<C64> = nd::Array3::zeros((m, m, traj.len()));
    for (k, (_, rho)) in traj.iter().enumerate() {
        out.slice_mut(s![.., .., k]).assign(&partial_trace(&rho, dims, keep)?);
    }
    Ok(out)
}

/// Expectation values of the three Pauli matrices for an atomic state.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BlochVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl BlochVector {
    /// Euclidean length.
    pub fn norm(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2) + self.z.powi(2)).sqrt()
    }

    /// Return the components as an array `[x, y, z]`.
    pub fn to_array(&self) -> [f64; 3] { [self.x, self.y, self.z] }
}

/// Compute the Bloch vector of a 2x2 atomic density matrix.
///
/// Rounding can push the length of the vector for a pure state slightly past
/// 1; such vectors are rescaled onto the unit sphere.
pub fn bloch_vector<S>(rho_atom: &nd::ArrayBase<S, nd::Ix2>)
    -> Result<BlochVector>
where S: nd::Data<Elem = C64>
{
    check_op_shape(rho_atom, 2)?;
    let mut b
        = BlochVector {
            x: expect(&sigma_x(), rho_atom).re,
            y: expect(&sigma_y(), rho_atom).re,
            z: expect(&sigma_z(), rho_atom).re,
        };
    let r = b.norm();
    if r > 1.0 {
        if r > 1.0 + BLOCH_TOL {
            warn!(norm = r, "Bloch vector lies outside the unit sphere");
        }
        b.x /= r;
        b.y /= r;
        b.z /= r;
    }
    Ok(b)
}

/// Compute the atomic Bloch vector at every time point of a trajectory.
pub fn bloch_series(traj: &Trajectory) -> Result<Vec<BlochVector>> {
    let dims = traj.dims();
    traj.iter()
        .map(|(_, rho)| {
            let rho_atom = partial_trace(&rho, dims, Subsystem::Atom)?;
            bloch_vector(&rho_atom)
        })
        .collect()
}

/// Compute the atomic Bloch vector at each requested time, using the
/// trajectory state closest to that time.
///
/// Returns the trajectory times actually used alongside the vectors.
pub fn bloch_snapshots(traj: &Trajectory, times: &[f64])
    -> Result<(Vec<f64>, Vec<BlochVector>)>
{
    let dims = traj.dims();
    times.iter()
        .map(|tk| {
            let (tk_used, rho) = traj.state_at(*tk);
            let rho_atom = partial_trace(&rho, dims, Subsystem::Atom)?;
            Ok((tk_used, bloch_vector(&rho_atom)?))
        })
        .collect::<Result<Vec<(f64, BlochVector)>>>()
        .map(|snaps| snaps.into_iter().unzip())
}
