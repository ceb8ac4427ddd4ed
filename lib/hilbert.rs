//! Definitions to describe the truncated cavity ⊗ atom Hilbert space, its
//! elementary operators, and states on it.
//!
//! The tensor ordering is fixed throughout the crate as cavity ⊗ atom, so the
//! joint basis state `|n⟩ ⊗ |s⟩` has index `2 n + s`.

use ndarray::{ self as nd, s, linalg::kron };
use num_complex::Complex64 as C64;
use num_traits::{ One, Zero };
use serde::{ Deserialize, Serialize };
use crate::error::{ Error, Result };

/// Dimension of the atomic factor.
pub const ATOM_DIM: usize = 2;

/* Dimensions *****************************************************************/

/// Names one factor of the joint space.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Cavity,
    Atom,
}

/// Dimensions of the joint cavity ⊗ atom space, parameterized by the cavity
/// truncation `N` (the number of Fock states kept, `|0⟩ ..= |N - 1⟩`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Dims {
    cavity: usize,
}

impl Dims {
    /// Create a new `Dims`, failing if the truncation is zero.
    pub fn new(cavity: usize) -> Result<Self> {
        if cavity == 0 {
            return Err(Error::config("cavity truncation must be at least 1"));
        }
        Ok(Self { cavity })
    }

    /// Number of cavity Fock states.
    pub fn cavity(&self) -> usize { self.cavity }

    /// Number of atomic levels.
    pub fn atom(&self) -> usize { ATOM_DIM }

    /// Dimension of the joint space, `2 N`.
    pub fn joint(&self) -> usize { self.cavity * ATOM_DIM }

    /// Dimension of a single factor.
    pub fn of(&self, sub: Subsystem) -> usize {
        match sub {
            Subsystem::Cavity => self.cavity,
            Subsystem::Atom => ATOM_DIM,
        }
    }

    /// Joint-space index of `|n⟩ ⊗ |level⟩`.
    pub fn index(&self, n: usize, level: AtomLevel) -> usize {
        n * ATOM_DIM + level.index()
    }
}

/* States *********************************************************************/

/// One of the two atomic levels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AtomLevel {
    /// Ground state `|g⟩`, σ_z eigenvalue -1.
    Ground,
    /// Excited state `|e⟩`, σ_z eigenvalue +1.
    Excited,
}

impl AtomLevel {
    /// Index of the level in the atomic factor.
    pub fn index(&self) -> usize {
        match *self {
            Self::Ground => 0,
            Self::Excited => 1,
        }
    }

    /// Return appropriate `\sigma_z` eigenvalue.
    pub fn sz(&self) -> f64 {
        match *self {
            Self::Ground => -1.0,
            Self::Excited => 1.0,
        }
    }
}

/// Compute the outer product of two state vectors.
pub fn outer_prod(a: &nd::Array1<C64>, b: &nd::Array1<C64>)
    -> nd::Array2<C64>
{
    nd::Array2::from_shape_fn((a.len(), b.len()), |(i, j)| a[i] * b[j].conj())
}

/// Density matrix of a single atomic level.
pub fn atom_density(level: AtomLevel) -> nd::Array2<C64> {
    let mut rho: nd::Array2<C64> = nd::Array2::zeros((ATOM_DIM, ATOM_DIM));
    rho[[level.index(), level.index()]] = C64::one();
    rho
}

/// Density matrix of the Fock state `|n⟩` in a cavity truncated at `dim`
/// states.
pub fn fock_density(dim: usize, n: usize) -> Result<nd::Array2<C64>> {
    if n >= dim {
        return Err(Error::config(format!(
            "Fock state |{}> lies outside a truncation of {} states", n, dim)));
    }
    let mut rho: nd::Array2<C64> = nd::Array2::zeros((dim, dim));
    rho[[n, n]] = C64::one();
    Ok(rho)
}

/// State vector of the coherent state `|α⟩`, truncated at `dim` Fock states
/// and renormalized so that its inner product with itself is 1.
pub fn coherent_vector(dim: usize, alpha: C64) -> Result<nd::Array1<C64>> {
    if dim == 0 {
        return Err(Error::config("cavity truncation must be at least 1"));
    }
    let mut psi: nd::Array1<C64> = nd::Array1::zeros(dim);
    let mut amp = C64::from((-alpha.norm_sqr() / 2.0).exp());
    psi[0] = amp;
    for n in 1..dim {
        amp = amp * alpha / (n as f64).sqrt();
        psi[n] = amp;
    }
    let norm: f64 = psi.iter().map(|a| a.norm_sqr()).sum::<f64>().sqrt();
    psi /= C64::from(norm);
    Ok(psi)
}

/// Density matrix of a thermal cavity state with mean photon number `n_th`,
/// truncated at `dim` Fock states and renormalized to unit trace.
pub fn thermal_density(dim: usize, n_th: f64) -> Result<nd::Array2<C64>> {
    if dim == 0 {
        return Err(Error::config("cavity truncation must be at least 1"));
    }
    if !(n_th >= 0.0) {
        return Err(Error::config("thermal photon number must be non-negative"));
    }
    let mut diag: nd::Array1<f64>
        = if n_th == 0.0 {
            (0..dim).map(|n| if n == 0 { 1.0 } else { 0.0 }).collect()
        } else {
            let ratio = n_th / (1.0 + n_th);
            (0..dim).map(|n| ratio.powi(n as i32)).collect()
        };
    let norm = diag.sum();
    diag /= norm;
    Ok(nd::Array2::from_diag(&diag.mapv(C64::from)))
}

/// Density matrix of the product state `rho_cavity ⊗ rho_atom`.
pub fn product_density(
    rho_cavity: &nd::Array2<C64>,
    rho_atom: &nd::Array2<C64>,
) -> nd::Array2<C64>
{
    kron(rho_cavity, rho_atom)
}

/// State vector of the joint basis state `|n⟩ ⊗ |level⟩`.
pub fn basis_vector(dims: Dims, n: usize, level: AtomLevel)
    -> Result<nd::Array1<C64>>
{
    if n >= dims.cavity() {
        return Err(Error::config(format!(
            "Fock state |{}> lies outside a truncation of {} states",
            n, dims.cavity(),
        )));
    }
    let k = dims.index(n, level);
    Ok((0..dims.joint())
        .map(|j| if j == k { C64::one() } else { C64::zero() })
        .collect())
}

/* Operators ******************************************************************/

/// Conjugate transpose of a matrix.
pub fn dagger<S>(op: &nd::ArrayBase<S, nd::Ix2>) -> nd::Array2<C64>
where S: nd::Data<Elem = C64>
{
    op.t().mapv(|x| x.conj())
}

/// Largest absolute difference between a matrix and its conjugate transpose.
pub fn hermitian_defect<S>(op: &nd::ArrayBase<S, nd::Ix2>) -> f64
where S: nd::Data<Elem = C64>
{
    op.iter().zip(op.t().iter())
        .map(|(xij, xji)| (*xij - xji.conj()).norm())
        .fold(0.0, f64::max)
}

/// Return `true` if `op` is square and equal to its conjugate transpose to
/// within `tol`.
pub fn is_hermitian<S>(op: &nd::ArrayBase<S, nd::Ix2>, tol: f64) -> bool
where S: nd::Data<Elem = C64>
{
    op.is_square() && hermitian_defect(op) <= tol
}

/// Bosonic annihilation operator truncated at `dim` Fock states, with
/// `a[n - 1, n] = sqrt(n)`.
pub fn destroy(dim: usize) -> Result<nd::Array2<C64>> {
    if dim == 0 {
        return Err(Error::config("mode dimension must be at least 1"));
    }
    let mut a: nd::Array2<C64> = nd::Array2::zeros((dim, dim));
    a.slice_mut(s![..dim - 1, 1..dim])
        .diag_mut()
        .indexed_iter_mut()
        .for_each(|(n, elem)| { *elem = C64::from((n as f64 + 1.0).sqrt()); });
    Ok(a)
}

/// Bosonic creation operator truncated at `dim` Fock states.
pub fn create(dim: usize) -> Result<nd::Array2<C64>> {
    destroy(dim).map(|a| dagger(&a))
}

/// Photon-number operator truncated at `dim` Fock states.
pub fn number(dim: usize) -> Result<nd::Array2<C64>> {
    if dim == 0 {
        return Err(Error::config("mode dimension must be at least 1"));
    }
    let diag: nd::Array1<C64> = (0..dim).map(|n| C64::from(n as f64)).collect();
    Ok(nd::Array2::from_diag(&diag))
}

/// Atomic lowering operator σ₋ = |g⟩⟨e|.
pub fn sigma_minus() -> nd::Array2<C64> {
    let mut sm: nd::Array2<C64> = nd::Array2::zeros((ATOM_DIM, ATOM_DIM));
    sm[[AtomLevel::Ground.index(), AtomLevel::Excited.index()]] = C64::one();
    sm
}

/// Atomic raising operator σ₊ = |e⟩⟨g|.
pub fn sigma_plus() -> nd::Array2<C64> { dagger(&sigma_minus()) }

/// Pauli σ_x = σ₊ + σ₋.
pub fn sigma_x() -> nd::Array2<C64> { sigma_plus() + sigma_minus() }

/// Pauli σ_y = -i (σ₊ - σ₋).
pub fn sigma_y() -> nd::Array2<C64> {
    (sigma_plus() - sigma_minus()) * (-C64::i())
}

/// Pauli σ_z = |e⟩⟨e| - |g⟩⟨g|.
pub fn sigma_z() -> nd::Array2<C64> {
    let diag: nd::Array1<C64>
        = [AtomLevel::Ground, AtomLevel::Excited].iter()
        .map(|level| C64::from(level.sz()))
        .collect();
    nd::Array2::from_diag(&diag)
}

/// Lift an operator acting on one factor to the joint space by a Kronecker
/// product with the identity on the other factor.
///
/// Fails if `op` is not square with the dimension of `sub`.
pub fn embed<S>(dims: Dims, sub: Subsystem, op: &nd::ArrayBase<S, nd::Ix2>)
    -> Result<nd::Array2<C64>>
where S: nd::Data<Elem = C64>
{
    let n = dims.of(sub);
    if op.shape() != [n, n] {
        return Err(Error::config(format!(
            "cannot embed a {:?} operator of shape {:?} into a {:?} factor of \
            dimension {}",
            sub, op.shape(), sub, n,
        )));
    }
    let op = op.to_owned();
    let embedded
        = match sub {
            Subsystem::Cavity => kron(&op, &nd::Array2::eye(ATOM_DIM)),
            Subsystem::Atom => kron(&nd::Array2::eye(dims.cavity()), &op),
        };
    Ok(embedded)
}

/// Elementary operators already lifted to the joint space.
#[derive(Clone, Debug, PartialEq)]
pub struct JointOps {
    pub dims: Dims,
    /// Cavity annihilation operator `a ⊗ 1`.
    pub a: nd::Array2<C64>,
    /// Cavity creation operator `a† ⊗ 1`.
    pub ad: nd::Array2<C64>,
    /// Cavity photon number `a†a ⊗ 1`.
    pub n: nd::Array2<C64>,
    /// `1 ⊗ σ₋`
    pub sm: nd::Array2<C64>,
    /// `1 ⊗ σ₊`
    pub sp: nd::Array2<C64>,
    /// `1 ⊗ σ_x`
    pub sx: nd::Array2<C64>,
    /// `1 ⊗ σ_y`
    pub sy: nd::Array2<C64>,
    /// `1 ⊗ σ_z`
    pub sz: nd::Array2<C64>,
    /// Joint identity.
    pub eye: nd::Array2<C64>,
}

impl JointOps {
    /// Build all elementary operators for the given dimensions.
    pub fn new(dims: Dims) -> Result<Self> {
        let nc = dims.cavity();
        let a = embed(dims, Subsystem::Cavity, &destroy(nc)?)?;
        let ad = dagger(&a);
        let n = embed(dims, Subsystem::Cavity, &number(nc)?)?;
        let sm = embed(dims, Subsystem::Atom, &sigma_minus())?;
        let sp = dagger(&sm);
        let sx = embed(dims, Subsystem::Atom, &sigma_x())?;
        let sy = embed(dims, Subsystem::Atom, &sigma_y())?;
        let sz = embed(dims, Subsystem::Atom, &sigma_z())?;
        let eye = nd::Array2::eye(dims.joint());
        Ok(Self { dims, a, ad, n, sm, sp, sx, sy, sz, eye })
    }
}
