//! Hamiltonian builders for a single two-level atom coupled to one cavity
//! mode.

use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::hilbert::{ Dims, JointOps };

pub mod jaynes_cummings;
pub use jaynes_cummings::{ HBuilderJC, JCParams };

/// Basic requirements for any Hamiltonian builder.
pub trait HBuild {
    /// Joint-space dimensions of the generated Hamiltonian.
    fn dims(&self) -> Dims;

    /// Build the (time-independent) Hamiltonian matrix.
    fn build_static(&self) -> nd::Array2<C64>;
}

/// Supplies the atom-cavity interaction term of a Hamiltonian.
///
/// Implementors must return a Hermitian operator on the joint space described
/// by `ops.dims`; [`HBuilderJC::with_coupling`] rejects anything else when the
/// builder is created.
pub trait CouplingHook {
    /// Produce the interaction operator for the given parameters.
    fn coupling(&self, params: &JCParams, ops: &JointOps) -> nd::Array2<C64>;
}

impl<F> CouplingHook for F
where F: Fn(&JCParams, &JointOps) -> nd::Array2<C64>
{
    fn coupling(&self, params: &JCParams, ops: &JointOps) -> nd::Array2<C64> {
        self(params, ops)
    }
}

/// Jaynes-Cummings interaction `g (a† σ₋ + a σ₊)`, i.e. the rotating wave
/// approximation of the dipole coupling.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RotatingWave;

impl CouplingHook for RotatingWave {
    fn coupling(&self, params: &JCParams, ops: &JointOps) -> nd::Array2<C64> {
        (ops.ad.dot(&ops.sm) + ops.a.dot(&ops.sp)) * C64::from(params.g)
    }
}

/// Full dipole interaction `g (a + a†)(σ₊ + σ₋)`, keeping the
/// counter-rotating terms (quantum Rabi model).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FullRabi;

impl CouplingHook for FullRabi {
    fn coupling(&self, params: &JCParams, ops: &JointOps) -> nd::Array2<C64> {
        (&ops.a + &ops.ad).dot(&ops.sx) * C64::from(params.g)
    }
}

/// Names one of the built-in couplings; used by the configuration layer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CouplingKind {
    #[default]
    RotatingWave,
    Rabi,
}

impl CouplingHook for CouplingKind {
    fn coupling(&self, params: &JCParams, ops: &JointOps) -> nd::Array2<C64> {
        match self {
            Self::RotatingWave => RotatingWave.coupling(params, ops),
            Self::Rabi => FullRabi.coupling(params, ops),
        }
    }
}
