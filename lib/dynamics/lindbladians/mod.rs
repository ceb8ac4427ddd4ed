//! Lindbladian operators for the atom-cavity system.

use std::fmt;
use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{ hilbert::dagger, rabi::anti_commutator };

pub mod cavity;
pub use cavity::{ DecayRates, LOperatorJC };

/// Basic requirements for any implementation of a Lindbladian operator.
pub trait LOp {
    /// The collapse operators, already scaled by the square roots of their
    /// rates.
    fn collapse_ops(&self) -> &[CollapseOp];

    /// Apply the dissipator
    /// ```text
    /// D(ρ) = Σ_j (L_j ρ L_j† - {L_j† L_j, ρ} / 2)
    /// ```
    /// to a matrix.
    ///
    /// `rho` need not be a density matrix; the map is linear and is also used
    /// to propagate the operators appearing in two-time correlation functions.
    fn op<S>(&self, rho: &nd::ArrayBase<S, nd::Ix2>) -> nd::Array2<C64>
    where S: nd::Data<Elem = C64>
    {
        let mut L: nd::Array2<C64> = nd::Array2::zeros(rho.raw_dim());
        for c in self.collapse_ops().iter() {
            L += &c.op.dot(rho).dot(&c.op_dag);
            L -= &(anti_commutator(&c.op_dag_op, rho) / C64::from(2.0));
        }
        L
    }
}

/// Names the physical process behind a collapse operator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Photon leakage out of the cavity, `a`.
    CavityDecay,
    /// Incoherent photon injection from a thermal bath, `a†`.
    CavityPump,
    /// Spontaneous emission out of the cavity mode, `σ₋`.
    AtomicDecay,
    /// Pure dephasing of the atom, `σ_z`.
    Dephasing,
}

/// A single collapse operator `L = sqrt(rate) X` on the joint space.
///
/// `L†` and `L† L` are cached at construction.
#[derive(Clone, PartialEq)]
pub struct CollapseOp {
    pub channel: Channel,
    pub rate: f64,
    pub op: nd::Array2<C64>,
    pub op_dag: nd::Array2<C64>,
    pub op_dag_op: nd::Array2<C64>,
}

impl fmt::Debug for CollapseOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,
            "CollapseOp {{ channel: {:?}, rate: {:?}, dim: {} }}",
            self.channel, self.rate, self.op.nrows(),
        )
    }
}

impl CollapseOp {
    /// Scale a bare operator `X` by `sqrt(rate)`.
    pub fn new(channel: Channel, rate: f64, bare: &nd::Array2<C64>) -> Self {
        let op = bare * C64::from(rate.sqrt());
        let op_dag = dagger(&op);
        let op_dag_op = op_dag.dot(&op);
        Self { channel, rate, op, op_dag, op_dag_op }
    }
}
