//! Dissipation channels of a single atom in a leaky cavity.
//!
//! See also [`hamiltonians::jaynes_cummings`][super::super::hamiltonians::jaynes_cummings].

use ndarray as nd;
use num_complex::Complex64 as C64;
use tracing::debug;
use crate::{
    dynamics::{
        hamiltonians::HBuilderJC,
        lindbladians::{ Channel, CollapseOp, LOp },
    },
    error::{ Error, Result },
    hilbert::{ Dims, JointOps },
};

/// Dissipation rates in units of angular frequency.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct DecayRates {
    /// Cavity field decay rate κ.
    pub kappa: f64,
    /// Atomic spontaneous decay rate γ.
    pub gamma: f64,
    /// Atomic dephasing rate γ_φ.
    pub gamma_phi: f64,
    /// Mean thermal photon number of the cavity's bath.
    pub n_th: f64,
}

impl DecayRates {
    /// Create a new `DecayRates` with a zero-temperature bath.
    pub fn new(kappa: f64, gamma: f64, gamma_phi: f64) -> Self {
        Self { kappa, gamma, gamma_phi, n_th: 0.0 }
    }

    /// No dissipation at all.
    pub fn closed() -> Self { Self::default() }

    /// Set the mean thermal photon number of the cavity's bath.
    pub fn with_thermal(mut self, n_th: f64) -> Self {
        self.n_th = n_th;
        self
    }

    /// Fail if any rate is negative or non-finite.
    pub fn validate(&self) -> Result<()> {
        let named
            = [
                ("kappa", self.kappa),
                ("gamma", self.gamma),
                ("gamma_phi", self.gamma_phi),
                ("n_th", self.n_th),
            ];
        for (name, value) in named {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::config(format!(
                    "{} must be finite and non-negative, got {}", name, value)));
            }
        }
        Ok(())
    }
}

/// Implements a Lindbladian operator for one two-level atom coupled to one
/// cavity mode.
///
/// The collapse operators are, in order,
/// - `sqrt(κ (1 + n_th)) a` (cavity decay)
/// - `sqrt(κ n_th) a†` (thermal pumping)
/// - `sqrt(γ) σ₋` (spontaneous emission)
/// - `sqrt(γ_φ) σ_z` (dephasing)
///
/// where channels with a rate of exactly zero are left out entirely.
#[derive(Clone, Debug, PartialEq)]
pub struct LOperatorJC {
    dims: Dims,
    rates: DecayRates,
    collapse: Vec<CollapseOp>,
}

impl LOperatorJC {
    /// Create a new `LOperatorJC` for a cavity truncated at `cavity_dim` Fock
    /// states.
    pub fn new(cavity_dim: usize, rates: DecayRates) -> Result<Self> {
        let dims = Dims::new(cavity_dim)?;
        let ops = JointOps::new(dims)?;
        Self::from_ops(&ops, rates)
    }

    /// Create a new `LOperatorJC` using data from a borrowed [`HBuilderJC`].
    pub fn from_hbuilder(hbuilder: &HBuilderJC, rates: DecayRates)
        -> Result<Self>
    {
        Self::from_ops(hbuilder.ops(), rates)
    }

    fn from_ops(ops: &JointOps, rates: DecayRates) -> Result<Self> {
        rates.validate()?;
        let channels: [(Channel, f64, &nd::Array2<C64>); 4]
            = [
                (Channel::CavityDecay, rates.kappa * (1.0 + rates.n_th), &ops.a),
                (Channel::CavityPump, rates.kappa * rates.n_th, &ops.ad),
                (Channel::AtomicDecay, rates.gamma, &ops.sm),
                (Channel::Dephasing, rates.gamma_phi, &ops.sz),
            ];
        let collapse: Vec<CollapseOp>
            = channels.into_iter()
            .filter(|(_, rate, _)| *rate > 0.0)
            .map(|(channel, rate, bare)| CollapseOp::new(channel, rate, bare))
            .collect();
        debug!(
            channels = ?collapse.iter().map(|c| c.channel).collect::<Vec<_>>(),
            "built collapse operators",
        );
        Ok(Self { dims: ops.dims, rates, collapse })
    }

    /// Return the joint-space dimensions.
    pub fn dims(&self) -> Dims { self.dims }

    /// Return the dissipation rates.
    pub fn rates(&self) -> &DecayRates { &self.rates }

    /// Return `true` if there are no dissipation channels.
    pub fn is_closed(&self) -> bool { self.collapse.is_empty() }

    /// Return the collapse operator for a particular channel, if present.
    pub fn channel(&self, channel: Channel) -> Option<&CollapseOp> {
        self.collapse.iter().find(|c| c.channel == channel)
    }
}

impl LOp for LOperatorJC {
    fn collapse_ops(&self) -> &[CollapseOp] { &self.collapse }
}
