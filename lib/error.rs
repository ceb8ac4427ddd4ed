//! Error taxonomy shared by every stage of a simulation run.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while building or running a simulation.
///
/// None of these are retried by the caller-facing API except
/// [`Error::NumericalInstability`], which the integrator attempts once more
/// with a reduced step size before surfacing it.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid dimensions, rates, grids, or integrator settings.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A density matrix failed a Hermiticity, trace, or positivity check.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A generator failed a physical requirement, e.g. a non-Hermitian
    /// Hamiltonian.
    #[error("physics invariant violated: {0}")]
    PhysicsInvariant(String),

    /// Propagation drifted beyond recovery.
    #[error("numerical instability after t = {last_stable_time}: {reason}")]
    NumericalInstability {
        /// Last time-grid point reached with a valid state.
        last_stable_time: f64,
        reason: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("linear algebra error: {0}")]
    Linalg(#[from] ndarray_linalg::error::LinalgError),
}

impl Error {
    pub(crate) fn config<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    pub(crate) fn state<S: Into<String>>(msg: S) -> Self {
        Self::InvalidState(msg.into())
    }
}
