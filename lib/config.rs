//! Simulation settings, loadable from TOML.
//!
//! Every field has a default, so a file only needs to name what it changes:
//! ```toml
//! cavity_dim = 10
//! g = 0.5
//! kappa = 0.1
//!
//! [initial_state]
//! kind = "coherent"
//! alpha_re = 1.0
//! atom = "ground"
//!
//! [time]
//! stop = 50.0
//! num = 500
//! ```

use std::{ f64::consts::TAU, fs, path::Path };
use ndarray as nd;
use num_complex::Complex64 as C64;
use serde::{ Deserialize, Serialize };
use tracing::debug;
use crate::{
    dynamics::{
        hamiltonians::{ CouplingKind, HBuilderJC, JCParams },
        lindbladians::{ DecayRates, LOperatorJC },
    },
    error::{ Error, Result },
    hilbert::{
        AtomLevel,
        atom_density,
        coherent_vector,
        fock_density,
        outer_prod,
        product_density,
        thermal_density,
    },
    rabi::IntegratorConfig,
    spectrum::{ CorrelationStart, Correlator, SpectrumSetup },
    time::TimeGrid,
};

fn excited() -> AtomLevel { AtomLevel::Excited }

/// Initial joint state, always a product of a cavity state and an atomic
/// level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum InitialState {
    /// `|0⟩ ⊗ |e⟩`.
    AtomExcitedVacuum,
    /// `|0⟩ ⊗ |g⟩`.
    AtomGroundVacuum,
    /// `|n⟩ ⊗ |atom⟩`.
    Fock {
        n: usize,
        #[serde(default = "excited")]
        atom: AtomLevel,
    },
    /// `|α⟩ ⊗ |atom⟩`.
    Coherent {
        #[serde(default)]
        alpha_re: f64,
        #[serde(default)]
        alpha_im: f64,
        #[serde(default = "excited")]
        atom: AtomLevel,
    },
    /// Thermal cavity state with mean photon number `n_th`, times `|atom⟩`.
    Thermal {
        n_th: f64,
        #[serde(default = "excited")]
        atom: AtomLevel,
    },
}

impl Default for InitialState {
    fn default() -> Self { Self::AtomExcitedVacuum }
}

impl InitialState {
    /// Build the joint density matrix for a cavity truncated at `cavity_dim`.
    pub fn density(&self, cavity_dim: usize) -> Result<nd::Array2<C64>> {
        let (rho_c, atom): (nd::Array2<C64>, AtomLevel)
            = match self {
                Self::AtomExcitedVacuum
                    => (fock_density(cavity_dim, 0)?, AtomLevel::Excited),
                Self::AtomGroundVacuum
                    => (fock_density(cavity_dim, 0)?, AtomLevel::Ground),
                Self::Fock { n, atom }
                    => (fock_density(cavity_dim, *n)?, *atom),
                Self::Coherent { alpha_re, alpha_im, atom } => {
                    let psi = coherent_vector(cavity_dim, C64::new(*alpha_re, *alpha_im))?;
                    (outer_prod(&psi, &psi), *atom)
                },
                Self::Thermal { n_th, atom }
                    => (thermal_density(cavity_dim, *n_th)?, *atom),
            };
        Ok(product_density(&rho_c, &atom_density(atom)))
    }
}

/// Uniform time grid settings.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeSpec {
    pub start: f64,
    pub stop: f64,
    pub num: usize,
}

impl Default for TimeSpec {
    fn default() -> Self { Self { start: 0.0, stop: 25.0, num: 100 } }
}

impl TimeSpec {
    /// Build the grid.
    pub fn grid(&self) -> Result<TimeGrid> {
        TimeGrid::linspace(self.start, self.stop, self.num)
    }
}

/// Where a correlation function starts.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StartKind {
    /// The steady state of the dissipative dynamics.
    #[default]
    SteadyState,
    /// The configured initial state.
    Initial,
}

/// Settings for correlation functions and spectra.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpectrumSpec {
    pub correlator: Correlator,
    pub start: StartKind,
    /// Mean thermal photon number of the cavity's bath for spectrum runs,
    /// used in place of the top-level `n_th`. Without a bath the undriven
    /// steady state is `|0, g⟩`, whose emission spectrum vanishes.
    pub n_th: f64,
    /// Delay grid; must start at zero.
    pub tau: TimeSpec,
}

impl Default for SpectrumSpec {
    fn default() -> Self {
        Self {
            correlator: Correlator::Cavity,
            start: StartKind::SteadyState,
            n_th: 0.25,
            tau: TimeSpec { start: 0.0, stop: 100.0, num: 5000 },
        }
    }
}

/// Settings for Wigner function snapshots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhaseSpaceSpec {
    /// Times at which to take snapshots.
    pub times: Vec<f64>,
    /// Quadrature axes span `[-extent, extent]`.
    pub extent: f64,
    /// Number of points along each axis.
    pub num: usize,
}

impl Default for PhaseSpaceSpec {
    fn default() -> Self {
        Self {
            times: vec![0.0, 5.0, 10.0, 15.0, 20.0, 25.0],
            extent: 5.0,
            num: 200,
        }
    }
}

impl PhaseSpaceSpec {
    /// Build the (shared) quadrature axis.
    pub fn axis(&self) -> nd::Array1<f64> {
        nd::Array1::linspace(-self.extent, self.extent, self.num)
    }
}

/// Complete description of a simulation run.
///
/// All frequencies and rates are angular, with ħ = 1.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Number of cavity Fock states kept.
    pub cavity_dim: usize,
    pub omega_c: f64,
    pub omega_a: f64,
    /// Coupling strength for a single run.
    pub g: f64,
    /// Coupling strengths for a spectrum sweep.
    pub g_sweep: Vec<f64>,
    pub kappa: f64,
    pub gamma: f64,
    pub gamma_phi: f64,
    /// Mean thermal photon number of the cavity's bath.
    pub n_th: f64,
    /// Added to the cavity frequency.
    pub detuning: f64,
    /// Shift both frequencies by `0.1 g²`.
    pub nonlinear: bool,
    pub coupling: CouplingKind,
    pub initial_state: InitialState,
    pub time: TimeSpec,
    pub integrator: IntegratorConfig,
    pub spectrum: SpectrumSpec,
    pub phase_space: PhaseSpaceSpec,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            cavity_dim: 15,
            omega_c: TAU,
            omega_a: TAU,
            g: 0.05 * TAU,
            g_sweep: nd::Array1::linspace(0.01, 1.0, 6).iter().map(|g| g * TAU).collect(),
            kappa: 0.7,
            gamma: 0.2,
            gamma_phi: 0.001,
            n_th: 0.0,
            detuning: 0.0,
            nonlinear: false,
            coupling: CouplingKind::RotatingWave,
            initial_state: InitialState::AtomExcitedVacuum,
            time: TimeSpec::default(),
            integrator: IntegratorConfig::default(),
            spectrum: SpectrumSpec::default(),
            phase_space: PhaseSpaceSpec::default(),
        }
    }
}

impl SimConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        debug!(path = %path.display(), "loading simulation config");
        Self::from_toml_str(&text)
    }

    /// Serialize to a TOML document.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self)
            .map_err(|e| Error::config(format!("could not serialize config: {}", e)))
    }

    /// Fail with [`Error::Configuration`] if any setting is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.cavity_dim == 0 {
            return Err(Error::config("cavity_dim must be at least 1"));
        }
        self.params().validate()?;
        self.rates().validate()?;
        self.spectrum_rates().validate()?;
        if self.g_sweep.iter().any(|g| !g.is_finite()) {
            return Err(Error::config("g_sweep values must be finite"));
        }
        self.integrator.validate()?;
        self.time.grid()?;
        let tau = self.spectrum.tau.grid()?;
        if tau.start() != 0.0 {
            return Err(Error::config("spectrum delays must start at 0"));
        }
        if self.phase_space.num == 0
            || !(self.phase_space.extent.is_finite() && self.phase_space.extent > 0.0)
        {
            return Err(Error::config(
                "phase-space axis needs a positive extent and at least one point"));
        }
        self.initial_density()?;
        Ok(())
    }

    /// Hamiltonian parameters.
    pub fn params(&self) -> JCParams {
        JCParams::new(self.omega_c, self.omega_a, self.g)
            .with_detuning(self.detuning)
            .with_nonlinear(self.nonlinear)
    }

    /// Dissipation rates.
    pub fn rates(&self) -> DecayRates {
        DecayRates::new(self.kappa, self.gamma, self.gamma_phi)
            .with_thermal(self.n_th)
    }

    /// Dissipation rates for spectrum runs, with the spectrum's own bath.
    pub fn spectrum_rates(&self) -> DecayRates {
        self.rates().with_thermal(self.spectrum.n_th)
    }

    /// Build the Hamiltonian.
    pub fn hbuilder(&self) -> Result<HBuilderJC> {
        HBuilderJC::with_coupling(self.params(), self.cavity_dim, &self.coupling)
    }

    /// Build the dissipators.
    pub fn loperator(&self) -> Result<LOperatorJC> {
        LOperatorJC::new(self.cavity_dim, self.rates())
    }

    /// Build the initial joint density matrix.
    pub fn initial_density(&self) -> Result<nd::Array2<C64>> {
        self.initial_state.density(self.cavity_dim)
    }

    /// Build the time grid.
    pub fn time_grid(&self) -> Result<TimeGrid> { self.time.grid() }

    /// Integrator settings.
    pub fn integrator(&self) -> IntegratorConfig { self.integrator }

    /// Gather what [`sweep_coupling`][crate::spectrum::sweep_coupling] needs.
    pub fn spectrum_setup(&self) -> Result<SpectrumSetup> {
        let start
            = match self.spectrum.start {
                StartKind::SteadyState => CorrelationStart::SteadyState,
                StartKind::Initial => CorrelationStart::State(self.initial_density()?),
            };
        Ok(SpectrumSetup {
            params: self.params(),
            cavity_dim: self.cavity_dim,
            rates: self.spectrum_rates(),
            coupling: self.coupling,
            correlator: self.spectrum.correlator,
            start,
            tau: self.spectrum.tau.grid()?,
            integrator: self.integrator,
        })
    }
}
