//! A single two-level atom coupled to one cavity mode.
//!
//! See also [`lindbladians::cavity`][super::super::lindbladians::cavity].

use ndarray::{ self as nd, s };
use ndarray_linalg::{ EighInto, UPLO };
use num_complex::Complex64 as C64;
use tracing::debug;
use crate::{
    dynamics::hamiltonians::{ CouplingHook, HBuild, RotatingWave },
    error::{ Error, Result },
    hilbert::{ Dims, JointOps, hermitian_defect },
};

/// Dispersive shift coefficient applied to both frequencies when
/// [`JCParams::nonlinear`] is set: `ω → ω + 0.1 g²`.
pub const NONLINEAR_SHIFT: f64 = 0.1;

/// Relative tolerance for the Hermiticity check on interaction terms.
const HERMITIAN_RTOL: f64 = 1e-10;

/// Physical parameters of the atom-cavity system, all in units of angular
/// frequency with ħ = 1.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct JCParams {
    /// Bare cavity frequency ω_c.
    pub omega_c: f64,
    /// Bare atomic transition frequency ω_a.
    pub omega_a: f64,
    /// Atom-cavity coupling strength g.
    pub g: f64,
    /// Shift added to the cavity frequency.
    pub detuning: f64,
    /// Apply a `0.1 g²` shift to both frequencies.
    pub nonlinear: bool,
}

impl JCParams {
    /// Create a new `JCParams` with no detuning and no nonlinear shift.
    pub fn new(omega_c: f64, omega_a: f64, g: f64) -> Self {
        Self { omega_c, omega_a, g, detuning: 0.0, nonlinear: false }
    }

    /// Set the cavity detuning.
    pub fn with_detuning(mut self, detuning: f64) -> Self {
        self.detuning = detuning;
        self
    }

    /// Turn the nonlinear frequency shift on or off.
    pub fn with_nonlinear(mut self, nonlinear: bool) -> Self {
        self.nonlinear = nonlinear;
        self
    }

    /// Return a copy with a different coupling strength.
    pub fn with_g(mut self, g: f64) -> Self {
        self.g = g;
        self
    }

    fn shift(&self) -> f64 {
        if self.nonlinear { NONLINEAR_SHIFT * self.g * self.g } else { 0.0 }
    }

    /// Cavity frequency entering the Hamiltonian.
    pub fn effective_omega_c(&self) -> f64 {
        self.omega_c + self.detuning + self.shift()
    }

    /// Atomic frequency entering the Hamiltonian.
    pub fn effective_omega_a(&self) -> f64 { self.omega_a + self.shift() }

    /// Fail if any parameter is not finite.
    pub fn validate(&self) -> Result<()> {
        let all_finite
            = [self.omega_c, self.omega_a, self.g, self.detuning].iter()
            .all(|x| x.is_finite());
        if !all_finite {
            return Err(Error::config(format!(
                "Hamiltonian parameters must be finite: {:?}", self)));
        }
        Ok(())
    }
}

/// Hamiltonian builder for the Jaynes-Cummings system
/// ```text
/// H = ω_c a†a + (ω_a / 2) σ_z + V
/// ```
/// where `V` is the interaction term, `g (a† σ₋ + a σ₊)` by default.
///
/// The interaction term is computed and checked for Hermiticity once, when the
/// builder is created, so a built `HBuilderJC` always generates a Hermitian
/// matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct HBuilderJC {
    params: JCParams,
    ops: JointOps,
    coupling: nd::Array2<C64>,
}

impl HBuilderJC {
    /// Create a new `HBuilderJC` with the standard Jaynes-Cummings coupling.
    pub fn new(params: JCParams, cavity_dim: usize) -> Result<Self> {
        Self::with_coupling(params, cavity_dim, &RotatingWave)
    }

    /// Create a new `HBuilderJC` using a provided interaction term.
    ///
    /// Fails with [`Error::PhysicsInvariant`] if the interaction has the wrong
    /// shape or is not Hermitian.
    pub fn with_coupling<C>(params: JCParams, cavity_dim: usize, hook: &C)
        -> Result<Self>
    where C: CouplingHook + ?Sized
    {
        params.validate()?;
        let dims = Dims::new(cavity_dim)?;
        let ops = JointOps::new(dims)?;
        let coupling = hook.coupling(&params, &ops);
        let n = dims.joint();
        if coupling.shape() != [n, n] {
            return Err(Error::PhysicsInvariant(format!(
                "interaction term has shape {:?}; expected [{}, {}]",
                coupling.shape(), n, n,
            )));
        }
        if coupling.iter().any(|x| !x.re.is_finite() || !x.im.is_finite()) {
            return Err(Error::PhysicsInvariant(
                "interaction term has non-finite entries".into()));
        }
        let scale: f64
            = coupling.iter().map(|x| x.norm()).fold(1.0, f64::max);
        let defect = hermitian_defect(&coupling);
        if defect > HERMITIAN_RTOL * scale {
            return Err(Error::PhysicsInvariant(format!(
                "interaction term is not Hermitian (max |V - V†| = {:.3e})",
                defect,
            )));
        }
        // remove rounding-level anti-Hermitian residue
        let coupling = (&coupling + &coupling.t().mapv(|x| x.conj())) / C64::from(2.0);
        debug!(cavity_dim, joint_dim = n, ?params, "built Jaynes-Cummings Hamiltonian");
        Ok(Self { params, ops, coupling })
    }

    /// Return the physical parameters.
    pub fn params(&self) -> &JCParams { &self.params }

    /// Return the joint-space elementary operators.
    pub fn ops(&self) -> &JointOps { &self.ops }

    /// Return the joint-space dimensions.
    pub fn dims(&self) -> Dims { self.ops.dims }

    /// Return the validated interaction term.
    pub fn coupling(&self) -> &nd::Array2<C64> { &self.coupling }

    /// Compute the time-independent Hamiltonian.
    pub fn gen_static(&self) -> nd::Array2<C64> {
        let wc = self.params.effective_omega_c();
        let wa = self.params.effective_omega_a();
        &self.ops.n * C64::from(wc)
            + &self.ops.sz * C64::from(wa / 2.0)
            + &self.coupling
    }

    /// Diagonalize the Hamiltonian, returning dressed-state energies in
    /// ascending order and eigenvectors as columns.
    pub fn diagonalize(&self) -> Result<(nd::Array1<f64>, nd::Array2<C64>)> {
        Ok(self.gen_static().eigh_into(UPLO::Lower)?)
    }

    /// Return the lowest dressed-state energy and its eigenvector.
    pub fn ground_state(&self) -> Result<(f64, nd::Array1<C64>)> {
        let (E, V) = self.diagonalize()?;
        Ok((E[0], V.slice(s![.., 0]).to_owned()))
    }
}

impl HBuild for HBuilderJC {
    fn dims(&self) -> Dims { self.dims() }

    fn build_static(&self) -> nd::Array2<C64> { self.gen_static() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dynamics::hamiltonians::FullRabi,
        hilbert::{ AtomLevel, is_hermitian },
    };

    #[test]
    fn hermitian_and_diagonal_energies() {
        let params = JCParams::new(1.0, 1.0, 0.1);
        let hbuilder = HBuilderJC::new(params, 4).unwrap();
        let H = hbuilder.gen_static();
        assert!(is_hermitian(&H, 0.0));
        let dims = hbuilder.dims();
        let k0g = dims.index(0, AtomLevel::Ground);
        let k2e = dims.index(2, AtomLevel::Excited);
        assert!((H[[k0g, k0g]].re + 0.5).abs() < 1e-14);
        assert!((H[[k2e, k2e]].re - 2.5).abs() < 1e-14);
        // <0, e| H |1, g> = g
        let k0e = dims.index(0, AtomLevel::Excited);
        let k1g = dims.index(1, AtomLevel::Ground);
        assert!((H[[k1g, k0e]].re - 0.1).abs() < 1e-14);
    }

    #[test]
    fn resonant_dressed_states_split_by_2g() {
        let g = 0.3;
        let hbuilder = HBuilderJC::new(JCParams::new(2.0, 2.0, g), 5).unwrap();
        let (E, _) = hbuilder.diagonalize().unwrap();
        // single-excitation manifold sits at ω/2 ± g
        assert!(E.iter().any(|e| (e - (1.0 + g)).abs() < 1e-10));
        assert!(E.iter().any(|e| (e - (1.0 - g)).abs() < 1e-10));
        let (e0, _) = hbuilder.ground_state().unwrap();
        assert!((e0 + 1.0).abs() < 1e-10);
    }

    #[test]
    fn detuning_and_nonlinear_shift() {
        let params = JCParams::new(1.0, 1.0, 2.0)
            .with_detuning(0.5)
            .with_nonlinear(true);
        assert!((params.effective_omega_c() - 1.9).abs() < 1e-12);
        assert!((params.effective_omega_a() - 1.4).abs() < 1e-12);
    }

    #[test]
    fn custom_couplings() {
        let params = JCParams::new(1.0, 1.0, 0.2);
        let rabi = HBuilderJC::with_coupling(params, 4, &FullRabi).unwrap();
        assert!(is_hermitian(&rabi.gen_static(), 1e-14));

        let bad = |p: &JCParams, ops: &JointOps| ops.a.dot(&ops.sp) * C64::from(p.g);
        let res = HBuilderJC::with_coupling(params, 4, &bad);
        assert!(matches!(res, Err(Error::PhysicsInvariant(_))));

        let wrong_shape = |_: &JCParams, _: &JointOps| nd::Array2::<C64>::zeros((3, 3));
        let res = HBuilderJC::with_coupling(params, 4, &wrong_shape);
        assert!(matches!(res, Err(Error::PhysicsInvariant(_))));

        assert!(matches!(
            HBuilderJC::new(params, 0),
            Err(Error::Configuration(_)),
        ));
    }
}
