//! Evolution functions for the Lindblad equation.

use ndarray::s;
use crate::{
    dynamics::HBuild,
    hilbert::{ Dims, is_hermitian },
};
use super::*;

/// Population of the top cavity Fock level above which a warning about
/// truncation is emitted.
pub const TRUNCATION_WARN: f64 = 1e-3;

/// Relative tolerance on the Hermiticity of a caller-supplied Hamiltonian.
const HERMITIAN_RTOL: f64 = 1e-10;

/// Density matrices sampled on a time grid.
///
/// States are stored as a 3D array with time along the last axis.
#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory {
    dims: Dims,
    time: TimeGrid,
    rho: nd::Array3<C64>,
}

impl Trajectory {
    /// Return the joint-space dimensions.
    pub fn dims(&self) -> Dims { self.dims }

    /// Return the time grid.
    pub fn time(&self) -> &TimeGrid { &self.time }

    /// Return all states, with time along the last axis.
    pub fn states(&self) -> &nd::Array3<C64> { &self.rho }

    /// Number of time points.
    pub fn len(&self) -> usize { self.time.len() }

    /// Always `false`; a trajectory holds at least the initial state.
    pub fn is_empty(&self) -> bool { false }

    /// Return the state at the `k`-th grid point.
    pub fn state(&self, k: usize) -> Option<nd::ArrayView2<C64>> {
        (k < self.len()).then(|| self.rho.slice(s![.., .., k]))
    }

    /// Return the grid time closest to `t` and the state there.
    pub fn state_at(&self, t: f64) -> (f64, nd::ArrayView2<C64>) {
        let k = self.time.closest_index(t);
        (self.time[k], self.rho.slice(s![.., .., k]))
    }

    /// Return the last state.
    pub fn final_state(&self) -> nd::ArrayView2<C64> {
        self.rho.slice(s![.., .., self.len() - 1])
    }

    /// Iterate over `(t, ρ(t))` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, nd::ArrayView2<'_, C64>)> + '_ {
        self.time.iter().copied().zip(self.rho.axis_iter(nd::Axis(2)))
    }

    /// Consume `self`, returning the time grid and the state array.
    pub fn into_parts(self) -> (TimeGrid, nd::Array3<C64>) { (self.time, self.rho) }
}

/// Total population of the highest cavity Fock level.
pub fn top_fock_population<S>(rho: &nd::ArrayBase<S, nd::Ix2>, dims: Dims) -> f64
where S: nd::Data<Elem = C64>
{
    let n = dims.cavity() - 1;
    (0..dims.atom())
        .map(|s| { let k = n * dims.atom() + s; rho[[k, k]].re })
        .sum()
}

fn check_generators<L>(H: &nd::Array2<C64>, L: &L, n: usize) -> Result<()>
where L: LOp
{
    if H.shape() != [n, n] {
        return Err(Error::config(format!(
            "Hamiltonian has shape {:?}; expected [{}, {}]", H.shape(), n, n)));
    }
    let scale: f64 = H.iter().map(|x| x.norm()).fold(1.0, f64::max);
    if !is_hermitian(H, HERMITIAN_RTOL * scale) {
        return Err(Error::PhysicsInvariant("Hamiltonian is not Hermitian".into()));
    }
    if let Some(c) = L.collapse_ops().iter().find(|c| c.op.shape() != [n, n]) {
        return Err(Error::config(format!(
            "collapse operator {:?} has shape {:?}; expected [{}, {}]",
            c.channel, c.op.shape(), n, n,
        )));
    }
    Ok(())
}

/// Numerically integrate the Lindblad equation for a time-independent
/// Hamiltonian, applying a function to the state at each grid point instead of
/// storing it.
///
/// Fails if `rho0` is not a valid density matrix, `H` is not Hermitian, or the
/// integration blows up even after a retry with a smaller initial step.
pub fn evolve_reduced<L, X, T>(
    rho0: &nd::Array2<C64>,
    H: &nd::Array2<C64>,
    L: &L,
    t: &TimeGrid,
    config: &IntegratorConfig,
    x: X,
) -> Result<Vec<T>>
where
    L: LOp,
    X: FnMut(&nd::Array2<C64>) -> T,
{
    let n = rho0.nrows();
    check_density(rho0, n, config.state_tolerance)?;
    check_generators(H, L, n)?;
    do_evolve_reduced(
        rho0, |rho| lindblad_rhs(H, L, rho), t, config, Drift::Density, x)
}

/// Numerically integrate the Lindblad equation for a time-independent
/// Hamiltonian.
pub fn evolve<L>(
    rho0: &nd::Array2<C64>,
    H: &nd::Array2<C64>,
    L: &L,
    dims: Dims,
    t: &TimeGrid,
    config: &IntegratorConfig,
) -> Result<Trajectory>
where L: LOp
{
    let n = dims.joint();
    if rho0.shape() != [n, n] {
        return Err(Error::state(format!(
            "initial state has shape {:?}; expected [{}, {}]",
            rho0.shape(), n, n,
        )));
    }
    let mut top_max: f64 = 0.0;
    let states: Vec<nd::Array2<C64>>
        = evolve_reduced(rho0, H, L, t, config, |rho| {
            top_max = top_max.max(top_fock_population(rho, dims));
            rho.clone()
        })?;
    if top_max > TRUNCATION_WARN {
        warn!(
            population = top_max,
            cavity_dim = dims.cavity(),
            "highest cavity Fock level is significantly populated; consider a \
            larger truncation",
        );
    }
    let mut rho: nd::Array3<C64> = nd::Array3::zeros((n, n, t.len()));
    for (k, state) in states.iter().enumerate() {
        rho.slice_mut(s![.., .., k]).assign(state);
    }
    Ok(Trajectory { dims, time: t.clone(), rho })
}

/// Numerically integrate the Lindblad equation using a Hamiltonian and
/// dissipator built from the given builders.
pub fn evolve_with<H, L>(
    rho0: &nd::Array2<C64>,
    hbuilder: &H,
    loperator: &L,
    t: &TimeGrid,
    config: &IntegratorConfig,
) -> Result<Trajectory>
where
    H: HBuild,
    L: LOp,
{
    let H = hbuilder.build_static();
    evolve(rho0, &H, loperator, hbuilder.dims(), t, config)
}

/// Propagate an arbitrary operator `X` under the Lindblad generator,
/// `X(t) = exp(𝓛 t) X`, applying `x` at each grid point.
///
/// No re-Hermitization or renormalization is performed, since `X` is
/// generally neither Hermitian nor of unit trace. This is the propagation
/// step of the quantum regression theorem.
pub fn evolve_operator<L, X, T>(
    X0: &nd::Array2<C64>,
    H: &nd::Array2<C64>,
    L: &L,
    t: &TimeGrid,
    config: &IntegratorConfig,
    x: X,
) -> Result<Vec<T>>
where
    L: LOp,
    X: FnMut(&nd::Array2<C64>) -> T,
{
    check_generators(H, L, X0.nrows())?;
    do_evolve_reduced(
        X0, |rho| lindblad_rhs(H, L, rho), t, config, Drift::Raw, x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dynamics::{
            hamiltonians::{ HBuilderJC, JCParams },
            lindbladians::{ DecayRates, LOperatorJC },
        },
        hilbert::{
            AtomLevel,
            atom_density,
            fock_density,
            hermitian_defect,
            product_density,
        },
    };

    fn excited_vacuum(cavity_dim: usize) -> nd::Array2<C64> {
        product_density(
            &fock_density(cavity_dim, 0).unwrap(),
            &atom_density(AtomLevel::Excited),
        )
    }

    #[test]
    fn trace_and_positivity_preserved() {
        let hbuilder = HBuilderJC::new(JCParams::new(1.0, 1.0, 0.4), 4).unwrap();
        let lop = LOperatorJC::from_hbuilder(&hbuilder, DecayRates::new(0.2, 0.1, 0.05))
            .unwrap();
        let t = TimeGrid::linspace(0.0, 10.0, 51).unwrap();
        let traj = evolve_with(
            &excited_vacuum(4), &hbuilder, &lop, &t, &IntegratorConfig::default(),
        ).unwrap();
        assert_eq!(traj.len(), 51);
        assert_eq!(traj.states().shape(), &[8, 8, 51]);
        for (_, rho) in traj.iter() {
            assert!((trace(&rho) - 1.0).norm() < 1e-9);
            assert!(min_eigenvalue(&rho).unwrap() > -1e-6);
        }
    }

    #[test]
    fn sparse_correction_keeps_invariants() {
        let hbuilder = HBuilderJC::new(JCParams::new(1.0, 1.0, 0.4), 4).unwrap();
        let lop = LOperatorJC::from_hbuilder(
            &hbuilder, DecayRates::new(0.2, 0.1, 0.05).with_thermal(0.1),
        ).unwrap();
        let t = TimeGrid::linspace(0.0, 10.0, 51).unwrap();
        let every_step = evolve_with(
            &excited_vacuum(4), &hbuilder, &lop, &t, &IntegratorConfig::default(),
        ).unwrap();
        let every_fifth = evolve_with(
            &excited_vacuum(4), &hbuilder, &lop, &t,
            &IntegratorConfig::default().with_correct_every(5),
        ).unwrap();
        for ((_, rho), (_, rho_ref)) in every_fifth.iter().zip(every_step.iter()) {
            assert!((trace(&rho) - 1.0).norm() < 1e-9);
            assert!(hermitian_defect(&rho) < 1e-9);
            assert!(min_eigenvalue(&rho).unwrap() > -1e-6);
            let diff = rho.iter().zip(rho_ref.iter())
                .map(|(a, b)| (a - b).norm())
                .fold(0.0, f64::max);
            assert!(diff < 1e-5);
        }
    }

    #[test]
    fn rejects_invalid_inputs() {
        let hbuilder = HBuilderJC::new(JCParams::new(1.0, 1.0, 0.4), 3).unwrap();
        let lop = LOperatorJC::new(3, DecayRates::closed()).unwrap();
        let t = TimeGrid::linspace(0.0, 1.0, 3).unwrap();
        let config = IntegratorConfig::default();

        let bad = excited_vacuum(3) * C64::from(2.0);
        assert!(matches!(
            evolve_with(&bad, &hbuilder, &lop, &t, &config),
            Err(Error::InvalidState(_)),
        ));

        let mut H = hbuilder.gen_static();
        H[[0, 1]] += C64::from(1.0);
        assert!(matches!(
            evolve(&excited_vacuum(3), &H, &lop, hbuilder.dims(), &t, &config),
            Err(Error::PhysicsInvariant(_)),
        ));
    }

    #[test]
    fn state_lookup() {
        let hbuilder = HBuilderJC::new(JCParams::new(1.0, 1.0, 0.4), 3).unwrap();
        let lop = LOperatorJC::new(3, DecayRates::closed()).unwrap();
        let t = TimeGrid::linspace(0.0, 2.0, 5).unwrap();
        let traj = evolve_with(
            &excited_vacuum(3), &hbuilder, &lop, &t, &IntegratorConfig::default(),
        ).unwrap();
        let (tk, rho) = traj.state_at(1.1);
        assert!((tk - 1.0).abs() < 1e-12);
        assert_eq!(rho, traj.state(2).unwrap());
        assert!(traj.state(5).is_none());
        assert_eq!(traj.final_state(), traj.state(4).unwrap());
    }
}
