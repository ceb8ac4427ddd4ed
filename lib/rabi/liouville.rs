//! Superoperator form of the Lindblad generator and the steady states it
//! implies.
//!
//! Matrices are vectorized row-major, `vec(ρ)[i n + j] = ρ[i, j]`, so that
//! `vec(A ρ B) = (A ⊗ Bᵀ) vec(ρ)`.

use ndarray::linalg::kron;
use ndarray_linalg::{ FactorizeInto, ReciprocalConditionNum, Solve };
use super::*;

/// Reciprocal condition numbers below this mark a steady state that is not
/// unique.
const RCOND_MIN: f64 = 1e-12;

fn not_unique<D: std::fmt::Display>(detail: D) -> Error {
    Error::config(format!("steady state is not unique ({})", detail))
}

/// Flatten a square matrix into a vector, row-major.
pub fn vectorize<S>(rho: &nd::ArrayBase<S, nd::Ix2>) -> nd::Array1<C64>
where S: nd::Data<Elem = C64>
{
    rho.iter().copied().collect()
}

/// Inverse of [`vectorize`].
pub fn unvectorize(v: &nd::Array1<C64>, n: usize) -> Result<nd::Array2<C64>> {
    if v.len() != n * n {
        return Err(Error::config(format!(
            "cannot reshape vector of length {} into a {}x{} matrix",
            v.len(), n, n,
        )));
    }
    Ok(nd::Array2::from_shape_fn((n, n), |(i, j)| v[i * n + j]))
}

/// Build the Liouvillian superoperator `𝓛` such that `vec(dρ/dt) = 𝓛
/// vec(ρ)`.
///
/// The result is `n² x n²` for an `n`-dimensional Hamiltonian, so this is
/// meant for small truncations only.
pub fn liouvillian<L>(H: &nd::Array2<C64>, L: &L) -> nd::Array2<C64>
where L: LOp
{
    let n = H.nrows();
    let eye: nd::Array2<C64> = nd::Array2::eye(n);
    let mut sup: nd::Array2<C64>
        = (kron(H, &eye) - kron(&eye, &H.t())) * (-C64::i());
    for c in L.collapse_ops().iter() {
        sup += &kron(&c.op, &c.op.mapv(|x| x.conj()));
        sup -= &(kron(&c.op_dag_op, &eye) / C64::from(2.0));
        sup -= &(kron(&eye, &c.op_dag_op.t()) / C64::from(2.0));
    }
    sup
}

/// Find the steady state of the Lindblad equation, `𝓛 ρ_ss = 0` with
/// `tr ρ_ss = 1`.
///
/// The trace condition replaces the first row of the linear system. Fails
/// with [`Error::Configuration`] when the steady state is not unique: for a
/// closed system, and whenever the constrained system is singular or too
/// ill-conditioned to trust (e.g. pure dephasing, or an uncoupled atom that
/// cannot decay).
pub fn steady_state<L>(H: &nd::Array2<C64>, L: &L) -> Result<nd::Array2<C64>>
where L: LOp
{
    if L.collapse_ops().is_empty() {
        return Err(Error::config(
            "steady state is not unique without any dissipation channels"));
    }
    let n = H.nrows();
    let mut sup = liouvillian(H, L);
    sup.row_mut(0).fill(C64::from(0.0));
    (0..n).for_each(|i| { sup[[0, i * n + i]] = C64::from(1.0); });
    let mut b: nd::Array1<C64> = nd::Array1::zeros(n * n);
    b[0] = C64::from(1.0);
    let lu = sup.factorize_into().map_err(not_unique)?;
    let rcond = lu.rcond().map_err(not_unique)?;
    if !(rcond >= RCOND_MIN) {
        return Err(not_unique(format!("reciprocal condition number {:.3e}", rcond)));
    }
    let x = lu.solve_into(b)?;
    let mut rho = unvectorize(&x, n)?;
    hermitize_normalize(&mut rho);
    debug!(dim = n, "solved for steady state");
    Ok(rho)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::{
        hamiltonians::{ HBuilderJC, JCParams },
        lindbladians::{ DecayRates, LOperatorJC },
    };

    #[test]
    fn superoperator_matches_matrix_form() {
        let hbuilder = HBuilderJC::new(JCParams::new(1.0, 0.8, 0.3), 3).unwrap();
        let lop = LOperatorJC::new(3, DecayRates::new(0.2, 0.1, 0.05).with_thermal(0.1))
            .unwrap();
        let H = hbuilder.gen_static();
        let n = H.nrows();
        let rho: nd::Array2<C64>
            = nd::Array2::from_shape_fn((n, n), |(i, j)| {
                C64::new((i * j) as f64 / 7.0, i as f64 - 2.0 * j as f64)
            });
        let direct = lindblad_rhs(&H, &lop, &rho);
        let sup = liouvillian(&H, &lop);
        let via_sup = unvectorize(&sup.dot(&vectorize(&rho)), n).unwrap();
        let diff = direct.iter().zip(&via_sup)
            .map(|(a, b)| (a - b).norm())
            .fold(0.0, f64::max);
        assert!(diff < 1e-12);
    }

    #[test]
    fn cavity_decay_relaxes_to_ground() {
        let hbuilder = HBuilderJC::new(JCParams::new(1.0, 1.0, 0.2), 4).unwrap();
        let lop = LOperatorJC::from_hbuilder(&hbuilder, DecayRates::new(0.5, 0.3, 0.0))
            .unwrap();
        let rho = steady_state(&hbuilder.gen_static(), &lop).unwrap();
        assert!((rho[[0, 0]].re - 1.0).abs() < 1e-10);
        assert!(check_density(&rho, 8, 1e-10).is_ok());
    }

    #[test]
    fn degenerate_dissipation_has_no_unique_steady_state() {
        // dephasing alone conserves every population
        let hbuilder = HBuilderJC::new(JCParams::new(1.0, 1.0, 0.2), 3).unwrap();
        let lop = LOperatorJC::new(3, DecayRates::new(0.0, 0.0, 0.1)).unwrap();
        assert!(matches!(
            steady_state(&hbuilder.gen_static(), &lop),
            Err(Error::Configuration(_)),
        ));

        // an uncoupled atom keeps whatever excitation it starts with
        let hbuilder = HBuilderJC::new(JCParams::new(1.0, 1.0, 0.0), 3).unwrap();
        let lop = LOperatorJC::new(3, DecayRates::new(0.5, 0.0, 0.0)).unwrap();
        assert!(matches!(
            steady_state(&hbuilder.gen_static(), &lop),
            Err(Error::Configuration(_)),
        ));
    }

    #[test]
    fn closed_system_has_no_unique_steady_state() {
        let hbuilder = HBuilderJC::new(JCParams::new(1.0, 1.0, 0.2), 3).unwrap();
        let lop = LOperatorJC::new(3, DecayRates::closed()).unwrap();
        assert!(matches!(
            steady_state(&hbuilder.gen_static(), &lop),
            Err(Error::Configuration(_)),
        ));
    }
}
