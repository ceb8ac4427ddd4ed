//! Constructs to build the generators of the atom-cavity dynamics: the
//! Hamiltonian and the set of collapse operators.

pub mod hamiltonians;
pub use hamiltonians::{
    jaynes_cummings::{ HBuilderJC, JCParams },
    CouplingHook,
    CouplingKind,
    FullRabi,
    HBuild,
    RotatingWave,
};

pub mod lindbladians;
pub use lindbladians::{
    cavity::{ DecayRates, LOperatorJC },
    Channel,
    CollapseOp,
    LOp,
};
