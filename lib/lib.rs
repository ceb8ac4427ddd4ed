#![allow(dead_code, non_snake_case, non_upper_case_globals)]

//! Open-system dynamics of a two-level atom coupled to a single cavity mode
//! (Jaynes-Cummings model) under a Lindblad master equation.
//!
//! ħ = 1 throughout, so all frequencies, couplings, and rates are angular
//! frequencies.

pub mod error;
pub mod time;
pub mod hilbert;
pub mod dynamics;
pub mod rabi;
pub mod observables;
pub mod spectrum;
pub mod wigner;
pub mod config;

pub use error::{ Error, Result };
