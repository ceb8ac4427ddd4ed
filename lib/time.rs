//! Validated time coordinates shared by the integrator and the analyzers.

use std::ops::Deref;
use itertools::Itertools;
use ndarray as nd;
use crate::error::{ Error, Result };

/// Relative tolerance used to decide whether a grid is uniformly spaced.
const UNIFORM_RTOL: f64 = 1e-9;

/// An ordered, strictly increasing sequence of non-negative times.
///
/// Dereferences to the underlying [`nd::Array1`].
#[derive(Clone, Debug, PartialEq)]
pub struct TimeGrid {
    t: nd::Array1<f64>,
}

impl Deref for TimeGrid {
    type Target = nd::Array1<f64>;

    fn deref(&self) -> &Self::Target { &self.t }
}

impl AsRef<nd::Array1<f64>> for TimeGrid {
    fn as_ref(&self) -> &nd::Array1<f64> { &self.t }
}

impl TryFrom<nd::Array1<f64>> for TimeGrid {
    type Error = Error;

    fn try_from(t: nd::Array1<f64>) -> Result<Self> { Self::new(t) }
}

impl TryFrom<Vec<f64>> for TimeGrid {
    type Error = Error;

    fn try_from(t: Vec<f64>) -> Result<Self> { Self::new(t.into()) }
}

impl TimeGrid {
    /// Wrap an existing array of times.
    ///
    /// Fails if the array is empty, contains negative or non-finite values, or
    /// is not strictly increasing.
    pub fn new(t: nd::Array1<f64>) -> Result<Self> {
        if t.is_empty() {
            return Err(Error::config("time grid must be non-empty"));
        }
        if t.iter().any(|tk| !tk.is_finite() || *tk < 0.0) {
            return Err(Error::config(
                "time grid values must be finite and non-negative"));
        }
        if t.iter().tuple_windows().any(|(tk, tkp1)| tkp1 <= tk) {
            return Err(Error::config("time grid must be strictly increasing"));
        }
        Ok(Self { t })
    }

    /// `num` evenly spaced points over `[start, stop]`.
    pub fn linspace(start: f64, stop: f64, num: usize) -> Result<Self> {
        if num < 2 && start != stop {
            return Err(Error::config(
                "a time grid spanning a finite interval needs at least 2 points"));
        }
        if num == 0 {
            return Err(Error::config("time grid must be non-empty"));
        }
        Self::new(nd::Array1::linspace(start, stop, num))
    }

    /// Number of time points.
    pub fn num_points(&self) -> usize { self.t.len() }

    /// First time point.
    pub fn start(&self) -> f64 { self.t[0] }

    /// Last time point.
    pub fn stop(&self) -> f64 { self.t[self.t.len() - 1] }

    /// Interval widths between consecutive points.
    pub fn steps(&self) -> nd::Array1<f64> {
        self.t.iter().tuple_windows()
            .map(|(tk, tkp1)| *tkp1 - *tk)
            .collect()
    }

    /// Return `true` if all intervals agree to within a small relative
    /// tolerance.
    pub fn is_uniform(&self) -> bool {
        let steps = self.steps();
        match steps.first() {
            None => true,
            Some(&dt0) => {
                steps.iter()
                    .all(|dt| (dt - dt0).abs() <= UNIFORM_RTOL * dt0.abs().max(1.0))
            },
        }
    }

    /// Return the common interval width of a uniform grid.
    ///
    /// Fails if the grid has fewer than two points or is not uniform.
    pub fn uniform_step(&self) -> Result<f64> {
        if self.t.len() < 2 {
            return Err(Error::config(
                "a uniform step requires at least two time points"));
        }
        if !self.is_uniform() {
            return Err(Error::config("time grid must be uniformly spaced"));
        }
        Ok((self.stop() - self.start()) / (self.t.len() - 1) as f64)
    }

    /// Index of the grid point closest to `t`.
    pub fn closest_index(&self, t: f64) -> usize {
        self.t.iter().enumerate()
            .fold((0, f64::INFINITY), |(kmin, dmin), (k, tk)| {
                let d = (tk - t).abs();
                if d < dmin { (k, d) } else { (kmin, dmin) }
            })
            .0
    }

    /// Consume `self`, returning the underlying array.
    pub fn into_inner(self) -> nd::Array1<f64> { self.t }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_grids() {
        assert!(TimeGrid::try_from(vec![]).is_err());
        assert!(TimeGrid::try_from(vec![0.0, 1.0, 1.0]).is_err());
        assert!(TimeGrid::try_from(vec![-1.0, 0.0]).is_err());
        assert!(TimeGrid::try_from(vec![0.0, f64::NAN]).is_err());
    }

    #[test]
    fn uniformity() {
        let grid = TimeGrid::linspace(0.0, 10.0, 101).unwrap();
        assert!(grid.is_uniform());
        assert!((grid.uniform_step().unwrap() - 0.1).abs() < 1e-12);

        let grid = TimeGrid::try_from(vec![0.0, 0.1, 0.3]).unwrap();
        assert!(!grid.is_uniform());
        assert!(matches!(grid.uniform_step(), Err(Error::Configuration(_))));
    }

    #[test]
    fn closest() {
        let grid = TimeGrid::linspace(0.0, 25.0, 100).unwrap();
        assert_eq!(grid.closest_index(0.0), 0);
        assert_eq!(grid.closest_index(25.0), 99);
        assert_eq!(grid.closest_index(100.0), 99);
        let k = grid.closest_index(5.0);
        assert!((grid[k] - 5.0).abs() <= 0.5 * 25.0 / 99.0);
    }
}
