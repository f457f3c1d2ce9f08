// SPDX: CC0-1.0

pub mod config;
pub mod dialect;
pub mod eval;
pub mod gnuplot;
pub mod lex;
pub mod limit;
pub mod parse;
pub mod plot;
pub mod series;
pub mod shell;
pub mod stdlib;

use crate::{
    limit::{SeriesSolver, SymbolicLimitSolver},
    plot::{Chart, PlotErr},
};
use core::fmt;

pub type Number = f64;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point<T> {
    pub x: T,
    pub y: T,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NeighborhoodErr {
    NonFinitePoint,
    BadRadius,
    /// `point ± radius / 2` rounds back to `point`.
    RadiusBelowPrecision,
}

impl fmt::Display for NeighborhoodErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFinitePoint => write!(f, "limit point must be a finite number"),
            Self::BadRadius => write!(f, "window radius must be a positive finite number"),
            Self::RadiusBelowPrecision => write!(
                f,
                "window radius is too small to tell points apart at this limit point"
            ),
        }
    }
}

impl std::error::Error for NeighborhoodErr {}

/// The interval `point ± radius` shown around the limit point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighborhood {
    point: Number,
    radius: Number,
}

impl Neighborhood {
    pub fn new(point: Number, radius: Number) -> Result<Self, NeighborhoodErr> {
        if !point.is_finite() {
            Err(NeighborhoodErr::NonFinitePoint)
        } else if !(radius.is_finite() && radius > 0.0) {
            Err(NeighborhoodErr::BadRadius)
        } else if point - radius / 2.0 == point || point + radius / 2.0 == point {
            Err(NeighborhoodErr::RadiusBelowPrecision)
        } else {
            Ok(Self { point, radius })
        }
    }

    pub const fn point(&self) -> Number {
        self.point
    }

    pub const fn radius(&self) -> Number {
        self.radius
    }
}

impl fmt::Display for Neighborhood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Neighborhood")
            .field("point", &self.point)
            .field("radius", &self.radius)
            .finish()
    }
}

/// Result of one recomputation for the current inputs.
#[derive(Debug)]
pub struct Interaction {
    pub formal: String,
    pub chart: Result<Chart, PlotErr>,
}

/// Formal limit plus neighborhood chart for a function typed by the user.
#[derive(Clone, Debug, Default)]
pub struct LimitExplorer<S = SeriesSolver> {
    solver: S,
}

impl<S: SymbolicLimitSolver> LimitExplorer<S> {
    pub const fn new(solver: S) -> Self {
        Self { solver }
    }

    pub fn evaluate(&self, function_text: &str, point: Number) -> String {
        limit::evaluate(&self.solver, function_text, point)
    }

    pub fn plot(&self, function_text: &str, nbhd: &Neighborhood) -> Result<Chart, PlotErr> {
        plot::chart(&self.solver, function_text, nbhd)
    }

    pub fn interact(&self, function_text: &str, nbhd: &Neighborhood) -> Interaction {
        Interaction {
            formal: self.evaluate(function_text, nbhd.point),
            chart: self.plot(function_text, nbhd),
        }
    }
}
