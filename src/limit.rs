// SPDX: CC0-1.0

use crate::{
    dialect::{self, SYMBOLIC, USER},
    eval::{self, EvalErrTyp},
    series::{Leading, Series, SeriesErr},
    Number,
};
use core::fmt;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sign {
    Pos,
    Neg,
}

impl Sign {
    pub const fn flip(self) -> Self {
        match self {
            Self::Pos => Self::Neg,
            Self::Neg => Self::Pos,
        }
    }
}

/// Outcome of a formal limit computation.
#[derive(Clone, Debug, PartialEq)]
pub enum SymbolicResult {
    Finite(Number),
    Infinite(Sign),
    /// The two-sided limit doesn't exist.
    Undefined,
    /// The expression couldn't be parsed, or the solver couldn't resolve it.
    Unparsed(String),
}

/// Rounds away float noise so that exact limits print as `1` or `0.5`.
fn format_number(val: Number) -> String {
    let rounded: Number = format!("{val:.11e}").parse().unwrap_or(val);
    if rounded == 0.0 {
        String::from("0")
    } else if rounded.abs() >= 1e16 || rounded.abs() < 1e-6 {
        format!("{rounded:e}")
    } else {
        format!("{rounded}")
    }
}

impl fmt::Display for SymbolicResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(val) => f.write_str(&format_number(*val)),
            Self::Infinite(Sign::Pos) => write!(f, "oo"),
            Self::Infinite(Sign::Neg) => write!(f, "-oo"),
            Self::Undefined => write!(f, "undefined"),
            Self::Unparsed(msg) => write!(f, "Error: {msg}"),
        }
    }
}

/// Anything able to compute `lim(x -> point) expr` from both sides.
///
/// `expr` is written in the [`SYMBOLIC`] dialect.
pub trait SymbolicLimitSolver {
    fn limit(&self, expr: &str, point: Number) -> SymbolicResult;
}

/// Solves limits by expanding the expression into a Laurent series around
/// the point and reading off its leading term.
#[derive(Clone, Copy, Debug, Default)]
pub struct SeriesSolver;

impl SymbolicLimitSolver for SeriesSolver {
    fn limit(&self, expr: &str, point: Number) -> SymbolicResult {
        let prog = match dialect::compile(expr, &SYMBOLIC) {
            Ok(prog) => prog,
            Err(err) => return SymbolicResult::Unparsed(err.to_string()),
        };

        let leading = eval::eval(&prog, &Series::variable(point), &mut Vec::new())
            .map_err(|err| match err.typ {
                EvalErrTyp::Domain(err) => err,
                _ => SeriesErr::Indeterminate,
            })
            .and_then(|series| {
                debug!(?series, "expanded around x = {point}");
                series.leading_behavior()
            });

        match leading {
            Ok(Leading::Finite(val)) => SymbolicResult::Finite(val),
            Ok(Leading::Infinite(sign)) => SymbolicResult::Infinite(sign),
            Ok(Leading::Undefined)
            | Err(
                SeriesErr::DivByZero
                | SeriesErr::Oscillates
                | SeriesErr::OneSided
                | SeriesErr::NotReal,
            ) => SymbolicResult::Undefined,
            Err(
                err @ (SeriesErr::Essential
                | SeriesErr::LogSingularity
                | SeriesErr::Branch
                | SeriesErr::Indeterminate
                | SeriesErr::TooLarge),
            ) => SymbolicResult::Unparsed(format!("cannot resolve limit: {err}")),
        }
    }
}

/// Formal limit of the user's `function_text` as `x -> point`, as text.
///
/// Never fails: problems come back as text starting with `Error:`.
pub fn evaluate<S: SymbolicLimitSolver + ?Sized>(
    solver: &S,
    function_text: &str,
    point: Number,
) -> String {
    // names foreign to the user dialect may still mean something after
    // translation
    if let Err(err) = dialect::compile(function_text, &USER) {
        return SymbolicResult::Unparsed(err.to_string()).to_string();
    }
    let expr = dialect::to_symbolic_dialect(function_text);
    debug!(%expr, "symbolic dialect");
    solver.limit(&expr, point).to_string()
}

/// The limit as a real number, if the text is one.
pub fn finite_limit(text: &str) -> Option<Number> {
    text.trim()
        .parse::<Number>()
        .ok()
        .filter(|val| val.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lim(function_text: &str, point: Number) -> String {
        evaluate(&SeriesSolver, function_text, point)
    }

    #[test]
    fn classic_limits() {
        assert_eq!(lim("sin(x)/x", 0.0), "1");
        assert_eq!(lim("(1-cos(x))/x", 0.0), "0");
        assert_eq!(lim("tan(2*x)/(x*cos(x))", 0.0), "2");
        assert_eq!(lim("(1-cos(x))/x^2", 0.0), "0.5");
        assert_eq!(lim("(e^x - 1)/x", 0.0), "1");
        assert_eq!(lim("(x^2 - 1)/(x - 1)", 1.0), "2");
        assert_eq!(lim("(sin(x) - x)/x^3", 0.0), format_number(-1.0 / 6.0));
        assert_eq!(lim("ln(x)/(x - 1)", 1.0), "1");
    }

    #[test]
    fn regular_points_evaluate_directly() {
        assert_eq!(lim("sin(x)", 1.0), "0.841470984808");
        assert_eq!(lim("x^2 + 1", -2.0), "5");
        assert_eq!(lim("sqrt(x)", 4.0), "2");
    }

    #[test]
    fn poles() {
        assert_eq!(lim("1/x", 0.0), "undefined");
        assert_eq!(lim("1/x^2", 0.0), "oo");
        assert_eq!(lim("-1/x^2", 0.0), "-oo");
        assert_eq!(lim("tan(x)", core::f64::consts::FRAC_PI_2), "undefined");
        assert_eq!(lim("1/(x-2)^2", 2.0), "oo");
    }

    #[test]
    fn limits_that_do_not_exist() {
        assert_eq!(lim("sin(1/x)", 0.0), "undefined");
        assert_eq!(lim("exp(1/x)", 0.0), "undefined");
        assert_eq!(lim("sqrt(x)", 0.0), "undefined");
        assert_eq!(lim("ln(x)", -1.0), "undefined");
        assert_eq!(lim("exp(-1/x^2)", 0.0), "0");
    }

    #[test]
    fn failures_are_reported_as_text() {
        assert!(lim("(sin(x)", 0.0).starts_with("Error:"));
        assert!(lim("sinh(x)", 0.0).starts_with("Error: undefined identifier 'sinh'"));
        assert!(lim("x = 1", 0.0).starts_with("Error:"));
        assert_eq!(
            lim("ln(x^2)", 0.0),
            "Error: cannot resolve limit: logarithmic singularity"
        );
    }

    #[test]
    fn flat_denominators_are_not_guessed() {
        assert_eq!(lim("exp(-1/x^2)", 0.0), "0");
        assert_eq!(lim("1 + x*exp(-1/x^2)", 0.0), "1");
        for text in ["x^2/exp(-1/x^2)", "exp(-1/x^2)/exp(-1/x^2)"] {
            assert_eq!(
                lim(text, 0.0),
                "Error: cannot resolve limit: essential singularity",
                "{text}"
            );
        }
    }

    #[test]
    fn huge_exponents() {
        assert_eq!(lim("x^1024", 0.0), "0");
        assert_eq!(lim("x^1025", 0.0), "0");
        assert_eq!(lim("x^2000", 0.0), "0");
        assert_eq!(lim("1/x^2001", 0.0), "undefined");
        assert_eq!(lim("(x^1024)^1024", 0.0), "0");
        assert_eq!(
            lim("(((x^1024)^1024)^1024)^2", 0.0),
            "Error: cannot resolve limit: exponent too large to expand"
        );
    }

    #[test]
    fn only_user_names_are_accepted() {
        for text in ["(E^x-1)/x", "np.sin(x)/x", "np.e"] {
            assert!(lim(text, 0.0).starts_with("Error:"), "{text}");
        }
        assert!(lim("(E^x-1)/x", 0.0).contains("undefined identifier 'E'"));
    }

    #[test]
    fn only_real_numbers_are_finite() {
        assert_eq!(finite_limit("1"), Some(1.0));
        assert_eq!(finite_limit("-0.5"), Some(-0.5));
        for text in ["oo", "-oo", "undefined", "Error: x", "inf", "NaN"] {
            assert_eq!(finite_limit(text), None, "{text}");
        }
    }

    #[test]
    fn formats_numbers() {
        assert_eq!(SymbolicResult::Finite(-0.0).to_string(), "0");
        assert_eq!(SymbolicResult::Finite(2.0000000000000004).to_string(), "2");
        assert_eq!(SymbolicResult::Finite(1e20).to_string(), "1e20");
        assert_eq!(SymbolicResult::Infinite(Sign::Neg).to_string(), "-oo");
    }
}
