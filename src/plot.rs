// SPDX: CC0-1.0

use crate::{
    dialect::{self, NUMERIC, USER},
    eval::{self, EvalErr, Program},
    limit::{self, SymbolicLimitSolver},
    parse::ParseErr,
    Neighborhood, Number, Point,
};
use core::{convert::Infallible, fmt, ops::Range};
use tracing::debug;

/// Points on each side of the limit point.
pub const SAMPLES_PER_SIDE: usize = 500;

/// Distance kept from the limit point when sampling.
pub const GUARD: Number = 1e-9;

/// Extra room above and below the clipped y range.
pub const Y_MARGIN: Number = 0.5;

const LOW_PERCENTILE: Number = 1.0;
const HIGH_PERCENTILE: Number = 99.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Curve {
    pub label: String,
    pub points: Vec<Point<Number>>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Annotation {
    Marker { at: Point<Number>, label: String },
    HLine { y: Number, x: Range<Number>, label: String },
    VLine { x: Number, y: Range<Number> },
    Band { x: Range<Number>, label: String },
}

/// Everything needed to draw the neighborhood of a limit.
#[derive(Clone, Debug, PartialEq)]
pub struct Chart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x_range: Range<Number>,
    pub y_range: Range<Number>,
    pub curve: Curve,
    pub annotations: Vec<Annotation>,
}

impl Chart {
    pub fn marker(&self) -> Option<Point<Number>> {
        self.annotations.iter().find_map(|a| match a {
            Annotation::Marker { at, .. } => Some(*at),
            _ => None,
        })
    }
}

#[derive(Debug)]
pub enum PlotErr {
    Parse(ParseErr),
    Eval(EvalErr<Infallible>),
    NoFiniteSamples,
}

impl fmt::Display for PlotErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "could not parse function: {err}"),
            Self::Eval(err) => write!(f, "could not evaluate function: {err}"),
            Self::NoFiniteSamples => {
                write!(f, "function has no finite value anywhere in the window")
            }
        }
    }
}

impl From<ParseErr> for PlotErr {
    fn from(err: ParseErr) -> Self {
        Self::Parse(err)
    }
}

impl From<EvalErr<Infallible>> for PlotErr {
    fn from(err: EvalErr<Infallible>) -> Self {
        Self::Eval(err)
    }
}

fn linspace(start: Number, end: Number, n: usize) -> impl Iterator<Item = Number> {
    let step = (end - start) / (n.max(2) - 1) as Number;
    (0..n).map(move |i| {
        if i + 1 == n {
            end
        } else {
            start + step * i as Number
        }
    })
}

/// Sample positions on both sides of the point, left to right, never
/// touching the point itself.
pub fn sample_points(nbhd: &Neighborhood) -> Vec<Number> {
    let Neighborhood { point, radius } = *nbhd;
    // far from zero, a - 1e-9 rounds back to a
    let guard = GUARD
        .max(point.abs() * Number::EPSILON * 4.0)
        .min(radius / 2.0);
    linspace(point - radius, point - guard, SAMPLES_PER_SIDE)
        .chain(linspace(point + guard, point + radius, SAMPLES_PER_SIDE))
        .collect()
}

/// Evaluates the program at every point, non-finite results become NaN.
pub fn sample(prog: &Program, xs: &[Number]) -> Result<Vec<Number>, EvalErr<Infallible>> {
    let mut stack = Vec::new();
    xs.iter()
        .map(|x| {
            eval::eval(prog, x, &mut stack).map(|y| if y.is_finite() { y } else { Number::NAN })
        })
        .collect()
}

/// Linearly interpolated percentile of already sorted values.
fn percentile(sorted: &[Number], p: Number) -> Number {
    let rank = p / 100.0 * (sorted.len() - 1) as Number;
    let (lo, hi) = (rank.floor() as usize, rank.ceil() as usize);
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as Number)
}

/// Vertical range that ignores blow-ups near singularities.
pub fn y_range(ys: &[Number]) -> Option<Range<Number>> {
    let mut finite: Vec<Number> = ys.iter().copied().filter(|y| y.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    finite.sort_by(Number::total_cmp);
    let lo = percentile(&finite, LOW_PERCENTILE);
    let hi = percentile(&finite, HIGH_PERCENTILE);
    Some(lo - Y_MARGIN..hi + Y_MARGIN)
}

pub fn chart<S: SymbolicLimitSolver + ?Sized>(
    solver: &S,
    function_text: &str,
    nbhd: &Neighborhood,
) -> Result<Chart, PlotErr> {
    let Neighborhood { point, radius } = *nbhd;
    let window = point - radius..point + radius;

    dialect::compile(function_text, &USER)?;
    let expr = dialect::to_numeric_dialect(function_text);
    debug!(%expr, "numeric dialect");
    let prog = dialect::compile(&expr, &NUMERIC)?;
    let xs = sample_points(nbhd);
    let ys = sample(&prog, &xs)?;
    let y_range = y_range(&ys).ok_or(PlotErr::NoFiniteSamples)?;
    debug!(
        finite = ys.iter().filter(|y| y.is_finite()).count(),
        ?y_range,
        "sampled"
    );

    let mut annotations = Vec::new();
    if let Some(limit) = limit::finite_limit(&limit::evaluate(solver, function_text, point)) {
        annotations.push(Annotation::Marker {
            at: Point {
                x: point,
                y: limit,
            },
            label: format!("limit L = {limit:.4}"),
        });
        annotations.push(Annotation::HLine {
            y: limit,
            x: window.clone(),
            label: String::from("y = L"),
        });
        annotations.push(Annotation::VLine {
            x: point,
            y: y_range.clone(),
        });
    }
    annotations.push(Annotation::Band {
        x: window.clone(),
        label: format!("window x = {point} ± {radius}"),
    });

    Ok(Chart {
        title: format!("Limit of f(x) near x = {point}"),
        x_label: String::from("x"),
        y_label: String::from("f(x)"),
        x_range: window,
        y_range,
        curve: Curve {
            label: format!("f(x) = {function_text}"),
            points: xs
                .into_iter()
                .zip(ys)
                .map(|(x, y)| Point { x, y })
                .collect(),
        },
        annotations,
    })
}
