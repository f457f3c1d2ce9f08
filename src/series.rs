// SPDX: CC0-1.0

//! Truncated Laurent series in `t = x - a`.
//!
//! Evaluating an expression over [`Series`] instead of floats gives its
//! expansion around the limit point, and the leading term of that
//! expansion decides the limit. A series is either an exact polynomial or
//! carries an `O(t^p)` remainder, in which case only the coefficients
//! below `p` are known.

use crate::{eval::Domain, limit::Sign, stdlib::Builtin, Number};
use core::fmt;

/// Relative number of coefficients kept after the leading one.
pub const TERMS: usize = 16;

/// Coefficients smaller than this, relative to the terms they were summed
/// from, are float noise left by cancellation.
const ZERO_TOL: Number = 1e-12;

/// Largest integer exponent expanded by repeated multiplication.
const MAX_INT_POW: Number = 1024.0;

/// Largest power of `t` a series may start at, in either direction.
pub const MAX_VAL: i32 = 1 << 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeriesErr {
    DivByZero,
    Oscillates,
    OneSided,
    NotReal,
    Essential,
    LogSingularity,
    Branch,
    Indeterminate,
    TooLarge,
}

impl fmt::Display for SeriesErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DivByZero => write!(f, "division by zero"),
            Self::Oscillates => write!(f, "function oscillates near the point"),
            Self::OneSided => write!(f, "one-sided limits differ"),
            Self::NotReal => write!(f, "function is not real on both sides of the point"),
            Self::Essential => write!(f, "essential singularity"),
            Self::LogSingularity => write!(f, "logarithmic singularity"),
            Self::Branch => write!(f, "fractional power at a branch point"),
            Self::Indeterminate => write!(f, "expansion lost all precision"),
            Self::TooLarge => write!(f, "exponent too large to expand"),
        }
    }
}

/// How the leading term of an expansion behaves as `t -> 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Leading {
    Finite(Number),
    Infinite(Sign),
    Undefined,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Series {
    val: i32,
    coeffs: Vec<Number>,
    exact: bool,
    // vanishes faster than any power of t, like exp(-1/t^2)
    flat: bool,
}

// accumulates coefficients together with the magnitude of what was summed
// into them, so that cancellation can be told apart from real values
struct Acc {
    start: i32,
    end: Option<i32>,
    vals: Vec<Number>,
    mags: Vec<Number>,
}

impl Acc {
    fn new(start: i32, end: Option<i32>, len: usize) -> Self {
        let len = match end {
            Some(end) => usize::try_from(end - start).unwrap_or(0),
            None => len,
        };
        Self {
            start,
            end,
            vals: vec![0.0; len],
            mags: vec![0.0; len],
        }
    }

    fn add(&mut self, pow: i32, c: Number) {
        let Ok(idx) = usize::try_from(pow - self.start) else {
            return;
        };
        if let (Some(val), Some(mag)) = (self.vals.get_mut(idx), self.mags.get_mut(idx)) {
            *val += c;
            *mag += c.abs();
        }
    }

    fn finish(mut self) -> Series {
        for (val, mag) in self.vals.iter_mut().zip(&self.mags) {
            if val.abs() <= ZERO_TOL * mag {
                *val = 0.0;
            }
        }
        let Some(first) = self.vals.iter().position(|c| *c != 0.0) else {
            return match self.end {
                Some(end) => Series::big_o(end),
                None => Series::zero(),
            };
        };

        let mut coeffs = self.vals.split_off(first);
        let mut exact = self.end.is_none();
        if exact {
            while coeffs.last() == Some(&0.0) {
                coeffs.pop();
            }
        }
        if coeffs.len() > TERMS {
            coeffs.truncate(TERMS);
            exact = false;
        }
        Series {
            val: self.start + first as i32,
            coeffs,
            exact,
            flat: false,
        }
    }
}

/// Checks that a computed valuation stays expandable.
fn valuation(val: Option<i32>) -> Result<i32, SeriesErr> {
    val.filter(|val| val.abs() <= MAX_VAL)
        .ok_or(SeriesErr::TooLarge)
}

fn snap(val: Number, scale: Number) -> Number {
    if val.abs() <= ZERO_TOL * scale.abs().max(1.0) {
        0.0
    } else {
        val
    }
}

fn factorial(k: usize) -> Number {
    (1..=k).map(|i| i as Number).product()
}

fn sin_coeff(k: usize) -> Number {
    match k % 4 {
        1 => 1.0 / factorial(k),
        3 => -1.0 / factorial(k),
        _ => 0.0,
    }
}

fn cos_coeff(k: usize) -> Number {
    match k % 4 {
        0 => 1.0 / factorial(k),
        2 => -1.0 / factorial(k),
        _ => 0.0,
    }
}

fn exp_coeff(k: usize) -> Number {
    1.0 / factorial(k)
}

// ln(1 + u)
fn ln1p_coeff(k: usize) -> Number {
    match k {
        0 => 0.0,
        k if k % 2 == 1 => 1.0 / k as Number,
        k => -1.0 / k as Number,
    }
}

// (1 + u)^p
fn binomial_coeff(p: Number) -> impl Fn(usize) -> Number {
    move |k| (0..k).map(|j| (p - j as Number) / (j as Number + 1.0)).product()
}

impl Series {
    pub const fn zero() -> Self {
        Self {
            val: 0,
            coeffs: Vec::new(),
            exact: true,
            flat: false,
        }
    }

    /// Unknown terms of order `t^order` and above.
    pub const fn big_o(order: i32) -> Self {
        Self {
            val: order,
            coeffs: Vec::new(),
            exact: false,
            flat: false,
        }
    }

    /// Nonzero, yet every coefficient is zero.
    pub const fn flat() -> Self {
        Self {
            val: 0,
            coeffs: Vec::new(),
            exact: true,
            flat: true,
        }
    }

    pub fn constant(c: Number) -> Self {
        if c == 0.0 {
            Self::zero()
        } else {
            Self {
                val: 0,
                coeffs: vec![c],
                exact: true,
                flat: false,
            }
        }
    }

    /// `x` expanded around `point`, i.e. `point + t`.
    pub fn variable(point: Number) -> Self {
        if point == 0.0 {
            Self {
                val: 1,
                coeffs: vec![1.0],
                exact: true,
                flat: false,
            }
        } else {
            Self {
                val: 0,
                coeffs: vec![point, 1.0],
                exact: true,
                flat: false,
            }
        }
    }

    pub const fn val(&self) -> i32 {
        self.val
    }

    pub fn coeffs(&self) -> &[Number] {
        &self.coeffs
    }

    pub const fn is_exact(&self) -> bool {
        self.exact
    }

    /// Order of the remainder, `None` for exact polynomials.
    pub fn prec(&self) -> Option<i32> {
        (!self.exact).then(|| self.val + self.coeffs.len() as i32)
    }

    pub fn is_zero(&self) -> bool {
        self.exact && self.coeffs.is_empty() && !self.flat
    }

    pub const fn is_flat(&self) -> bool {
        self.flat
    }

    pub fn leading(&self) -> Option<Number> {
        self.coeffs.first().copied()
    }

    pub fn as_constant(&self) -> Option<Number> {
        if !self.exact || self.flat {
            return None;
        }
        match self.coeffs[..] {
            [] => Some(0.0),
            [c] if self.val == 0 => Some(c),
            _ => None,
        }
    }

    pub fn negated(mut self) -> Self {
        self.coeffs.iter_mut().for_each(|c| *c = -*c);
        self
    }

    pub fn scaled(self, by: Number) -> Self {
        if by == 0.0 {
            return Self::zero();
        }
        let mut ret = self;
        ret.coeffs.iter_mut().for_each(|c| *c *= by);
        ret
    }

    pub fn shifted(mut self, by: i32) -> Result<Self, SeriesErr> {
        self.val = valuation(self.val.checked_add(by))?;
        Ok(self)
    }

    // adding a flat value leaves every coefficient alone, but the result
    // is no longer a polynomial
    fn padded(mut self) -> Self {
        if self.exact {
            if self.coeffs.len() < TERMS {
                self.coeffs.resize(TERMS, 0.0);
            }
            self.exact = false;
        }
        self
    }

    pub fn sum(&self, rhs: &Self) -> Self {
        if self.is_zero() {
            return rhs.clone();
        }
        if rhs.is_zero() {
            return self.clone();
        }
        match (self.flat, rhs.flat) {
            (false, false) => (),
            (true, true) => return Self::flat(),
            (true, false) => return rhs.clone().padded(),
            (false, true) => return self.clone().padded(),
        }

        let start = self.val.min(rhs.val);
        let end = match (self.prec(), rhs.prec()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let top = (self.val + self.coeffs.len() as i32).max(rhs.val + rhs.coeffs.len() as i32);
        let mut acc = Acc::new(start, end, (top - start) as usize);
        for s in [self, rhs] {
            for (k, c) in s.coeffs.iter().enumerate() {
                acc.add(s.val + k as i32, *c);
            }
        }
        acc.finish()
    }

    pub fn difference(&self, rhs: &Self) -> Self {
        self.sum(&rhs.clone().negated())
    }

    pub fn product(&self, rhs: &Self) -> Result<Self, SeriesErr> {
        if self.is_zero() || rhs.is_zero() {
            return Ok(Self::zero());
        }
        if self.flat || rhs.flat {
            return Ok(Self::flat());
        }

        let val = valuation(self.val.checked_add(rhs.val))?;
        let (la, lb) = (self.coeffs.len(), rhs.coeffs.len());
        let rel = match (self.exact, rhs.exact) {
            (true, true) if la + lb - 1 > TERMS => Some(TERMS),
            (true, true) => None,
            (true, false) => Some(lb),
            (false, true) => Some(la),
            (false, false) => Some(la.min(lb)),
        };
        let len = rel.unwrap_or((la + lb).saturating_sub(1));
        let mut acc = Acc::new(val, rel.map(|rel| val + rel as i32), len);
        for (i, a) in self.coeffs.iter().enumerate() {
            for (j, b) in rhs.coeffs.iter().enumerate().take(len.saturating_sub(i)) {
                acc.add(val + (i + j) as i32, a * b);
            }
        }
        Ok(acc.finish())
    }

    pub fn inverse(&self) -> Result<Self, SeriesErr> {
        if self.flat {
            return Err(SeriesErr::Essential);
        }
        let lead = match self.leading() {
            Some(c) => c,
            None if self.exact => return Err(SeriesErr::DivByZero),
            None => return Err(SeriesErr::Indeterminate),
        };
        if self.exact && self.coeffs.len() == 1 {
            return Ok(Self {
                val: -self.val,
                coeffs: vec![1.0 / lead],
                exact: true,
                flat: false,
            });
        }

        let rel = if self.exact {
            TERMS
        } else {
            self.coeffs.len().min(TERMS)
        };
        let mut q: Vec<Number> = Vec::with_capacity(rel);
        for n in 0..rel {
            let (mut sum, mut mag) = if n == 0 { (1.0, 1.0) } else { (0.0, 0.0) };
            for k in 1..=n {
                let term = self.coeffs.get(k).copied().unwrap_or(0.0) * q[n - k];
                sum -= term;
                mag += term.abs();
            }
            q.push(snap(sum, mag) / lead);
        }

        let mut acc = Acc::new(-self.val, Some(-self.val + rel as i32), rel);
        for (k, c) in q.into_iter().enumerate() {
            acc.add(-self.val + k as i32, c);
        }
        Ok(acc.finish())
    }

    pub fn quotient(&self, rhs: &Self) -> Result<Self, SeriesErr> {
        self.product(&rhs.inverse()?)
    }

    pub fn powi(&self, mut n: u32) -> Result<Self, SeriesErr> {
        let mut ret = Self::constant(1.0);
        let mut base = self.clone();
        while n > 0 {
            if n & 1 == 1 {
                ret = ret.product(&base)?;
            }
            n >>= 1;
            if n > 0 {
                base = base.product(&base)?;
            }
        }
        Ok(ret)
    }

    /// Splits off the constant term: `self = c + r` where `r` vanishes at
    /// the point.
    fn split(&self) -> Result<(Number, Self), SeriesErr> {
        if self.val >= 1 || self.is_zero() {
            return Ok((0.0, self.clone()));
        }
        match self.coeffs.split_first() {
            Some((c, rest)) if self.val == 0 => {
                let mut acc = Acc::new(1, self.prec(), rest.len());
                for (k, c) in rest.iter().enumerate() {
                    acc.add(1 + k as i32, *c);
                }
                Ok((*c, acc.finish()))
            }
            _ => Err(SeriesErr::Indeterminate),
        }
    }

    /// Sums the Taylor series `coeff(k) * r^k` for a vanishing `r`.
    fn compose<F: Fn(usize) -> Number>(coeff: F, r: &Self) -> Result<Self, SeriesErr> {
        if r.is_zero() {
            return Ok(Self::constant(coeff(0)));
        }
        if r.val < 1 {
            return Err(SeriesErr::Indeterminate);
        }

        let target = r.prec().unwrap_or(r.val + TERMS as i32);
        let last = ((target + r.val - 1) / r.val - 1).max(1) as usize;
        let mut sum = Self::constant(coeff(0));
        let mut pow = r.clone();
        for k in 1..=last {
            let c = coeff(k);
            if c != 0.0 {
                sum = sum.sum(&pow.clone().scaled(c));
            }
            if k < last {
                pow = pow.product(r)?;
            }
        }
        Ok(sum.sum(&Self::big_o((last as i32 + 1) * r.val)))
    }

    fn has_pole(&self) -> bool {
        self.val < 0 && !self.coeffs.is_empty()
    }

    pub fn sin(&self) -> Result<Self, SeriesErr> {
        if self.flat {
            return Ok(Self::flat());
        }
        if let Some(c) = self.as_constant() {
            return Ok(Self::constant(snap(c.sin(), c)));
        }
        if self.has_pole() {
            return Err(SeriesErr::Oscillates);
        }
        let (c, r) = self.split()?;
        let cos_r = Self::compose(cos_coeff, &r)?;
        let sin_r = Self::compose(sin_coeff, &r)?;
        Ok(cos_r
            .scaled(snap(c.sin(), c))
            .sum(&sin_r.scaled(snap(c.cos(), c))))
    }

    pub fn cos(&self) -> Result<Self, SeriesErr> {
        if self.flat {
            return Ok(Self::constant(1.0).sum(self));
        }
        if let Some(c) = self.as_constant() {
            return Ok(Self::constant(snap(c.cos(), c)));
        }
        if self.has_pole() {
            return Err(SeriesErr::Oscillates);
        }
        let (c, r) = self.split()?;
        let cos_r = Self::compose(cos_coeff, &r)?;
        let sin_r = Self::compose(sin_coeff, &r)?;
        Ok(cos_r
            .scaled(snap(c.cos(), c))
            .difference(&sin_r.scaled(snap(c.sin(), c))))
    }

    pub fn tan(&self) -> Result<Self, SeriesErr> {
        if self.has_pole() {
            return Err(SeriesErr::Oscillates);
        }
        self.sin()?.quotient(&self.cos()?)
    }

    pub fn exp(&self) -> Result<Self, SeriesErr> {
        if self.flat {
            return Ok(Self::constant(1.0).sum(self));
        }
        if let Some(c) = self.as_constant() {
            return Ok(Self::constant(c.exp()));
        }
        if let (true, Some(lead)) = (self.has_pole(), self.leading()) {
            return if self.val % 2 != 0 {
                // blows up on one side, vanishes on the other
                Err(SeriesErr::OneSided)
            } else if lead < 0.0 {
                Ok(Self::flat())
            } else {
                Err(SeriesErr::Essential)
            };
        }
        let (c, r) = self.split()?;
        Ok(Self::compose(exp_coeff, &r)?.scaled(c.exp()))
    }

    pub fn ln(&self) -> Result<Self, SeriesErr> {
        if let Some(c) = self.as_constant() {
            return match c {
                c if c > 0.0 => Ok(Self::constant(snap(c.ln(), 1.0))),
                c if c == 0.0 => Err(SeriesErr::DivByZero),
                _ => Err(SeriesErr::NotReal),
            };
        }
        let Some(lead) = self.leading() else {
            return Err(SeriesErr::Indeterminate);
        };
        if self.val != 0 {
            return if self.val % 2 != 0 || lead < 0.0 {
                Err(SeriesErr::NotReal)
            } else {
                Err(SeriesErr::LogSingularity)
            };
        }
        if lead < 0.0 {
            return Err(SeriesErr::NotReal);
        }
        let (c, r) = self.split()?;
        let ln_r = Self::compose(ln1p_coeff, &r.scaled(1.0 / c))?;
        Ok(Self::constant(snap(c.ln(), 1.0)).sum(&ln_r))
    }

    pub fn sqrt(&self) -> Result<Self, SeriesErr> {
        self.powf(0.5)
    }

    /// Raises to a constant power.
    pub fn powf(&self, p: Number) -> Result<Self, SeriesErr> {
        let integral = p.fract() == 0.0;
        if integral && p.abs() <= MAX_INT_POW {
            let n = p.abs() as u32;
            let base = if p < 0.0 {
                self.inverse()?
            } else {
                self.clone()
            };
            return base.powi(n);
        }

        if self.is_zero() || self.flat {
            return match p {
                p if p > 0.0 => Ok(self.clone()),
                _ if self.flat => Err(SeriesErr::Essential),
                _ => Err(SeriesErr::DivByZero),
            };
        }
        let Some(lead) = self.leading() else {
            return Err(SeriesErr::Indeterminate);
        };
        let q = Number::from(self.val) * p;
        if !integral {
            if self.val % 2 != 0 || lead < 0.0 {
                return Err(SeriesErr::NotReal);
            }
            // (c t^v)^p is |t|^(vp), which is a power of t only for even vp
            if q.fract() != 0.0 || q % 2.0 != 0.0 {
                return Err(SeriesErr::Branch);
            }
        }
        if q.abs() > Number::from(MAX_VAL) {
            return Err(SeriesErr::TooLarge);
        }

        // self = c t^v (1 + u)
        let unit = self.clone().shifted(-self.val)?.scaled(1.0 / lead);
        let (_, u) = unit.split()?;
        // q is integral and in range
        Self::compose(binomial_coeff(p), &u)?
            .scaled(lead.powf(p))
            .shifted(q as i32)
    }

    /// Raises to a power that may itself depend on `x`.
    pub fn pow(&self, exp: &Self) -> Result<Self, SeriesErr> {
        if let Some(p) = exp.as_constant() {
            return self.powf(p);
        }
        exp.product(&self.ln()?)?.exp()
    }

    /// Behavior of the expanded function as `t -> 0` from both sides.
    pub fn leading_behavior(&self) -> Result<Leading, SeriesErr> {
        let Some(lead) = self.leading() else {
            return if self.exact || self.val >= 1 {
                Ok(Leading::Finite(0.0))
            } else {
                Err(SeriesErr::Indeterminate)
            };
        };
        Ok(match self.val {
            v if v > 0 => Leading::Finite(0.0),
            0 => Leading::Finite(lead),
            v => {
                let right = if lead > 0.0 { Sign::Pos } else { Sign::Neg };
                let left = if v % 2 == 0 { right } else { right.flip() };
                if left == right {
                    Leading::Infinite(right)
                } else {
                    Leading::Undefined
                }
            }
        })
    }
}

impl Domain for Series {
    type Err = SeriesErr;

    fn constant(val: Number) -> Self {
        Self::constant(val)
    }

    fn neg(arg: Self) -> Result<Self, Self::Err> {
        Ok(arg.negated())
    }

    fn add(lhs: Self, rhs: Self) -> Result<Self, Self::Err> {
        Ok(lhs.sum(&rhs))
    }

    fn sub(lhs: Self, rhs: Self) -> Result<Self, Self::Err> {
        Ok(lhs.difference(&rhs))
    }

    fn mul(lhs: Self, rhs: Self) -> Result<Self, Self::Err> {
        lhs.product(&rhs)
    }

    fn div(lhs: Self, rhs: Self) -> Result<Self, Self::Err> {
        lhs.quotient(&rhs)
    }

    fn pow(base: Self, exp: Self) -> Result<Self, Self::Err> {
        base.pow(&exp)
    }

    fn call(fun: Builtin, arg: Self) -> Result<Self, Self::Err> {
        match fun {
            Builtin::Sin => arg.sin(),
            Builtin::Cos => arg.cos(),
            Builtin::Tan => arg.tan(),
            Builtin::Ln => arg.ln(),
            Builtin::Exp => arg.exp(),
            Builtin::Sqrt => arg.sqrt(),
        }
    }
}
