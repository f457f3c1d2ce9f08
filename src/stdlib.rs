// SPDX: CC0-1.0

use crate::{eval::Domain, Number};
use core::{convert::Infallible, f64::consts}; // assumes Number = f64

pub const X: &str = "x";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    Sin,
    Cos,
    Tan,
    Ln,
    Exp,
    Sqrt,
}

impl Builtin {
    pub const fn exhaustive() -> &'static [Builtin] {
        &[
            Self::Sin,
            Self::Cos,
            Self::Tan,
            Self::Ln,
            Self::Exp,
            Self::Sqrt,
        ]
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Ln => "ln",
            Self::Exp => "exp",
            Self::Sqrt => "sqrt",
        }
    }

    pub fn apply(&self, x: Number) -> Number {
        match self {
            Self::Sin => x.sin(),
            Self::Cos => x.cos(),
            Self::Tan => x.tan(),
            Self::Ln => x.ln(),
            Self::Exp => x.exp(),
            Self::Sqrt => x.sqrt(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Constant {
    Pi,
    E,
}

impl Constant {
    pub const fn value(&self) -> Number {
        match self {
            Self::Pi => consts::PI,
            Self::E => consts::E,
        }
    }
}

/// What an identifier resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Ident {
    Var,
    Const(Constant),
    Fun(Builtin),
}

impl Ident {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Var => "variable",
            Self::Const(_) => "constant",
            Self::Fun(_) => "function",
        }
    }
}

// non-finite results are kept, the sampler turns them into NaN
impl Domain for Number {
    type Err = Infallible;

    fn constant(val: Number) -> Self {
        val
    }

    fn neg(arg: Self) -> Result<Self, Self::Err> {
        Ok(-arg)
    }

    fn add(lhs: Self, rhs: Self) -> Result<Self, Self::Err> {
        Ok(lhs + rhs)
    }

    fn sub(lhs: Self, rhs: Self) -> Result<Self, Self::Err> {
        Ok(lhs - rhs)
    }

    fn mul(lhs: Self, rhs: Self) -> Result<Self, Self::Err> {
        Ok(lhs * rhs)
    }

    fn div(lhs: Self, rhs: Self) -> Result<Self, Self::Err> {
        Ok(lhs / rhs)
    }

    fn pow(base: Self, exp: Self) -> Result<Self, Self::Err> {
        Ok(base.powf(exp))
    }

    fn call(fun: Builtin, arg: Self) -> Result<Self, Self::Err> {
        Ok(fun.apply(arg))
    }
}
