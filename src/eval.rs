// SPDX: CC0-1.0

use crate::{lex::SubStr, stdlib::Builtin, Number};
use core::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperatorTyp {
    Neg,
    Add,
    Sub,
    Mul,
    Div,
    Exp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Associativity {
    Left,
    Right,
}

impl OperatorTyp {
    pub const fn precedence(&self) -> i8 {
        match self {
            Self::Add => 2,
            Self::Sub => 2,
            Self::Mul => 3,
            Self::Div => 3,
            Self::Neg => 4,
            Self::Exp => 5,
        }
    }

    pub const fn associativity(&self) -> Associativity {
        use Associativity::{Left, Right};
        match self {
            Self::Neg => Right,
            Self::Add => Left,
            Self::Sub => Left,
            Self::Mul => Left,
            Self::Div => Left,
            Self::Exp => Right,
        }
    }

    pub const fn arity(&self) -> usize {
        match self {
            Self::Neg => 1,
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Exp => 2,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Neg => "neg",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Exp => "pow",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OperationTyp {
    Operator(OperatorTyp),
    Val(Number),
    Var,
    Call(Builtin),
}

impl OperationTyp {
    pub const fn arity(&self) -> usize {
        match self {
            Self::Operator(typ) => typ.arity(),
            Self::Val(_) | Self::Var => 0,
            Self::Call(_) => 1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Operation {
    pub typ: OperationTyp,
    pub loc: SubStr,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.typ {
            OperationTyp::Val(val) => write!(f, "push {val}"),
            OperationTyp::Var => write!(f, "load '{}'", self.loc.get()),
            OperationTyp::Operator(typ) => write!(f, "call '{}'", typ.name()),
            OperationTyp::Call(fun) => write!(f, "call '{}'", fun.name()),
        }
    }
}

/// Values a [`Program`] can be evaluated over.
///
/// Plain floats give the numeric sampler, truncated series give the
/// symbolic limit solver.
pub trait Domain: Clone {
    type Err;

    fn constant(val: Number) -> Self;
    fn neg(arg: Self) -> Result<Self, Self::Err>;
    fn add(lhs: Self, rhs: Self) -> Result<Self, Self::Err>;
    fn sub(lhs: Self, rhs: Self) -> Result<Self, Self::Err>;
    fn mul(lhs: Self, rhs: Self) -> Result<Self, Self::Err>;
    fn div(lhs: Self, rhs: Self) -> Result<Self, Self::Err>;
    fn pow(base: Self, exp: Self) -> Result<Self, Self::Err>;
    fn call(fun: Builtin, arg: Self) -> Result<Self, Self::Err>;
}

#[derive(Debug)]
pub enum EvalErrTyp<E> {
    Empty,
    MissingArgs {
        name: &'static str,
        arity: usize,
        found: usize,
    },
    StackMismatch {
        expected: usize,
        found: usize,
    },
    Domain(E),
}

#[derive(Debug)]
pub struct EvalErr<E> {
    pub typ: EvalErrTyp<E>,
    pub op: Option<Operation>, // if none, associated with end-of-program checking
}

impl<E: fmt::Display> fmt::Display for EvalErr<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.typ {
            EvalErrTyp::Empty => write!(f, "cannot evaluate empty program"),

            EvalErrTyp::MissingArgs { name, arity, found } => write!(
                f,
                "function '{name}' requires {arity} argument{s}, but found {found}",
                s = if *arity == 1 { "" } else { "s" }
            ),

            EvalErrTyp::StackMismatch { expected, found } => write!(
                f,
                "expected {expected} operation{s} on the stack but found {found}",
                s = if *expected == 1 { "" } else { "s" }
            ),

            EvalErrTyp::Domain(err) => write!(f, "{err}"),
        }
    }
}

#[derive(Debug)]
pub struct Program {
    pub(crate) ops: Vec<Operation>,
}

impl Program {
    #[inline]
    pub const fn new(ops: Vec<Operation>) -> Self {
        Self { ops }
    }

    #[inline]
    pub fn ops(&self) -> core::slice::Iter<'_, Operation> {
        self.ops.iter()
    }
}

pub fn eval<D: Domain>(prog: &Program, x: &D, stack: &mut Vec<D>) -> Result<D, EvalErr<D::Err>> {
    fn take_args<D, E, const N: usize>(
        stack: &mut Vec<D>,
        op: &Operation,
        name: &'static str,
    ) -> Result<[D; N], EvalErr<E>> {
        let missing = |found| EvalErr {
            typ: EvalErrTyp::MissingArgs {
                name,
                arity: N,
                found,
            },
            op: Some(op.clone()),
        };
        let len = stack.len();
        if len < N {
            return Err(missing(len));
        }
        // stack: ...a, b, c, d
        //                 ^^^^ args if arity is 2
        let args = stack.split_off(len - N);
        args.try_into().map_err(|args: Vec<D>| missing(args.len()))
    }

    fn domain<E>(op: &Operation) -> impl FnOnce(E) -> EvalErr<E> {
        let op = op.clone();
        move |err| EvalErr {
            typ: EvalErrTyp::Domain(err),
            op: Some(op),
        }
    }

    if prog.ops.is_empty() {
        return Err(EvalErr {
            typ: EvalErrTyp::Empty,
            op: None,
        });
    }

    stack.clear();

    for op in prog.ops() {
        let val = match op.typ {
            OperationTyp::Val(num) => D::constant(num),

            OperationTyp::Var => x.clone(),

            OperationTyp::Operator(OperatorTyp::Neg) => {
                let [arg] = take_args::<_, D::Err, 1>(stack, op, OperatorTyp::Neg.name())?;
                D::neg(arg).map_err(domain(op))?
            }

            OperationTyp::Operator(typ) => {
                let [lhs, rhs] = take_args::<_, D::Err, 2>(stack, op, typ.name())?;
                match typ {
                    OperatorTyp::Add => D::add(lhs, rhs),
                    OperatorTyp::Sub => D::sub(lhs, rhs),
                    OperatorTyp::Mul => D::mul(lhs, rhs),
                    OperatorTyp::Div => D::div(lhs, rhs),
                    OperatorTyp::Exp => D::pow(lhs, rhs),
                    OperatorTyp::Neg => unreachable!("negation is unary"),
                }
                .map_err(domain(op))?
            }

            OperationTyp::Call(fun) => {
                let [arg] = take_args::<_, D::Err, 1>(stack, op, fun.name())?;
                D::call(fun, arg).map_err(domain(op))?
            }
        };
        stack.push(val);
    }

    match stack.pop() {
        Some(val) if stack.is_empty() => Ok(val),
        _ => Err(EvalErr {
            typ: EvalErrTyp::StackMismatch {
                expected: 1,
                found: stack.len() + 1,
            },
            op: None,
        }),
    }
}
