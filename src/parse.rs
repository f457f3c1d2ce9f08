// SPDX: CC0-1.0

// implementation of shunting yard algorithm by dijkstra (see https://en.wikipedia.org/wiki/Shunting_yard_algorithm)

use crate::{
    dialect::Dialect,
    eval::{Associativity, Operation, OperationTyp, OperatorTyp, Program},
    lex::{LexErr, LexErrTyp, Lexer, SubStr, TokTyp},
    stdlib::{Builtin, Ident},
    Number,
};
use core::{fmt, num::ParseFloatError};

#[derive(Debug)]
pub enum ParseErrTyp {
    LexErr(LexErrTyp),
    ParseNum(ParseFloatError),
    ParenMismatch,
    UndefinedIdent {
        name: String,
        similar: Option<(&'static str, Ident)>,
    },
    ExpectedCall,
    MissingOperand {
        arity: usize,
        found: usize,
    },
    MissingOperator {
        found: usize,
    },
    Empty,
}

impl fmt::Display for ParseErrTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LexErr(err) => write!(f, "{err}"),
            Self::ParseNum(err) => write!(f, "invalid number: {err}"),
            Self::ParenMismatch => write!(f, "mismatched parentheses"),
            Self::UndefinedIdent { name, similar } => {
                write!(f, "undefined identifier '{name}'")?;
                if let Some((similar, ident)) = similar {
                    write!(f, " ({} '{similar}' has a similar name)", ident.kind())?;
                }
                Ok(())
            }
            Self::ExpectedCall => write!(f, "function name must be followed by '('"),
            Self::MissingOperand { arity, found } => write!(
                f,
                "operation requires {arity} operand{s}, but found {found}",
                s = if *arity == 1 { "" } else { "s" }
            ),
            Self::MissingOperator { found } => {
                write!(f, "expected 1 expression but found {found}")
            }
            Self::Empty => write!(f, "expression is empty"),
        }
    }
}

#[derive(Debug)]
pub struct ParseErr {
    pub typ: ParseErrTyp,
    pub loc: SubStr,
}

impl fmt::Display for ParseErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.typ)
    }
}

impl From<LexErr> for ParseErr {
    fn from(err: LexErr) -> Self {
        Self {
            typ: ParseErrTyp::LexErr(err.typ),
            loc: err.loc,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ShuntOpTyp {
    Operator(OperatorTyp),
    Call(Builtin),
    OpenParen,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ShuntOp {
    typ: ShuntOpTyp,
    loc: SubStr,
}

impl ShuntOp {
    fn into_output(self) -> Option<Operation> {
        let typ = match self.typ {
            ShuntOpTyp::Operator(typ) => OperationTyp::Operator(typ),
            ShuntOpTyp::Call(fun) => OperationTyp::Call(fun),
            ShuntOpTyp::OpenParen => return None,
        };
        Some(Operation { typ, loc: self.loc })
    }
}

pub fn parse(lex: Lexer<'_>, dialect: &Dialect) -> Result<Program, ParseErr> {
    let src = lex.src();
    let mut out: Vec<Operation> = Vec::new(); // output
    let mut ops: Vec<ShuntOp> = Vec::new(); // operator stack
    let mut pending_call: Option<SubStr> = None; // function waiting for its '('

    let paren_mismatch = |loc| ParseErr {
        typ: ParseErrTyp::ParenMismatch,
        loc,
    };

    for tok in lex {
        let tok = tok?;

        if let Some(fun) = pending_call.take() {
            if tok.typ != TokTyp::OpenParen {
                return Err(ParseErr {
                    typ: ParseErrTyp::ExpectedCall,
                    loc: fun,
                });
            }
        }

        match tok.typ {
            TokTyp::Number => {
                let num: Number = tok.loc.get().parse().map_err(|err| ParseErr {
                    typ: ParseErrTyp::ParseNum(err),
                    loc: tok.loc.clone(),
                })?;
                out.push(Operation {
                    typ: OperationTyp::Val(num),
                    loc: tok.loc,
                });
            }

            TokTyp::Ident => match dialect.lookup(tok.loc.get()) {
                Some(Ident::Var) => out.push(Operation {
                    typ: OperationTyp::Var,
                    loc: tok.loc,
                }),
                Some(Ident::Const(c)) => out.push(Operation {
                    typ: OperationTyp::Val(c.value()),
                    loc: tok.loc,
                }),
                Some(Ident::Fun(fun)) => {
                    pending_call = Some(tok.loc.clone());
                    ops.push(ShuntOp {
                        typ: ShuntOpTyp::Call(fun),
                        loc: tok.loc,
                    });
                }
                None => {
                    return Err(ParseErr {
                        typ: ParseErrTyp::UndefinedIdent {
                            name: tok.loc.get().to_string(),
                            similar: dialect.similar(tok.loc.get()),
                        },
                        loc: tok.loc,
                    })
                }
            },

            // prefix operators apply to what follows, nothing to pop yet
            TokTyp::Op(OperatorTyp::Neg) => ops.push(ShuntOp {
                typ: ShuntOpTyp::Operator(OperatorTyp::Neg),
                loc: tok.loc,
            }),

            TokTyp::Op(o1) => {
                while let Some(ShuntOp {
                    typ: ShuntOpTyp::Operator(o2),
                    ..
                }) = ops.last()
                {
                    if (o2.precedence() > o1.precedence())
                        || ((o1.precedence() == o2.precedence())
                            && (o1.associativity() == Associativity::Left))
                    {
                        out.extend(ops.pop().and_then(ShuntOp::into_output));
                    } else {
                        break;
                    }
                }
                ops.push(ShuntOp {
                    typ: ShuntOpTyp::Operator(o1),
                    loc: tok.loc,
                });
            }

            TokTyp::OpenParen => {
                ops.push(ShuntOp {
                    typ: ShuntOpTyp::OpenParen,
                    loc: tok.loc,
                });
            }

            TokTyp::CloseParen => {
                loop {
                    match ops.pop() {
                        Some(ShuntOp {
                            typ: ShuntOpTyp::OpenParen,
                            ..
                        }) => break,
                        Some(op) => out.extend(op.into_output()),
                        None => return Err(paren_mismatch(tok.loc)),
                    }
                }

                // handle functions
                if let Some(ShuntOp {
                    typ: ShuntOpTyp::Call(_),
                    ..
                }) = ops.last()
                {
                    out.extend(ops.pop().and_then(ShuntOp::into_output));
                }
            }

            TokTyp::XComma
            | TokTyp::XGreater
            | TokTyp::XLess
            | TokTyp::XEqual
            | TokTyp::XPipe
            | TokTyp::XOpenSquareBracket
            | TokTyp::XCloseSquareBracket
            | TokTyp::XOpenCurly
            | TokTyp::XCloseCurly => unreachable!("unsupported token survived until parsing"),
        }
    }

    if let Some(fun) = pending_call {
        return Err(ParseErr {
            typ: ParseErrTyp::ExpectedCall,
            loc: fun,
        });
    }

    while let Some(op) = ops.pop() {
        if let ShuntOpTyp::OpenParen = op.typ {
            return Err(paren_mismatch(op.loc));
        }
        out.extend(op.into_output());
    }

    check_arity(&out, src)?;
    Ok(Program::new(out))
}

/// Simulates the evaluation stack so that malformed programs are rejected
/// here instead of at evaluation time.
fn check_arity(out: &[Operation], src: std::sync::Arc<String>) -> Result<(), ParseErr> {
    if out.is_empty() {
        return Err(ParseErr {
            typ: ParseErrTyp::Empty,
            loc: SubStr::all(src),
        });
    }

    let mut depth = 0usize;
    for op in out {
        let arity = op.typ.arity();
        if depth < arity {
            return Err(ParseErr {
                typ: ParseErrTyp::MissingOperand {
                    arity,
                    found: depth,
                },
                loc: op.loc.clone(),
            });
        }
        depth = depth + 1 - arity;
    }

    if depth != 1 {
        return Err(ParseErr {
            typ: ParseErrTyp::MissingOperator { found: depth },
            loc: SubStr::all(src),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{self, USER};

    fn program(src: &str) -> Vec<String> {
        dialect::compile(src, &USER)
            .unwrap()
            .ops()
            .map(ToString::to_string)
            .collect()
    }

    fn error(src: &str) -> ParseErr {
        dialect::compile(src, &USER).unwrap_err()
    }

    #[test]
    fn emits_postfix() {
        assert_eq!(
            program("(1-cos(x))/x"),
            [
                "push 1",
                "load 'x'",
                "call 'cos'",
                "call 'sub'",
                "load 'x'",
                "call 'div'"
            ]
        );
    }

    #[test]
    fn negation_binds_looser_than_power() {
        assert_eq!(
            program("-x^2"),
            ["load 'x'", "push 2", "call 'pow'", "call 'neg'"]
        );
        assert_eq!(
            program("2^-x*3"),
            [
                "push 2",
                "load 'x'",
                "call 'neg'",
                "call 'pow'",
                "push 3",
                "call 'mul'"
            ]
        );
    }

    #[test]
    fn resolves_constants() {
        assert_eq!(program("pi"), [format!("push {}", core::f64::consts::PI)]);
    }

    #[test]
    fn reports_unmatched_parentheses() {
        let err = error("sin(x");
        assert!(matches!(err.typ, ParseErrTyp::ParenMismatch));
        assert_eq!(err.loc.get(), "(");

        let err = error("x)");
        assert!(matches!(err.typ, ParseErrTyp::ParenMismatch));
        assert_eq!(err.loc.start(), 1);
    }

    #[test]
    fn suggests_similar_identifiers() {
        let err = error("sinh(x)/x");
        assert_eq!(err.loc.get(), "sinh");
        assert_eq!(
            err.to_string(),
            "undefined identifier 'sinh' (function 'sin' has a similar name)"
        );
    }

    #[test]
    fn requires_parentheses_after_functions() {
        let err = error("sin x");
        assert!(matches!(err.typ, ParseErrTyp::ExpectedCall));
        assert_eq!(err.loc.get(), "sin");
        assert!(matches!(error("cos").typ, ParseErrTyp::ExpectedCall));
    }

    #[test]
    fn rejects_implicit_multiplication() {
        assert!(matches!(
            error("2x").typ,
            ParseErrTyp::UndefinedIdent { .. } | ParseErrTyp::MissingOperator { found: 2 }
        ));
        assert!(matches!(
            error("2 x").typ,
            ParseErrTyp::MissingOperator { found: 2 }
        ));
    }

    #[test]
    fn rejects_missing_operands() {
        let err = error("x +");
        assert!(matches!(
            err.typ,
            ParseErrTyp::MissingOperand { arity: 2, found: 1 }
        ));
        assert_eq!(err.loc.get(), "+");
        assert!(matches!(
            error("sin()").typ,
            ParseErrTyp::MissingOperand { arity: 1, found: 0 }
        ));
        assert!(matches!(error("  ").typ, ParseErrTyp::Empty));
    }
}
