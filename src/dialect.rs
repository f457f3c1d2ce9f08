// SPDX: CC0-1.0

//! Spellings of the expression grammar.
//!
//! The same expression is written differently for the user, for the
//! symbolic solver and for the numeric sampler. Translation between them
//! goes token by token, so a name is only ever replaced as a whole and
//! `sinh` can't turn into `np.sinh`.

use crate::{
    eval::{OperatorTyp, Program},
    lex::{Lexer, Tok, TokTyp},
    parse::{self, ParseErr},
    stdlib::{Builtin, Constant, Ident, X},
};
use std::{borrow::Cow, sync::Arc};

#[derive(Debug)]
pub struct Dialect {
    pub name: &'static str,
    pub power: &'static str,
    /// The first spelling of each builtin is the one written on translation.
    pub functions: &'static [(&'static str, Builtin)],
    pub constants: &'static [(&'static str, Constant)],
}

pub const USER: Dialect = Dialect {
    name: "user",
    power: "^",
    functions: &[
        ("sin", Builtin::Sin),
        ("cos", Builtin::Cos),
        ("tan", Builtin::Tan),
        ("ln", Builtin::Ln),
        ("log", Builtin::Ln),
        ("exp", Builtin::Exp),
        ("sqrt", Builtin::Sqrt),
    ],
    constants: &[("pi", Constant::Pi), ("e", Constant::E)],
};

pub const SYMBOLIC: Dialect = Dialect {
    name: "symbolic",
    power: "**",
    functions: &[
        ("sin", Builtin::Sin),
        ("cos", Builtin::Cos),
        ("tan", Builtin::Tan),
        ("log", Builtin::Ln),
        ("exp", Builtin::Exp),
        ("sqrt", Builtin::Sqrt),
    ],
    constants: &[("pi", Constant::Pi), ("E", Constant::E)],
};

pub const NUMERIC: Dialect = Dialect {
    name: "numeric",
    power: "**",
    functions: &[
        ("np.sin", Builtin::Sin),
        ("np.cos", Builtin::Cos),
        ("np.tan", Builtin::Tan),
        ("np.log", Builtin::Ln),
        ("np.exp", Builtin::Exp),
        ("np.sqrt", Builtin::Sqrt),
    ],
    constants: &[("np.pi", Constant::Pi), ("np.e", Constant::E)],
};

impl Dialect {
    pub fn lookup(&self, name: &str) -> Option<Ident> {
        if name == X {
            return Some(Ident::Var);
        }
        self.functions
            .iter()
            .find(|(spelling, _)| *spelling == name)
            .map(|(_, fun)| Ident::Fun(*fun))
            .or_else(|| {
                self.constants
                    .iter()
                    .find(|(spelling, _)| *spelling == name)
                    .map(|(_, c)| Ident::Const(*c))
            })
    }

    pub fn spell(&self, ident: Ident) -> Option<&'static str> {
        match ident {
            Ident::Var => Some(X),
            Ident::Fun(fun) => self
                .functions
                .iter()
                .find(|(_, f)| *f == fun)
                .map(|(spelling, _)| *spelling),
            Ident::Const(c) => self
                .constants
                .iter()
                .find(|(_, k)| *k == c)
                .map(|(spelling, _)| *spelling),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = (&'static str, Ident)> + '_ {
        core::iter::once((X, Ident::Var))
            .chain(self.functions.iter().map(|(s, f)| (*s, Ident::Fun(*f))))
            .chain(self.constants.iter().map(|(s, c)| (*s, Ident::Const(*c))))
    }

    /// Known name closest to `name`, if any is reasonably close.
    pub fn similar(&self, name: &str) -> Option<(&'static str, Ident)> {
        self.names()
            .map(|(known, ident)| {
                (
                    strsim::normalized_damerau_levenshtein(
                        &name.to_ascii_lowercase(),
                        &known.to_ascii_lowercase(),
                    ),
                    (known, ident),
                )
            })
            .reduce(|(acc_sim, acc), (sim, elem)| {
                if sim > acc_sim {
                    (sim, elem)
                } else {
                    (acc_sim, acc)
                }
            })
            .filter(|(sim, _)| *sim > 0.3)
            .map(|(_, found)| found)
    }

    fn respell<'t>(&self, tok: &'t Tok, to: &Dialect) -> Cow<'t, str> {
        let verbatim = Cow::Borrowed(tok.loc.get());
        match tok.typ {
            TokTyp::Op(OperatorTyp::Exp) => Cow::Borrowed(to.power),
            TokTyp::Ident => self
                .lookup(tok.loc.get())
                .and_then(|ident| to.spell(ident))
                .map_or(verbatim, Cow::Borrowed),
            _ => verbatim,
        }
    }
}

/// Rewrites `text` from one dialect into another.
///
/// Whitespace and unknown names are kept as they are. On a lexical error
/// the rest of the text is copied untouched, the parser downstream reports
/// it.
pub fn translate(text: &str, from: &Dialect, to: &Dialect) -> String {
    let src = Arc::new(text.to_string());
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for tok in Lexer::new(&src) {
        let Ok(tok) = tok else { break };
        out.push_str(&text[cursor..tok.loc.start()]);
        out.push_str(&from.respell(&tok, to));
        cursor = tok.loc.end();
    }
    out.push_str(&text[cursor..]);
    out
}

pub fn to_symbolic_dialect(text: &str) -> String {
    translate(text, &USER, &SYMBOLIC)
}

pub fn to_numeric_dialect(text: &str) -> String {
    translate(text, &USER, &NUMERIC)
}

pub fn compile(text: &str, dialect: &Dialect) -> Result<Program, ParseErr> {
    let src = Arc::new(text.to_string());
    parse::parse(Lexer::new(&src), dialect)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbolic_dialect() {
        assert_eq!(to_symbolic_dialect("ln(x)^2"), "log(x)**2");
        assert_eq!(to_symbolic_dialect("sin(x)/x"), "sin(x)/x");
        assert_eq!(to_symbolic_dialect("e^x - pi"), "E**x - pi");
    }

    #[test]
    fn numeric_dialect() {
        assert_eq!(
            to_numeric_dialect("tan(2*x)/(x*cos(x))"),
            "np.tan(2*x)/(x*np.cos(x))"
        );
        assert_eq!(to_numeric_dialect("ln( x ) ^ 2"), "np.log( x ) ** 2");
        assert_eq!(to_numeric_dialect("x**3"), "x**3");
    }

    #[test]
    fn unknown_names_are_not_rewritten() {
        assert_eq!(to_numeric_dialect("sinh(x)+acos(x)"), "sinh(x)+acos(x)");
    }

    #[test]
    fn malformed_tail_is_copied() {
        assert_eq!(to_numeric_dialect("sin(x) = x^2"), "np.sin(x) = x^2");
        assert_eq!(to_symbolic_dialect("(x^2"), "(x**2");
    }

    #[test]
    fn dialects_round_trip() {
        let user = "(1 - cos(x))/x^2 + ln(e)";
        let numeric = to_numeric_dialect(user);
        assert_eq!(translate(&numeric, &NUMERIC, &USER), user);
    }

    #[test]
    fn every_builtin_is_spelled_everywhere() {
        for dialect in [&USER, &SYMBOLIC, &NUMERIC] {
            for fun in Builtin::exhaustive() {
                let spelling = dialect.spell(Ident::Fun(*fun));
                assert!(spelling.is_some(), "{} lacks {}", dialect.name, fun.name());
                assert_eq!(spelling.and_then(|s| dialect.lookup(s)), Some(Ident::Fun(*fun)));
            }
        }
    }

    #[test]
    fn similar_names() {
        assert_eq!(
            NUMERIC.similar("np.sinh"),
            Some(("np.sin", Ident::Fun(Builtin::Sin)))
        );
        assert_eq!(USER.similar("qqqqqqqq"), None);
    }
}
