// SPDX: CC0-1.0

use crate::eval::OperatorTyp;
use core::{fmt, iter::Peekable, str::CharIndices};
use std::sync::Arc;

/// A byte span of the user's input, kept together with the input so that
/// errors can point back into it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubStr {
    src: Arc<String>,
    start: usize,
    len: usize,
}

impl SubStr {
    #[inline]
    pub const fn new(src: Arc<String>, start: usize, len: usize) -> Self {
        Self { src, start, len }
    }

    #[inline]
    pub fn all(src: Arc<String>) -> Self {
        let len = src.len();
        Self::new(src, 0, len)
    }

    pub fn src(&self) -> Arc<String> {
        Arc::clone(&self.src)
    }

    pub const fn start(&self) -> usize {
        self.start
    }

    pub const fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn get(&self) -> &str {
        &self.src[self.start..self.end()]
    }

    /// Widens the span by `by` bytes to the right.
    pub fn grow(&mut self, by: usize) {
        self.len += by;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokTyp {
    Ident,
    Number,
    Op(OperatorTyp),
    OpenParen,
    CloseParen,

    // unsupported tokens
    XComma,
    XGreater,
    XLess,
    XEqual,
    XPipe,
    XOpenSquareBracket,
    XCloseSquareBracket,
    XOpenCurly,
    XCloseCurly,
}

impl TokTyp {
    pub const fn is_unsupported(&self) -> bool {
        match self {
            Self::Ident | Self::Number | Self::Op(_) | Self::OpenParen | Self::CloseParen => false,

            // unsupported tokens
            Self::XComma
            | Self::XGreater
            | Self::XLess
            | Self::XEqual
            | Self::XPipe
            | Self::XOpenSquareBracket
            | Self::XCloseSquareBracket
            | Self::XOpenCurly
            | Self::XCloseCurly => true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tok {
    pub typ: TokTyp,
    pub loc: SubStr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LexErrTyp {
    InvalidChar,
    Unsupported(TokTyp),
}

impl fmt::Display for LexErrTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChar => write!(f, "invalid character"),
            Self::Unsupported(_) => write!(f, "unsupported character"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LexErr {
    pub typ: LexErrTyp,
    pub loc: SubStr,
}

#[derive(Debug)]
pub struct Lexer<'src> {
    src: &'src Arc<String>,
    cur: Peekable<CharIndices<'src>>,
    prev: Option<TokTyp>, // decides between negation and subtraction
    has_errored: bool,    // tells iter to yield None after error
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src Arc<String>) -> Self {
        Self {
            src,
            cur: src.char_indices().peekable(),
            prev: None,
            has_errored: false,
        }
    }

    pub fn src(&self) -> Arc<String> {
        Arc::clone(self.src)
    }

    pub fn trim_whitespace(&mut self) {
        while let Some((_, chr)) = self.cur.peek() {
            if chr.is_ascii_whitespace() {
                self.cur.next();
            } else {
                break;
            }
        }
    }

    /// Whether the next token sits where an operand is expected, in which
    /// case a `-` is negation rather than subtraction.
    fn expects_operand(&self) -> bool {
        matches!(
            self.prev,
            None | Some(TokTyp::Op(_)) | Some(TokTyp::OpenParen)
        )
    }

    pub fn consume_unambiguous(&mut self) -> Option<Tok> {
        let (idx, chr) = self.cur.peek().copied()?;
        let typ = match chr {
            '+' => TokTyp::Op(OperatorTyp::Add),
            '-' if self.expects_operand() => TokTyp::Op(OperatorTyp::Neg),
            '-' => TokTyp::Op(OperatorTyp::Sub),
            '*' => TokTyp::Op(OperatorTyp::Mul),
            '/' => TokTyp::Op(OperatorTyp::Div),
            '^' => TokTyp::Op(OperatorTyp::Exp),
            '(' => TokTyp::OpenParen,
            ')' => TokTyp::CloseParen,

            ',' => TokTyp::XComma,
            '>' => TokTyp::XGreater,
            '<' => TokTyp::XLess,
            '=' => TokTyp::XEqual,
            '|' => TokTyp::XPipe,
            '[' => TokTyp::XOpenSquareBracket,
            ']' => TokTyp::XCloseSquareBracket,
            '{' => TokTyp::XOpenCurly,
            '}' => TokTyp::XCloseCurly,
            _ => return None,
        };
        self.cur.next(); // consume because we only peeked
        let mut tok = Tok {
            typ,
            loc: SubStr::new(Arc::clone(self.src), idx, 1),
        };

        // `**` is accepted as a spelling of `^`
        if typ == TokTyp::Op(OperatorTyp::Mul) {
            if let Some((_, '*')) = self.cur.peek() {
                self.cur.next();
                tok.typ = TokTyp::Op(OperatorTyp::Exp);
                tok.loc.grow(1);
            }
        }
        Some(tok)
    }

    pub fn consume_while<P>(&mut self, start: usize, typ: TokTyp, predicate: P) -> Tok
    where
        P: Fn(char) -> bool,
    {
        let mut tok = Tok {
            typ,
            loc: SubStr::new(Arc::clone(self.src), start, 0),
        };
        while let Some((_, chr)) = self.cur.peek().copied() {
            if predicate(chr) {
                tok.loc.grow(chr.len_utf8());
                self.cur.next();
            } else {
                break;
            }
        }
        tok
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Tok, LexErr>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.has_errored {
            return None;
        }

        self.trim_whitespace();

        let (next_idx, next_chr) = self.cur.peek().copied()?;
        let tok = if let Some(tok) = self.consume_unambiguous() {
            tok
        } else if next_chr.is_ascii_alphabetic() || next_chr == '_' {
            // identifiers may be namespaced, as in `np.sin`
            self.consume_while(next_idx, TokTyp::Ident, |chr| {
                chr.is_ascii_alphanumeric() || chr == '_' || chr == '.'
            })
        } else if next_chr.is_ascii_digit() || next_chr == '.' {
            self.consume_while(next_idx, TokTyp::Number, |chr| {
                chr.is_ascii_digit() || chr == '.'
            })
        } else {
            self.has_errored = true;
            return Some(Err(LexErr {
                typ: LexErrTyp::InvalidChar,
                loc: SubStr::new(Arc::clone(self.src), next_idx, next_chr.len_utf8()),
            }));
        };

        if tok.typ.is_unsupported() {
            self.has_errored = true;
            return Some(Err(LexErr {
                typ: LexErrTyp::Unsupported(tok.typ),
                loc: tok.loc,
            }));
        }
        self.prev = Some(tok.typ);
        Some(Ok(tok))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typs(src: &str) -> Vec<TokTyp> {
        let src = Arc::new(src.to_string());
        Lexer::new(&src).map(|tok| tok.unwrap().typ).collect()
    }

    #[test]
    fn minus_is_subtraction_after_an_operand() {
        assert_eq!(
            typs("1-cos(x)"),
            [
                TokTyp::Number,
                TokTyp::Op(OperatorTyp::Sub),
                TokTyp::Ident,
                TokTyp::OpenParen,
                TokTyp::Ident,
                TokTyp::CloseParen,
            ]
        );
    }

    #[test]
    fn minus_is_negation_where_an_operand_is_expected() {
        assert_eq!(
            typs("-x*(-2)^-1"),
            [
                TokTyp::Op(OperatorTyp::Neg),
                TokTyp::Ident,
                TokTyp::Op(OperatorTyp::Mul),
                TokTyp::OpenParen,
                TokTyp::Op(OperatorTyp::Neg),
                TokTyp::Number,
                TokTyp::CloseParen,
                TokTyp::Op(OperatorTyp::Exp),
                TokTyp::Op(OperatorTyp::Neg),
                TokTyp::Number,
            ]
        );
    }

    #[test]
    fn double_star_is_power() {
        let src = Arc::new(String::from("x ** 2"));
        let toks: Vec<Tok> = Lexer::new(&src).map(Result::unwrap).collect();
        assert_eq!(toks[1].typ, TokTyp::Op(OperatorTyp::Exp));
        assert_eq!(toks[1].loc.get(), "**");
    }

    #[test]
    fn namespaced_identifier_is_one_token() {
        let src = Arc::new(String::from("np.sin(x)"));
        let first = Lexer::new(&src).next().unwrap().unwrap();
        assert_eq!(first.typ, TokTyp::Ident);
        assert_eq!(first.loc.get(), "np.sin");
    }

    #[test]
    fn unsupported_token_stops_lexing() {
        let src = Arc::new(String::from("x, y"));
        let mut lex = Lexer::new(&src);
        assert!(lex.next().unwrap().is_ok());
        let err = lex.next().unwrap().unwrap_err();
        assert_eq!(err.typ, LexErrTyp::Unsupported(TokTyp::XComma));
        assert_eq!(err.loc.start(), 1);
        assert!(lex.next().is_none());
    }

    #[test]
    fn invalid_multibyte_char_has_full_span() {
        let src = Arc::new(String::from("x·2"));
        let err = Lexer::new(&src).nth(1).unwrap().unwrap_err();
        assert_eq!(err.typ, LexErrTyp::InvalidChar);
        assert_eq!(err.loc.get(), "·");
    }
}
