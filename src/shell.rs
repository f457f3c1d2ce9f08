// SPDX: CC0-1.0

use crate::{
    eval::Program,
    lex::{LexErrTyp, SubStr, TokTyp},
    parse::ParseErrTyp,
};
use anyhow::Context;
use core::fmt;
use std::{
    io::{self, stdin, BufRead, Write},
    sync::Arc,
};

/// Functions worth trying first.
pub const EXAMPLES: &[&str] = &["sin(x)/x", "(1-cos(x))/x", "tan(2*x)/(x*cos(x))"];

pub const GUIDE: &str = "\
Exploration guide:
  1. Change the window radius with 'in', 'out' or 'window'. Watch the curve
     narrow down around x = a as the radius gets smaller.
  2. Check continuity. Does the curve pass through the red marker? Where
     the function is undefined at x = a (for example a division by zero)
     the curve has a hole there, yet the limit can still exist.
  3. Change the function with 'set'. Try sin(x)/x (limit 1 as x -> 0) or
     (1-cos(x))/x (limit 0 as x -> 0).";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    SetFunction,
    SetPoint,
    SetWindow,
    Left,
    Right,
    ZoomIn,
    ZoomOut,
    Limit,
    Plot,
    PrintProg,
    Examples,
    Guide,
}

impl Command {
    pub const fn exhaustive() -> &'static [Command] {
        &[
            Self::Help,
            Self::Quit,
            Self::SetFunction,
            Self::SetPoint,
            Self::SetWindow,
            Self::Left,
            Self::Right,
            Self::ZoomIn,
            Self::ZoomOut,
            Self::Limit,
            Self::Plot,
            Self::PrintProg,
            Self::Examples,
            Self::Guide,
        ]
    }

    pub const fn help(&self) -> &'static str {
        match self {
            Self::Help => "display help for each command",
            Self::Quit => "quit the shell",
            Self::SetFunction => "set the function f(x)",
            Self::SetPoint => "set the limit point a",
            Self::SetWindow => "set the radius of the window around a",
            Self::Left => "move the limit point left by one step",
            Self::Right => "move the limit point right by one step",
            Self::ZoomIn => "shrink the window by one step",
            Self::ZoomOut => "grow the window by one step",
            Self::Limit => "print the formal limit again",
            Self::Plot => "plot the function around the limit point again",
            Self::PrintProg => "print program compiled from the function (for debugging)",
            Self::Examples => "list example functions",
            Self::Guide => "print a short exploration guide",
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Quit => "quit",
            Self::SetFunction => "set",
            Self::SetPoint => "point",
            Self::SetWindow => "window",
            Self::Left => "left",
            Self::Right => "right",
            Self::ZoomIn => "in",
            Self::ZoomOut => "out",
            Self::Limit => "limit",
            Self::Plot => "plot",
            Self::PrintProg => "prog",
            Self::Examples => "examples",
            Self::Guide => "guide",
        }
    }

    /// Command with the name closest to `s`, if any is close enough.
    pub fn similar(s: &str) -> Option<Command> {
        Self::exhaustive()
            .iter()
            .map(|c| (strsim::normalized_damerau_levenshtein(s, c.name()), *c))
            .filter(|(sim, _)| *sim > 0.3)
            .max_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, c)| c)
    }
}

impl core::str::FromStr for Command {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for c in Self::exhaustive() {
            if s == c.name() {
                return Ok(*c);
            }
        }
        Err(())
    }
}

/// Prompts for one line of standard input, `None` at end of input.
pub fn input<W: Write>(out: W, prompt: impl fmt::Display) -> anyhow::Result<Option<String>> {
    input_from(stdin().lock(), out, prompt)
}

pub fn input_from<R: BufRead, W: Write>(
    src: R,
    out: W,
    prompt: impl fmt::Display,
) -> anyhow::Result<Option<String>> {
    fn inner<R: BufRead, W: Write>(
        mut src: R,
        mut out: W,
        prompt: impl fmt::Display,
    ) -> io::Result<Option<String>> {
        write!(out, "{prompt}")?;
        out.flush()?;
        let mut s = String::new();
        if src.read_line(&mut s)? == 0 {
            return Ok(None);
        }
        Ok(Some(s.trim().to_string()))
    }

    let s = inner(src, out, prompt).context("read from standard input failed")?;
    Ok(s)
}

pub fn read_fromstr<W: Write, T: core::str::FromStr>(
    mut out: W,
    prompt: impl fmt::Display,
    ignore_empty: bool,
) -> anyhow::Result<Result<Option<T>, <T as core::str::FromStr>::Err>>
where
    <T as core::str::FromStr>::Err: fmt::Display,
{
    let Some(input) = input(&mut out, prompt)? else {
        return Ok(Ok(None));
    };
    let input = Arc::new(input);
    if ignore_empty && input.is_empty() {
        return Ok(Ok(None));
    }
    match input.parse::<T>() {
        Ok(new) => Ok(Ok(Some(new))),
        Err(err) => {
            writeln!(out)?;
            underline(&mut out, &SubStr::all(input))?;
            writeln!(out, "parse error: {err}")?;
            Ok(Err(err))
        }
    }
}

/// Prints the source of `span` with carets below the span.
pub fn underline<W: Write>(mut out: W, span: &SubStr) -> io::Result<()> {
    let src = span.src();
    // NOTE(unicode): columns count chars, not bytes
    let col = src[..span.start()].chars().count();
    let width = span.get().chars().count().max(1);
    writeln!(out, "{src}")?;
    writeln!(out, "{}{}", " ".repeat(col), "^".repeat(width))?;
    Ok(())
}

/// Hint for a parse error of the user's function, if there is one.
pub fn parse_note(typ: &ParseErrTyp) -> Option<&'static str> {
    match typ {
        ParseErrTyp::LexErr(LexErrTyp::InvalidChar) => Some(
            "available tokens are numbers, identifiers, and symbols +-*/^()",
        ),
        ParseErrTyp::LexErr(LexErrTyp::Unsupported(typ)) => match typ {
            TokTyp::XGreater | TokTyp::XLess => {
                Some("expected an expression but found an inequality")
            }
            TokTyp::XEqual => Some("expected an expression but found an equation"),
            TokTyp::XComma => Some("functions take exactly one argument"),
            TokTyp::XPipe => Some("absolute value is not supported"),
            TokTyp::XOpenSquareBracket
            | TokTyp::XCloseSquareBracket
            | TokTyp::XOpenCurly
            | TokTyp::XCloseCurly => Some("use round parentheses for grouping"),
            TokTyp::Ident
            | TokTyp::Number
            | TokTyp::Op(_)
            | TokTyp::OpenParen
            | TokTyp::CloseParen => None,
        },
        ParseErrTyp::ParseNum(_) => Some("parsing as floating point number"),
        ParseErrTyp::UndefinedIdent { .. } => {
            Some("functions are sin, cos, tan, ln, log, exp and sqrt; constants are pi and e")
        }
        ParseErrTyp::ExpectedCall => Some("write function arguments in parentheses, like sin(x)"),
        ParseErrTyp::MissingOperator { .. } => Some(
            "implicit multiplication is not supported, so for example '2x' would be '2*x'",
        ),
        ParseErrTyp::ParenMismatch | ParseErrTyp::MissingOperand { .. } | ParseErrTyp::Empty => {
            None
        }
    }
}

pub fn dump_program<W: Write>(
    mut out: W,
    prog: &Program,
    title: core::fmt::Arguments,
) -> io::Result<()> {
    writeln!(out, "{title}: ")?;
    if prog.ops().len() == 0 {
        writeln!(out, "  (empty)")?;
    }
    for op in prog.ops() {
        writeln!(out, "  {op}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{self, USER};

    #[test]
    fn commands_round_trip_through_names() {
        for c in Command::exhaustive() {
            assert_eq!(c.name().parse::<Command>(), Ok(*c));
            assert!(!c.help().is_empty());
        }
        assert_eq!("plto".parse::<Command>(), Err(()));
    }

    #[test]
    fn suggests_similar_commands() {
        assert_eq!(Command::similar("plto"), Some(Command::Plot));
        assert_eq!(Command::similar("quti"), Some(Command::Quit));
        assert_eq!(Command::similar("examples!"), Some(Command::Examples));
        assert_eq!(Command::similar("xyz"), None);
    }

    #[test]
    fn input_ends_with_the_stream() {
        let mut out = Vec::new();
        let line = input_from(&b"  plot \nquit\n"[..], &mut out, "> ").unwrap();
        assert_eq!(line.as_deref(), Some("plot"));
        assert_eq!(out, b"> ");
        assert_eq!(input_from(&b"\n"[..], io::sink(), "> ").unwrap().as_deref(), Some(""));
        assert_eq!(input_from(&b""[..], io::sink(), "> ").unwrap(), None);
    }

    #[test]
    fn underlines_span() {
        let src = Arc::new(String::from("sin(x) + tanh(x)"));
        let mut out = Vec::new();
        underline(&mut out, &SubStr::new(src, 9, 4)).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "sin(x) + tanh(x)\n         ^^^^\n"
        );
    }

    #[test]
    fn underlines_past_multibyte_chars() {
        let src = Arc::new(String::from("π + x"));
        let mut out = Vec::new();
        // "x" starts at byte 5 but column 4
        underline(&mut out, &SubStr::new(src, 5, 1)).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "π + x\n    ^\n");
    }

    #[test]
    fn notes_for_common_mistakes() {
        let err = dialect::compile("2x", &USER).unwrap_err();
        assert!(parse_note(&err.typ).unwrap().contains("implicit multiplication"));

        let err = dialect::compile("x = 1", &USER).unwrap_err();
        assert_eq!(
            parse_note(&err.typ),
            Some("expected an expression but found an equation")
        );

        let err = dialect::compile("(x", &USER).unwrap_err();
        assert_eq!(parse_note(&err.typ), None);
    }

    #[test]
    fn dumps_program() {
        let prog = dialect::compile("sin(x)/x", &USER).unwrap();
        let mut out = Vec::new();
        dump_program(&mut out, &prog, format_args!("program")).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "program: \n  load 'x'\n  call 'sin'\n  load 'x'\n  call 'div'\n"
        );
    }

    #[test]
    fn examples_compile() {
        for example in EXAMPLES {
            assert!(dialect::compile(example, &USER).is_ok(), "{example}");
        }
    }
}
