use std::fmt;
use std::str::FromStr;

use symbolic_expressions::{parser::parse_str, Sexp, SexpError};
use thiserror::Error;

use crate::util::pretty_print;
use crate::{Expr, Kind, Node, Wildcard};

/// An error resulting from parsing a pattern [`Expr`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ParseError: {0}")]
pub struct ParseError(String);

type Result<T> = std::result::Result<T, ParseError>;

impl From<SexpError> for ParseError {
    fn from(e: SexpError) -> ParseError {
        ParseError(e.to_string())
    }
}

impl Expr {
    /// Converts this expression to an s-expression.
    ///
    /// Operators print as `+ - * .* ./ t async`, scaling as
    /// `(scale c x)`, wildcards by name. Literals print only their shape
    /// (`[2x3]`) and futures as `(future 2x3)`; neither can be parsed back.
    pub fn to_sexp(&self) -> Sexp {
        let op = |k: Kind| Sexp::String(k.op().to_owned());
        match self.node() {
            Node::Literal(d) => {
                let (r, c) = d.dims();
                Sexp::String(format!("[{}x{}]", r, c))
            }
            Node::Future(f) => {
                let (r, c) = f.dims();
                Sexp::List(vec![op(Kind::Future), Sexp::String(format!("{}x{}", r, c))])
            }
            Node::Wildcard(w) => Sexp::String(w.name()),
            Node::Scale(c, m) => Sexp::List(vec![op(Kind::Scale), Sexp::String(c.to_string()), m.to_sexp()]),
            node => {
                let mut list = vec![op(node.kind())];
                list.extend(node.children().iter().map(|c| c.to_sexp()));
                Sexp::List(list)
            }
        }
    }

    /// Pretty prints this expression, breaking lines longer than `width`.
    pub fn pretty(&self, width: usize) -> String {
        let mut buf = String::new();
        // writing to a String can't fail
        let _ = pretty_print(&mut buf, &self.to_sexp(), width, 1);
        buf
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = String::new();
        pretty_print(&mut buf, &self.to_sexp(), usize::MAX, 0)?;
        f.write_str(&buf)
    }
}

/// Parses a pattern.
///
/// Only operators, scale constants and wildcards can be written down;
/// concrete matrices have no textual form.
///
/// ```
/// use matexp::{Expr, Kind};
///
/// let p: Expr = "(t (+ ?a (scale 2 ?b)))".parse().unwrap();
/// assert_eq!(p.kind(), Kind::Transpose);
/// assert_eq!(p.to_string(), "(t (+ ?a (scale 2 ?b)))");
/// ```
impl FromStr for Expr {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self> {
        let sexp = parse_str(s.trim())?;
        parse_term(&sexp)
    }
}

fn arity(sexps: &[Sexp], n: usize, op: &str) -> Result<()> {
    if sexps.len() != n {
        return Err(ParseError(format!(
            "'{}' takes {} operands, got {}",
            op,
            n,
            sexps.len()
        )));
    }
    Ok(())
}

fn parse_term(sexp: &Sexp) -> Result<Expr> {
    match sexp {
        Sexp::String(s) => {
            if s.starts_with('?') {
                s.parse::<Wildcard>().map(Expr::from).map_err(ParseError)
            } else {
                Err(ParseError(format!(
                    "Couldn't parse '{}': only wildcards can be leaves of a pattern",
                    s
                )))
            }
        }

        Sexp::List(list) => {
            let (op, args) = match list.split_first() {
                Some((Sexp::String(op), args)) => (op.as_str(), args),
                Some((op_sexp, _)) => {
                    return Err(ParseError(format!("expected op, got {}", op_sexp)))
                }
                None => return Err(ParseError("empty list".into())),
            };

            let binary = |make: fn([Expr; 2]) -> Node| -> Result<Expr> {
                arity(args, 2, op)?;
                Ok(Expr::new(make([parse_term(&args[0])?, parse_term(&args[1])?])))
            };
            let unary = |make: fn(Expr) -> Node| -> Result<Expr> {
                arity(args, 1, op)?;
                Ok(Expr::new(make(parse_term(&args[0])?)))
            };

            match op {
                "+" => binary(Node::Add),
                "-" => binary(Node::Sub),
                "*" => binary(Node::Mul),
                ".*" => binary(Node::MulElem),
                "./" => binary(Node::DivElem),
                "t" => unary(Node::Transpose),
                "async" => unary(Node::Async),
                "scale" => {
                    arity(args, 2, op)?;
                    let c = match &args[0] {
                        Sexp::String(c) => c
                            .parse::<f64>()
                            .map_err(|_| ParseError(format!("bad scale constant: {}", c)))?,
                        other => return Err(ParseError(format!("bad scale constant: {}", other))),
                    };
                    Ok(Expr::new(Node::Scale(c, parse_term(&args[1])?)))
                }
                _ => Err(ParseError(format!("bad op: {}", op))),
            }
        }
        Sexp::Empty => Err(ParseError("empty!".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Dense;

    #[test]
    fn parse_and_print() {
        for s in &[
            "?a",
            "(+ (t ?a) (t ?b))",
            "(- ?a (* ?b ?c))",
            "(./ (.* ?x ?y) ?x)",
            "(async (scale -1.5 ?a))",
        ] {
            let e: Expr = s.parse().unwrap();
            assert_eq!(&e.to_string(), s);
        }
    }

    #[test]
    fn same_name_same_wildcard() {
        let e: Expr = "(* ?x (t ?x))".parse().unwrap();
        let ws: Vec<_> = e.wildcards().collect();
        assert_eq!(ws.len(), 2);
        assert_eq!(ws[0], ws[1]);
    }

    #[test]
    fn parse_errors() {
        assert!("(+ ?a)".parse::<Expr>().is_err());
        assert!("(t ?a ?b)".parse::<Expr>().is_err());
        assert!("(pow ?a ?b)".parse::<Expr>().is_err());
        assert!("(scale two ?a)".parse::<Expr>().is_err());
        assert!("a".parse::<Expr>().is_err());
        assert!("()".parse::<Expr>().is_err());
    }

    #[test]
    fn literals_print_their_shape() {
        let a = Expr::literal(Dense::zeros(2, 3));
        assert_eq!(a.t().add(&a.t()).to_string(), "(+ (t [2x3]) (t [2x3]))");
        assert_eq!(Expr::from(crate::Future::ready(Dense::zeros(1, 4))).to_string(), "(future 1x4)");
    }

    #[test]
    fn pretty_breaks_long_lines() {
        let e: Expr = "(+ (* ?first_operand ?second_operand) (* ?third_operand ?fourth_operand))"
            .parse()
            .unwrap();
        assert!(e.pretty(20).contains('\n'));
        assert!(!e.pretty(200).contains('\n'));
    }
}
