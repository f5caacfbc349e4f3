use log::*;
use thiserror::Error;

use crate::{Bindings, Expr, Kind, Node, Wildcard};

/// Why an expression didn't match a pattern.
#[derive(Debug, Clone, Error)]
pub enum MatchError {
    /// The pattern wanted a different operator here.
    #[error("expected {expected} but found {found}")]
    KindMismatch { expected: Kind, found: Kind },
    /// A wildcard that occurs more than once would have to stand for two
    /// different sub-expressions.
    #[error("wildcard {wildcard} is bound to {bound} but would also have to match {found}")]
    Rebinding {
        wildcard: Wildcard,
        bound: Expr,
        found: Expr,
    },
    /// The pattern contains a concrete leaf, and the expression has a
    /// different one in its place.
    #[error("pattern leaf {expected} is not {found}")]
    LeafMismatch { expected: Expr, found: Expr },
}

/// A problem with a template's target pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// The target refers to a wildcard that matching the source never
    /// binds.
    #[error("refers to unbound wildcard {0}")]
    Unbound(Wildcard),
}

/// Matches `candidate` against `pattern`, recording in `bindings` what each
/// wildcard stood for.
///
/// The walk is depth first, operands left to right, and stops at the first
/// mismatch. Operators must agree kind for kind; a scale's constant is not
/// compared. A wildcard binds to whatever sits in its place, and every later
/// occurrence of the same wildcard must find the very same handle (see
/// [`Expr::same`]). Concrete leaves in the pattern only match themselves.
///
/// On failure `bindings` may hold a partial match.
///
/// ```
/// use matexp::{match_expr, Bindings, Dense, Expr, Wildcard};
///
/// let x: Wildcard = "?x".parse().unwrap();
/// let pattern = Expr::from(x).mul(&Expr::from(x).t());
///
/// let a = Expr::literal(Dense::ones(2, 2));
/// let b = Expr::literal(Dense::ones(2, 2));
///
/// let mut bindings = Bindings::default();
/// assert!(match_expr(&a.mul(&a.t()), &pattern, &mut bindings).is_ok());
/// assert!(bindings[x].same(&a));
///
/// let mut bindings = Bindings::default();
/// assert!(match_expr(&a.mul(&b.t()), &pattern, &mut bindings).is_err());
/// ```
pub fn match_expr(candidate: &Expr, pattern: &Expr, bindings: &mut Bindings) -> Result<(), MatchError> {
    match_rec(0, candidate, pattern, bindings)
}

fn match_rec(
    depth: usize,
    candidate: &Expr,
    pattern: &Expr,
    bindings: &mut Bindings,
) -> Result<(), MatchError> {
    let indent = "    ".repeat(depth);
    trace!("{}match {} against {}", indent, candidate, pattern);

    match pattern.node() {
        Node::Wildcard(w) => match bindings.get(*w) {
            None => {
                trace!("{}bound wildcard {} to {}", indent, w, candidate);
                bindings.insert(*w, candidate.clone());
                Ok(())
            }
            Some(bound) if bound.same(candidate) => Ok(()),
            Some(bound) => {
                trace!("{}failed to rebind wildcard {}", indent, w);
                Err(MatchError::Rebinding {
                    wildcard: *w,
                    bound: bound.clone(),
                    found: candidate.clone(),
                })
            }
        },
        Node::Literal(_) | Node::Future(_) => {
            if pattern.same(candidate) {
                Ok(())
            } else {
                Err(MatchError::LeafMismatch {
                    expected: pattern.clone(),
                    found: candidate.clone(),
                })
            }
        }
        node => {
            if node.kind() != candidate.kind() {
                trace!("{}expected {}, found {}", indent, node.kind(), candidate.kind());
                return Err(MatchError::KindMismatch {
                    expected: node.kind(),
                    found: candidate.kind(),
                });
            }
            for (p, c) in node.children().iter().zip(candidate.children()) {
                match_rec(depth + 1, c, p, bindings)?;
            }
            Ok(())
        }
    }
}

/// Builds `pattern` with every wildcard replaced by what it is bound to.
///
/// Bound sub-expressions are shared, not copied. Operator nodes are rebuilt
/// with the pattern's kind and, for a scale, the pattern's constant.
/// Concrete leaves of the pattern are reused as they are.
pub fn construct(pattern: &Expr, bindings: &Bindings) -> Result<Expr, TemplateError> {
    match pattern.node() {
        Node::Wildcard(w) => bindings.get(*w).cloned().ok_or(TemplateError::Unbound(*w)),
        Node::Literal(_) | Node::Future(_) => Ok(pattern.clone()),
        node => Ok(Expr::new(node.try_map_children(|c| construct(c, bindings))?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Dense;

    fn w(name: &str) -> Expr {
        name.parse::<Wildcard>().unwrap().expr()
    }

    #[test]
    fn kind_mismatch_names_both_kinds() {
        crate::init_logger();
        let a = Expr::literal(Dense::zeros(2, 2));
        let pattern = w("?pk_a").t().add(&w("?pk_b").t());
        let mut bindings = Bindings::default();
        let err = match_expr(&a.t().sub(&a.t()), &pattern, &mut bindings).unwrap_err();
        match err {
            MatchError::KindMismatch { expected, found } => {
                assert_eq!(expected, Kind::Add);
                assert_eq!(found, Kind::Sub);
            }
            other => panic!("unexpected error {}", other),
        }

        let err = match_expr(&a.add(&a.t()), &pattern, &mut Bindings::default()).unwrap_err();
        assert!(matches!(
            err,
            MatchError::KindMismatch {
                expected: Kind::Transpose,
                found: Kind::Literal
            }
        ));
    }

    #[test]
    fn rebinding_conflict() {
        let a = Expr::literal(Dense::zeros(2, 2));
        let b = Expr::literal(Dense::zeros(2, 2));
        let x = w("?rb_x");
        let pattern = x.mul(&x.t());
        let mut bindings = Bindings::default();
        let err = match_expr(&a.mul(&b.t()), &pattern, &mut bindings).unwrap_err();
        match err {
            MatchError::Rebinding { bound, found, .. } => {
                assert!(bound.same(&a));
                assert!(found.same(&b));
            }
            other => panic!("unexpected error {}", other),
        }
    }

    #[test]
    fn structurally_equal_is_not_enough() {
        // equal contents, different handles
        let a = Expr::literal(Dense::ones(1, 1));
        let b = Expr::literal(Dense::ones(1, 1));
        let x = w("?se_x");
        assert!(match_expr(&a.add(&b), &x.add(&x), &mut Bindings::default()).is_err());
        assert!(match_expr(&a.add(&a), &x.add(&x), &mut Bindings::default()).is_ok());
    }

    #[test]
    fn scale_constant_is_ignored() {
        let a = Expr::literal(Dense::ones(1, 1));
        let pattern = w("?sc_a").scale(2.0);
        let mut bindings = Bindings::default();
        assert!(match_expr(&a.scale(5.0), &pattern, &mut bindings).is_ok());

        let built = construct(&pattern, &bindings).unwrap();
        match built.node() {
            Node::Scale(c, m) => {
                assert_eq!(*c, 2.0);
                assert!(m.same(&a));
            }
            _ => panic!("expected a scale node"),
        }
    }

    #[test]
    fn concrete_leaves_match_only_themselves() {
        let i = Expr::literal(Dense::identity(2));
        let other = Expr::literal(Dense::identity(2));
        let pattern = i.mul(&w("?cl_a"));
        assert!(match_expr(&i.mul(&other), &pattern, &mut Bindings::default()).is_ok());
        let err = match_expr(&other.mul(&i), &pattern, &mut Bindings::default()).unwrap_err();
        assert!(matches!(err, MatchError::LeafMismatch { .. }));
    }

    #[test]
    fn construct_substitutes_and_shares() {
        let a = Expr::literal(Dense::zeros(3, 1));
        let b = Expr::literal(Dense::ones(3, 1));
        let (pa, pb) = (w("?cs_a"), w("?cs_b"));
        let mut bindings = Bindings::default();
        match_expr(&a.t().add(&b.t()), &pa.t().add(&pb.t()), &mut bindings).unwrap();
        assert_eq!(bindings.len(), 2);

        let built = construct(&pa.add(&pb).t(), &bindings).unwrap();
        assert_eq!(built.kind(), Kind::Transpose);
        let sum = &built.children()[0];
        assert!(sum.children()[0].same(&a));
        assert!(sum.children()[1].same(&b));
    }

    #[test]
    fn construct_unbound() {
        let x: Wildcard = "?cu_x".parse().unwrap();
        let err = construct(&x.expr().t(), &Bindings::default()).unwrap_err();
        assert_eq!(err, TemplateError::Unbound(x));
        assert_eq!(err.to_string(), "refers to unbound wildcard ?cu_x");
    }
}
