use std::fmt;

use log::*;
use thiserror::Error;

use crate::util::{HashMap, IndexSet};
use crate::{construct, match_expr, Bindings, Expr, MatchError, TemplateError, Wildcard};

/// Something that turns one expression into an equivalent one.
///
/// [`Template`] is the main implementation; [`Everywhere`] lifts any
/// rewriter from the root of a tree to all of its nodes.
/// A [`Compiler`](crate::Compiler) runs a list of them in order.
pub trait Rewriter {
    /// The name used in logs and errors.
    fn name(&self) -> &str;

    /// Rewrites `expr`, or explains why it can't. Must not change `expr`.
    fn rewrite(&self, expr: &Expr) -> Result<Expr, RewriteError>;
}

/// An error from applying a [`Rewriter`].
#[derive(Debug, Clone, Error)]
pub enum RewriteError {
    /// The expression doesn't have the shape the rule looks for.
    #[error(transparent)]
    Match(#[from] MatchError),
    /// The rule itself is broken.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// An example-based rewrite rule: an expression shaped like `from` becomes
/// one shaped like `to`.
///
/// Both sides are ordinary [`Expr`]s built from the same [`Wildcard`]s, so
/// they can be written with the expression algebra or parsed from pattern
/// syntax (the [`template!`](crate::template) macro does the latter).
/// A template is meant to be built once and applied many times.
///
/// ```
/// use matexp::{template, Dense, Expr};
///
/// let rule = template!("transpose-add"; "(+ (t ?a) (t ?b))" => "(t (+ ?a ?b))");
///
/// let a = Expr::literal(Dense::zeros(10, 1));
/// let b = Expr::literal(Dense::ones(10, 1));
/// let before = a.t().add(&b.t());
///
/// let after = rule.rewrite(&before).unwrap();
/// assert_eq!(after.to_string(), "(t (+ [10x1] [10x1]))");
/// assert!(after.equals(&before));
/// ```
#[derive(Clone)]
pub struct Template {
    name: String,
    from: Expr,
    to: Expr,
}

impl Template {
    /// Creates a new [`Template`]. You typically want to use the
    /// [`template!`](crate::template) macro instead.
    pub fn new(name: impl Into<String>, from: Expr, to: Expr) -> Self {
        Template {
            name: name.into(),
            from,
            to,
        }
    }

    /// Returns the name of the template.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The pattern an expression has to match.
    pub fn from(&self) -> &Expr {
        &self.from
    }

    /// The pattern a match is rebuilt into.
    pub fn to(&self) -> &Expr {
        &self.to
    }

    /// The wildcards bound by matching [`from`](Template::from), in the
    /// order they are first met.
    pub fn vars(&self) -> Vec<Wildcard> {
        let vars: IndexSet<Wildcard> = self.from.wildcards().collect();
        vars.into_iter().collect()
    }

    /// Checks that every wildcard of [`to`](Template::to) is bound by
    /// [`from`](Template::from), so that a successful match always
    /// constructs.
    pub fn check(&self) -> Result<(), TemplateError> {
        let bound: IndexSet<Wildcard> = self.from.wildcards().collect();
        match self.to.wildcards().find(|w| !bound.contains(w)) {
            Some(w) => Err(TemplateError::Unbound(w)),
            None => Ok(()),
        }
    }

    /// Matches `expr` against [`from`](Template::from) and returns the
    /// bindings.
    pub fn matches(&self, expr: &Expr) -> Result<Bindings, MatchError> {
        let mut bindings = Bindings::default();
        match_expr(expr, &self.from, &mut bindings)?;
        Ok(bindings)
    }

    /// Matches `expr` against [`from`](Template::from), then builds
    /// [`to`](Template::to) from what the wildcards matched.
    ///
    /// `expr` is left untouched; the result shares every matched
    /// sub-expression with it.
    pub fn rewrite(&self, expr: &Expr) -> Result<Expr, RewriteError> {
        let bindings = match self.matches(expr) {
            Ok(bindings) => bindings,
            Err(err) => {
                debug!("Template '{}' doesn't match: {}", self.name, err);
                return Err(err.into());
            }
        };
        let rewritten = construct(&self.to, &bindings)?;
        debug!("Template '{}' rewrote {} into {}", self.name, expr, rewritten);
        Ok(rewritten)
    }

    /// The same rule, the other way around.
    pub fn flip(&self) -> Self {
        Template {
            name: format!("{}-rev", self.name),
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }

    /// Applies this template at every node it matches instead of only at
    /// the root. See [`Everywhere`].
    pub fn everywhere(self) -> Everywhere<Self> {
        Everywhere::new(self)
    }
}

impl Rewriter for Template {
    fn name(&self) -> &str {
        &self.name
    }

    fn rewrite(&self, expr: &Expr) -> Result<Expr, RewriteError> {
        Template::rewrite(self, expr)
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Template({}: {} => {})", self.name, self.from, self.to)
    }
}

/// Applies a [`Rewriter`] bottom up at every node of a tree.
///
/// Operands are rewritten before the node that holds them, and a node where
/// the inner rewriter reports a [`RewriteError::Match`] is simply kept.
/// Any other error is passed on. A sub-expression shared in several places
/// is only rewritten once and stays shared.
///
/// ```
/// use matexp::{template, Dense, Expr, Rewriter};
///
/// let hoist = template!("transpose-add"; "(+ (t ?a) (t ?b))" => "(t (+ ?a ?b))").everywhere();
///
/// let a = Expr::literal(Dense::ones(2, 3));
/// let e = a.t().add(&a.t()).mul(&a);
/// assert_eq!(hoist.rewrite(&e).unwrap().to_string(), "(* (t (+ [2x3] [2x3])) [2x3])");
/// ```
pub struct Everywhere<R> {
    name: String,
    inner: R,
}

impl<R: Rewriter> Everywhere<R> {
    /// Wraps `inner`.
    pub fn new(inner: R) -> Self {
        Everywhere {
            name: format!("{}-everywhere", inner.name()),
            inner,
        }
    }

    /// The wrapped rewriter.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn rewrite_rec(&self, expr: &Expr, memo: &mut HashMap<usize, Expr>) -> Result<Expr, RewriteError> {
        if let Some(done) = memo.get(&expr.addr()) {
            return Ok(done.clone());
        }

        let mut changed = false;
        let node = expr.node().try_map_children(|c| {
            let rewritten = self.rewrite_rec(c, memo)?;
            changed |= !rewritten.same(c);
            Ok::<_, RewriteError>(rewritten)
        })?;
        let rebuilt = if changed { Expr::new(node) } else { expr.clone() };

        let result = match self.inner.rewrite(&rebuilt) {
            Ok(rewritten) => rewritten,
            Err(RewriteError::Match(_)) => rebuilt,
            Err(err) => return Err(err),
        };
        memo.insert(expr.addr(), result.clone());
        Ok(result)
    }
}

impl<R: Rewriter> Rewriter for Everywhere<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn rewrite(&self, expr: &Expr) -> Result<Expr, RewriteError> {
        let mut memo = HashMap::default();
        self.rewrite_rec(expr, &mut memo)
    }
}
