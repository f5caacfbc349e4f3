use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use crate::util::HashMap;
use crate::{Dense, Error, Future, Literal, Wildcard};

/// A lazy matrix expression.
///
/// An [`Expr`] is a cheap, shared handle to an immutable [`Node`]. The
/// algebra methods ([`add`](Expr::add), [`mul`](Expr::mul),
/// [`t`](Expr::t), ...) never compute anything; they build a bigger tree
/// whose leaves are the handles you passed in. Using the same handle twice
/// makes the tree a DAG, and the rewrite engine cares about that: repeated
/// wildcards only match the *same* handle (see [`Expr::same`]).
///
/// Nothing is computed until you call [`eval`](Expr::eval) (or read single
/// elements with [`at`](Expr::at)). Both assume the tree is dimensionally
/// sound, which is what [`validate`](Expr::validate) checks, so the usual
/// sequence is "validate, then compute":
///
/// ```
/// use matexp::{Dense, Error, Expr};
///
/// let a = Expr::literal(Dense::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap());
/// let b = Expr::literal(Dense::ones(3, 2));
///
/// let ab = a.mul(&b);
/// assert_eq!(ab.dims(), (2, 2));
/// assert!(ab.validate().is_ok());
/// assert_eq!(ab.eval().as_vector(), vec![6.0, 6.0, 15.0, 15.0]);
///
/// assert_eq!(
///     a.add(&b).validate(),
///     Err(Error::DimMismatch { r1: 2, c1: 3, r2: 3, c2: 2 })
/// );
/// ```
#[derive(Clone)]
pub struct Expr(Arc<Node>);

/// One node of an [`Expr`] tree.
///
/// Binary operators hold their operands as `[left, right]`.
#[derive(Clone)]
pub enum Node {
    /// A matrix in memory.
    Literal(Dense),
    /// Matrix addition.
    Add([Expr; 2]),
    /// Matrix subtraction, `left - right`.
    Sub([Expr; 2]),
    /// Matrix multiplication.
    Mul([Expr; 2]),
    /// Elementwise multiplication.
    MulElem([Expr; 2]),
    /// Elementwise division, `left ./ right`.
    DivElem([Expr; 2]),
    /// Multiplication by a scalar constant.
    Scale(f64, Expr),
    /// Transpose.
    Transpose(Expr),
    /// Evaluates its operand on a background thread.
    Async(Expr),
    /// A matrix being computed in the background.
    Future(Future),
    /// A template placeholder.
    Wildcard(Wildcard),
}

/// The operator of a [`Node`], without its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    /// [`Node::Literal`]
    Literal,
    /// [`Node::Add`]
    Add,
    /// [`Node::Sub`]
    Sub,
    /// [`Node::Mul`]
    Mul,
    /// [`Node::MulElem`]
    MulElem,
    /// [`Node::DivElem`]
    DivElem,
    /// [`Node::Scale`]
    Scale,
    /// [`Node::Transpose`]
    Transpose,
    /// [`Node::Async`]
    Async,
    /// [`Node::Future`]
    Future,
    /// [`Node::Wildcard`]
    Wildcard,
}

impl Kind {
    /// The operator as it is written in pattern syntax.
    pub fn op(self) -> &'static str {
        match self {
            Kind::Literal => "literal",
            Kind::Add => "+",
            Kind::Sub => "-",
            Kind::Mul => "*",
            Kind::MulElem => ".*",
            Kind::DivElem => "./",
            Kind::Scale => "scale",
            Kind::Transpose => "t",
            Kind::Async => "async",
            Kind::Future => "future",
            Kind::Wildcard => "wildcard",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.op())
    }
}

impl Node {
    /// Returns the operator of this node.
    pub fn kind(&self) -> Kind {
        match self {
            Node::Literal(_) => Kind::Literal,
            Node::Add(_) => Kind::Add,
            Node::Sub(_) => Kind::Sub,
            Node::Mul(_) => Kind::Mul,
            Node::MulElem(_) => Kind::MulElem,
            Node::DivElem(_) => Kind::DivElem,
            Node::Scale(..) => Kind::Scale,
            Node::Transpose(_) => Kind::Transpose,
            Node::Async(_) => Kind::Async,
            Node::Future(_) => Kind::Future,
            Node::Wildcard(_) => Kind::Wildcard,
        }
    }

    /// The operands of this node, left to right. Leaves have none.
    pub fn children(&self) -> &[Expr] {
        match self {
            Node::Add(c) | Node::Sub(c) | Node::Mul(c) | Node::MulElem(c) | Node::DivElem(c) => c,
            Node::Scale(_, m) | Node::Transpose(m) | Node::Async(m) => std::slice::from_ref(m),
            Node::Literal(_) | Node::Future(_) | Node::Wildcard(_) => &[],
        }
    }

    /// Returns true if this node has no operands.
    pub fn is_leaf(&self) -> bool {
        self.children().is_empty()
    }

    /// Builds a node of the same kind whose operands are determined by the
    /// given function, stopping at the first error. Scalar constants are
    /// kept as they are.
    pub fn try_map_children<E, F>(&self, mut f: F) -> Result<Node, E>
    where
        F: FnMut(&Expr) -> Result<Expr, E>,
    {
        Ok(match self {
            Node::Add([l, r]) => Node::Add([f(l)?, f(r)?]),
            Node::Sub([l, r]) => Node::Sub([f(l)?, f(r)?]),
            Node::Mul([l, r]) => Node::Mul([f(l)?, f(r)?]),
            Node::MulElem([l, r]) => Node::MulElem([f(l)?, f(r)?]),
            Node::DivElem([l, r]) => Node::DivElem([f(l)?, f(r)?]),
            Node::Scale(c, m) => Node::Scale(*c, f(m)?),
            Node::Transpose(m) => Node::Transpose(f(m)?),
            Node::Async(m) => Node::Async(f(m)?),
            Node::Literal(_) | Node::Future(_) | Node::Wildcard(_) => self.clone(),
        })
    }

    /// Infallible version of [`try_map_children`](Node::try_map_children).
    pub fn map_children<F>(&self, mut f: F) -> Node
    where
        F: FnMut(&Expr) -> Expr,
    {
        match self.try_map_children::<Infallible, _>(|c| Ok(f(c))) {
            Ok(node) => node,
            Err(never) => match never {},
        }
    }
}

pub(crate) fn wildcard_misuse(w: Wildcard, what: &str) -> ! {
    panic!("cannot {} wildcard {}: wildcards only belong in templates", what, w)
}

impl Expr {
    /// Wraps a node into a new expression handle.
    pub fn new(node: Node) -> Self {
        Expr(Arc::new(node))
    }

    /// A literal leaf.
    pub fn literal(dense: Dense) -> Self {
        Expr::new(Node::Literal(dense))
    }

    /// The node this handle points to.
    pub fn node(&self) -> &Node {
        &self.0
    }

    /// The operator of the root node.
    pub fn kind(&self) -> Kind {
        self.node().kind()
    }

    /// The operands of the root node.
    pub fn children(&self) -> &[Expr] {
        self.node().children()
    }

    /// Returns true if both handles point to the very same node.
    ///
    /// This is identity, not structural equality: two separately built
    /// literals with equal contents are not the same.
    pub fn same(&self, other: &Expr) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Transpose.
    pub fn t(&self) -> Expr {
        Expr::new(Node::Transpose(self.clone()))
    }

    /// Matrix addition.
    pub fn add(&self, other: &Expr) -> Expr {
        Expr::new(Node::Add([self.clone(), other.clone()]))
    }

    /// Subtracts `other` from `self`.
    pub fn sub(&self, other: &Expr) -> Expr {
        Expr::new(Node::Sub([self.clone(), other.clone()]))
    }

    /// Scalar multiplication.
    ///
    /// Scaling a [`Node::Scale`] folds the two constants into one node.
    pub fn scale(&self, c: f64) -> Expr {
        match self.node() {
            Node::Scale(c0, m) => Expr::new(Node::Scale(c * c0, m.clone())),
            _ => Expr::new(Node::Scale(c, self.clone())),
        }
    }

    /// Matrix multiplication.
    pub fn mul(&self, other: &Expr) -> Expr {
        Expr::new(Node::Mul([self.clone(), other.clone()]))
    }

    /// Elementwise multiplication.
    pub fn mul_elem(&self, other: &Expr) -> Expr {
        Expr::new(Node::MulElem([self.clone(), other.clone()]))
    }

    /// Elementwise division of `self` by `other`.
    pub fn div_elem(&self, other: &Expr) -> Expr {
        Expr::new(Node::DivElem([self.clone(), other.clone()]))
    }

    /// Marks this expression for background evaluation: evaluating the
    /// result starts a [`Future`] instead of computing synchronously.
    ///
    /// Wrapping independent operands lets them compute concurrently:
    ///
    /// ```
    /// use matexp::{Dense, Expr};
    ///
    /// let a = Expr::literal(Dense::identity(4));
    /// let b = Expr::literal(Dense::ones(4, 4));
    /// let sum = a.mul(&b).async_().add(&b.mul(&a).async_());
    /// assert_eq!(sum.eval().as_vector(), vec![2.0; 16]);
    /// ```
    pub fn async_(&self) -> Expr {
        Expr::new(Node::Async(self.clone()))
    }

    /// Returns `(rows, cols)`.
    ///
    /// This never blocks and never fails. A [`Wildcard`] reports `(0, 0)`.
    pub fn dims(&self) -> (usize, usize) {
        match self.node() {
            Node::Literal(d) => d.dims(),
            Node::Add([l, _]) | Node::Sub([l, _]) | Node::MulElem([l, _]) | Node::DivElem([l, _]) => {
                l.dims()
            }
            Node::Mul([l, r]) => (l.dims().0, r.dims().1),
            Node::Scale(_, m) | Node::Async(m) => m.dims(),
            Node::Transpose(m) => {
                let (r, c) = m.dims();
                (c, r)
            }
            Node::Future(f) => f.dims(),
            Node::Wildcard(_) => (0, 0),
        }
    }

    /// Returns the element at `(row, col)` without evaluating the whole
    /// expression.
    ///
    /// A product costs one dot product over the inner dimension per call;
    /// nothing is cached. Reading from a [`Future`] blocks until it is done.
    ///
    /// # Panics
    /// Panics if the expression contains a [`Wildcard`], or if `(row, col)`
    /// is out of range of a literal it reaches. The result is unspecified on
    /// a tree that doesn't [`validate`](Expr::validate).
    pub fn at(&self, row: usize, col: usize) -> f64 {
        match self.node() {
            Node::Literal(d) => d.at(row, col),
            Node::Add([l, r]) => l.at(row, col) + r.at(row, col),
            Node::Sub([l, r]) => l.at(row, col) - r.at(row, col),
            Node::MulElem([l, r]) => l.at(row, col) * r.at(row, col),
            Node::DivElem([l, r]) => l.at(row, col) / r.at(row, col),
            Node::Mul([l, r]) => {
                let (_, n) = l.dims();
                (0..n).map(|i| l.at(row, i) * r.at(i, col)).sum()
            }
            Node::Scale(c, m) => m.at(row, col) * c,
            Node::Transpose(m) => m.at(col, row),
            Node::Async(m) => m.at(row, col),
            Node::Future(f) => f.at(row, col),
            Node::Wildcard(w) => wildcard_misuse(*w, "read from"),
        }
    }

    /// Evaluates the expression into a [`Literal`].
    ///
    /// Evaluation is a synchronous, depth-first walk, except that every
    /// [`async_`](Expr::async_) node it reaches starts a background thread
    /// and evaluates to a pending literal right away. Operators only block on
    /// a pending operand when they need its values, after both operands have
    /// been started.
    ///
    /// # Panics
    /// Panics if the expression contains a [`Wildcard`]. The result is
    /// unspecified (and may panic) on a tree that doesn't
    /// [`validate`](Expr::validate).
    pub fn eval(&self) -> Literal {
        match self.node() {
            Node::Literal(d) => Literal::Ready(d.clone()),
            Node::Add([l, r]) => self.elementwise(l, r, |a, b| a + b),
            Node::Sub([l, r]) => self.elementwise(l, r, |a, b| a - b),
            Node::MulElem([l, r]) => self.elementwise(l, r, |a, b| a * b),
            Node::DivElem([l, r]) => self.elementwise(l, r, |a, b| a / b),
            Node::Mul([l, r]) => {
                let (left, right) = (l.eval(), r.eval());
                Literal::Ready(Dense::gemm(left.as_dense(), right.as_dense()))
            }
            Node::Scale(c, m) => {
                let mut d = m.eval().into_dense();
                d.map_in_place(|v| v * c);
                Literal::Ready(d)
            }
            Node::Transpose(m) => Literal::Ready(m.eval().as_dense().transpose()),
            Node::Async(m) => Literal::Pending(Future::spawn(m.clone())),
            Node::Future(f) => Literal::Pending(f.clone()),
            Node::Wildcard(w) => wildcard_misuse(*w, "evaluate"),
        }
    }

    fn elementwise(&self, l: &Expr, r: &Expr, f: impl Fn(f64, f64) -> f64) -> Literal {
        let (rows, cols) = self.dims();
        // start both sides before blocking on either
        let (left, right) = (l.eval(), r.eval());
        let right = right.into_vector();
        Literal::Ready(Dense::zip_with(rows, cols, left.into_vector(), &right, f))
    }

    /// Checks that every operator in the tree gets operands of agreeable
    /// shapes, returning the first problem found.
    ///
    /// The walk is depth first, left operand before right operand, and a
    /// node's own constraint is only checked once both operands passed.
    /// A [`Future`] blocks until it is done and reports the error its
    /// background evaluation ran into.
    ///
    /// # Panics
    /// Panics if the expression contains a [`Wildcard`].
    pub fn validate(&self) -> Result<(), Error> {
        match self.node() {
            Node::Literal(_) => Ok(()),
            Node::Add([l, r]) | Node::Sub([l, r]) | Node::MulElem([l, r]) | Node::DivElem([l, r]) => {
                l.validate()?;
                r.validate()?;
                let (r1, c1) = l.dims();
                let (r2, c2) = r.dims();
                if r1 != r2 || c1 != c2 {
                    return Err(Error::DimMismatch { r1, c1, r2, c2 });
                }
                Ok(())
            }
            Node::Mul([l, r]) => {
                l.validate()?;
                r.validate()?;
                let (_, cols) = l.dims();
                let (rows, _) = r.dims();
                if cols != rows {
                    return Err(Error::InnerDimMismatch { cols, rows });
                }
                Ok(())
            }
            Node::Scale(_, m) | Node::Transpose(m) | Node::Async(m) => m.validate(),
            Node::Future(f) => f.validate(),
            Node::Wildcard(w) => wildcard_misuse(*w, "validate"),
        }
    }

    /// Makes a deep copy that shares no storage with `self`.
    ///
    /// Sub-expressions shared within `self` stay shared within the copy.
    /// A [`Future`] is waited on and its result copied. Wildcards are the
    /// exception: a wildcard's copy is itself, so that copies of a template
    /// keep matching the same wildcards.
    pub fn copy(&self) -> Expr {
        let mut memo = HashMap::default();
        self.copy_rec(&mut memo)
    }

    fn copy_rec(&self, memo: &mut HashMap<usize, Expr>) -> Expr {
        if let Some(done) = memo.get(&self.addr()) {
            return done.clone();
        }
        let copy = match self.node() {
            Node::Literal(d) => Expr::literal(d.clone()),
            Node::Future(f) => Expr::from(f.copy()),
            Node::Wildcard(_) => self.clone(),
            node => Expr::new(node.map_children(|c| c.copy_rec(memo))),
        };
        memo.insert(self.addr(), copy.clone());
        copy
    }

    /// Evaluates both expressions and compares their dimensions and values.
    pub fn equals(&self, other: &Expr) -> bool {
        self.dims() == other.dims() && self.eval() == other.eval()
    }

    /// Iterates over the wildcards in this expression, in depth-first,
    /// left-to-right order. Repeated wildcards are repeated.
    pub fn wildcards(&self) -> impl Iterator<Item = Wildcard> {
        let mut stack = vec![self.clone()];
        std::iter::from_fn(move || {
            while let Some(e) = stack.pop() {
                if let Node::Wildcard(w) = e.node() {
                    return Some(*w);
                }
                stack.extend(e.children().iter().rev().cloned());
            }
            None
        })
    }
}

impl From<Dense> for Expr {
    fn from(d: Dense) -> Self {
        Expr::literal(d)
    }
}

impl From<Future> for Expr {
    fn from(f: Future) -> Self {
        Expr::new(Node::Future(f))
    }
}

impl From<Literal> for Expr {
    fn from(l: Literal) -> Self {
        match l {
            Literal::Ready(d) => Expr::literal(d),
            Literal::Pending(f) => Expr::from(f),
        }
    }
}

impl From<Wildcard> for Expr {
    fn from(w: Wildcard) -> Self {
        Expr::new(Node::Wildcard(w))
    }
}

/// Evaluates both expressions and compares their dimensions and values.
///
/// Shorthand for [`a.equals(b)`](Expr::equals).
pub fn equals(a: &Expr, b: &Expr) -> bool {
    a.equals(b)
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(rows: &[&[f64]]) -> Expr {
        Expr::literal(Dense::from_rows(rows).unwrap())
    }

    #[test]
    fn dims_of_each_node() {
        let a = Expr::literal(Dense::zeros(2, 3));
        let b = Expr::literal(Dense::zeros(3, 4));
        assert_eq!(a.t().dims(), (3, 2));
        assert_eq!(a.mul(&b).dims(), (2, 4));
        assert_eq!(a.add(&a).scale(2.0).dims(), (2, 3));
        assert_eq!(a.async_().dims(), (2, 3));
        assert_eq!(Wildcard::new().expr().dims(), (0, 0));
    }

    #[test]
    fn at_matches_eval() {
        let a = lit(&[&[1.0, 2.0], &[3.0, 4.0]]);
        let b = lit(&[&[0.5, -1.0], &[2.0, 0.0]]);
        let exprs = vec![
            a.add(&b),
            a.sub(&b),
            a.mul(&b),
            a.mul_elem(&b),
            a.div_elem(&b.add(&a)),
            a.t().mul(&b).scale(-3.0),
            a.async_().sub(&b.t()),
        ];
        for e in exprs {
            assert!(e.validate().is_ok());
            let lit = e.eval();
            for r in 0..2 {
                for c in 0..2 {
                    assert_eq!(e.at(r, c), lit.at(r, c), "{} at ({}, {})", e, r, c);
                }
            }
        }
    }

    #[test]
    fn scale_folds() {
        let a = lit(&[&[1.0, 2.0]]);
        let s = a.scale(2.0).scale(3.0);
        match s.node() {
            Node::Scale(c, m) => {
                assert_eq!(*c, 6.0);
                assert!(m.same(&a));
            }
            _ => panic!("expected a scale node"),
        }
        assert_eq!(s.eval().as_vector(), vec![6.0, 12.0]);
    }

    #[test]
    fn validate_reports_first_error() {
        let a = Expr::literal(Dense::zeros(2, 3));
        let b = Expr::literal(Dense::zeros(3, 2));
        assert_eq!(
            a.mul(&a).validate(),
            Err(Error::InnerDimMismatch { cols: 3, rows: 2 })
        );
        // the left operand's error wins over the node's own mismatch
        assert_eq!(
            a.add(&b).add(&b.mul(&b)).validate(),
            Err(Error::DimMismatch {
                r1: 2,
                c1: 3,
                r2: 3,
                c2: 2
            })
        );
        assert!(a.mul(&b).t().scale(2.0).async_().validate().is_ok());
    }

    #[test]
    fn copy_is_deep_and_keeps_sharing() {
        let a = lit(&[&[1.0]]);
        let e = a.add(&a);
        let copy = e.copy();
        let (l, r) = (&copy.children()[0], &copy.children()[1]);
        assert!(!l.same(&a));
        assert!(l.same(r));
        assert!(copy.equals(&e));

        let w = Wildcard::new().expr();
        assert!(w.copy().same(&w));
        assert!(w.t().copy().children()[0].same(&w));
    }

    #[test]
    fn wildcards_in_order() {
        let a = Wildcard::new();
        let b = Wildcard::new();
        let e = a.expr().t().add(&b.expr().mul(&a.expr()));
        assert_eq!(e.wildcards().collect::<Vec<_>>(), vec![a, b, a]);
    }

    #[test]
    #[should_panic(expected = "wildcards only belong in templates")]
    fn at_wildcard_panics() {
        crate::wildcard().at(0, 0);
    }

    #[test]
    #[should_panic(expected = "wildcards only belong in templates")]
    fn eval_wildcard_panics() {
        Wildcard::new().expr().t().eval();
    }

    #[test]
    #[should_panic(expected = "wildcards only belong in templates")]
    fn validate_wildcard_panics() {
        let a = Expr::literal(Dense::zeros(1, 1));
        let _ = a.add(&Wildcard::new().expr()).validate();
    }

    #[test]
    fn division_by_zero_is_ieee() {
        let a = lit(&[&[1.0, 0.0, -1.0]]);
        let z = Expr::literal(Dense::zeros(1, 3));
        let v = a.div_elem(&z).eval().as_vector();
        assert_eq!(v[0], f64::INFINITY);
        assert!(v[1].is_nan());
        assert_eq!(v[2], f64::NEG_INFINITY);
    }
}
