use std::fmt;

use crate::{Dense, Error, Expr, Future};

/// The result of evaluating an [`Expr`]: a concrete matrix that is either
/// already in memory or still being computed in the background.
///
/// [`Expr::eval`] returns a [`Literal::Pending`] when the evaluated node is
/// an [`async_`](Expr::async_) wrapper or a [`Future`]; every other node
/// evaluates to a [`Literal::Ready`].
/// The accessors hide the difference: value reads block until a pending
/// literal is ready, [`dims`](Literal::dims) never blocks.
#[derive(Clone)]
pub enum Literal {
    /// A matrix in memory.
    Ready(Dense),
    /// A matrix being computed by a background thread.
    Pending(Future),
}

impl Literal {
    /// Returns `(rows, cols)` without blocking.
    pub fn dims(&self) -> (usize, usize) {
        match self {
            Literal::Ready(d) => d.dims(),
            Literal::Pending(f) => f.dims(),
        }
    }

    /// Returns the element at `(r, c)`, blocking on a pending literal.
    pub fn at(&self, r: usize, c: usize) -> f64 {
        self.as_dense().at(r, c)
    }

    /// Changes the element at `(r, c)`, blocking on a pending literal.
    ///
    /// A pending literal shares its result with every other handle to the
    /// same [`Future`], so it is first copied into this literal and turned
    /// into a [`Literal::Ready`]; the other handles don't see the change.
    pub fn set(&mut self, r: usize, c: usize, v: f64) {
        if let Literal::Pending(f) = self {
            let dense = f.wait().clone();
            *self = Literal::Ready(dense);
        }
        if let Literal::Ready(d) = self {
            d.set(r, c, v)
        }
    }

    /// Borrows the dense form, blocking on a pending literal. This is not a
    /// copy.
    pub fn as_dense(&self) -> &Dense {
        match self {
            Literal::Ready(d) => d,
            Literal::Pending(f) => f.wait(),
        }
    }

    /// Converts into the dense form, blocking on a pending literal.
    pub fn into_dense(self) -> Dense {
        match self {
            Literal::Ready(d) => d,
            Literal::Pending(f) => f.wait().clone(),
        }
    }

    /// Returns a row-major copy of all elements, blocking on a pending
    /// literal.
    pub fn as_vector(&self) -> Vec<f64> {
        self.as_dense().to_vec()
    }

    /// Like [`as_vector`](Literal::as_vector), but avoids the copy when this
    /// literal owns a compact buffer.
    pub fn into_vector(self) -> Vec<f64> {
        match self {
            Literal::Ready(d) => d.into_vec(),
            Literal::Pending(f) => f.as_vector(),
        }
    }

    /// A ready literal is always valid; a pending one blocks and reports the
    /// error its background evaluation ran into.
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            Literal::Ready(_) => Ok(()),
            Literal::Pending(f) => f.validate(),
        }
    }

    /// Deep copy, blocking on a pending literal.
    pub fn copy(&self) -> Literal {
        match self {
            Literal::Ready(d) => Literal::Ready(d.clone()),
            Literal::Pending(f) => Literal::Pending(f.copy()),
        }
    }

    /// Returns true if this literal holds its value in memory.
    pub fn is_ready(&self) -> bool {
        match self {
            Literal::Ready(_) => true,
            Literal::Pending(f) => f.is_ready(),
        }
    }

    /// Wraps this literal into an expression leaf.
    pub fn into_expr(self) -> Expr {
        Expr::from(self)
    }
}

impl From<Dense> for Literal {
    fn from(d: Dense) -> Self {
        Literal::Ready(d)
    }
}

impl From<Future> for Literal {
    fn from(f: Future) -> Self {
        Literal::Pending(f)
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        self.as_dense() == other.as_dense()
    }
}

impl fmt::Debug for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Ready(d) => d.fmt(f),
            Literal::Pending(fut) => fut.fmt(f),
        }
    }
}
