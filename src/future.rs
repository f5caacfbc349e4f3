use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use log::*;
use once_cell::sync::OnceCell;

use crate::expr::wildcard_misuse;
use crate::{Dense, Error, Expr};

type Outcome = Result<Dense, Error>;

/// A matrix that is being computed by a background thread.
///
/// A [`Future`] knows its dimensions up front, so [`dims`](Future::dims)
/// never blocks. Everything that needs values ([`at`](Future::at),
/// [`wait`](Future::wait), [`validate`](Future::validate), ...) blocks the
/// calling thread until the background evaluation has finished.
///
/// The result is written exactly once, into a cell that any number of
/// threads may wait on. The write happens-before every waiter returns, so no
/// reader ever sees a partially built matrix. Once the value is there it is
/// shared between all clones of the [`Future`] without further locking.
///
/// There is no cancellation. Dropping every handle to a running [`Future`]
/// lets the background thread run to completion and then discards its
/// result.
#[derive(Clone)]
pub struct Future {
    rows: usize,
    cols: usize,
    cell: Arc<OnceCell<Outcome>>,
}

/// Starts evaluating `expr` on a background thread and returns a handle to
/// the result.
///
/// The expression's dimensions are computed right away on the calling thread.
/// The background thread validates `expr` and then evaluates it; a
/// validation error (or a panic) is stored instead of a value, so waiters
/// never hang.
///
/// # Panics
/// Panics right away, on the calling thread, if `expr` contains a
/// [`Wildcard`](crate::Wildcard).
///
/// ```
/// use matexp::{make_future, Dense, Expr};
///
/// let a = Expr::literal(Dense::ones(3, 2));
/// let f = make_future(&a.mul(&a.t()));
/// assert_eq!(f.dims(), (3, 3));
/// assert_eq!(f.at(2, 1), 2.0);
/// ```
pub fn make_future(expr: &Expr) -> Future {
    Future::spawn(expr.clone())
}

fn run(expr: &Expr) -> Outcome {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        expr.validate()?;
        Ok(expr.eval().into_dense())
    }));
    match result {
        Ok(outcome) => outcome,
        Err(payload) => {
            let msg = if let Some(s) = payload.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            Err(Error::Background(msg))
        }
    }
}

impl Future {
    pub(crate) fn spawn(expr: Expr) -> Self {
        // fail on the caller's thread, like a synchronous evaluation would
        if let Some(w) = expr.wildcards().next() {
            wildcard_misuse(w, "evaluate");
        }
        let (rows, cols) = expr.dims();
        let cell: Arc<OnceCell<Outcome>> = Arc::new(OnceCell::new());
        let future = Future { rows, cols, cell };

        let slot = future.cell.clone();
        let background = expr.clone();
        let spawned = thread::Builder::new()
            .name("matexp-future".into())
            .spawn(move || {
                debug!("Evaluating {}x{} future in the background", rows, cols);
                let outcome = run(&background);
                if let Err(err) = &outcome {
                    debug!("Future failed: {}", err);
                }
                // the only writer of this cell
                let _ = slot.set(outcome);
            });

        if let Err(err) = spawned {
            warn!("Couldn't spawn a thread for a future, evaluating inline: {}", err);
            let _ = future.cell.set(run(&expr));
        }
        future
    }

    /// A future that is already complete.
    pub fn ready(dense: Dense) -> Self {
        let (rows, cols) = dense.dims();
        Future {
            rows,
            cols,
            cell: Arc::new(OnceCell::with_value(Ok(dense))),
        }
    }

    #[cfg(test)]
    fn gate(rows: usize, cols: usize) -> Self {
        Future {
            rows,
            cols,
            cell: Arc::new(OnceCell::new()),
        }
    }

    #[cfg(test)]
    fn open(&self, dense: Dense) {
        assert!(self.cell.set(Ok(dense)).is_ok(), "gate opened twice");
    }

    /// Returns `(rows, cols)` without blocking.
    pub fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Returns true if the background evaluation has finished.
    pub fn is_ready(&self) -> bool {
        self.cell.get().is_some()
    }

    fn outcome(&self) -> &Outcome {
        self.cell.wait()
    }

    /// Blocks until the result is available and borrows it.
    ///
    /// # Panics
    /// Panics if the background evaluation failed; call
    /// [`validate`](Future::validate) first to get the error as a value.
    pub fn wait(&self) -> &Dense {
        match self.outcome() {
            Ok(dense) => dense,
            Err(err) => panic!("read from a failed future: {}", err),
        }
    }

    /// Blocks, then returns the element at `(r, c)`.
    pub fn at(&self, r: usize, c: usize) -> f64 {
        self.wait().at(r, c)
    }

    /// Blocks, then returns a row-major copy of the result.
    pub fn as_vector(&self) -> Vec<f64> {
        self.wait().to_vec()
    }

    /// Blocks, then reports the error the background evaluation ran into,
    /// if any.
    pub fn validate(&self) -> Result<(), Error> {
        match self.outcome() {
            Ok(_) => Ok(()),
            Err(err) => Err(err.clone()),
        }
    }

    /// Blocks, then returns a completed future holding a deep copy of the
    /// result.
    ///
    /// Copying a still-running future is synchronous; the copy does not
    /// subscribe to the pending computation.
    pub fn copy(&self) -> Future {
        match self.outcome() {
            Ok(dense) => Future::ready(dense.clone()),
            Err(err) => Future {
                rows: self.rows,
                cols: self.cols,
                cell: Arc::new(OnceCell::with_value(Err(err.clone()))),
            },
        }
    }

    /// Returns true if both handles share the same result cell.
    pub fn same(&self, other: &Future) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl fmt::Debug for Future {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Future")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("ready", &self.is_ready())
            .finish()
    }
}
