use std::fmt;

use log::*;
use thiserror::Error;

use crate::util::Instant;
use crate::{Error, Expr, RewriteError, Rewriter};

/// An error from [`Compiler::compile`].
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    /// The expression (or a rewritten form of it) doesn't validate.
    #[error("invalid expression: {0}")]
    Invalid(#[from] Error),
    /// A rewriter refused the expression.
    #[error("rewrite '{rule}' failed: {source}")]
    Rewrite {
        rule: String,
        #[source]
        source: RewriteError,
    },
}

/// Runs an ordered list of [`Rewriter`]s over an expression.
///
/// Each rewriter receives the output of the previous one. Rewriters are
/// applied once each, in insertion order; there is no fixpoint iteration,
/// so a list that needs one has to repeat its rules.
///
/// A [`Compiler`] is immutable once built and can be shared between
/// threads and used for any number of compilations.
///
/// ```
/// use matexp::{template, Compiler, Dense, Expr};
///
/// let compiler = Compiler::new()
///     .with_rewriter(template!("transpose-add"; "(+ (t ?a) (t ?b))" => "(t (+ ?a ?b))").everywhere())
///     .with_rewriter(template!("double-t"; "(t (t ?a))" => "?a").everywhere());
///
/// let a = Expr::literal(Dense::zeros(10, 1));
/// let b = Expr::literal(Dense::ones(10, 1));
/// let e = a.t().add(&b.t()).t();
///
/// let compiled = compiler.must_compile(&e);
/// assert_eq!(compiled.to_string(), "(+ [10x1] [10x1])");
/// assert!(compiled.equals(&e));
/// ```
pub struct Compiler {
    rewriters: Vec<Box<dyn Rewriter + Send + Sync>>,
    validate: bool,
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler {
            rewriters: vec![],
            validate: false,
        }
    }
}

impl Compiler {
    /// Creates a compiler with no rewriters. It returns its input unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rewriter.
    pub fn with_rewriter(mut self, rewriter: impl Rewriter + Send + Sync + 'static) -> Self {
        if self.rewriters.iter().any(|r| r.name() == rewriter.name()) {
            warn!("Compiler already has a rewriter named '{}'", rewriter.name());
        }
        self.rewriters.push(Box::new(rewriter));
        self
    }

    /// Appends several rewriters, in order.
    pub fn with_rewriters<R>(self, rewriters: impl IntoIterator<Item = R>) -> Self
    where
        R: Rewriter + Send + Sync + 'static,
    {
        rewriters.into_iter().fold(self, Self::with_rewriter)
    }

    /// Whether to [`validate`](Expr::validate) the input and the final
    /// result. Off by default.
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// The number of rewriters.
    pub fn len(&self) -> usize {
        self.rewriters.len()
    }

    /// Returns true if this compiler has no rewriters.
    pub fn is_empty(&self) -> bool {
        self.rewriters.is_empty()
    }

    /// The rewriter names, in the order they run.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rewriters.iter().map(|r| r.name())
    }

    /// Threads `expr` through every rewriter in order, stopping at the first
    /// one that fails.
    ///
    /// `expr` is never modified. With no rewriters the input handle itself
    /// is returned.
    pub fn compile(&self, expr: &Expr) -> Result<Expr, CompileError> {
        let start = Instant::now();
        if self.validate {
            expr.validate()?;
        }

        let mut current = expr.clone();
        for rewriter in &self.rewriters {
            current = rewriter.rewrite(&current).map_err(|source| {
                debug!("Compilation stopped at '{}': {}", rewriter.name(), source);
                CompileError::Rewrite {
                    rule: rewriter.name().to_owned(),
                    source,
                }
            })?;
            trace!("After '{}': {}", rewriter.name(), current);
        }

        if self.validate {
            current.validate()?;
        }
        info!(
            "Compiled with {} rewriters in {:.6}s",
            self.rewriters.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(current)
    }

    /// Like [`compile`](Compiler::compile), but panics on failure.
    ///
    /// Meant for rewriters that are known to apply, e.g. ones wrapped in
    /// [`Everywhere`](crate::Everywhere).
    pub fn must_compile(&self, expr: &Expr) -> Expr {
        match self.compile(expr) {
            Ok(e) => e,
            Err(err) => panic!("failed to compile {}: {}", expr, err),
        }
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("rewriters", &self.names().collect::<Vec<_>>())
            .field("validate", &self.validate)
            .finish()
    }
}
