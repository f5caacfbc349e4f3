use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::util::{DisplayAsDebug, IndexSet};
use crate::Expr;

static NAMES: Lazy<Mutex<IndexSet<String>>> = Lazy::new(Default::default);

fn id(i: usize) -> Wildcard {
    match u32::try_from(i) {
        Ok(i) => Wildcard(i),
        Err(_) => panic!("Too many wildcards: the name table is full at {} entries", i),
    }
}

fn names() -> std::sync::MutexGuard<'static, IndexSet<String>> {
    NAMES
        .lock()
        .unwrap_or_else(|err| panic!("Failed to acquire the wildcard name table: {}", err))
}

/// A placeholder for "any expression" inside a [`Template`].
///
/// A [`Wildcard`] is just a small integer. Its identity, not its value, is
/// what matters: every occurrence of the same wildcard in a template must
/// match the very same sub-expression.
///
/// Wildcards come from a process-wide name table.
/// [`Wildcard::new`] hands out a fresh, anonymous one; parsing a name with
/// a leading `?` always returns the same wildcard for the same name.
///
/// ```
/// use matexp::Wildcard;
///
/// let a: Wildcard = "?a".parse().unwrap();
/// assert_eq!(a, "?a".parse().unwrap());
/// assert_ne!(Wildcard::new(), Wildcard::new());
/// assert!("a".parse::<Wildcard>().is_err());
/// ```
///
/// [`Template`]: struct.Template.html
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Wildcard(u32);

impl Wildcard {
    /// Creates a fresh wildcard, distinct from every other one.
    ///
    /// Every call adds a name to the process-wide table, and names are never
    /// freed. Create wildcards once, when setting up templates, not per
    /// rewrite.
    ///
    /// # Panics
    /// Panics if the table outgrows `u32` ids.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let mut names = names();
        let mut n = names.len();
        loop {
            let (i, inserted) = names.insert_full(format!("?_{}", n));
            if inserted {
                return id(i);
            }
            n += 1;
        }
    }

    /// The name this wildcard prints as, including the leading `?`.
    pub fn name(self) -> String {
        let names = names();
        match names.get_index(self.0 as usize) {
            Some(s) => s.clone(),
            None => format!("?#{}", self.0),
        }
    }

    /// Wraps this wildcard into an [`Expr`] leaf so it can be used with the
    /// expression algebra.
    pub fn expr(self) -> Expr {
        Expr::from(self)
    }
}

impl FromStr for Wildcard {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with('?') && s.len() > 1 {
            let (i, _) = names().insert_full(s.to_owned());
            Ok(id(i))
        } else {
            Err(format!("{} doesn't start with '?'", s))
        }
    }
}

impl fmt::Display for Wildcard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Debug for Wildcard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Creates a fresh wildcard expression.
///
/// Shorthand for `Wildcard::new().expr()`.
pub fn wildcard() -> Expr {
    Wildcard::new().expr()
}

/// The binding map built while matching a template: which sub-expression
/// each [`Wildcard`] stood for.
///
/// A [`Bindings`] lives for exactly one rewrite application.
#[derive(Default, Clone)]
pub struct Bindings {
    vec: smallvec::SmallVec<[(Wildcard, Expr); 3]>,
}

impl Bindings {
    /// Insert something, returning the old `Expr` if present.
    pub fn insert(&mut self, wildcard: Wildcard, expr: Expr) -> Option<Expr> {
        for pair in &mut self.vec {
            if pair.0 == wildcard {
                return Some(std::mem::replace(&mut pair.1, expr));
            }
        }
        self.vec.push((wildcard, expr));
        None
    }

    /// Retrieve a `Wildcard`, returning `None` if not present.
    pub fn get(&self, wildcard: Wildcard) -> Option<&Expr> {
        self.vec
            .iter()
            .find_map(|(w, e)| if *w == wildcard { Some(e) } else { None })
    }

    /// The number of bound wildcards.
    pub fn len(&self) -> usize {
        self.vec.len()
    }

    /// Returns true if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    /// Iterates over the bindings in the order they were made.
    pub fn iter(&self) -> impl Iterator<Item = (Wildcard, &Expr)> {
        self.vec.iter().map(|(w, e)| (*w, e))
    }
}

impl std::ops::Index<Wildcard> for Bindings {
    type Output = Expr;

    fn index(&self, wildcard: Wildcard) -> &Self::Output {
        match self.get(wildcard) {
            Some(e) => e,
            None => panic!("Wildcard '{}' not found in {:?}", wildcard, self),
        }
    }
}

impl fmt::Debug for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.vec.iter().map(|(w, e)| (w, DisplayAsDebug(e))))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Dense;

    #[test]
    fn fresh_wildcards_are_distinct() {
        let a = Wildcard::new();
        let b = Wildcard::new();
        assert_ne!(a, b);
        assert_ne!(a.name(), b.name());
        let again: Wildcard = a.name().parse().unwrap();
        assert_eq!(again, a);
    }

    #[test]
    fn insert_and_get() {
        let w: Wildcard = "?bindings_test".parse().unwrap();
        let e = Expr::literal(Dense::zeros(1, 1));
        let mut b = Bindings::default();
        assert!(b.is_empty());
        assert!(b.insert(w, e.clone()).is_none());
        assert!(b.get(w).unwrap().same(&e));
        assert!(b[w].same(&e));
        assert_eq!(b.len(), 1);
        assert!(b.get(Wildcard::new()).is_none());
    }
}
