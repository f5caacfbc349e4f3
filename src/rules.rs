/*! Built-in rule sets.

Every rule here preserves the value of the expression it rewrites, given
that the expression [`validate`](crate::Expr::validate)s.
The rules only match at the root of an expression; wrap them with
[`Template::everywhere`] (or use the ready-made [`serial`] and
[`concurrent`] compilers) to apply them throughout a tree.
*/

use crate::{template, Compiler, Template};

/// Rules that hoist transposes towards the root, so that fewer of them are
/// computed:
///
/// * `t(a) op t(b) => t(a op b)` for `+`, `-`, `.*` and `./`,
/// * `t(a) * t(b) => t(b * a)`,
/// * `t(t(a)) => a`.
pub fn transpose_rules() -> Vec<Template> {
    vec![
        template!("transpose-add"; "(+ (t ?a) (t ?b))" => "(t (+ ?a ?b))"),
        template!("transpose-sub"; "(- (t ?a) (t ?b))" => "(t (- ?a ?b))"),
        template!("transpose-mul-elem"; "(.* (t ?a) (t ?b))" => "(t (.* ?a ?b))"),
        template!("transpose-div-elem"; "(./ (t ?a) (t ?b))" => "(t (./ ?a ?b))"),
        template!("transpose-mul"; "(* (t ?a) (t ?b))" => "(t (* ?b ?a))"),
        template!("double-transpose"; "(t (t ?a))" => "?a"),
    ]
}

/// Rules that compute both products of a sum or difference of products
/// concurrently: `a*b + c*d => async(a*b) + async(c*d)`, and the same for
/// `-`.
pub fn concurrent_products() -> Vec<Template> {
    vec![
        template!("concurrent-add";
            "(+ (* ?a ?b) (* ?c ?d))" => "(+ (async (* ?a ?b)) (async (* ?c ?d)))"),
        template!("concurrent-sub";
            "(- (* ?a ?b) (* ?c ?d))" => "(- (async (* ?a ?b)) (async (* ?c ?d)))"),
    ]
}

/// A compiler that applies the [`transpose_rules`] throughout a tree.
pub fn serial() -> Compiler {
    Compiler::new().with_rewriters(transpose_rules().into_iter().map(Template::everywhere))
}

/// [`serial`], followed by the [`concurrent_products`] throughout the tree.
///
/// ```
/// use matexp::{rules, Dense, Expr};
///
/// let a = Expr::literal(Dense::from_fn(3, 2, |r, c| (r + c) as f64));
/// let b = Expr::literal(Dense::ones(3, 2));
/// let e = a.t().mul(&b).add(&b.t().mul(&a));
///
/// let compiled = rules::concurrent().must_compile(&e);
/// assert_eq!(compiled.to_string(), "(+ (async (* (t [3x2]) [3x2])) (async (* (t [3x2]) [3x2])))");
/// assert!(compiled.equals(&e));
/// ```
pub fn concurrent() -> Compiler {
    serial().with_rewriters(concurrent_products().into_iter().map(Template::everywhere))
}
