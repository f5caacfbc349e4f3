/** A macro to easily make [`Template`](crate::Template)s.

The form is `template!(name; from => to)`. `name` is anything that
converts into a `String`. `from` and `to` are either string literals, which
are parsed as patterns (see [`Expr`](crate::Expr)'s `FromStr`), or any other
expression of type [`Expr`](crate::Expr), which is used as is. The latter is
how you put concrete matrices into a template.

The macro panics if a pattern doesn't parse, or if `to` refers to a wildcard
that `from` doesn't bind (see [`Template::check`](crate::Template::check)).
Wildcards with the same name are the same wildcard, in this template and in
every other one.

`template!(name; a <=> b)` makes a bidirectional rule: it returns a `Vec`
with the forward template and its reverse, named `name-rev`.

# Example
```
use matexp::{template, Compiler, Dense, Expr, Template};

let id = Expr::literal(Dense::identity(3));
let from = Expr::from("?x".parse::<matexp::Wildcard>().unwrap()).mul(&id);

let mut rules: Vec<Template> = vec![
    template!("transpose-add"; "(+ (t ?a) (t ?b))" => "(t (+ ?a ?b))"),
    template!("scale-t"; "(t (scale 2 ?a))" => "(scale 2 (t ?a))"),
    // an identity literal; it only matches that very handle
    template!("mul-id"; { from } => "?x"),
];
rules.extend(template!("double-t"; "(t (t ?a))" <=> "?a"));
assert_eq!(rules[4].name(), "double-t-rev");

let compiler = Compiler::new().with_rewriters(rules.into_iter().map(Template::everywhere));
assert_eq!(compiler.len(), 5);
```
**/
#[macro_export]
macro_rules! template {
    (
        $name:expr;
        $from:tt => $to:tt
    ) => {{
        let from = $crate::__template!(@parse $from);
        let to = $crate::__template!(@parse $to);
        let template = $crate::Template::new($name, from, to);
        if let Err(err) = template.check() {
            panic!("template '{}': {}", template.name(), err);
        }
        template
    }};
    (
        $name:expr;
        $from:tt <=> $to:tt
    ) => {{
        let template = $crate::template!($name; $from => $to);
        let rev = template.flip();
        if let Err(err) = rev.check() {
            panic!("template '{}': {}", rev.name(), err);
        }
        vec![template, rev]
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __template {
    (@parse $pat:literal) => {
        $pat.parse::<$crate::Expr>().unwrap()
    };
    (@parse $pat:expr) => {
        $pat
    };
}
