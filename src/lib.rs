#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
/*!

`matexp` is a library of lazy matrix expressions.

You build an expression tree with ordinary method calls
([`add`](Expr::add), [`mul`](Expr::mul), [`t`](Expr::t), ...), check it with
[`validate`](Expr::validate), and compute it with [`eval`](Expr::eval) or
element by element with [`at`](Expr::at).
Sub-trees wrapped with [`async_`](Expr::async_) are computed on background
threads as [`Future`]s, concurrently with the rest of the evaluation.

Before evaluating, a tree can be reshaped with example-based rewrite rules:
a [`Template`] pairs a pattern built from [`Wildcard`]s with the shape
to build from what the wildcards matched, and a [`Compiler`] runs a list of
such rewriters in order. The [`rules`] module has some ready-made ones.

## Logging

Many parts of `matexp` dump useful logging info using the [`log`](https://docs.rs/log/) crate.
The easiest way to see this info is to use the [`env_logger`](https://docs.rs/env_logger/)
crate in your binary or test.
The simplest way to enable `env_logger` is to put the following line near the top of your `main`:
`env_logger::init();`.
Then, set the environment variable `RUST_LOG=matexp=info`, or use `warn` or `debug` instead of info
for less or more logging.

*/
#![doc = "## Simple Example\n```"]
#![doc = include_str!("../tests/simple.rs")]
#![doc = "\n```"]

mod macros;

mod compile;
mod dense;
mod error;
mod expr;
mod future;
mod literal;
mod parse;
mod pattern;
pub mod rules;
mod template;
mod util;
mod wildcard;

pub use {
    compile::{CompileError, Compiler},
    dense::Dense,
    error::Error,
    expr::{equals, Expr, Kind, Node},
    future::{make_future, Future},
    literal::Literal,
    parse::ParseError,
    pattern::{construct, match_expr, MatchError, TemplateError},
    template::{Everywhere, RewriteError, Rewriter, Template},
    wildcard::{wildcard, Bindings, Wildcard},
};

#[cfg(test)]
fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
