//! # Gramgen
//!
//! Grammar-based random data generator for fuzz testing parsers and
//! other programs that consume structured input.
//!
//! Grammars are built programmatically from composable fields:
//!
//! - **Weighted generators**: integers, floats, and strings sampled
//!   from band distributions that target boundary conditions
//! - **Combinators**: concatenation, alternation, optionals, bounded
//!   repetition, and quoting wrappers
//! - **Named rules**: definitions grouped by category and category
//!   group, with cross-references (cycles included) resolved by name
//! - **Shortest-path analysis**: unreachable rules are pruned and every
//!   alternation learns its cheapest branches, so a recursion budget
//!   can always steer generation back to a leaf
//!
//! ## Quick Start
//!
//! ```rust
//! use gramgen::{fields, Def, GenRequest, Or, Rand, Registry, Target};
//!
//! fn main() -> gramgen::Result<()> {
//!     let mut registry = Registry::new();
//!     registry.define(Def::new(
//!         "greeting",
//!         fields![Or::new(fields!["hello", "world"])],
//!     ));
//!
//!     let req = GenRequest::builder()
//!         .num(3)
//!         .target(Target::cat("default"))
//!         .build();
//!     let mut rand = Rand::seeded(42);
//!     let out = registry.generate(&req, &mut rand)?;
//!     assert_eq!(out.len(), 3);
//!     Ok(())
//! }
//! ```
//!
//! ## Rules and references
//!
//! A [`Def`] names a concatenation of fields and registers in a
//! category; a [`Ref`] points back at a name. References may be
//! forward, mutual, or self-recursive. [`Registry::preprocess`]
//! computes how many reference expansions each rule needs at minimum,
//! prunes rules that can never bottom out, and the per-sample recursion
//! budget forces deep builds down the cheapest branches.
//!
//! ## Determinism
//!
//! All randomness funnels through [`Rand`]; two runs over the same
//! registry with the same seed and request produce identical output.

pub mod error;
pub mod field;
pub mod generator;
pub mod graph;
pub mod rand;
pub mod registry;

mod analyze;
mod state;

pub use error::{Error, Result};
pub use field::{
    charset, code_escape, html_js_escape, plus, plus_up_to, star, star_up_to, And, Band,
    BuildResult, CustomField, Def, Field, Float, Int, Join, Lit, Odds, Opt, Or, Quote, QuoteStyle,
    Ref, Signal, Str, DEFAULT_CAT, DEFAULT_GROUP, WILDCARD,
};
pub use generator::{GenRequest, Target, DEFAULT_MAX_RECURSION};
pub use graph::RefGraph;
pub use rand::Rand;
pub use registry::Registry;
pub use state::BuildState;

/// Builds a `Vec<Field>` from mixed field and literal expressions.
///
/// ```rust
/// use gramgen::{fields, Int};
///
/// let values = fields!["id=", Int::ranged(0, 100), ";"];
/// assert_eq!(values.len(), 3);
/// ```
#[macro_export]
macro_rules! fields {
    ($($value:expr),* $(,)?) => {
        vec![$($crate::Field::from($value)),*]
    };
}
