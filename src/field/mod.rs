//! The field algebra.
//!
//! A [`Field`] is a node in the generator tree: a literal, a numeric or
//! string generator, a concatenation, an alternation, an optional
//! subtree, a bounded repetition, a quoting wrapper, or a reference to a
//! named rule. Building a field walks the tree depth-first and returns
//! the produced string, threading a [`BuildState`] (registry handle,
//! random source, recursion budget) and a prerequisite sink through the
//! walk.
//!
//! Composite fields can be assembled with the `&` and `|` operators:
//!
//! ```rust
//! use gramgen::{Field, Int};
//!
//! // equivalent to And(["(", Int, ")"])
//! let call = Field::from("(") & Int::ranged(0, 10) & ")";
//! ```

pub mod num;
pub mod rule;
pub mod text;

use std::ops::{BitAnd, BitOr};
use std::rc::Rc;

use crate::error::Error;
use crate::state::BuildState;
use crate::Result;

pub use num::{Band, Float, Int, Odds};
pub use rule::{Def, Ref, DEFAULT_CAT, DEFAULT_GROUP, WILDCARD};
pub use text::{charset, code_escape, html_js_escape, Quote, QuoteStyle, Str};

/// Control signal raised while building a field subtree.
#[derive(Debug)]
pub enum Signal {
    /// Produce nothing for this subtree; caught by the nearest
    /// concatenation.
    Skip,
    /// Promote the prefix built so far into the prerequisite sink;
    /// caught by the nearest `Def` or `And`.
    Flush,
    /// A real failure; propagates to the generator.
    Fail(Error),
}

impl From<Error> for Signal {
    fn from(e: Error) -> Self {
        Signal::Fail(e)
    }
}

/// Result of building a single field subtree.
pub type BuildResult = std::result::Result<String, Signal>;

/// A constant leaf value, built verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Str(String),
    Int(i64),
    Float(f64),
    Null,
}

impl std::fmt::Display for Lit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lit::Str(s) => f.write_str(s),
            Lit::Int(n) => write!(f, "{n}"),
            Lit::Float(x) => write!(f, "{x}"),
            Lit::Null => f.write_str("null"),
        }
    }
}

/// Extension seam for user-defined fields.
///
/// Custom fields take part in builds like any core variant: they may
/// read the registry, draw randomness, stage new definitions through
/// [`BuildState::add_definition`], or raise [`Signal::Flush`] to mark a
/// statement boundary. `children` and `shortest_is_nothing` feed the
/// reference analyzer.
pub trait CustomField: std::fmt::Debug {
    fn build(&self, st: &mut BuildState<'_>, pre: &mut Vec<String>, shortest: bool) -> BuildResult;

    /// Child fields visible to the reference analyzer.
    fn children(&self) -> &[Field] {
        &[]
    }

    /// `true` when the minimal build of this field produces nothing.
    fn shortest_is_nothing(&self) -> bool {
        false
    }
}

/// A node in the generator tree.
#[derive(Debug)]
pub enum Field {
    Lit(Lit),
    Int(Int),
    Float(Float),
    Str(Str),
    And(And),
    Join(Join),
    Or(Or),
    Opt(Opt),
    Quote(Quote),
    Ref(Ref),
    Custom(Rc<dyn CustomField>),
}

impl Field {
    /// The null literal.
    pub fn null() -> Field {
        Field::Lit(Lit::Null)
    }

    /// Wrap a user-defined field.
    pub fn custom(field: impl CustomField + 'static) -> Field {
        Field::Custom(Rc::new(field))
    }

    /// Builds this subtree.
    ///
    /// Strings pushed into `pre` are prerequisites: the enclosing
    /// top-level build emits them ahead of its own result. With
    /// `shortest` set the subtree must produce its reference-minimum
    /// output.
    pub fn build(
        &self,
        st: &mut BuildState<'_>,
        pre: &mut Vec<String>,
        shortest: bool,
    ) -> BuildResult {
        match self {
            Field::Lit(lit) => Ok(lit.to_string()),
            Field::Int(f) => Ok(f.build(st.rand())),
            Field::Float(f) => Ok(f.build(st.rand())),
            Field::Str(f) => Ok(f.build(st.rand())),
            Field::And(f) => f.build(st, pre, shortest),
            Field::Join(f) => f.build(st, pre, shortest),
            Field::Or(f) => f.build(st, pre, shortest),
            Field::Opt(f) => f.build(st, pre, shortest),
            Field::Quote(f) => f.build(st, pre, shortest),
            Field::Ref(f) => f.build(st, pre, shortest),
            Field::Custom(f) => f.build(st, pre, shortest),
        }
    }
}

/// Concatenation of child fields with a separator (empty by default).
#[derive(Debug)]
pub struct And {
    pub(crate) values: Vec<Field>,
    pub(crate) sep: String,
    pub(crate) rolling: bool,
}

impl And {
    pub fn new(values: Vec<Field>) -> Self {
        And {
            values,
            sep: String::new(),
            rolling: false,
        }
    }

    fn rolling(values: Vec<Field>) -> Self {
        And {
            rolling: true,
            ..And::new(values)
        }
    }

    pub fn sep(mut self, sep: impl Into<String>) -> Self {
        self.sep = sep.into();
        self
    }

    pub(crate) fn build(
        &self,
        st: &mut BuildState<'_>,
        pre: &mut Vec<String>,
        shortest: bool,
    ) -> BuildResult {
        concat_fields(&self.values, &self.sep, st, pre, shortest).map_err(Signal::Fail)
    }
}

/// Joins children with a separator (`","` by default). With `max` set,
/// the first child is instead repeated between 1 and `max` times
/// inclusive, once in shortest mode.
#[derive(Debug)]
pub struct Join {
    pub(crate) values: Vec<Field>,
    pub(crate) sep: String,
    pub(crate) max: Option<usize>,
}

impl Join {
    pub fn new(values: Vec<Field>) -> Self {
        Join {
            values,
            sep: ",".into(),
            max: None,
        }
    }

    pub fn sep(mut self, sep: impl Into<String>) -> Self {
        self.sep = sep.into();
        self
    }

    pub fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    pub(crate) fn build(
        &self,
        st: &mut BuildState<'_>,
        pre: &mut Vec<String>,
        shortest: bool,
    ) -> BuildResult {
        let mut parts = Vec::new();
        match self.max {
            Some(max) if !self.values.is_empty() => {
                let reps = if shortest {
                    1
                } else {
                    st.rand().int_in(1, max as i64 + 1) as usize
                };
                for _ in 0..reps {
                    match self.values[0].build(st, pre, shortest) {
                        Ok(s) => parts.push(s),
                        Err(Signal::Skip) => {}
                        Err(other) => return Err(other),
                    }
                }
            }
            _ => {
                for value in &self.values {
                    match value.build(st, pre, shortest) {
                        Ok(s) => parts.push(s),
                        Err(Signal::Skip) => {}
                        Err(other) => return Err(other),
                    }
                }
            }
        }
        Ok(parts.join(&self.sep))
    }
}

/// Uniform choice between alternatives.
///
/// The analyzer records the subset of branches with the minimum
/// reference depth; shortest-mode builds choose between those instead.
#[derive(Debug)]
pub struct Or {
    pub(crate) values: Vec<Field>,
    pub(crate) shortest: Option<Vec<usize>>,
    pub(crate) rolling: bool,
}

impl Or {
    pub fn new(values: Vec<Field>) -> Self {
        Or {
            values,
            shortest: None,
            rolling: false,
        }
    }

    fn rolling(values: Vec<Field>) -> Self {
        Or {
            rolling: true,
            ..Or::new(values)
        }
    }

    pub(crate) fn build(
        &self,
        st: &mut BuildState<'_>,
        pre: &mut Vec<String>,
        shortest: bool,
    ) -> BuildResult {
        if self.values.is_empty() {
            return Err(Signal::Fail(Error::EmptyAlternation));
        }
        let pick = match (&self.shortest, shortest) {
            (Some(branches), true) => *st.rand().choice(branches),
            _ => st.rand().index(self.values.len()),
        };
        self.values[pick].build(st, pre, shortest)
    }
}

/// Optional subtree: skipped with probability `prob` (and always in
/// shortest mode), otherwise concatenated like `And`.
#[derive(Debug)]
pub struct Opt {
    pub(crate) values: Vec<Field>,
    pub(crate) sep: String,
    pub(crate) prob: f64,
}

impl Opt {
    pub fn new(values: Vec<Field>) -> Self {
        Opt {
            values,
            sep: String::new(),
            prob: 0.5,
        }
    }

    /// Probability of skipping the subtree.
    pub fn prob(mut self, prob: f64) -> Self {
        self.prob = prob;
        self
    }

    pub fn sep(mut self, sep: impl Into<String>) -> Self {
        self.sep = sep.into();
        self
    }

    pub(crate) fn build(
        &self,
        st: &mut BuildState<'_>,
        pre: &mut Vec<String>,
        shortest: bool,
    ) -> BuildResult {
        if shortest || st.rand().maybe(self.prob) {
            return Err(Signal::Skip);
        }
        concat_fields(&self.values, &self.sep, st, pre, shortest).map_err(Signal::Fail)
    }
}

/// Shared child loop for the concatenating variants.
///
/// `Skip` drops the child. `Flush` joins the prefix built so far
/// (without the separator) and promotes it: at scope depth 1 into the
/// prerequisite sink, deeper into the innermost scope together with any
/// pending prerequisites.
pub(crate) fn concat_fields(
    values: &[Field],
    sep: &str,
    st: &mut BuildState<'_>,
    pre: &mut Vec<String>,
    shortest: bool,
) -> Result<String> {
    let mut parts: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        match value.build(st, pre, shortest) {
            Ok(s) => parts.push(s),
            Err(Signal::Skip) => {}
            Err(Signal::Flush) => {
                let prefix = parts.concat();
                parts.clear();
                if st.scope_depth() <= 1 {
                    pre.push(prefix);
                } else {
                    let mut hoisted: Vec<String> = pre.drain(..).collect();
                    hoisted.push(prefix);
                    st.hoist(hoisted);
                }
            }
            Err(Signal::Fail(e)) => return Err(e),
        }
    }
    Ok(parts.join(sep))
}

/// One-or-more sugar: the values are concatenated and repeated up to
/// `max` times, like `+` in a regex.
pub fn plus_up_to(values: Vec<Field>, max: usize) -> Field {
    Field::Join(Join::new(vec![Field::And(And::new(values))]).sep("").max(max))
}

/// [`plus_up_to`] with the default cap of 10 repetitions.
pub fn plus(values: Vec<Field>) -> Field {
    plus_up_to(values, 10)
}

/// Zero-or-more sugar: like [`plus`], but may produce nothing, and
/// always produces nothing in shortest mode.
pub fn star_up_to(values: Vec<Field>, max: usize) -> Field {
    Field::Opt(Opt::new(vec![plus_up_to(values, max)]))
}

/// [`star_up_to`] with the default cap of 10 repetitions.
pub fn star(values: Vec<Field>) -> Field {
    star_up_to(values, 10)
}

impl From<&str> for Field {
    fn from(s: &str) -> Field {
        Field::Lit(Lit::Str(s.into()))
    }
}

impl From<String> for Field {
    fn from(s: String) -> Field {
        Field::Lit(Lit::Str(s))
    }
}

impl From<i64> for Field {
    fn from(n: i64) -> Field {
        Field::Lit(Lit::Int(n))
    }
}

impl From<i32> for Field {
    fn from(n: i32) -> Field {
        Field::Lit(Lit::Int(n.into()))
    }
}

impl From<f64> for Field {
    fn from(x: f64) -> Field {
        Field::Lit(Lit::Float(x))
    }
}

impl From<Lit> for Field {
    fn from(lit: Lit) -> Field {
        Field::Lit(lit)
    }
}

impl From<Int> for Field {
    fn from(f: Int) -> Field {
        Field::Int(f)
    }
}

impl From<Float> for Field {
    fn from(f: Float) -> Field {
        Field::Float(f)
    }
}

impl From<Str> for Field {
    fn from(f: Str) -> Field {
        Field::Str(f)
    }
}

impl From<And> for Field {
    fn from(f: And) -> Field {
        Field::And(f)
    }
}

impl From<Join> for Field {
    fn from(f: Join) -> Field {
        Field::Join(f)
    }
}

impl From<Or> for Field {
    fn from(f: Or) -> Field {
        Field::Or(f)
    }
}

impl From<Opt> for Field {
    fn from(f: Opt) -> Field {
        Field::Opt(f)
    }
}

impl From<Quote> for Field {
    fn from(f: Quote) -> Field {
        Field::Quote(f)
    }
}

impl From<Ref> for Field {
    fn from(f: Ref) -> Field {
        Field::Ref(f)
    }
}

impl<T: Into<Field>> BitAnd<T> for Field {
    type Output = Field;

    fn bitand(self, rhs: T) -> Field {
        match self {
            Field::And(mut and) if and.rolling => {
                and.values.push(rhs.into());
                Field::And(and)
            }
            lhs => Field::And(And::rolling(vec![lhs, rhs.into()])),
        }
    }
}

impl<T: Into<Field>> BitOr<T> for Field {
    type Output = Field;

    fn bitor(self, rhs: T) -> Field {
        match self {
            Field::Or(mut or) if or.rolling => {
                or.values.push(rhs.into());
                Field::Or(or)
            }
            lhs => Field::Or(Or::rolling(vec![lhs, rhs.into()])),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::field::{plus, star, Field, Join, Opt, Or, Quote};
    use crate::rand::Rand;
    use crate::registry::Registry;
    use crate::state::BuildState;
    use crate::{fields, DEFAULT_MAX_RECURSION};

    fn build_once(field: &Field, seed: u64) -> String {
        let registry = Registry::new();
        let mut rand = Rand::seeded(seed);
        let mut st = BuildState::new(&registry, &mut rand, DEFAULT_MAX_RECURSION);
        let mut pre = Vec::new();
        field.build(&mut st, &mut pre, false).unwrap()
    }

    #[test]
    fn and_concatenates_in_order() {
        let field = Field::from("a") & "b" & "c";
        assert_eq!(build_once(&field, 1), "abc");
    }

    #[test]
    fn rolling_operators_flatten() {
        let field = Field::from("a") & "b" & "c";
        match field {
            Field::And(and) => assert_eq!(and.values.len(), 3),
            other => panic!("expected And, got {other:?}"),
        }
        let field = Field::from("a") | "b" | "c";
        match field {
            Field::Or(or) => assert_eq!(or.values.len(), 3),
            other => panic!("expected Or, got {other:?}"),
        }
    }

    #[test]
    fn or_picks_every_branch_roughly_uniformly() {
        let field = Field::Or(Or::new(fields!["a", "b", "c"]));
        let mut counts = [0usize; 3];
        let registry = Registry::new();
        let mut rand = Rand::seeded(42);
        for _ in 0..1000 {
            let mut st = BuildState::new(&registry, &mut rand, DEFAULT_MAX_RECURSION);
            let mut pre = Vec::new();
            let out = field.build(&mut st, &mut pre, false).unwrap();
            counts[(out.as_bytes()[0] - b'a') as usize] += 1;
        }
        // 333 expected per branch, ±5 sigma
        for count in counts {
            assert!((258..=408).contains(&count), "got {count}");
        }
    }

    #[test]
    fn opt_with_certain_skip_produces_nothing() {
        let field = Field::from("[") & Opt::new(fields!["X"]).prob(1.0) & "]";
        for seed in 0..20 {
            assert_eq!(build_once(&field, seed), "[]");
        }
    }

    #[test]
    fn opt_with_no_skip_always_builds() {
        let field = Field::from("[") & Opt::new(fields!["X"]).prob(0.0) & "]";
        for seed in 0..20 {
            assert_eq!(build_once(&field, seed), "[X]");
        }
    }

    #[test]
    fn join_repeats_its_first_value_within_bounds() {
        let field = Field::Join(Join::new(fields!["x"]).sep("-").max(5));
        for seed in 0..50 {
            let out = build_once(&field, seed);
            let reps = out.split('-').count();
            assert!((1..=5).contains(&reps), "got {out:?}");
            assert!(out.split('-').all(|part| part == "x"));
        }
    }

    #[test]
    fn join_without_max_acts_like_a_separated_and() {
        let field = Field::Join(Join::new(fields!["a", "b"]));
        assert_eq!(build_once(&field, 1), "a,b");
    }

    #[test]
    fn quote_wraps_with_the_quote_char() {
        let field = Field::Quote(Quote::new(fields!["hi"]));
        let out: Vec<String> = (0..3).map(|seed| build_once(&field, seed)).collect();
        insta::assert_snapshot!(out.join(" "), @r#""hi" "hi" "hi""#);
    }

    #[test]
    fn plus_produces_at_least_one_copy() {
        let field = plus(fields!["z"]);
        for seed in 0..30 {
            let out = build_once(&field, seed);
            assert!(!out.is_empty() && out.len() <= 10);
            assert!(out.chars().all(|c| c == 'z'));
        }
    }

    #[test]
    fn star_may_produce_nothing() {
        let field = star(fields!["z"]);
        let registry = Registry::new();
        let mut rand = Rand::seeded(42);
        let mut empty = 0;
        let mut full = 0;
        for _ in 0..100 {
            let mut st = BuildState::new(&registry, &mut rand, DEFAULT_MAX_RECURSION);
            let mut pre = Vec::new();
            match field.build(&mut st, &mut pre, false) {
                Ok(s) => {
                    assert!(!s.is_empty());
                    full += 1;
                }
                Err(super::Signal::Skip) => empty += 1,
                Err(other) => panic!("unexpected signal {other:?}"),
            }
        }
        assert!(empty > 0 && full > 0);
    }

    #[test]
    fn empty_alternation_fails_to_build() {
        let registry = Registry::new();
        let mut rand = Rand::seeded(1);
        let mut st = BuildState::new(&registry, &mut rand, DEFAULT_MAX_RECURSION);
        let mut pre = Vec::new();
        let field = Field::Or(Or::new(vec![]));
        match field.build(&mut st, &mut pre, false) {
            Err(super::Signal::Fail(crate::Error::EmptyAlternation)) => {}
            other => panic!("expected EmptyAlternation, got {other:?}"),
        }
    }

    #[test]
    fn shortest_mode_skips_optionals_and_repeats_once() {
        let registry = Registry::new();
        let mut rand = Rand::seeded(42);
        let field = Field::from("(") & plus(fields!["x"]) & Opt::new(fields!["?"]).prob(0.0) & ")";
        for _ in 0..20 {
            let mut st = BuildState::new(&registry, &mut rand, DEFAULT_MAX_RECURSION);
            let mut pre = Vec::new();
            let out = field.build(&mut st, &mut pre, true).unwrap();
            assert_eq!(out, "(x)");
        }
    }
}
