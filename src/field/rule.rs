//! Named rules and references between them.
//!
//! A [`Def`] is the top-level form of a grammar rule: a concatenation of
//! child fields plus the metadata the registry needs (name, category,
//! category group, no-prune flag). A [`Ref`] points at a rule by name
//! only; the target is resolved through the registry at build time, so
//! cyclic grammars stay acyclic in the ownership graph.

use crate::error::Error;
use crate::field::{concat_fields, BuildResult, Field, Signal};
use crate::state::BuildState;
use crate::Result;

/// Category used when a definition or reference does not name one.
pub const DEFAULT_CAT: &str = "default";

/// Category group used when a definition does not name one.
pub const DEFAULT_GROUP: &str = "default";

/// Reference name that resolves to any name in the target category.
pub const WILDCARD: &str = "*";

/// A named grammar rule.
///
/// The same name may be defined any number of times; generation picks
/// between competing definitions uniformly. Register a `Def` with
/// [`Registry::define`](crate::Registry::define).
///
/// # Example
///
/// ```rust
/// use gramgen::{fields, Def, Int, Registry};
///
/// let mut registry = Registry::new();
/// registry.define(
///     Def::new("pair", fields![Int::ranged(0, 10), ",", Int::ranged(0, 10)]).cat("csv"),
/// );
/// ```
#[derive(Debug)]
pub struct Def {
    pub(crate) name: String,
    pub(crate) cat: String,
    pub(crate) group: String,
    pub(crate) sep: String,
    pub(crate) no_prune: bool,
    pub(crate) values: Vec<Field>,
}

impl Def {
    pub fn new(name: impl Into<String>, values: Vec<Field>) -> Self {
        Def {
            name: name.into(),
            cat: DEFAULT_CAT.into(),
            group: DEFAULT_GROUP.into(),
            sep: String::new(),
            no_prune: false,
            values,
        }
    }

    /// Category to register the rule in.
    pub fn cat(mut self, cat: impl Into<String>) -> Self {
        self.cat = cat.into();
        self
    }

    /// Category group the rule is declared from, by convention the base
    /// name of the grammar module.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Separator placed between built children.
    pub fn sep(mut self, sep: impl Into<String>) -> Self {
        self.sep = sep.into();
        self
    }

    /// Keep this rule even when the analyzer finds it unreachable.
    pub fn no_prune(mut self) -> Self {
        self.no_prune = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.cat
    }

    /// Builds the rule: children concatenate like an `And`, with a
    /// scope pushed for the duration so flushed statements raised
    /// underneath can be anchored here.
    pub fn build(
        &self,
        st: &mut BuildState<'_>,
        pre: &mut Vec<String>,
        shortest: bool,
    ) -> Result<String> {
        st.push_scope();
        let built = concat_fields(&self.values, &self.sep, st, pre, shortest);
        let hoisted = st.pop_scope();
        let body = built?;
        if hoisted.is_empty() {
            return Ok(body);
        }
        let mut out = hoisted.concat();
        out.push_str(&body);
        Ok(out)
    }
}

/// A reference to a named rule in some category.
///
/// When a name is defined multiple times, one definition is picked
/// uniformly. Building a reference counts against the per-sample
/// recursion budget; once the budget is reached, nested builds are
/// forced into shortest mode.
#[derive(Debug)]
pub struct Ref {
    pub(crate) name: String,
    pub(crate) cat: String,
    pub(crate) failsafe: Option<Box<Field>>,
}

impl Ref {
    pub fn new(name: impl Into<String>) -> Self {
        Ref {
            name: name.into(),
            cat: DEFAULT_CAT.into(),
            failsafe: None,
        }
    }

    /// Reference any name in the category.
    pub fn any() -> Self {
        Ref::new(WILDCARD)
    }

    /// Category the referenced rule is defined in.
    pub fn cat(mut self, cat: impl Into<String>) -> Self {
        self.cat = cat.into();
        self
    }

    /// Fallback built in place of the target when the referenced name is
    /// missing.
    pub fn failsafe(mut self, field: impl Into<Field>) -> Self {
        self.failsafe = Some(Box::new(field.into()));
        self
    }

    pub(crate) fn build(
        &self,
        st: &mut BuildState<'_>,
        pre: &mut Vec<String>,
        shortest: bool,
    ) -> BuildResult {
        st.enter_ref();
        let res = self.resolve(st, pre, shortest);
        st.leave_ref();
        res
    }

    fn resolve(
        &self,
        st: &mut BuildState<'_>,
        pre: &mut Vec<String>,
        shortest: bool,
    ) -> BuildResult {
        if st.past_runaway_limit() {
            return Err(Signal::Fail(Error::RunawayRecursion {
                limit: st.runaway_limit(),
            }));
        }
        let shortest = shortest || st.at_recursion_limit();
        let registry = st.registry();
        let def = match registry.get_ref(&self.cat, &self.name, st.rand()) {
            Ok(def) => def,
            Err(e @ Error::NameMissing { .. }) => match &self.failsafe {
                Some(fallback) => return fallback.build(st, pre, shortest),
                None => return Err(Signal::Fail(e)),
            },
            Err(e) => return Err(Signal::Fail(e)),
        };
        def.build(st, pre, shortest).map_err(Signal::Fail)
    }
}
