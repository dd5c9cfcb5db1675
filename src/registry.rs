//! Rule registry.
//!
//! This module provides [`Registry`], which holds rule definitions by
//! category, tracks which category group (grammar module) declared each
//! name, and remembers the rules that must never be pruned. Populate it
//! with [`Registry::define`], analyze it with
//! [`Registry::preprocess`](crate::Registry::preprocess), and draw
//! samples with [`Registry::generate`](crate::Registry::generate).

use crate::error::Error;
use crate::field::{Def, WILDCARD};
use crate::rand::Rand;
use crate::Result;
use indexmap::{IndexMap, IndexSet};

/// Holds named rule definitions, grouped by category and category group.
///
/// All maps are insertion-ordered so uniform index picks are
/// reproducible from a seed alone.
///
/// # Example
///
/// ```rust
/// use gramgen::{fields, Def, Registry};
///
/// let mut registry = Registry::new();
/// registry.define(Def::new("greeting", fields!["hello"]).cat("words"));
/// assert_eq!(registry.names("words"), vec!["greeting"]);
/// ```
#[derive(Debug, Default)]
pub struct Registry {
    /// cat -> name -> competing definitions.
    pub(crate) defs: IndexMap<String, IndexMap<String, Vec<Def>>>,
    /// cat -> group -> names declared by that group.
    pub(crate) cat_groups: IndexMap<String, IndexMap<String, Vec<String>>>,
    /// group -> default category to generate from.
    pub(crate) group_top_cats: IndexMap<String, String>,
    /// cat -> names exempt from pruning.
    pub(crate) no_prunes: IndexMap<String, IndexSet<String>>,
    /// whether analyzer results are current.
    pub(crate) processed: bool,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Registers a rule definition.
    ///
    /// Definitions sharing a name compete; generation picks between
    /// them uniformly. Registering invalidates any previous analyzer
    /// results.
    pub fn define(&mut self, def: Def) {
        self.processed = false;
        self.cat_groups
            .entry(def.cat.clone())
            .or_default()
            .entry(def.group.clone())
            .or_default()
            .push(def.name.clone());
        if def.no_prune {
            self.no_prunes
                .entry(def.cat.clone())
                .or_default()
                .insert(def.name.clone());
        }
        self.defs
            .entry(def.cat.clone())
            .or_default()
            .entry(def.name.clone())
            .or_default()
            .push(def);
    }

    /// Sets the default category used when generation targets `group`.
    pub fn set_group_top_cat(&mut self, group: impl Into<String>, cat: impl Into<String>) {
        self.group_top_cats.insert(group.into(), cat.into());
    }

    /// Resolves a reference: one of the definitions of `name` in `cat`,
    /// picked uniformly. The wildcard name `"*"` resolves against any
    /// live name in the category.
    pub fn get_ref(&self, cat: &str, name: &str, rand: &mut Rand) -> Result<&Def> {
        let defs = self.defs.get(cat).ok_or_else(|| Error::CategoryMissing {
            cat: cat.into(),
        })?;
        let name = if name == WILDCARD {
            if defs.is_empty() {
                return Err(Error::EmptyCategory { cat: cat.into() });
            }
            let (picked, _) = defs
                .get_index(rand.index(defs.len()))
                .expect("index within bounds");
            picked.as_str()
        } else {
            name
        };
        let list = defs.get(name).ok_or_else(|| Error::NameMissing {
            cat: cat.into(),
            name: name.into(),
        })?;
        Ok(rand.choice(list.as_slice()))
    }

    /// Names with live definitions in `cat`, in declaration order.
    pub fn names(&self, cat: &str) -> Vec<&str> {
        self.defs
            .get(cat)
            .map(|defs| defs.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// The competing definitions currently registered for a name.
    pub fn definitions(&self, cat: &str, name: &str) -> &[Def] {
        self.defs
            .get(cat)
            .and_then(|defs| defs.get(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// `true` once `preprocess` has run with no definitions added since.
    pub fn is_processed(&self) -> bool {
        self.processed
    }

    /// Expands preferred entries into rule names: a category-group entry
    /// contributes every name it declared in `cat`, a bare rule name
    /// contributes itself.
    pub(crate) fn pref_keys(&self, cat: &str, preferred: &[String]) -> Vec<String> {
        let mut keys = Vec::new();
        for pref in preferred {
            if let Some(names) = self.cat_groups.get(cat).and_then(|groups| groups.get(pref)) {
                keys.extend(names.iter().cloned());
            } else if self.defs.get(cat).is_some_and(|defs| defs.contains_key(pref)) {
                keys.push(pref.clone());
            }
        }
        keys
    }
}

#[cfg(test)]
mod test {
    use crate::error::Error;
    use crate::field::{Def, Ref};
    use crate::rand::Rand;
    use crate::registry::Registry;
    use crate::{fields, Field};

    fn small_registry() -> Registry {
        let mut registry = Registry::new();
        registry.define(Def::new("a", fields!["A"]).cat("c").group("g1"));
        registry.define(Def::new("b", fields!["B"]).cat("c").group("g2"));
        registry.define(Def::new("b", fields!["B2"]).cat("c").group("g2"));
        registry
    }

    #[test]
    fn competing_definitions_accumulate() {
        let registry = small_registry();
        assert_eq!(registry.names("c"), vec!["a", "b"]);
        assert_eq!(registry.definitions("c", "b").len(), 2);
    }

    #[test]
    fn get_ref_reports_missing_category_and_name() {
        let registry = small_registry();
        let mut rand = Rand::seeded(1);
        assert!(matches!(
            registry.get_ref("nope", "a", &mut rand),
            Err(Error::CategoryMissing { .. })
        ));
        assert!(matches!(
            registry.get_ref("c", "nope", &mut rand),
            Err(Error::NameMissing { .. })
        ));
    }

    #[test]
    fn wildcard_resolves_to_a_live_name() {
        let registry = small_registry();
        let mut rand = Rand::seeded(1);
        for _ in 0..20 {
            let def = registry.get_ref("c", "*", &mut rand).unwrap();
            assert!(def.name() == "a" || def.name() == "b");
        }
    }

    #[test]
    fn pref_keys_expand_groups_and_pass_names_through() {
        let registry = small_registry();
        let keys = registry.pref_keys("c", &["g2".into(), "a".into(), "nope".into()]);
        assert_eq!(keys, vec!["b".to_string(), "b".to_string(), "a".to_string()]);
    }

    #[test]
    fn defining_marks_analysis_stale() {
        let mut registry = small_registry();
        registry.preprocess();
        assert!(registry.is_processed());
        registry.define(Def::new("late", fields![Ref::new("a").cat("c")]).cat("c"));
        assert!(!registry.is_processed());
    }

    #[test]
    fn failsafe_covers_a_missing_name() {
        let mut registry = Registry::new();
        // the analyzer cannot resolve a ref to a missing name, so the
        // rule must opt out of pruning for the failsafe to matter
        registry.define(
            Def::new(
                "host",
                fields![Field::from(Ref::new("ghost").failsafe("fallback"))],
            )
            .no_prune(),
        );
        let req = crate::GenRequest::builder()
            .num(3)
            .target(crate::Target::cat("default"))
            .build();
        let mut rand = Rand::seeded(42);
        let out = registry.generate(&req, &mut rand).unwrap();
        assert_eq!(out, vec!["fallback"; 3]);
    }
}
