//! Reference-path analysis.
//!
//! Before generation, [`Registry::preprocess`] computes the minimum
//! number of reference expansions each rule needs to produce output,
//! records on every alternation which branches achieve that minimum
//! (consulted by shortest-mode builds), and prunes rules whose depth
//! cannot be determined at all (cycles with no leaf branch).

use crate::field::{Field, Or};
use crate::registry::Registry;
use indexmap::IndexMap;
use std::collections::{HashMap, VecDeque};

#[derive(Clone, Copy)]
struct RefInfo {
    /// minimum reference depth over the resolved definitions of a name
    depth: usize,
    /// the representative definition contains no references at all
    leaf: bool,
}

fn depth_key(cat: &str, name: &str) -> String {
    format!("{cat}-:-{name}")
}

impl Registry {
    /// Computes shortest reference paths, annotates alternations, and
    /// prunes unreachable rules. Returns the pruned `(category, name)`
    /// pairs.
    ///
    /// # Example
    ///
    /// ```rust
    /// use gramgen::{fields, Def, Ref, Registry};
    ///
    /// let mut registry = Registry::new();
    /// registry.define(Def::new("a", fields![Ref::new("b")]));
    /// registry.define(Def::new("b", fields![Ref::new("a")]));
    /// let pruned = registry.preprocess();
    /// assert_eq!(pruned.len(), 2);
    /// assert!(registry.names("default").is_empty());
    /// ```
    pub fn preprocess(&mut self) -> Vec<(String, String)> {
        let mut depths: HashMap<String, RefInfo> = HashMap::new();
        let mut pending: VecDeque<(String, String, usize)> = VecDeque::new();

        // rules without any reference are the leaves
        for (cat, rules) in &self.defs {
            for (name, defs) in rules {
                for (idx, def) in defs.iter().enumerate() {
                    if count_refs_in(&def.values) == 0 {
                        depths.insert(depth_key(cat, name), RefInfo { depth: 0, leaf: true });
                    } else {
                        pending.push_back((cat.clone(), name.clone(), idx));
                    }
                }
            }
        }

        // resolve rules whose children are already known; stop once two
        // full passes over the queue make no progress
        let mut resolved: Vec<(String, String, usize)> = Vec::new();
        let mut stalled = 0usize;
        while let Some((cat, name, idx)) = pending.pop_front() {
            let def = &self.defs[cat.as_str()][name.as_str()][idx];
            let Some(depth) = max_depth(&def.values, &depths) else {
                stalled += 1;
                pending.push_back((cat, name, idx));
                if stalled >= pending.len() * 2 {
                    break;
                }
                continue;
            };
            stalled = 0;
            let key = depth_key(&cat, &name);
            if depths.get(&key).map_or(true, |cur| depth < cur.depth) {
                depths.insert(key, RefInfo { depth, leaf: false });
            }
            resolved.push((cat, name, idx));
        }

        // second pass: record the shortest-producing branches of every
        // alternation in the resolved rules
        for (cat, name, idx) in &resolved {
            let def = self
                .defs
                .get_mut(cat.as_str())
                .and_then(|rules| rules.get_mut(name.as_str()))
                .and_then(|defs| defs.get_mut(*idx));
            if let Some(def) = def {
                for value in def.values.iter_mut() {
                    annotate(value, &depths);
                }
            }
        }

        // whatever is still pending is unreachable
        let mut doomed: IndexMap<(String, String), Vec<usize>> = IndexMap::new();
        for (cat, name, idx) in pending {
            doomed.entry((cat, name)).or_default().push(idx);
        }
        let mut pruned = Vec::new();
        for ((cat, name), mut idxs) in doomed {
            if self
                .no_prunes
                .get(&cat)
                .is_some_and(|names| names.contains(&name))
            {
                continue;
            }
            let Some(rules) = self.defs.get_mut(&cat) else {
                continue;
            };
            let Some(list) = rules.get_mut(&name) else {
                continue;
            };
            idxs.sort_unstable_by(|a, b| b.cmp(a));
            for idx in idxs {
                list.remove(idx);
            }
            if list.is_empty() {
                rules.shift_remove(&name);
            }
            pruned.push((cat, name));
        }

        self.processed = true;
        pruned
    }
}

fn count_refs(field: &Field) -> usize {
    match field {
        Field::Ref(_) => 1,
        Field::And(f) => count_refs_in(&f.values),
        Field::Or(f) => count_refs_in(&f.values),
        Field::Join(f) => count_refs_in(&f.values),
        Field::Opt(f) => count_refs_in(&f.values),
        Field::Quote(f) => count_refs_in(&f.values),
        Field::Custom(f) => count_refs_in(f.children()),
        Field::Lit(_) | Field::Int(_) | Field::Float(_) | Field::Str(_) => 0,
    }
}

fn count_refs_in(values: &[Field]) -> usize {
    values.iter().map(count_refs).sum()
}

/// Minimum reference depth of a field, or `None` while any referenced
/// rule is still unresolved.
fn depth_of(field: &Field, depths: &HashMap<String, RefInfo>) -> Option<usize> {
    match field {
        Field::Lit(_) | Field::Int(_) | Field::Float(_) | Field::Str(_) => Some(0),
        // optional subtrees produce nothing in shortest mode
        Field::Opt(_) => Some(0),
        Field::Custom(f) if f.shortest_is_nothing() => Some(0),
        Field::Custom(f) => max_depth(f.children(), depths),
        Field::Or(f) => {
            let mut best: Option<usize> = None;
            for value in &f.values {
                if let Some(depth) = depth_of(value, depths) {
                    best = Some(best.map_or(depth, |b| b.min(depth)));
                }
            }
            best
        }
        Field::And(f) => max_depth(&f.values, depths),
        Field::Join(f) => max_depth(&f.values, depths),
        Field::Quote(f) => max_depth(&f.values, depths),
        Field::Ref(f) => {
            let info = depths.get(&depth_key(&f.cat, &f.name))?;
            // a reference to a pure leaf rule does not count against
            // the recursion depth
            if info.depth == 0 && info.leaf {
                Some(0)
            } else {
                Some(info.depth + 1)
            }
        }
    }
}

/// Every child must build, so a concatenation is as deep as its deepest
/// child.
fn max_depth(values: &[Field], depths: &HashMap<String, RefInfo>) -> Option<usize> {
    let mut max = 0;
    for value in values {
        max = max.max(depth_of(value, depths)?);
    }
    Some(max)
}

fn annotate(field: &mut Field, depths: &HashMap<String, RefInfo>) {
    match field {
        Field::Or(or) => {
            annotate_or(or, depths);
            for value in or.values.iter_mut() {
                annotate(value, depths);
            }
        }
        Field::And(f) => annotate_all(&mut f.values, depths),
        Field::Join(f) => annotate_all(&mut f.values, depths),
        Field::Quote(f) => annotate_all(&mut f.values, depths),
        // never built in shortest mode, so annotation below is moot
        Field::Opt(_) => {}
        Field::Lit(_)
        | Field::Int(_)
        | Field::Float(_)
        | Field::Str(_)
        | Field::Ref(_)
        | Field::Custom(_) => {}
    }
}

fn annotate_all(values: &mut [Field], depths: &HashMap<String, RefInfo>) {
    for value in values {
        annotate(value, depths);
    }
}

fn annotate_or(or: &mut Or, depths: &HashMap<String, RefInfo>) {
    let mut best = usize::MAX;
    let mut picks = Vec::new();
    for (idx, value) in or.values.iter().enumerate() {
        match depth_of(value, depths) {
            Some(depth) if depth < best => {
                best = depth;
                picks = vec![idx];
            }
            Some(depth) if depth == best => picks.push(idx),
            _ => {}
        }
    }
    if best != usize::MAX {
        or.shortest = Some(picks);
    }
}

#[cfg(test)]
mod test {
    use crate::field::{Def, Field, Opt, Or, Ref};
    use crate::fields;
    use crate::registry::Registry;

    fn shortest_of(registry: &Registry, cat: &str, name: &str) -> Option<Vec<usize>> {
        match &registry.definitions(cat, name)[0].values[0] {
            Field::Or(or) => or.shortest.clone(),
            other => panic!("expected Or, got {other:?}"),
        }
    }

    #[test]
    fn leaf_rules_survive_untouched() {
        let mut registry = Registry::new();
        registry.define(Def::new("n", fields![5]).cat("c"));
        let pruned = registry.preprocess();
        assert!(pruned.is_empty());
        assert_eq!(registry.names("c"), vec!["n"]);
    }

    #[test]
    fn self_recursive_alternation_prefers_its_leaf_branch() {
        let mut registry = Registry::new();
        registry.define(Def::new(
            "e",
            fields![Or::new(fields![Ref::new("e"), "0"])],
        ));
        let pruned = registry.preprocess();
        assert!(pruned.is_empty());
        assert_eq!(shortest_of(&registry, "default", "e"), Some(vec![1]));
    }

    #[test]
    fn refs_to_pure_leaves_do_not_add_depth() {
        let mut registry = Registry::new();
        registry.define(Def::new("leaf", fields!["x"]));
        registry.define(Def::new("wrap", fields![Ref::new("leaf")]));
        registry.define(Def::new(
            "outer",
            fields![Or::new(fields![Ref::new("wrap"), Ref::new("leaf")])],
        ));
        registry.preprocess();
        // Ref("wrap") costs 1, Ref("leaf") costs 0
        assert_eq!(shortest_of(&registry, "default", "outer"), Some(vec![1]));
    }

    #[test]
    fn mutual_cycle_with_no_leaf_is_pruned() {
        let mut registry = Registry::new();
        registry.define(Def::new("a", fields![Ref::new("b").cat("c")]).cat("c"));
        registry.define(Def::new("b", fields![Ref::new("a").cat("c")]).cat("c"));
        let mut pruned = registry.preprocess();
        pruned.sort();
        assert_eq!(
            pruned,
            vec![
                ("c".to_string(), "a".to_string()),
                ("c".to_string(), "b".to_string())
            ]
        );
        assert!(registry.names("c").is_empty());
    }

    #[test]
    fn no_prune_keeps_an_unreachable_rule() {
        let mut registry = Registry::new();
        registry.define(Def::new("a", fields![Ref::new("b")]).no_prune());
        registry.define(Def::new("b", fields![Ref::new("a")]));
        registry.preprocess();
        assert_eq!(registry.names("default"), vec!["a"]);
    }

    #[test]
    fn refs_inside_optionals_cost_nothing() {
        let mut registry = Registry::new();
        registry.define(Def::new("loop", fields![Opt::new(fields![Ref::new("loop")])]));
        let pruned = registry.preprocess();
        // resolvable: the optional can always be skipped
        assert!(pruned.is_empty());
        assert_eq!(registry.names("default"), vec!["loop"]);
    }

    #[test]
    fn competing_definitions_prune_individually() {
        let mut registry = Registry::new();
        registry.define(Def::new("x", fields!["ok"]));
        registry.define(Def::new("x", fields![Ref::new("gone")]));
        registry.preprocess();
        // the reachable definition stays, the dangling one goes
        assert_eq!(registry.definitions("default", "x").len(), 1);
    }

    #[test]
    fn pruning_is_idempotent() {
        let mut registry = Registry::new();
        registry.define(Def::new("a", fields![Ref::new("b")]));
        registry.define(Def::new("b", fields![Ref::new("a")]));
        registry.define(Def::new("keep", fields!["k"]));
        let first = registry.preprocess();
        let second = registry.preprocess();
        assert_eq!(first.len(), 2);
        assert!(second.is_empty());
        assert_eq!(registry.names("default"), vec!["keep"]);
    }
}
