//! Sample generation.
//!
//! [`Registry::generate`] draws `num` samples from a category (or from
//! a category group's registered top-level category), preferring rules
//! from the requested category groups at the configured ratio, with a
//! bounded reference-recursion budget per sample. Definitions added
//! while a sample builds are staged, then committed only if the sample
//! succeeds.

use crate::error::Error;
use crate::field::Def;
use crate::rand::Rand;
use crate::registry::Registry;
use crate::state::BuildState;
use crate::Result;
use indexmap::IndexMap;
use typed_builder::TypedBuilder;

/// Reference depth at which builds switch to shortest mode, unless the
/// request overrides it.
pub const DEFAULT_MAX_RECURSION: usize = 10;

/// Consecutive recoverable failures tolerated before the last cause is
/// returned to the caller.
const MAX_CONSECUTIVE_FAILURES: usize = 0x100;

/// What to generate from: a category directly, or a category group with
/// a registered top-level category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Category(String),
    Group(String),
}

impl Target {
    pub fn cat(cat: impl Into<String>) -> Self {
        Target::Category(cat.into())
    }

    pub fn group(group: impl Into<String>) -> Self {
        Target::Group(group.into())
    }
}

/// A generation request.
///
/// # Example
///
/// ```rust
/// use gramgen::{GenRequest, Target};
///
/// let req = GenRequest::builder()
///     .num(10)
///     .target(Target::cat("json"))
///     .preferred(vec!["objects".into()])
///     .build();
/// assert_eq!(req.preferred_ratio, 0.5);
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct GenRequest {
    /// Number of samples to generate.
    pub num: usize,
    /// Category or category group to generate from.
    pub target: Target,
    /// Category groups (or bare rule names) to favor over a uniform pick.
    #[builder(default)]
    pub preferred: Vec<String>,
    /// Probability that a sample starts from a preferred name.
    #[builder(default = 0.5)]
    pub preferred_ratio: f64,
    /// Reference depth at which builds switch to shortest mode.
    #[builder(default = DEFAULT_MAX_RECURSION)]
    pub max_recursion: usize,
    /// Re-run the analyzer first when definitions changed since the
    /// last run.
    #[builder(default = true)]
    pub auto_process: bool,
}

impl Registry {
    /// Generates `req.num` samples.
    ///
    /// Each successful sample contributes its prerequisite strings (in
    /// order) followed by its main string to the returned list, and
    /// commits any definitions staged during its build. A sample that
    /// fails recoverably is rolled back and retried without counting.
    pub fn generate(&mut self, req: &GenRequest, rand: &mut Rand) -> Result<Vec<String>> {
        let cat = match &req.target {
            Target::Category(cat) => cat.clone(),
            Target::Group(group) => self
                .group_top_cats
                .get(group)
                .cloned()
                .ok_or_else(|| Error::MissingTopCategory {
                    group: group.clone(),
                })?,
        };

        if req.auto_process && !self.processed {
            self.preprocess();
        }

        let pref_keys = self.pref_keys(&cat, &req.preferred);

        let mut out = Vec::with_capacity(req.num);
        let mut produced = 0usize;
        let mut failures = 0usize;
        while produced < req.num {
            let (built, pre, staged) = {
                let defs = self
                    .defs
                    .get(cat.as_str())
                    .ok_or_else(|| Error::CategoryMissing { cat: cat.clone() })?;
                if defs.is_empty() {
                    return Err(Error::EmptyCategory { cat: cat.clone() });
                }

                // preferred names win with probability `preferred_ratio`;
                // a pruned preferred name falls back to a uniform pick
                let name = if !pref_keys.is_empty() && rand.maybe(req.preferred_ratio) {
                    let pick = rand.choice(pref_keys.as_slice());
                    if defs.contains_key(pick.as_str()) {
                        pick.as_str()
                    } else {
                        uniform_name(defs, rand)
                    }
                } else {
                    uniform_name(defs, rand)
                };
                let def = rand.choice(defs[name].as_slice());

                let mut pre = Vec::new();
                let mut st = BuildState::new(self, rand, req.max_recursion);
                let built = def.build(&mut st, &mut pre, false);
                (built, pre, st.into_staged())
            };

            match built {
                Ok(body) => {
                    failures = 0;
                    for def in staged {
                        self.define(def);
                    }
                    out.extend(pre);
                    out.push(body);
                    produced += 1;
                }
                Err(e) if e.is_recoverable() => {
                    failures += 1;
                    if failures >= MAX_CONSECUTIVE_FAILURES {
                        return Err(e);
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }
}

fn uniform_name<'a>(defs: &'a IndexMap<String, Vec<Def>>, rand: &mut Rand) -> &'a str {
    let (name, _) = defs
        .get_index(rand.index(defs.len()))
        .expect("index within bounds");
    name.as_str()
}
