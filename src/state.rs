use crate::field::Def;
use crate::rand::Rand;
use crate::registry::Registry;

/// Runaway guard never drops below this many nested references.
const RUNAWAY_FLOOR: usize = 0x200;

/// Context threaded through a single sample build: the registry handle,
/// the random source, the reference-depth counter, the scope stack, and
/// the staging buffer for definitions added mid-build.
pub struct BuildState<'r> {
    registry: &'r Registry,
    rand: &'r mut Rand,
    max_recursion: usize,
    runaway_limit: usize,
    ref_level: usize,
    scopes: Vec<Vec<String>>,
    staged: Vec<Def>,
}

impl<'r> BuildState<'r> {
    pub fn new(registry: &'r Registry, rand: &'r mut Rand, max_recursion: usize) -> Self {
        BuildState {
            registry,
            rand,
            max_recursion,
            runaway_limit: RUNAWAY_FLOOR.max(max_recursion.saturating_mul(2)),
            ref_level: 1,
            scopes: Vec::new(),
            staged: Vec::new(),
        }
    }

    /// The registry this build resolves references against.
    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// The random source for this build.
    pub fn rand(&mut self) -> &mut Rand {
        &mut *self.rand
    }

    /// Quarantine a definition added mid-build. The generator commits
    /// the staging buffer once the sample succeeds and discards it
    /// otherwise, so a failed sample leaves the registry untouched.
    pub fn add_definition(&mut self, def: Def) {
        self.staged.push(def);
    }

    pub(crate) fn into_staged(self) -> Vec<Def> {
        self.staged
    }

    pub(crate) fn enter_ref(&mut self) {
        self.ref_level += 1;
    }

    pub(crate) fn leave_ref(&mut self) {
        self.ref_level -= 1;
    }

    pub(crate) fn at_recursion_limit(&self) -> bool {
        self.ref_level >= self.max_recursion
    }

    pub(crate) fn past_runaway_limit(&self) -> bool {
        self.ref_level > self.runaway_limit
    }

    pub(crate) fn runaway_limit(&self) -> usize {
        self.runaway_limit
    }

    pub(crate) fn push_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    pub(crate) fn pop_scope(&mut self) -> Vec<String> {
        self.scopes.pop().unwrap_or_default()
    }

    /// Depth of the scope stack; 1 while the top-level rule builds.
    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    /// Move flushed statements into the innermost scope; they are
    /// emitted ahead of that rule's output when its build completes.
    pub(crate) fn hoist(&mut self, items: Vec<String>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.extend(items);
        }
    }
}
