//! Index of components and entities available to component scanning.
//!
//! Rust has no runtime class-path to walk, so scannable items register
//! themselves here under the module path they live in, and a declaration's
//! scan picks up every entry at or below its scope.

use crate::container::ComponentDefinition;
use crate::entity::{Entity, EntityDefinition};

#[derive(Debug, Clone)]
pub enum ScanTarget {
    Component(ComponentDefinition),
    Entity(EntityDefinition),
}

#[derive(Debug, Clone)]
pub struct ScanEntry {
    id: usize,
    scope: String,
    target: ScanTarget,
}

impl ScanEntry {
    /// Stable identity inside its index, so a rescan can be recognized
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn target(&self) -> &ScanTarget {
        &self.target
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScanIndex {
    entries: Vec<ScanEntry>,
}

impl ScanIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, scope: impl Into<String>, target: ScanTarget) -> &mut Self {
        let id = self.entries.len();
        self.entries.push(ScanEntry {
            id,
            scope: scope.into(),
            target,
        });
        self
    }

    pub fn register_component(
        &mut self,
        scope: impl Into<String>,
        definition: ComponentDefinition,
    ) -> &mut Self {
        self.push(scope, ScanTarget::Component(definition))
    }

    pub fn register_entity<E: Entity>(&mut self, scope: impl Into<String>) -> &mut Self {
        self.push(scope, ScanTarget::Entity(E::definition()))
    }

    pub fn register_entity_definition(
        &mut self,
        scope: impl Into<String>,
        definition: EntityDefinition,
    ) -> &mut Self {
        self.push(scope, ScanTarget::Entity(definition))
    }

    /// Entries at `scope` or nested below it, in registration order
    pub fn scan<'a>(&'a self, scope: &'a str) -> impl Iterator<Item = &'a ScanEntry> + 'a {
        self.entries
            .iter()
            .filter(move |entry| scope_matches(&entry.scope, scope))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `hello::web` matches `hello` but `helloworld` does not
fn scope_matches(entry_scope: &str, requested: &str) -> bool {
    if requested.is_empty() {
        return true;
    }
    match entry_scope.strip_prefix(requested) {
        Some(rest) => rest.is_empty() || rest.starts_with("::"),
        None => false,
    }
}
