use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::PropertyResolver;
use crate::container::descriptor::{Capability, ComponentDefinition};
use crate::container::diagnostics::Diagnostic;
use crate::container::registry::ComponentTable;
use crate::entity::EntityDefinition;
use crate::errors::CoreError;

/// An assembled context: every singleton constructed, every entity registered.
///
/// Immutable after assembly, so a `Container` can be shared across threads
/// and queried concurrently.
pub struct Container {
    id: Uuid,
    root: String,
    assembled_at: DateTime<Utc>,
    table: Arc<ComponentTable>,
    construction_order: Vec<String>,
    entities: Vec<EntityDefinition>,
    diagnostics: Vec<Diagnostic>,
    properties: PropertyResolver,
    closed: AtomicBool,
}

impl Container {
    pub(crate) fn new(
        root: &str,
        table: Arc<ComponentTable>,
        construction_order: Vec<String>,
        entities: Vec<EntityDefinition>,
        diagnostics: Vec<Diagnostic>,
        properties: PropertyResolver,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            root: root.to_string(),
            assembled_at: Utc::now(),
            table,
            construction_order,
            entities,
            diagnostics,
            properties,
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Name of the declaration this context was assembled from
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn assembled_at(&self) -> DateTime<Utc> {
        self.assembled_at
    }

    /// The definition registered under `name`
    pub fn lookup(&self, name: &str) -> Option<&ComponentDefinition> {
        self.table.definition(name)
    }

    /// Every definition exposing `capability`, by ascending order then registration
    pub fn lookup_by_capability(&self, capability: &Capability) -> Vec<&ComponentDefinition> {
        self.table.providers(capability)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.definition(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Component names in registration order
    pub fn component_names(&self) -> Vec<&str> {
        self.table.definitions().iter().map(|d| d.name()).collect()
    }

    pub fn definitions(&self) -> &[ComponentDefinition] {
        self.table.definitions()
    }

    /// Names in the order their singletons were constructed
    pub fn construction_order(&self) -> &[String] {
        &self.construction_order
    }

    /// The singleton `name` as its concrete type
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, CoreError> {
        self.table.typed::<T>(name)
    }

    /// The single component of type (or exposed trait) `T`, primary first
    pub fn get_unique<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, CoreError> {
        let capability = Capability::of::<T>();
        match self.table.unique_provider(&capability, None) {
            Ok(Some(definition)) => self.table.cast::<T>(definition.name()),
            Ok(None) => Err(CoreError::component_not_found(capability.to_string())),
            Err(candidates) => Err(CoreError::NoUniqueComponent {
                capability: capability.to_string(),
                candidates,
            }),
        }
    }

    /// All components of type (or exposed trait) `T`, in capability order
    pub fn get_all<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Vec<Arc<T>>, CoreError> {
        self.table
            .providers(&Capability::of::<T>())
            .into_iter()
            .map(|definition| self.table.cast::<T>(definition.name()))
            .collect()
    }

    /// Entities discovered and registered during assembly
    pub fn entities(&self) -> &[EntityDefinition] {
        &self.entities
    }

    pub fn entity(&self, name: &str) -> Option<&EntityDefinition> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_warning())
    }

    pub fn properties(&self) -> &PropertyResolver {
        &self.properties
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Run destroy hooks in reverse construction order.
    ///
    /// Every hook runs even when an earlier one fails; the first failure is
    /// returned. Closing twice is a no-op.
    pub fn close(&self) -> Result<(), CoreError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        tracing::info!("Closing context '{}' ({})", self.root, self.id);

        let mut first_error = None;
        for name in self.construction_order.iter().rev() {
            let (Some(definition), Some(instance)) =
                (self.table.definition(name), self.table.instance(name))
            else {
                continue;
            };
            if !definition.has_destroy_hook() {
                continue;
            }

            tracing::debug!("Destroying component '{}'", name);
            if let Err(error) = definition.run_destroy(instance) {
                tracing::warn!("Destroy hook of component '{}' failed: {}", name, error);
                first_error.get_or_insert(CoreError::lifecycle(name.clone(), "destroy", error));
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("root", &self.root)
            .field("assembled_at", &self.assembled_at)
            .field("components", &self.component_names())
            .field("entities", &self.entities.len())
            .field("diagnostics", &self.diagnostics.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
