use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::container::descriptor::{Capability, ComponentDefinition, ComponentInstance};
use crate::errors::CoreError;

/// Definitions of one assembled context and the instances built from them.
///
/// Filled during assembly and read-only afterwards, which is what makes
/// lookups from many threads safe without locking.
pub(crate) struct ComponentTable {
    definitions: Vec<ComponentDefinition>,
    index: HashMap<String, usize>,
    instances: HashMap<String, ComponentInstance>,
}

impl ComponentTable {
    /// Definitions must already carry unique names
    pub(crate) fn new(definitions: Vec<ComponentDefinition>) -> Self {
        let index = definitions
            .iter()
            .enumerate()
            .map(|(pos, def)| (def.name().to_string(), pos))
            .collect();

        Self {
            definitions,
            index,
            instances: HashMap::new(),
        }
    }

    pub(crate) fn definitions(&self) -> &[ComponentDefinition] {
        &self.definitions
    }

    pub(crate) fn definition(&self, name: &str) -> Option<&ComponentDefinition> {
        self.index.get(name).map(|&pos| &self.definitions[pos])
    }

    pub(crate) fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Providers of `capability`, by ascending order then registration position
    pub(crate) fn providers(&self, capability: &Capability) -> Vec<&ComponentDefinition> {
        let mut providers: Vec<(usize, &ComponentDefinition)> = self
            .definitions
            .iter()
            .enumerate()
            .filter(|(_, def)| def.has_capability(capability))
            .collect();
        providers.sort_by_key(|(pos, def)| (def.order(), *pos));
        providers.into_iter().map(|(_, def)| def).collect()
    }

    /// The single provider of `capability`, ignoring `exclude`.
    ///
    /// With several candidates a single primary one wins; otherwise the
    /// candidate names come back as the error.
    pub(crate) fn unique_provider(
        &self,
        capability: &Capability,
        exclude: Option<&str>,
    ) -> Result<Option<&ComponentDefinition>, Vec<String>> {
        let candidates: Vec<&ComponentDefinition> = self
            .providers(capability)
            .into_iter()
            .filter(|def| Some(def.name()) != exclude)
            .collect();

        match candidates.as_slice() {
            [] => Ok(None),
            [single] => Ok(Some(*single)),
            _ => {
                let primaries: Vec<&ComponentDefinition> =
                    candidates.iter().copied().filter(|d| d.is_primary()).collect();
                match primaries.as_slice() {
                    [primary] => Ok(Some(*primary)),
                    _ => Err(candidates.iter().map(|d| d.name().to_string()).collect()),
                }
            }
        }
    }

    pub(crate) fn instance(&self, name: &str) -> Option<&ComponentInstance> {
        self.instances.get(name)
    }

    pub(crate) fn insert_instance(&mut self, name: &str, instance: ComponentInstance) {
        self.instances.insert(name.to_string(), instance);
    }

    fn constructed(&self, name: &str) -> Result<(&ComponentDefinition, &ComponentInstance), CoreError> {
        let definition = self
            .definition(name)
            .ok_or_else(|| CoreError::component_not_found(name))?;
        let instance = self.instance(name).ok_or_else(|| {
            CoreError::component_not_found(format!("{} (not constructed yet)", name))
        })?;
        Ok((definition, instance))
    }

    /// The instance `name` as its concrete type
    pub(crate) fn typed<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, CoreError> {
        let (definition, instance) = self.constructed(name)?;
        instance
            .clone()
            .downcast::<T>()
            .map_err(|_| CoreError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
                actual: definition.type_name(),
            })
    }

    /// The instance `name` through a capability it exposes
    pub(crate) fn cast<T: ?Sized + 'static>(&self, name: &str) -> Result<Arc<T>, CoreError> {
        let (definition, instance) = self.constructed(name)?;
        let mismatch = || CoreError::TypeMismatch {
            name: name.to_string(),
            expected: std::any::type_name::<T>(),
            actual: definition.type_name(),
        };

        let boxed: Box<dyn Any + Send + Sync> = definition
            .cast(&Capability::of::<T>(), instance)
            .ok_or_else(mismatch)?;
        boxed
            .downcast::<Arc<T>>()
            .map(|typed| *typed)
            .map_err(|_| mismatch())
    }
}
