use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::{Arc, OnceLock, Weak};

use crate::config::PropertyResolver;
use crate::container::descriptor::{Capability, DependencyTarget};
use crate::container::registry::ComponentTable;
use crate::container::resolver::ResolvedDependency;
use crate::errors::CoreError;

/// Filled with the finished table once assembly succeeds
pub(crate) type LazySlot = Arc<OnceLock<Weak<ComponentTable>>>;

/// What a constructor sees while its component is being built.
///
/// Only dependencies the definition declared are reachable, and all eager
/// ones are already constructed.
pub struct ComponentContext<'a> {
    component: &'a str,
    dependencies: &'a [ResolvedDependency],
    table: &'a ComponentTable,
    properties: &'a PropertyResolver,
    lazy_slot: &'a LazySlot,
}

impl<'a> ComponentContext<'a> {
    pub(crate) fn new(
        component: &'a str,
        dependencies: &'a [ResolvedDependency],
        table: &'a ComponentTable,
        properties: &'a PropertyResolver,
        lazy_slot: &'a LazySlot,
    ) -> Self {
        Self {
            component,
            dependencies,
            table,
            properties,
            lazy_slot,
        }
    }

    /// Name of the component under construction
    pub fn component_name(&self) -> &str {
        self.component
    }

    pub fn properties(&self) -> &PropertyResolver {
        self.properties
    }

    fn undeclared(&self, dependency: impl fmt::Display) -> CoreError {
        CoreError::UndeclaredDependency {
            component: self.component.to_string(),
            dependency: dependency.to_string(),
        }
    }

    fn declared_by_name(&self, name: &str, lazy: bool) -> Option<&'a ResolvedDependency> {
        self.dependencies.iter().find(|resolved| {
            resolved.dependency.lazy == lazy
                && matches!(&resolved.dependency.target, DependencyTarget::Name(n) if n == name)
        })
    }

    /// An eager dependency declared by name or resolved to `name`
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, CoreError> {
        let declared = self.dependencies.iter().any(|resolved| {
            !resolved.dependency.lazy && resolved.target.as_deref() == Some(name)
        });
        if !declared {
            return Err(self.undeclared(name));
        }
        self.table.typed::<T>(name)
    }

    /// The component satisfying a `depends_on_type::<T>()` declaration
    pub fn get_by_type<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, CoreError> {
        let capability = Capability::of::<T>();
        let resolved = self
            .dependencies
            .iter()
            .find(|resolved| {
                !resolved.dependency.lazy
                    && resolved.dependency.target == DependencyTarget::Capability(capability)
            })
            .ok_or_else(|| self.undeclared(capability))?;

        match &resolved.target {
            Some(name) => self.table.cast::<T>(name),
            None => Err(CoreError::component_not_found(capability.to_string())),
        }
    }

    /// An optional dependency; `None` when nothing provides it
    pub fn get_optional<T: Send + Sync + 'static>(&self, name: &str) -> Result<Option<Arc<T>>, CoreError> {
        let resolved = self
            .declared_by_name(name, false)
            .ok_or_else(|| self.undeclared(name))?;

        match &resolved.target {
            Some(target) => self.table.typed::<T>(target).map(Some),
            None => Ok(None),
        }
    }

    /// A handle to a lazily declared dependency, usable once assembly finishes
    pub fn lazy<T: Send + Sync + 'static>(&self, name: &str) -> Result<Lazy<T>, CoreError> {
        let resolved = self
            .declared_by_name(name, true)
            .ok_or_else(|| self.undeclared(name))?;

        let target = resolved
            .target
            .clone()
            .ok_or_else(|| CoreError::component_not_found(name))?;

        Ok(Lazy {
            name: target,
            slot: Arc::clone(self.lazy_slot),
            _phantom: PhantomData,
        })
    }

    /// A required property, `${...}` expressions resolved
    pub fn property<T: FromStr>(&self, key: &str) -> Result<T, CoreError> {
        Ok(self.properties.get_required(key)?)
    }

    pub fn property_or<T: FromStr>(&self, key: &str, default: T) -> Result<T, CoreError> {
        Ok(self.properties.get_or(key, default)?)
    }
}

/// Deferred access to a component that may not be constructed yet.
///
/// Breaks construction-order cycles: the handle can be stored during
/// construction and dereferenced once the container exists.
pub struct Lazy<T> {
    name: String,
    slot: LazySlot,
    _phantom: PhantomData<fn() -> Arc<T>>,
}

impl<T: Send + Sync + 'static> Lazy<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve the component; fails before assembly completes or after the container is dropped
    pub fn get(&self) -> Result<Arc<T>, CoreError> {
        let table = self
            .slot
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| CoreError::ContainerUnavailable {
                dependency: self.name.clone(),
            })?;
        table.typed::<T>(&self.name)
    }
}

impl<T> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            slot: Arc::clone(&self.slot),
            _phantom: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy")
            .field("name", &self.name)
            .field("available", &self.slot.get().is_some())
            .finish()
    }
}
