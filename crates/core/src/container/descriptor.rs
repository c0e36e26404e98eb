use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::container::context::ComponentContext;
use crate::container::conventions;
use crate::errors::CoreError;

/// A constructed component, type-erased
pub type ComponentInstance = Arc<dyn Any + Send + Sync>;

pub(crate) type Constructor =
    Arc<dyn Fn(&ComponentContext<'_>) -> Result<ComponentInstance, CoreError> + Send + Sync>;

pub(crate) type LifecycleHook = Arc<dyn Fn(&ComponentInstance) -> Result<(), CoreError> + Send + Sync>;

/// Produces a `Box<Arc<C>>` for the capability `C` out of an instance
type CapabilityCast = Arc<dyn Fn(&ComponentInstance) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// A type a component can be looked up as: its own type or a trait object it exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capability {
    type_id: TypeId,
    type_name: &'static str,
}

impl Capability {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// What a dependency points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyTarget {
    Name(String),
    Capability(Capability),
}

impl fmt::Display for DependencyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyTarget::Name(name) => write!(f, "component '{}'", name),
            DependencyTarget::Capability(capability) => write!(f, "type {}", capability),
        }
    }
}

/// A declared dependency of a component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub target: DependencyTarget,
    /// Lazy edges do not order construction; the value is reachable only after assembly
    pub lazy: bool,
    /// Optional dependencies that nothing satisfies are injected as absent
    pub required: bool,
}

impl Dependency {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            target: DependencyTarget::Name(name.into()),
            lazy: false,
            required: true,
        }
    }

    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            target: DependencyTarget::Capability(Capability::of::<T>()),
            lazy: false,
            required: true,
        }
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// How a component instance is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreationStrategy {
    Constructor,
    /// Created by a method of another component, which becomes an implicit dependency
    FactoryMethod { factory: String, method: String },
}

#[derive(Clone)]
struct CapabilityBinding {
    capability: Capability,
    cast: CapabilityCast,
}

/// Everything the assembler needs to know to construct one component
#[derive(Clone)]
pub struct ComponentDefinition {
    name: String,
    type_name: &'static str,
    origin: Option<String>,
    strategy: CreationStrategy,
    dependencies: Vec<Dependency>,
    capabilities: Vec<CapabilityBinding>,
    order: i32,
    primary: bool,
    constructor: Constructor,
    init: Option<LifecycleHook>,
    destroy: Option<LifecycleHook>,
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("origin", &self.origin)
            .field("strategy", &self.strategy)
            .field("dependencies", &self.dependencies)
            .field(
                "capabilities",
                &self.capabilities.iter().map(|b| b.capability).collect::<Vec<_>>(),
            )
            .field("order", &self.order)
            .field("primary", &self.primary)
            .finish()
    }
}

impl ComponentDefinition {
    /// Start a definition for a component of type `T`
    pub fn builder<T: Send + Sync + 'static>() -> ComponentBuilder<T> {
        ComponentBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Declaration that contributed this definition, set during assembly
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn strategy(&self) -> &CreationStrategy {
        &self.strategy
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn capabilities(&self) -> impl Iterator<Item = &Capability> {
        self.capabilities.iter().map(|binding| &binding.capability)
    }

    pub fn has_capability(&self, capability: &Capability) -> bool {
        self.capabilities.iter().any(|b| b.capability == *capability)
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn has_destroy_hook(&self) -> bool {
        self.destroy.is_some()
    }

    pub(crate) fn with_origin(mut self, origin: &str) -> Self {
        self.origin = Some(origin.to_string());
        self
    }

    pub(crate) fn construct(&self, ctx: &ComponentContext<'_>) -> Result<ComponentInstance, CoreError> {
        (self.constructor)(ctx)
    }

    pub(crate) fn run_init(&self, instance: &ComponentInstance) -> Result<(), CoreError> {
        match &self.init {
            Some(hook) => hook(instance),
            None => Ok(()),
        }
    }

    pub(crate) fn run_destroy(&self, instance: &ComponentInstance) -> Result<(), CoreError> {
        match &self.destroy {
            Some(hook) => hook(instance),
            None => Ok(()),
        }
    }

    /// View `instance` as `capability`; yields a `Box<Arc<C>>`
    pub(crate) fn cast(
        &self,
        capability: &Capability,
        instance: &ComponentInstance,
    ) -> Option<Box<dyn Any + Send + Sync>> {
        self.capabilities
            .iter()
            .find(|b| b.capability == *capability)
            .and_then(|binding| (binding.cast)(instance))
    }
}

/// Builder for component definitions
pub struct ComponentBuilder<T> {
    name: Option<String>,
    strategy: CreationStrategy,
    constructor: Option<Constructor>,
    dependencies: Vec<Dependency>,
    capabilities: Vec<CapabilityBinding>,
    order: i32,
    primary: bool,
    init: Option<LifecycleHook>,
    destroy: Option<LifecycleHook>,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> ComponentBuilder<T> {
    pub fn new() -> Self {
        let own_type = CapabilityBinding {
            capability: Capability::of::<T>(),
            cast: Arc::new(|instance: &ComponentInstance| {
                instance
                    .clone()
                    .downcast::<T>()
                    .ok()
                    .map(|typed| Box::new(typed) as Box<dyn Any + Send + Sync>)
            }),
        };

        Self {
            name: None,
            strategy: CreationStrategy::Constructor,
            constructor: None,
            dependencies: Vec::new(),
            capabilities: vec![own_type],
            order: i32::MAX,
            primary: false,
            init: None,
            destroy: None,
            _phantom: PhantomData,
        }
    }

    /// Override the default name derived from the type
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Create the component with a constructor function
    pub fn constructor<F>(mut self, constructor: F) -> Self
    where
        F: Fn(&ComponentContext<'_>) -> Result<T, CoreError> + Send + Sync + 'static,
    {
        self.strategy = CreationStrategy::Constructor;
        self.constructor = Some(Arc::new(move |ctx| {
            let instance = constructor(ctx)?;
            Ok(Arc::new(instance) as ComponentInstance)
        }));
        self
    }

    /// Create the component through a method of the component `factory`
    pub fn factory_method<F, M>(
        mut self,
        factory: impl Into<String>,
        method: impl Into<String>,
        create: M,
    ) -> Self
    where
        F: Send + Sync + 'static,
        M: Fn(&F, &ComponentContext<'_>) -> Result<T, CoreError> + Send + Sync + 'static,
    {
        let factory = factory.into();
        let factory_name = factory.clone();

        self.dependencies.push(Dependency::named(factory.clone()));
        self.strategy = CreationStrategy::FactoryMethod {
            factory,
            method: method.into(),
        };
        self.constructor = Some(Arc::new(move |ctx| {
            let owner = ctx.get::<F>(&factory_name)?;
            let instance = create(&owner, ctx)?;
            Ok(Arc::new(instance) as ComponentInstance)
        }));
        self
    }

    /// Depend on the component called `name`
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(Dependency::named(name));
        self
    }

    /// Depend on the unique component of type (or exposed trait) `D`
    pub fn depends_on_type<D: ?Sized + 'static>(mut self) -> Self {
        self.dependencies.push(Dependency::of::<D>());
        self
    }

    /// Depend on `name` without ordering construction on it
    pub fn depends_on_lazy(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(Dependency::named(name).lazy());
        self
    }

    /// Depend on `name` if some declaration provides it
    pub fn depends_on_optional(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(Dependency::named(name).optional());
        self
    }

    pub fn dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Make the component discoverable as `C`, usually a trait object
    pub fn exposes<C>(mut self, cast: fn(Arc<T>) -> Arc<C>) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let capability = Capability::of::<C>();
        if self.capabilities.iter().any(|b| b.capability == capability) {
            return self;
        }
        self.capabilities.push(CapabilityBinding {
            capability,
            cast: Arc::new(move |instance: &ComponentInstance| {
                instance
                    .clone()
                    .downcast::<T>()
                    .ok()
                    .map(|typed| Box::new(cast(typed)) as Box<dyn Any + Send + Sync>)
            }),
        });
        self
    }

    /// Lower orders come first when listing components by capability
    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Prefer this component when a single instance of a capability is requested
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Run after construction, before any dependent is constructed
    pub fn on_init<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) -> Result<(), CoreError> + Send + Sync + 'static,
    {
        self.init = Some(typed_hook(hook));
        self
    }

    /// Run when the container is closed, in reverse construction order
    pub fn on_destroy<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) -> Result<(), CoreError> + Send + Sync + 'static,
    {
        self.destroy = Some(typed_hook(hook));
        self
    }

    pub fn build(self) -> Result<ComponentDefinition, CoreError> {
        let type_name = std::any::type_name::<T>();
        let name = match self.name {
            Some(name) => conventions::normalize_component_name(&name)?,
            None => conventions::default_component_name(type_name),
        };

        let constructor = self.constructor.ok_or_else(|| {
            CoreError::invalid_definition(format!(
                "component '{}' ({}) has no constructor or factory method",
                name, type_name
            ))
        })?;

        Ok(ComponentDefinition {
            name,
            type_name,
            origin: None,
            strategy: self.strategy,
            dependencies: self.dependencies,
            capabilities: self.capabilities,
            order: self.order,
            primary: self.primary,
            constructor,
            init: self.init,
            destroy: self.destroy,
        })
    }
}

impl<T: Send + Sync + 'static> Default for ComponentBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn typed_hook<T, F>(hook: F) -> LifecycleHook
where
    T: Send + Sync + 'static,
    F: Fn(&T) -> Result<(), CoreError> + Send + Sync + 'static,
{
    Arc::new(move |instance: &ComponentInstance| match (**instance).downcast_ref::<T>() {
        Some(typed) => hook(typed),
        None => Err(CoreError::invalid_definition(format!(
            "lifecycle hook expected a {}",
            std::any::type_name::<T>()
        ))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    #[derive(Default)]
    struct EnglishGreeter;

    impl Greeter for EnglishGreeter {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    #[test]
    fn test_capability_identity() {
        let a = Capability::of::<EnglishGreeter>();
        let b = Capability::of::<dyn Greeter>();

        assert_ne!(a, b);
        assert!(a.type_name().ends_with("EnglishGreeter"));
        assert!(b.to_string().contains("Greeter"));
    }

    #[test]
    fn test_default_name_and_own_capability() {
        let def = ComponentDefinition::builder::<EnglishGreeter>()
            .constructor(|_| Ok(EnglishGreeter))
            .build()
            .unwrap();

        assert_eq!(def.name(), "englishGreeter");
        assert_eq!(def.strategy(), &CreationStrategy::Constructor);
        assert!(def.has_capability(&Capability::of::<EnglishGreeter>()));
        assert!(!def.has_capability(&Capability::of::<dyn Greeter>()));
        assert_eq!(def.order(), i32::MAX);
        assert!(def.origin().is_none());
    }

    #[test]
    fn test_exposed_trait_cast() {
        let def = ComponentDefinition::builder::<EnglishGreeter>()
            .named("greeter")
            .constructor(|_| Ok(EnglishGreeter))
            .exposes::<dyn Greeter>(|g| g)
            .build()
            .unwrap();

        let instance: ComponentInstance = Arc::new(EnglishGreeter);
        let boxed = def.cast(&Capability::of::<dyn Greeter>(), &instance).unwrap();
        let greeter = boxed.downcast::<Arc<dyn Greeter>>().unwrap();

        assert_eq!(greeter.greet(), "hello");
    }

    #[test]
    fn test_factory_method_adds_implicit_dependency() {
        struct Settings;

        let def = ComponentDefinition::builder::<EnglishGreeter>()
            .factory_method("helloConfiguration", "greeter", |_: &Settings, _| Ok(EnglishGreeter))
            .build()
            .unwrap();

        assert_eq!(def.dependencies(), &[Dependency::named("helloConfiguration")]);
        assert_eq!(
            def.strategy(),
            &CreationStrategy::FactoryMethod {
                factory: "helloConfiguration".to_string(),
                method: "greeter".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_constructor_is_rejected() {
        let err = ComponentDefinition::builder::<EnglishGreeter>()
            .build()
            .unwrap_err();

        assert!(matches!(err, CoreError::InvalidDefinition { .. }));
    }

    #[test]
    fn test_blank_name_is_rejected() {
        let result = ComponentDefinition::builder::<EnglishGreeter>()
            .named("  ")
            .constructor(|_| Ok(EnglishGreeter))
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_dependency_flags() {
        let dep = Dependency::named("eventBus").lazy().optional();

        assert!(dep.lazy);
        assert!(!dep.required);
        assert_eq!(dep.target.to_string(), "component 'eventBus'");
    }
}
