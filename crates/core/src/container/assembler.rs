//! Turns a root declaration into a [`Container`].
//!
//! Assembly runs in fixed phases and fails before constructing anything
//! when the declarations themselves are broken:
//!
//! 1. resolve imports breadth-first from the root
//! 2. collect definitions; a later contribution replaces an earlier one of
//!    the same name and leaves a warning diagnostic
//! 3. resolve dependencies and order components, rejecting cycles
//! 4. construct singletons in that order, running init hooks
//! 5. hand entity definitions to every [`EntityRegistrar`]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::config::PropertyResolver;
use crate::container::container::Container;
use crate::container::context::{ComponentContext, LazySlot};
use crate::container::descriptor::{Capability, ComponentDefinition, DependencyTarget};
use crate::container::diagnostics::Diagnostic;
use crate::container::registry::ComponentTable;
use crate::container::resolver::{DependencyGraph, ResolvedDependency};
use crate::entity::{EntityDefinition, EntityRegistrar};
use crate::errors::{AssemblyError, CoreError};
use crate::modules::{ConfigurationDeclaration, DeclarationCatalog, ImportResolver, ScanIndex, ScanTarget};

/// Assembles contexts out of a catalog
pub struct Assembler<'a> {
    catalog: &'a DeclarationCatalog,
    properties: PropertyResolver,
}

impl<'a> Assembler<'a> {
    pub fn new(catalog: &'a DeclarationCatalog) -> Self {
        Self {
            catalog,
            properties: PropertyResolver::new(),
        }
    }

    /// Properties available to constructors through the component context
    pub fn with_properties(mut self, properties: PropertyResolver) -> Self {
        self.properties = properties;
        self
    }

    /// Assemble the context rooted at `root`.
    ///
    /// Repeated calls with an unchanged catalog produce equivalent
    /// containers, each with its own set of singletons.
    pub fn assemble(&self, root: &str) -> Result<Container, AssemblyError> {
        let started = Instant::now();
        tracing::info!("Assembling context from declaration '{}'", root);

        let plan = ImportResolver::new(self.catalog).resolve(root)?;
        tracing::debug!("Contribution order: {:?}", plan.names());

        let mut contributions = Contributions::default();
        contributions.diagnostics.extend(plan.diagnostics.iter().cloned());
        for declaration in plan.contribution_order() {
            contributions.contribute(declaration, self.catalog.scan_index())?;
        }
        let Contributions {
            definitions,
            entities,
            mut diagnostics,
            ..
        } = contributions;

        let mut table = ComponentTable::new(definitions);
        let resolved = resolve_dependencies(&table, &mut diagnostics)?;
        let graph = DependencyGraph::build(table.definitions().iter().map(|definition| {
            let targets = resolved
                .get(definition.name())
                .map(|deps| eager_targets(deps))
                .unwrap_or_default();
            (definition.name(), targets)
        }));
        let order = graph.topological_sort()?;

        let lazy_slot = LazySlot::default();
        let mut constructed: Vec<String> = Vec::with_capacity(order.len());

        for name in &order {
            let Some(definition) = table.definition(name).cloned() else {
                continue;
            };
            let dependencies = resolved.get(name.as_str()).map(Vec::as_slice).unwrap_or(&[]);

            let built = {
                let ctx = ComponentContext::new(name, dependencies, &table, &self.properties, &lazy_slot);
                definition.construct(&ctx)
            }
            .and_then(|instance| definition.run_init(&instance).map(|()| instance));

            match built {
                Ok(instance) => {
                    table.insert_instance(name, instance);
                    constructed.push(name.clone());
                    tracing::debug!("Constructed component '{}' ({})", name, definition.type_name());
                }
                Err(error) => {
                    tracing::error!("Component '{}' failed to construct: {}", name, error);
                    destroy_constructed(&table, &constructed);
                    return Err(AssemblyError::construction_failed(name.clone(), error));
                }
            }
        }

        let table = Arc::new(table);
        // the slot is fresh, so this is the only write
        let _ = lazy_slot.set(Arc::downgrade(&table));

        if let Err(error) = register_entities(&table, &entities, &mut diagnostics) {
            destroy_constructed(&table, &constructed);
            return Err(error);
        }

        let container = Container::new(
            root,
            table,
            constructed,
            entities,
            diagnostics,
            self.properties.clone(),
        );

        tracing::info!(
            "Assembled context '{}' with {} components and {} entities in {:?}",
            root,
            container.len(),
            container.entities().len(),
            started.elapsed()
        );

        Ok(container)
    }
}

/// Assemble `root` from `catalog` without properties
pub fn assemble(catalog: &DeclarationCatalog, root: &str) -> Result<Container, AssemblyError> {
    Assembler::new(catalog).assemble(root)
}

/// Definitions and entities gathered from the contributing declarations
#[derive(Default)]
struct Contributions {
    definitions: Vec<ComponentDefinition>,
    /// Scan entry each definition came from, if any
    scan_ids: Vec<Option<usize>>,
    index: HashMap<String, usize>,
    entities: Vec<EntityDefinition>,
    entity_origins: Vec<String>,
    diagnostics: Vec<Diagnostic>,
}

impl Contributions {
    fn contribute(
        &mut self,
        declaration: &ConfigurationDeclaration,
        scan_index: &ScanIndex,
    ) -> Result<(), AssemblyError> {
        let origin = declaration.name.as_str();

        for definition in &declaration.components {
            self.add_component(definition.clone(), origin, None);
        }
        for entity in &declaration.entities {
            self.add_entity(entity.clone(), origin)?;
        }

        for scope in declaration.effective_scan_scopes() {
            let mut found = 0usize;
            for entry in scan_index.scan(scope) {
                found += 1;
                match entry.target() {
                    ScanTarget::Component(definition) => {
                        self.add_component(definition.clone(), origin, Some(entry.id()))
                    }
                    ScanTarget::Entity(entity) => self.add_entity(entity.clone(), origin)?,
                }
            }
            if found == 0 {
                self.push_diagnostic(Diagnostic::empty_scan(origin, scope));
            }
        }

        Ok(())
    }

    fn add_component(&mut self, definition: ComponentDefinition, origin: &str, scan_id: Option<usize>) {
        let definition = definition.with_origin(origin);

        let Some(&pos) = self.index.get(definition.name()) else {
            self.index.insert(definition.name().to_string(), self.definitions.len());
            self.definitions.push(definition);
            self.scan_ids.push(scan_id);
            return;
        };

        // the same scanned item reached through another scan
        if scan_id.is_some() && self.scan_ids[pos] == scan_id {
            return;
        }

        let previous = self.definitions[pos].origin().unwrap_or_default().to_string();
        self.push_diagnostic(Diagnostic::duplicate_component(definition.name(), previous, origin));
        self.definitions[pos] = definition;
        self.scan_ids[pos] = scan_id;
    }

    fn add_entity(&mut self, entity: EntityDefinition, origin: &str) -> Result<(), AssemblyError> {
        entity
            .validate()
            .map_err(|error| AssemblyError::InvalidDefinition {
                declaration: origin.to_string(),
                message: match error {
                    CoreError::InvalidDefinition { message } => message,
                    other => other.to_string(),
                },
            })?;

        match self.entities.iter().position(|e| e.name == entity.name) {
            Some(pos) if self.entities[pos] == entity => {}
            Some(pos) => {
                let diagnostic = Diagnostic::duplicate_entity(&entity.name, &self.entity_origins[pos], origin);
                self.push_diagnostic(diagnostic);
                self.entities[pos] = entity;
                self.entity_origins[pos] = origin.to_string();
            }
            None => {
                self.entities.push(entity);
                self.entity_origins.push(origin.to_string());
            }
        }

        Ok(())
    }

    fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        diagnostic.emit();
        self.diagnostics.push(diagnostic);
    }
}

/// Match every declared dependency to the component satisfying it
fn resolve_dependencies(
    table: &ComponentTable,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<HashMap<String, Vec<ResolvedDependency>>, AssemblyError> {
    let mut resolved = HashMap::with_capacity(table.len());

    for definition in table.definitions() {
        let component = definition.name();
        let declaration = definition.origin().unwrap_or_default();
        let mut dependencies = Vec::with_capacity(definition.dependencies().len());

        for dependency in definition.dependencies() {
            let target = match &dependency.target {
                DependencyTarget::Name(name) => table.definition(name).map(|d| d.name().to_string()),
                DependencyTarget::Capability(capability) => table
                    .unique_provider(capability, Some(component))
                    .map_err(|candidates| AssemblyError::AmbiguousDependency {
                        declaration: declaration.to_string(),
                        component: component.to_string(),
                        dependency: dependency.target.to_string(),
                        candidates,
                    })?
                    .map(|d| d.name().to_string()),
            };

            if target.is_none() {
                if dependency.required {
                    return Err(AssemblyError::MissingDependency {
                        declaration: declaration.to_string(),
                        component: component.to_string(),
                        dependency: dependency.target.to_string(),
                    });
                }
                let diagnostic = Diagnostic::unsatisfied_optional(component, dependency.target.to_string());
                diagnostic.emit();
                diagnostics.push(diagnostic);
            }

            dependencies.push(ResolvedDependency {
                dependency: dependency.clone(),
                target,
            });
        }

        resolved.insert(component.to_string(), dependencies);
    }

    Ok(resolved)
}

/// Targets that must exist before construction; lazy edges do not count
fn eager_targets(dependencies: &[ResolvedDependency]) -> Vec<String> {
    dependencies
        .iter()
        .filter(|resolved| !resolved.dependency.lazy)
        .filter_map(|resolved| resolved.target.clone())
        .collect()
}

fn register_entities(
    table: &ComponentTable,
    entities: &[EntityDefinition],
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<(), AssemblyError> {
    if entities.is_empty() {
        return Ok(());
    }

    let registrars = table.providers(&Capability::of::<dyn EntityRegistrar>());
    if registrars.is_empty() {
        let diagnostic = Diagnostic::unregistered_entities(entities.iter().map(|e| e.name.clone()).collect());
        diagnostic.emit();
        diagnostics.push(diagnostic);
        return Ok(());
    }

    for definition in registrars {
        let registrar_name = definition.name();
        let registrar = table
            .cast::<dyn EntityRegistrar>(registrar_name)
            .map_err(|error| AssemblyError::construction_failed(registrar_name, error))?;

        for entity in entities {
            registrar
                .register_entity(entity)
                .map_err(|source| AssemblyError::EntityRegistration {
                    entity: entity.name.clone(),
                    registrar: registrar_name.to_string(),
                    source: Box::new(source),
                })?;
            tracing::debug!("Registered entity '{}' with '{}'", entity.name, registrar_name);
        }
    }

    Ok(())
}

/// Undo a failed assembly: destroy what was built, newest first
fn destroy_constructed(table: &ComponentTable, constructed: &[String]) {
    for name in constructed.iter().rev() {
        if let (Some(definition), Some(instance)) = (table.definition(name), table.instance(name)) {
            if let Err(error) = definition.run_destroy(instance) {
                tracing::warn!("Destroy hook of component '{}' failed during rollback: {}", name, error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Repo;
    struct Service {
        repo: Arc<Repo>,
    }

    fn repo() -> ComponentDefinition {
        ComponentDefinition::builder::<Repo>()
            .constructor(|_| Ok(Repo))
            .build()
            .unwrap()
    }

    fn service() -> ComponentDefinition {
        ComponentDefinition::builder::<Service>()
            .depends_on("repo")
            .constructor(|ctx| {
                Ok(Service {
                    repo: ctx.get::<Repo>("repo")?,
                })
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_dependencies_constructed_first() {
        let mut catalog = DeclarationCatalog::new();
        catalog.register(
            ConfigurationDeclaration::new("App")
                .with_component(service())
                .with_component(repo()),
        );

        let container = assemble(&catalog, "App").unwrap();

        assert_eq!(container.construction_order(), &["repo".to_string(), "service".to_string()]);
        let service = container.get::<Service>("service").unwrap();
        assert!(Arc::ptr_eq(&service.repo, &container.get::<Repo>("repo").unwrap()));
    }

    #[test]
    fn test_root_overrides_imports() {
        let mut catalog = DeclarationCatalog::new();
        catalog
            .register(ConfigurationDeclaration::new("Root").import("Lib").with_component(repo()))
            .register(ConfigurationDeclaration::new("Lib").with_component(repo()));

        let container = assemble(&catalog, "Root").unwrap();

        assert_eq!(container.lookup("repo").unwrap().origin(), Some("Root"));
        assert_eq!(container.warnings().count(), 1);
    }

    #[test]
    fn test_missing_dependency_stops_before_construction() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let audit = ComponentDefinition::builder::<Repo>()
            .named("audit")
            .constructor(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Repo)
            })
            .build()
            .unwrap();

        let mut catalog = DeclarationCatalog::new();
        catalog.register(
            ConfigurationDeclaration::new("App")
                .with_component(audit)
                .with_component(service()),
        );

        let err = assemble(&catalog, "App").unwrap_err();
        assert!(matches!(
            err,
            AssemblyError::MissingDependency { ref declaration, ref component, .. }
                if declaration == "App" && component == "service"
        ));
        assert_eq!(
            err.to_string(),
            "Component 'service' from declaration 'App' depends on component 'repo', which no definition satisfies"
        );
        assert_eq!(built.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_optional_dependency_left_absent() {
        struct Cache {
            backend: Option<Arc<Repo>>,
        }

        let cache = ComponentDefinition::builder::<Cache>()
            .depends_on_optional("redis")
            .constructor(|ctx| {
                Ok(Cache {
                    backend: ctx.get_optional::<Repo>("redis")?,
                })
            })
            .build()
            .unwrap();

        let mut catalog = DeclarationCatalog::new();
        catalog.register(ConfigurationDeclaration::new("App").with_component(cache));

        let container = assemble(&catalog, "App").unwrap();
        assert!(container.get::<Cache>("cache").unwrap().backend.is_none());
        assert_eq!(container.diagnostics().len(), 1);
        assert_eq!(container.warnings().count(), 0);
    }

    #[test]
    fn test_invalid_entity_names_declaration() {
        let mut catalog = DeclarationCatalog::new();
        catalog.register(
            ConfigurationDeclaration::new("App").with_entity(EntityDefinition::builder("Ghost", "").build()),
        );

        let err = assemble(&catalog, "App").unwrap_err();
        assert!(matches!(
            err,
            AssemblyError::InvalidDefinition { ref declaration, .. } if declaration == "App"
        ));
    }
}
