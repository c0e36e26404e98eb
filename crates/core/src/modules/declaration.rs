use crate::container::ComponentDefinition;
use crate::entity::EntityDefinition;

/// A named unit of configuration: explicit component definitions, entity
/// mappings, component-scan scopes and imports of other declarations.
#[derive(Debug, Clone)]
pub struct ConfigurationDeclaration {
    pub name: String,
    /// Module path the declaration lives in; the default scan scope
    pub scope: String,
    pub component_scan: bool,
    /// Explicit scan scopes; empty means the declaration's own scope
    pub scan_scopes: Vec<String>,
    /// Names of imported declarations, in declaration order
    pub imports: Vec<String>,
    pub components: Vec<ComponentDefinition>,
    pub entities: Vec<EntityDefinition>,
}

impl ConfigurationDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: String::new(),
            component_scan: false,
            scan_scopes: Vec::new(),
            imports: Vec::new(),
            components: Vec::new(),
            entities: Vec::new(),
        }
    }

    /// Place the declaration in a module path, usually `module_path!()`
    pub fn in_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Scan the declaration's own scope
    pub fn with_component_scan(mut self) -> Self {
        self.component_scan = true;
        self
    }

    /// Scan `scope` instead of (or in addition to) other explicit scopes
    pub fn scan_scope(mut self, scope: impl Into<String>) -> Self {
        self.component_scan = true;
        self.scan_scopes.push(scope.into());
        self
    }

    pub fn import(mut self, declaration: impl Into<String>) -> Self {
        self.imports.push(declaration.into());
        self
    }

    pub fn with_imports(mut self, declarations: Vec<String>) -> Self {
        self.imports.extend(declarations);
        self
    }

    pub fn with_component(mut self, definition: ComponentDefinition) -> Self {
        self.components.push(definition);
        self
    }

    pub fn with_entity(mut self, definition: EntityDefinition) -> Self {
        self.entities.push(definition);
        self
    }

    /// Scopes to scan, or none when scanning is off
    pub fn effective_scan_scopes(&self) -> Vec<&str> {
        if !self.component_scan {
            Vec::new()
        } else if self.scan_scopes.is_empty() {
            vec![self.scope.as_str()]
        } else {
            self.scan_scopes.iter().map(String::as_str).collect()
        }
    }

    pub fn has_imports(&self) -> bool {
        !self.imports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_scope_defaults_to_own_scope() {
        let declaration = ConfigurationDeclaration::new("HelloConfig")
            .in_scope("hello")
            .with_component_scan();

        assert_eq!(declaration.effective_scan_scopes(), vec!["hello"]);
        assert!(!declaration.has_imports());
    }

    #[test]
    fn test_explicit_scan_scopes() {
        let declaration = ConfigurationDeclaration::new("WebConfig")
            .in_scope("hello")
            .scan_scope("hello::web")
            .scan_scope("hello::api");

        assert!(declaration.component_scan);
        assert_eq!(declaration.effective_scan_scopes(), vec!["hello::web", "hello::api"]);
    }

    #[test]
    fn test_no_scan_without_flag() {
        let declaration = ConfigurationDeclaration::new("DbConfiguration")
            .in_scope("hello::db")
            .import("EventBusConfig")
            .with_imports(vec!["AroundAopConfiguration".to_string()]);

        assert!(declaration.effective_scan_scopes().is_empty());
        assert_eq!(declaration.imports, vec!["EventBusConfig", "AroundAopConfiguration"]);
    }
}
