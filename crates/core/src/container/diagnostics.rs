use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Info,
    Warning,
}

/// Non-fatal findings of an assembly
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Several declarations share a name; the last registered one was used
    AmbiguousDeclaration { name: String, count: usize },
    /// A later contribution replaced a component of the same name
    DuplicateComponentName {
        name: String,
        overridden: String,
        replacement: String,
    },
    /// A later contribution replaced an entity of the same name
    DuplicateEntityName {
        name: String,
        overridden: String,
        replacement: String,
    },
    /// A scan scope matched nothing
    EmptyScan { declaration: String, scope: String },
    /// An optional dependency was left absent
    UnsatisfiedOptionalDependency { component: String, dependency: String },
    /// Entities were found but no component accepts them
    UnregisteredEntities { entities: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn ambiguous_declaration(name: impl Into<String>, count: usize) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            kind: DiagnosticKind::AmbiguousDeclaration {
                name: name.into(),
                count,
            },
        }
    }

    pub fn duplicate_component(
        name: impl Into<String>,
        overridden: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            kind: DiagnosticKind::DuplicateComponentName {
                name: name.into(),
                overridden: overridden.into(),
                replacement: replacement.into(),
            },
        }
    }

    pub fn duplicate_entity(
        name: impl Into<String>,
        overridden: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            kind: DiagnosticKind::DuplicateEntityName {
                name: name.into(),
                overridden: overridden.into(),
                replacement: replacement.into(),
            },
        }
    }

    pub fn empty_scan(declaration: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Info,
            kind: DiagnosticKind::EmptyScan {
                declaration: declaration.into(),
                scope: scope.into(),
            },
        }
    }

    pub fn unsatisfied_optional(component: impl Into<String>, dependency: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Info,
            kind: DiagnosticKind::UnsatisfiedOptionalDependency {
                component: component.into(),
                dependency: dependency.into(),
            },
        }
    }

    pub fn unregistered_entities(entities: Vec<String>) -> Self {
        Self {
            level: DiagnosticLevel::Info,
            kind: DiagnosticKind::UnregisteredEntities { entities },
        }
    }

    pub fn is_warning(&self) -> bool {
        self.level == DiagnosticLevel::Warning
    }

    /// Log through `tracing` at the matching level
    pub(crate) fn emit(&self) {
        match self.level {
            DiagnosticLevel::Warning => tracing::warn!("{}", self),
            DiagnosticLevel::Info => tracing::info!("{}", self),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiagnosticKind::AmbiguousDeclaration { name, count } => write!(
                f,
                "{} declarations are named '{}', using the one registered last",
                count, name
            ),
            DiagnosticKind::DuplicateComponentName {
                name,
                overridden,
                replacement,
            } => write!(
                f,
                "Component '{}' from '{}' is overridden by the definition from '{}'",
                name, overridden, replacement
            ),
            DiagnosticKind::DuplicateEntityName {
                name,
                overridden,
                replacement,
            } => write!(
                f,
                "Entity '{}' from '{}' is overridden by the definition from '{}'",
                name, overridden, replacement
            ),
            DiagnosticKind::EmptyScan { declaration, scope } => write!(
                f,
                "Component scan of '{}' in declaration '{}' found nothing",
                scope, declaration
            ),
            DiagnosticKind::UnsatisfiedOptionalDependency {
                component,
                dependency,
            } => write!(
                f,
                "Optional dependency {} of '{}' is not available",
                dependency, component
            ),
            DiagnosticKind::UnregisteredEntities { entities } => write!(
                f,
                "No entity registrar is available for [{}]",
                entities.join(", ")
            ),
        }
    }
}
