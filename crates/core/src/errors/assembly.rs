use thiserror::Error;

use crate::errors::CoreError;

/// Fatal failures of context assembly.
///
/// No variant is ever accompanied by a partially built container: when
/// `assemble` returns one of these, nothing it constructed is reachable.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("Ambiguous declaration '{name}': {count} declarations are registered under this name")]
    AmbiguousDeclaration { name: String, count: usize },

    #[error("Declaration not found: {name}")]
    DeclarationNotFound { name: String },

    #[error("Declaration '{declaration}' imports unknown module '{import}'")]
    UnresolvedImport { declaration: String, import: String },

    #[error("Cyclic import: {}", path.join(" -> "))]
    CyclicImport { path: Vec<String> },

    #[error("Cyclic dependency: {}", path.join(" -> "))]
    CyclicDependency { path: Vec<String> },

    #[error(
        "Component '{component}' from declaration '{declaration}' depends on {dependency}, which no definition satisfies"
    )]
    MissingDependency {
        declaration: String,
        component: String,
        dependency: String,
    },

    #[error(
        "Component '{component}' from declaration '{declaration}' depends on {dependency}, but several candidates match: [{}]",
        candidates.join(", ")
    )]
    AmbiguousDependency {
        declaration: String,
        component: String,
        dependency: String,
        candidates: Vec<String>,
    },

    #[error("Invalid definition in declaration '{declaration}': {message}")]
    InvalidDefinition { declaration: String, message: String },

    #[error("Component '{component}' failed to construct: {source}")]
    ConstructionFailed {
        component: String,
        #[source]
        source: Box<CoreError>,
    },

    #[error("Registrar '{registrar}' rejected entity '{entity}': {source}")]
    EntityRegistration {
        entity: String,
        registrar: String,
        #[source]
        source: Box<CoreError>,
    },
}

impl AssemblyError {
    pub(crate) fn construction_failed(component: impl Into<String>, source: CoreError) -> Self {
        Self::ConstructionFailed {
            component: component.into(),
            source: Box::new(source),
        }
    }

    /// The cycle path for `CyclicDependency` and `CyclicImport`
    pub fn cycle_path(&self) -> Option<&[String]> {
        match self {
            Self::CyclicDependency { path } | Self::CyclicImport { path } => Some(path),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_shows_path() {
        let err = AssemblyError::CyclicDependency {
            path: vec!["x".into(), "y".into(), "x".into()],
        };

        assert_eq!(err.to_string(), "Cyclic dependency: x -> y -> x");
        assert_eq!(err.cycle_path().map(|p| p.len()), Some(3));
    }

    #[test]
    fn test_construction_failure_keeps_source() {
        use std::error::Error;

        let err = AssemblyError::construction_failed(
            "userService",
            CoreError::validation("email missing"),
        );

        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("Validation error: email missing"));
        assert!(err.cycle_path().is_none());
    }
}
