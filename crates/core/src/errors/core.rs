use thiserror::Error;

use crate::config::ConfigError;
use crate::errors::AssemblyError;

/// Core error type for the autumn framework
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Assembly failed: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Component not found: {name}")]
    ComponentNotFound { name: String },

    #[error("Component '{name}' is a {actual}, not a {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("No unique component for {capability}: candidates [{}]", candidates.join(", "))]
    NoUniqueComponent {
        capability: String,
        candidates: Vec<String>,
    },

    #[error("Component '{component}' did not declare a dependency on '{dependency}'")]
    UndeclaredDependency {
        component: String,
        dependency: String,
    },

    #[error("Lazy dependency '{dependency}' was accessed before the container was assembled")]
    ContainerUnavailable { dependency: String },

    #[error("Invalid component definition: {message}")]
    InvalidDefinition { message: String },

    #[error("Lifecycle error in component '{component}' during '{operation}': {source}")]
    LifecycleError {
        component: String,
        operation: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl CoreError {
    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new component not found error
    pub fn component_not_found(name: impl Into<String>) -> Self {
        Self::ComponentNotFound { name: name.into() }
    }

    /// Create a new invalid definition error
    pub fn invalid_definition(message: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            message: message.into(),
        }
    }

    /// Create a new database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Wrap an arbitrary error raised by a lifecycle hook
    pub fn lifecycle(
        component: impl Into<String>,
        operation: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::LifecycleError {
            component: component.into(),
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// Check if the error is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Check if the error is a lookup miss
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ComponentNotFound { .. })
    }
}
