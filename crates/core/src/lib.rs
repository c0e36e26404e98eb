pub mod errors;
pub mod config;
pub mod container;
pub mod entity;
pub mod modules;

pub use errors::{AssemblyError, CoreError};
pub use config::{ConfigError, ConfigSource, PropertyResolver};
pub use container::{
    assemble, Assembler, Capability, ComponentContext, ComponentDefinition, Container, Dependency,
    Diagnostic, DiagnosticKind, Lazy,
};
pub use entity::{Entity, EntityDefinition, EntityRegistrar};
pub use modules::{ConfigurationDeclaration, DeclarationCatalog, DeclarationPolicy, ScanIndex};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Framework information
pub const FRAMEWORK_NAME: &str = "autumn";

/// Get framework version
pub fn version() -> &'static str {
    VERSION
}

/// Get framework name
pub fn name() -> &'static str {
    FRAMEWORK_NAME
}
