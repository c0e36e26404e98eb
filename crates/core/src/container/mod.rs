#[allow(clippy::module_inception)]
pub mod container;
pub mod assembler;
pub mod context;
pub mod conventions;
pub mod descriptor;
pub mod diagnostics;
pub(crate) mod registry;
pub mod resolver;

pub use container::Container;
pub use assembler::{assemble, Assembler};
pub use context::{ComponentContext, Lazy};
pub use descriptor::{
    Capability, ComponentBuilder, ComponentDefinition, ComponentInstance, CreationStrategy,
    Dependency, DependencyTarget,
};
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticLevel};
pub use resolver::{DependencyGraph, ResolutionPath, ResolvedDependency};
