//! Entity metadata discovered during component scanning.
//!
//! The assembler never persists anything itself: it hands every
//! [`EntityDefinition`] found in scanned scopes to the components exposing
//! [`EntityRegistrar`].

pub mod definition;

pub use definition::{
    ColumnDefinition, ColumnType, EntityDefinition, EntityDefinitionBuilder, GenerationType,
    IdDefinition,
};

use crate::errors::CoreError;

/// A record mapped to a table
pub trait Entity: Send + Sync + 'static {
    /// Mapping metadata for this entity type
    fn definition() -> EntityDefinition
    where
        Self: Sized;

    /// Identity, if the persistence layer has assigned one
    fn id(&self) -> Option<i64>;

    /// Raw identity setter; persistence layers go through [`Entity::assign_identity`]
    fn set_id(&mut self, id: i64);

    /// Assign the identity on first insert. Identities never change afterwards.
    fn assign_identity(&mut self, id: i64) -> Result<(), CoreError>
    where
        Self: Sized,
    {
        if let Some(existing) = self.id() {
            return Err(CoreError::validation(format!(
                "{} already has identity {}",
                Self::definition().name,
                existing
            )));
        }
        self.set_id(id);
        Ok(())
    }
}

/// Persistence-layer boundary: receives entity metadata during assembly
pub trait EntityRegistrar: Send + Sync {
    fn register_entity(&self, definition: &EntityDefinition) -> Result<(), CoreError>;
}
