//! In-process table store standing in for the database module.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use autumn_core::entity::{Entity, EntityDefinition, EntityRegistrar};
use autumn_core::{ComponentDefinition, ConfigurationDeclaration, CoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub const DECLARATION: &str = "DbConfiguration";

struct Table {
    definition: EntityDefinition,
    rows: BTreeMap<i64, Value>,
    next_id: i64,
}

impl Table {
    fn new(definition: EntityDefinition) -> Self {
        Self {
            definition,
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Not-null and unique constraints for `row`, ignoring the row `own_id`
    fn check(&self, row: &Value, own_id: Option<i64>) -> Result<(), CoreError> {
        for column in &self.definition.columns {
            let value = row.get(&column.field).unwrap_or(&Value::Null);
            if !column.nullable && value.is_null() {
                return Err(CoreError::database(format!(
                    "NOT NULL constraint failed: {}.{}",
                    self.definition.table, column.column
                )));
            }
            if column.unique && !value.is_null() {
                let taken = self
                    .rows
                    .iter()
                    .any(|(id, other)| Some(*id) != own_id && other.get(&column.field) == Some(value));
                if taken {
                    return Err(CoreError::database(format!(
                        "UNIQUE constraint failed: {}.{}",
                        self.definition.table, column.column
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Rows are kept as JSON objects keyed by field name
pub struct DbTemplate {
    name: String,
    tables: RwLock<HashMap<String, Table>>,
}

impl DbTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn poisoned() -> CoreError {
        CoreError::database("table lock poisoned")
    }

    /// Create the table for `definition` unless it exists with the same mapping
    pub fn ensure_table(&self, definition: &EntityDefinition) -> Result<(), CoreError> {
        definition.validate()?;
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;

        match tables.get(&definition.table) {
            Some(existing) if existing.definition == *definition => Ok(()),
            Some(existing) => Err(CoreError::database(format!(
                "table '{}' is already mapped to entity '{}'",
                definition.table, existing.definition.name
            ))),
            None => {
                tracing::debug!("Created table '{}' for entity '{}'", definition.table, definition.name);
                tables.insert(definition.table.clone(), Table::new(definition.clone()));
                Ok(())
            }
        }
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables
            .read()
            .map(|tables| tables.contains_key(table))
            .unwrap_or(false)
    }

    pub fn count(&self, table: &str) -> Result<usize, CoreError> {
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        tables
            .get(table)
            .map(|t| t.rows.len())
            .ok_or_else(|| CoreError::database(format!("no such table: {}", table)))
    }

    /// Insert `entity`, assigning its identity
    pub fn insert<E: Entity + Serialize>(&self, entity: &mut E) -> Result<i64, CoreError> {
        let definition = E::definition();
        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        let table = tables
            .get_mut(&definition.table)
            .ok_or_else(|| CoreError::database(format!("no such table: {}", definition.table)))?;

        let mut row = serde_json::to_value(&*entity)?;
        table.check(&row, None)?;

        let id = table.next_id;
        entity.assign_identity(id)?;
        if let Value::Object(fields) = &mut row {
            fields.insert(definition.id.column.field.clone(), Value::from(id));
        }
        table.rows.insert(id, row);
        table.next_id += 1;

        Ok(id)
    }

    /// Overwrite the stored row of `entity`; immutable columns must keep their value
    pub fn update<E: Entity + Serialize>(&self, entity: &E) -> Result<(), CoreError> {
        let definition = E::definition();
        let id = entity
            .id()
            .ok_or_else(|| CoreError::validation(format!("{} has no identity yet", definition.name)))?;

        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        let table = tables
            .get_mut(&definition.table)
            .ok_or_else(|| CoreError::database(format!("no such table: {}", definition.table)))?;

        let row = serde_json::to_value(entity)?;
        let current = table
            .rows
            .get(&id)
            .ok_or_else(|| CoreError::database(format!("no row {} in {}", id, definition.table)))?;

        for column in definition.columns.iter().filter(|c| !c.updatable) {
            if row.get(&column.field) != current.get(&column.field) {
                return Err(CoreError::database(format!(
                    "column {}.{} is not updatable",
                    definition.table, column.column
                )));
            }
        }
        table.check(&row, Some(id))?;
        table.rows.insert(id, row);

        Ok(())
    }

    /// First row whose `field` equals `value`
    pub fn find_by<E: Entity + DeserializeOwned>(
        &self,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<Option<E>, CoreError> {
        let definition = E::definition();
        let value = value.into();
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        let table = tables
            .get(&definition.table)
            .ok_or_else(|| CoreError::database(format!("no such table: {}", definition.table)))?;

        match table.rows.values().find(|row| row.get(field) == Some(&value)) {
            Some(row) => Ok(Some(serde_json::from_value(row.clone())?)),
            None => Ok(None),
        }
    }
}

impl EntityRegistrar for DbTemplate {
    fn register_entity(&self, definition: &EntityDefinition) -> Result<(), CoreError> {
        self.ensure_table(definition)
    }
}

pub fn declaration() -> Result<ConfigurationDeclaration, CoreError> {
    let template = ComponentDefinition::builder::<DbTemplate>()
        .constructor(|ctx| Ok(DbTemplate::new(ctx.property_or("db.name", "autumn".to_string())?)))
        .exposes::<dyn EntityRegistrar>(|db| db)
        .on_destroy(|db| {
            let tables = db.tables.read().map_err(|_| DbTemplate::poisoned())?;
            for (name, table) in tables.iter() {
                tracing::info!("Closing table '{}' of '{}' with {} rows", name, db.name, table.rows.len());
            }
            Ok(())
        })
        .build()?;

    Ok(ConfigurationDeclaration::new(DECLARATION)
        .in_scope(module_path!())
        .with_component(template))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::User;

    fn db() -> DbTemplate {
        let db = DbTemplate::new("test");
        db.ensure_table(&User::definition()).unwrap();
        db
    }

    #[test]
    fn test_insert_assigns_identity() {
        let db = db();
        let mut user = User::new("a@b.c", "alice", "salt", "hash");

        let id = db.insert(&mut user).unwrap();

        assert_eq!(user.id, Some(id));
        assert_eq!(db.count("users").unwrap(), 1);
        let found: User = db.find_by("email", "a@b.c").unwrap().unwrap();
        assert_eq!(found, user);
    }

    #[test]
    fn test_unique_email_enforced() {
        let db = db();
        db.insert(&mut User::new("a@b.c", "alice", "s1", "h1")).unwrap();

        let err = db.insert(&mut User::new("a@b.c", "other", "s2", "h2")).unwrap_err();

        assert!(err.to_string().contains("UNIQUE constraint failed: users.email"));
        assert_eq!(db.count("users").unwrap(), 1);
    }

    #[test]
    fn test_update_checks_uniqueness_against_others() {
        let db = db();
        let mut alice = User::new("a@b.c", "alice", "s", "h");
        let mut bob = User::new("b@b.c", "bob", "s", "h");
        db.insert(&mut alice).unwrap();
        db.insert(&mut bob).unwrap();

        alice.name = "Alice".to_string();
        db.update(&alice).unwrap();

        bob.email = "a@b.c".to_string();
        assert!(db.update(&bob).is_err());
    }

    #[test]
    fn test_unknown_table_and_remapping() {
        let db = DbTemplate::new("empty");
        assert!(db.insert(&mut User::new("a@b.c", "a", "s", "h")).is_err());

        db.register_entity(&User::definition()).unwrap();
        db.register_entity(&User::definition()).unwrap();
        assert!(db.has_table("users"));

        let other = EntityDefinition::builder("Account", "users").build();
        assert!(db.ensure_table(&other).is_err());
    }
}
