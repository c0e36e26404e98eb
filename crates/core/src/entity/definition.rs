use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// How the identity column gets its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationType {
    /// Generated by the store on first insert
    Identity,
    /// Supplied by the caller before insert
    Assigned,
}

/// Logical column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Integer,
    BigInt,
    Real,
    Boolean,
    Text,
    Bytes,
    Timestamp,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Integer => "integer",
            ColumnType::BigInt => "bigint",
            ColumnType::Real => "real",
            ColumnType::Boolean => "boolean",
            ColumnType::Text => "text",
            ColumnType::Bytes => "bytes",
            ColumnType::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

/// Mapping of one entity field to a table column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Field name on the record
    pub field: String,
    /// Column name in the table; defaults to the field name
    pub column: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub unique: bool,
    pub updatable: bool,
}

impl ColumnDefinition {
    /// A nullable, updatable, non-unique column named after the field
    pub fn new(field: impl Into<String>, column_type: ColumnType) -> Self {
        let field = field.into();
        Self {
            column: field.clone(),
            field,
            column_type,
            nullable: true,
            unique: false,
            updatable: true,
        }
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn immutable(mut self) -> Self {
        self.updatable = false;
        self
    }
}

/// Identity column of an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdDefinition {
    pub column: ColumnDefinition,
    pub generation: GenerationType,
}

/// Persistence metadata of an entity type, handed to the persistence
/// collaborator during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub name: String,
    pub table: String,
    pub id: IdDefinition,
    pub columns: Vec<ColumnDefinition>,
}

impl EntityDefinition {
    /// Start a definition whose identity column is `id`, generated by the store
    pub fn builder(name: impl Into<String>, table: impl Into<String>) -> EntityDefinitionBuilder {
        EntityDefinitionBuilder {
            name: name.into(),
            table: table.into(),
            id: IdDefinition {
                column: ColumnDefinition::new("id", ColumnType::BigInt)
                    .not_null()
                    .immutable(),
                generation: GenerationType::Identity,
            },
            columns: Vec::new(),
        }
    }

    /// Find a column by field name
    pub fn column(&self, field: &str) -> Option<&ColumnDefinition> {
        if self.id.column.field == field {
            return Some(&self.id.column);
        }
        self.columns.iter().find(|c| c.field == field)
    }

    /// Fields carrying a uniqueness constraint, identity excluded
    pub fn unique_fields(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.columns.iter().filter(|c| c.unique)
    }

    /// Check structural invariants of the mapping
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.table.trim().is_empty() {
            return Err(CoreError::invalid_definition(format!(
                "entity '{}' has an empty table name",
                self.name
            )));
        }

        if self.id.column.nullable || self.id.column.updatable {
            return Err(CoreError::invalid_definition(format!(
                "identity column '{}' of entity '{}' must be non-null and not updatable",
                self.id.column.column, self.name
            )));
        }

        let mut seen = HashSet::new();
        for column in std::iter::once(&self.id.column).chain(self.columns.iter()) {
            if !seen.insert(column.column.as_str()) {
                return Err(CoreError::invalid_definition(format!(
                    "entity '{}' maps column '{}' twice",
                    self.name, column.column
                )));
            }
        }

        Ok(())
    }
}

/// Builder for [`EntityDefinition`]
#[derive(Debug, Clone)]
pub struct EntityDefinitionBuilder {
    name: String,
    table: String,
    id: IdDefinition,
    columns: Vec<ColumnDefinition>,
}

impl EntityDefinitionBuilder {
    /// Replace the identity column
    pub fn id(mut self, column: ColumnDefinition, generation: GenerationType) -> Self {
        self.id = IdDefinition { column, generation };
        self
    }

    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    pub fn build(self) -> EntityDefinition {
        EntityDefinition {
            name: self.name,
            table: self.table,
            id: self.id,
            columns: self.columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> EntityDefinition {
        EntityDefinition::builder("User", "users")
            .column(ColumnDefinition::new("email", ColumnType::Text).not_null().unique())
            .column(ColumnDefinition::new("name", ColumnType::Text).not_null())
            .column(
                ColumnDefinition::new("pwd_salt", ColumnType::Text)
                    .column("pwd_salt")
                    .not_null(),
            )
            .build()
    }

    #[test]
    fn test_default_identity_column() {
        let def = users();

        assert_eq!(def.id.generation, GenerationType::Identity);
        assert!(!def.id.column.nullable);
        assert!(!def.id.column.updatable);
        assert!(def.validate().is_ok());
    }

    #[test]
    fn test_column_lookup_and_unique_fields() {
        let def = users();

        assert_eq!(def.column("id").map(|c| c.column_type), Some(ColumnType::BigInt));
        assert_eq!(
            def.unique_fields().map(|c| c.field.as_str()).collect::<Vec<_>>(),
            vec!["email"]
        );
        assert!(def.column("missing").is_none());
    }

    #[test]
    fn test_duplicate_column_is_rejected() {
        let def = EntityDefinition::builder("User", "users")
            .column(ColumnDefinition::new("email", ColumnType::Text))
            .column(ColumnDefinition::new("mail", ColumnType::Text).column("email"))
            .build();

        let err = def.validate().unwrap_err();
        assert!(err.to_string().contains("column 'email' twice"));
    }

    #[test]
    fn test_nullable_identity_is_rejected() {
        let def = EntityDefinition::builder("Audit", "audits")
            .id(ColumnDefinition::new("id", ColumnType::BigInt), GenerationType::Assigned)
            .build();

        assert!(def.validate().is_err());
    }

    #[test]
    fn test_blank_table_is_rejected() {
        let def = EntityDefinition::builder("Ghost", " ").build();

        assert!(def.validate().is_err());
    }
}
