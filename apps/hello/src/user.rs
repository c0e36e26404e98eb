use std::fmt;

use autumn_core::entity::{ColumnDefinition, ColumnType, Entity, EntityDefinition};
use autumn_core::ScanIndex;
use serde::{Deserialize, Serialize};

/// A registered account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub email: String,
    pub name: String,
    pub pwd_salt: String,
    pub pwd_hash: String,
}

impl User {
    /// A user not stored yet; the store assigns the id
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        pwd_salt: impl Into<String>,
        pwd_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            email: email.into(),
            name: name.into(),
            pwd_salt: pwd_salt.into(),
            pwd_hash: pwd_hash.into(),
        }
    }
}

impl Entity for User {
    fn definition() -> EntityDefinition {
        EntityDefinition::builder("User", "users")
            .column(ColumnDefinition::new("email", ColumnType::Text).not_null().unique())
            .column(ColumnDefinition::new("name", ColumnType::Text).not_null())
            .column(ColumnDefinition::new("pwd_salt", ColumnType::Text).column("pwd_salt").not_null())
            .column(ColumnDefinition::new("pwd_hash", ColumnType::Text).column("pwd_hash").not_null())
            .build()
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

// credentials stay out of logs
impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "User{{id={}, email='{}', name='{}'}}", id, self.email, self.name),
            None => write!(f, "User{{email='{}', name='{}'}}", self.email, self.name),
        }
    }
}

pub fn register(index: &mut ScanIndex) {
    index.register_entity::<User>(module_path!());
}
