use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;
use crate::errors::AssemblyError;
use crate::modules::declaration::ConfigurationDeclaration;
use crate::modules::scan::ScanIndex;

/// What to do when several declarations share a name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeclarationPolicy {
    /// Refuse to pick one
    #[default]
    Reject,
    /// Use the one registered last
    LastRegisteredWins,
}

impl FromStr for DeclarationPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "last-wins" | "last-registered-wins" => Ok(Self::LastRegisteredWins),
            other => Err(ConfigError::invalid_value(
                "assembly.declaration-policy",
                other,
                "reject or last-wins",
            )),
        }
    }
}

impl fmt::Display for DeclarationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => f.write_str("reject"),
            Self::LastRegisteredWins => f.write_str("last-wins"),
        }
    }
}

/// All declarations known to the program plus the scan index
#[derive(Debug, Clone, Default)]
pub struct DeclarationCatalog {
    declarations: Vec<ConfigurationDeclaration>,
    /// Positions in `declarations`, registration order
    by_name: HashMap<String, Vec<usize>>,
    scan_index: ScanIndex,
    policy: DeclarationPolicy,
}

impl DeclarationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: DeclarationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> DeclarationPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: DeclarationPolicy) {
        self.policy = policy;
    }

    /// Duplicated names are accepted here and only resolved on lookup
    pub fn register(&mut self, declaration: ConfigurationDeclaration) -> &mut Self {
        tracing::debug!("Registered declaration '{}'", declaration.name);
        self.by_name
            .entry(declaration.name.clone())
            .or_default()
            .push(self.declarations.len());
        self.declarations.push(declaration);
        self
    }

    pub fn scan_index(&self) -> &ScanIndex {
        &self.scan_index
    }

    pub fn scan_index_mut(&mut self) -> &mut ScanIndex {
        &mut self.scan_index
    }

    /// How many declarations are registered under `name`
    pub fn count(&self, name: &str) -> usize {
        self.by_name.get(name).map_or(0, Vec::len)
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Distinct declaration names, first registration order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for declaration in &self.declarations {
            if !names.contains(&declaration.name.as_str()) {
                names.push(&declaration.name);
            }
        }
        names
    }

    /// The declaration called `name` under the catalog's policy.
    ///
    /// Picking among several is silent here; assembly reports it once per
    /// name as a diagnostic.
    pub fn resolve(&self, name: &str) -> Result<Option<&ConfigurationDeclaration>, AssemblyError> {
        let positions = self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[]);

        match (positions, self.policy) {
            ([], _) => Ok(None),
            ([single], _) => Ok(self.declarations.get(*single)),
            (many, DeclarationPolicy::Reject) => Err(AssemblyError::AmbiguousDeclaration {
                name: name.to_string(),
                count: many.len(),
            }),
            (many, DeclarationPolicy::LastRegisteredWins) => {
                Ok(many.last().and_then(|&pos| self.declarations.get(pos)))
            }
        }
    }
}
