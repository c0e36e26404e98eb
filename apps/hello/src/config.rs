//! Declarations of the hello application and its settings.
//!
//! `HelloConfiguration` is deliberately declared twice: a minimal variant
//! importing only the web layer, and the full variant importing every
//! collaborator. Which one is used depends on the declaration policy.

use std::path::Path;

use autumn_core::config::{ConfigValidator, NonBlankValidator};
use autumn_core::{
    ConfigError, ConfigurationDeclaration, CoreError, DeclarationCatalog, DeclarationPolicy,
    PropertyResolver,
};

use crate::{aop, db, eventbus, service, user, web};

pub const ENV_PREFIX: &str = "AUTUMN_";

/// Scope of everything the application registers for scanning
const APP_SCOPE: &str = env!("CARGO_CRATE_NAME");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSettings {
    pub root: String,
    pub policy: DeclarationPolicy,
    pub log_level: String,
    pub json_logs: bool,
}

impl AppSettings {
    pub fn from_properties(properties: &PropertyResolver) -> Result<Self, ConfigError> {
        let root = properties.get_string_or("autumn.root", "HelloConfiguration")?;
        NonBlankValidator.validate("autumn.root", root.as_str())?;

        Ok(Self {
            root,
            policy: properties.get_or("autumn.declaration-policy", DeclarationPolicy::default())?,
            log_level: properties.get_string_or("logging.level", "info")?,
            json_logs: properties.get_or("logging.json", false)?,
        })
    }
}

/// The raw environment, then `path` if it exists, then `AUTUMN_*` overrides
pub fn load_properties(path: &Path) -> Result<PropertyResolver, ConfigError> {
    let mut properties = PropertyResolver::from_env();
    if path.exists() {
        properties = properties.merge(PropertyResolver::load_yaml(path)?);
    }
    Ok(properties.with_env_overrides(ENV_PREFIX))
}

pub fn hello_config() -> ConfigurationDeclaration {
    ConfigurationDeclaration::new("HelloConfig")
        .in_scope(APP_SCOPE)
        .with_component_scan()
}

/// Minimal variant: web layer only
pub fn hello_configuration_minimal() -> ConfigurationDeclaration {
    ConfigurationDeclaration::new("HelloConfiguration")
        .in_scope(APP_SCOPE)
        .with_component_scan()
        .import(web::DECLARATION)
}

/// Full variant: every collaborator
pub fn hello_configuration() -> ConfigurationDeclaration {
    ConfigurationDeclaration::new("HelloConfiguration")
        .in_scope(APP_SCOPE)
        .with_component_scan()
        .import(web::DECLARATION)
        .import(db::DECLARATION)
        .import(aop::DECLARATION)
        .import(eventbus::DECLARATION)
}

/// Every declaration and scannable item of the application
pub fn catalog(policy: DeclarationPolicy) -> Result<DeclarationCatalog, CoreError> {
    let mut catalog = DeclarationCatalog::new().with_policy(policy);

    catalog
        .register(hello_config())
        .register(hello_configuration_minimal())
        .register(web::declaration()?)
        .register(db::declaration()?)
        .register(aop::declaration()?)
        .register(eventbus::declaration()?)
        .register(hello_configuration());

    service::register(catalog.scan_index_mut())?;
    user::register(catalog.scan_index_mut());

    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use autumn_core::{assemble, AssemblyError};
    use serial_test::serial;

    use crate::db::DbTemplate;
    use crate::service::{UserService, TEST_EMAIL};

    #[test]
    fn test_full_variant_wins_under_last_wins() {
        let catalog = catalog(DeclarationPolicy::LastRegisteredWins).unwrap();
        let container = assemble(&catalog, "HelloConfiguration").unwrap();

        assert_eq!(
            container.construction_order(),
            &["webMvcSettings", "dbTemplate", "invocationLog", "eventBus", "userService"]
        );
        assert!(container.entity("User").is_some());

        let db = container.get::<DbTemplate>("dbTemplate").unwrap();
        assert_eq!(db.count("users").unwrap(), 1);

        let users = container.get::<UserService>("userService").unwrap();
        assert!(users.login(TEST_EMAIL, "test").unwrap().is_some());

        let log = container.get::<crate::aop::InvocationLog>("invocationLog").unwrap();
        assert!(log.entries().contains(&"before UserService::login".to_string()));

        container.close().unwrap();
    }

    #[test]
    fn test_duplicate_root_rejected_by_default() {
        let catalog = catalog(DeclarationPolicy::Reject).unwrap();

        let err = assemble(&catalog, "HelloConfiguration").unwrap_err();
        assert!(matches!(err, AssemblyError::AmbiguousDeclaration { count: 2, .. }));
    }

    #[test]
    fn test_scan_only_root_lacks_persistence() {
        let catalog = catalog(DeclarationPolicy::Reject).unwrap();

        let err = assemble(&catalog, "HelloConfig").unwrap_err();
        assert!(matches!(
            err,
            AssemblyError::MissingDependency { ref component, .. } if component == "userService"
        ));
    }

    #[test]
    fn test_settings_from_yaml() {
        let properties = PropertyResolver::from_yaml_str(
            "autumn:\n  root: HelloConfig\n  declaration-policy: last-wins\nlogging:\n  json: true\n",
            "inline",
        )
        .unwrap();

        let settings = AppSettings::from_properties(&properties).unwrap();

        assert_eq!(settings.root, "HelloConfig");
        assert_eq!(settings.policy, DeclarationPolicy::LastRegisteredWins);
        assert_eq!(settings.log_level, "info");
        assert!(settings.json_logs);
    }

    fn shipped_config() -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("config.yml")
    }

    #[test]
    #[serial]
    fn test_port_placeholder_reads_environment() {
        std::env::set_var("PORT", "9090");
        let properties = load_properties(&shipped_config()).unwrap();
        std::env::remove_var("PORT");

        assert_eq!(properties.get_required::<u16>("server.port").unwrap(), 9090);

        let properties = load_properties(&shipped_config()).unwrap();
        assert_eq!(properties.get_required::<u16>("server.port").unwrap(), 8080);
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        std::env::set_var("AUTUMN_AUTUMN_ROOT", "HelloConfig");
        let properties = load_properties(Path::new("does-not-exist.yml")).unwrap();
        std::env::remove_var("AUTUMN_AUTUMN_ROOT");

        let settings = AppSettings::from_properties(&properties).unwrap();
        assert_eq!(settings.root, "HelloConfig");
        assert_eq!(settings.policy, DeclarationPolicy::Reject);
    }
}
