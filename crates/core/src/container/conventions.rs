//! Naming conventions for components.

use crate::errors::CoreError;

/// Last path segment of a type name, generic arguments stripped.
///
/// `hello::service::UserService` becomes `UserService`, `cache::Cache<String>`
/// becomes `Cache`.
pub fn simple_type_name(type_name: &str) -> &str {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit("::").next().unwrap_or(base)
}

/// Default component name: the simple type name with its first character lower-cased
pub fn default_component_name(type_name: &str) -> String {
    let simple = simple_type_name(type_name);
    let mut chars = simple.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Validate an explicitly chosen component name
pub fn normalize_component_name(name: &str) -> Result<String, CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::invalid_definition("component name must not be blank"));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(CoreError::invalid_definition(format!(
            "component name '{}' must not contain whitespace",
            trimmed
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_type_name() {
        assert_eq!(simple_type_name("hello::service::UserService"), "UserService");
        assert_eq!(simple_type_name("cache::Cache<alloc::string::String>"), "Cache");
        assert_eq!(simple_type_name("Plain"), "Plain");
    }

    #[test]
    fn test_default_component_name() {
        assert_eq!(default_component_name("hello::config::HelloConfiguration"), "helloConfiguration");
        assert_eq!(default_component_name("db::DbTemplate"), "dbTemplate");
        assert_eq!(default_component_name("x"), "x");
        assert_eq!(default_component_name(""), "");
    }

    #[test]
    fn test_normalize_component_name() {
        assert_eq!(normalize_component_name(" userService ").unwrap(), "userService");
        assert!(normalize_component_name("").is_err());
        assert!(normalize_component_name("user service").is_err());
    }
}
