//! Flat property store used for value injection.
//!
//! YAML documents are flattened into dotted keys (`server.port`), sequences
//! become comma-joined values, and later sources override earlier ones.
//! Values and lookup keys may be `${key}` or `${key:default}` expressions.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use serde_yaml::Value;

use crate::config::{ConfigError, ConfigSource};

/// Guard against self-referencing expressions such as `a: ${a}`
const MAX_EXPRESSION_DEPTH: usize = 16;

struct PropertyExpr<'a> {
    key: &'a str,
    default: Option<&'a str>,
}

fn parse_expression(s: &str) -> Result<Option<PropertyExpr<'_>>, ConfigError> {
    let Some(inner) = s.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) else {
        return Ok(None);
    };

    let (key, default) = match inner.find(':') {
        Some(n) => (&inner[..n], Some(&inner[n + 1..])),
        None => (inner, None),
    };

    if key.trim().is_empty() {
        return Err(ConfigError::InvalidExpression {
            expression: s.to_string(),
        });
    }

    Ok(Some(PropertyExpr {
        key: key.trim(),
        default,
    }))
}

/// Resolved configuration properties
#[derive(Debug, Clone, Default)]
pub struct PropertyResolver {
    properties: HashMap<String, String>,
    sources: HashMap<String, ConfigSource>,
}

impl PropertyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML document; `origin` is recorded as the source of every key
    pub fn from_yaml_str(yaml: &str, origin: impl Into<String>) -> Result<Self, ConfigError> {
        let document: Value = serde_yaml::from_str(yaml)?;
        let origin = origin.into();

        let mut flat = Vec::new();
        flatten_yaml(None, &document, &mut flat)?;

        let mut resolver = Self::new();
        for (key, value) in flat {
            resolver.insert(key, value, ConfigSource::File(origin.clone()));
        }
        Ok(resolver)
    }

    /// Load a YAML file from disk
    pub fn load_yaml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents, path.display().to_string())
    }

    /// Every process environment variable under its own name, so that
    /// `${PORT:8080}` can read `PORT`. Meant as the lowest layer: merge files
    /// on top of it.
    pub fn from_env() -> Self {
        let mut resolver = Self::new();
        for (name, value) in std::env::vars() {
            resolver.insert(name.clone(), value, ConfigSource::EnvVar(name));
        }
        resolver
    }

    /// Apply environment variables starting with `prefix`.
    ///
    /// `AUTUMN_SERVER_PORT` maps to `server.port`; a double underscore maps to
    /// a dash, so `AUTUMN_AUTUMN_DECLARATION__POLICY` maps to
    /// `autumn.declaration-policy`.
    pub fn with_env_overrides(mut self, prefix: &str) -> Self {
        for (name, value) in std::env::vars() {
            let Some(rest) = name.strip_prefix(prefix) else {
                continue;
            };
            if rest.is_empty() {
                continue;
            }
            let key = rest.to_lowercase().replace("__", "-").replace('_', ".");
            self.insert(key, value, ConfigSource::EnvVar(name.clone()));
        }
        self
    }

    /// Set a property programmatically, replacing any existing value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.insert(key.into(), value.into(), ConfigSource::Programmatic);
        self
    }

    /// Set a property only if no source has provided it yet
    pub fn set_default(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        if !self.properties.contains_key(&key) {
            self.insert(key, value.into(), ConfigSource::Default);
        }
        self
    }

    /// Merge `other` into `self`; keys present in both take `other`'s value
    pub fn merge(mut self, other: PropertyResolver) -> Self {
        for (key, value) in other.properties {
            let source = other
                .sources
                .get(&key)
                .cloned()
                .unwrap_or(ConfigSource::Programmatic);
            self.insert(key, value, source);
        }
        self
    }

    fn insert(&mut self, key: String, value: String, source: ConfigSource) {
        self.sources.insert(key.clone(), source);
        self.properties.insert(key, value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn source_of(&self, key: &str) -> Option<&ConfigSource> {
        self.sources.get(key)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Sorted list of raw keys
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.properties.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Look up a value, resolving expressions. `Ok(None)` if the key is absent.
    pub fn get_string(&self, key: &str) -> Result<Option<String>, ConfigError> {
        self.resolve_key(key, 0)
    }

    pub fn get_string_or(&self, key: &str, default: &str) -> Result<String, ConfigError> {
        match self.resolve_key(key, 0)? {
            Some(value) => Ok(value),
            None => self.resolve_value(default, 1),
        }
    }

    pub fn get_required_string(&self, key: &str) -> Result<String, ConfigError> {
        self.resolve_key(key, 0)?
            .ok_or_else(|| ConfigError::missing_required(key, "No configuration source provides it"))
    }

    /// Typed lookup through `FromStr`
    pub fn get<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        let Some(raw) = self.get_string(key)? else {
            return Ok(None);
        };
        match raw.trim().parse::<T>() {
            Ok(value) => Ok(Some(value)),
            Err(_) => Err(ConfigError::invalid_value(
                key,
                raw,
                std::any::type_name::<T>(),
            )),
        }
    }

    pub fn get_or<T: FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    pub fn get_required<T: FromStr>(&self, key: &str) -> Result<T, ConfigError> {
        self.get(key)?
            .ok_or_else(|| ConfigError::missing_required(key, "No configuration source provides it"))
    }

    /// Comma separated list; an absent key yields an empty list
    pub fn get_list(&self, key: &str) -> Result<Vec<String>, ConfigError> {
        Ok(self
            .get_string(key)?
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    fn resolve_key(&self, key: &str, depth: usize) -> Result<Option<String>, ConfigError> {
        if depth > MAX_EXPRESSION_DEPTH {
            return Err(ConfigError::RecursiveExpression {
                key: key.to_string(),
                depth: MAX_EXPRESSION_DEPTH,
            });
        }

        if let Some(expr) = parse_expression(key)? {
            return match expr.default {
                Some(default) => match self.resolve_key(expr.key, depth + 1)? {
                    Some(value) => Ok(Some(value)),
                    None => self.resolve_value(default, depth + 1).map(Some),
                },
                None => match self.resolve_key(expr.key, depth + 1)? {
                    Some(value) => Ok(Some(value)),
                    None => Err(ConfigError::missing_required(
                        expr.key,
                        format!("Referenced by '{}'", key),
                    )),
                },
            };
        }

        match self.properties.get(key) {
            Some(value) => self.resolve_value(value, depth + 1).map(Some),
            None => Ok(None),
        }
    }

    fn resolve_value(&self, value: &str, depth: usize) -> Result<String, ConfigError> {
        if parse_expression(value)?.is_none() {
            return Ok(value.to_string());
        }
        self.resolve_key(value, depth)?
            .ok_or_else(|| ConfigError::missing_required(value, "Expression resolved to nothing"))
    }
}

fn flatten_yaml(
    prefix: Option<&str>,
    value: &Value,
    out: &mut Vec<(String, String)>,
) -> Result<(), ConfigError> {
    match value {
        Value::Null => Ok(()),
        Value::Tagged(tagged) => flatten_yaml(prefix, &tagged.value, out),
        Value::Mapping(map) => {
            for (key, nested) in map {
                let part = scalar_to_string(key)
                    .ok_or_else(|| ConfigError::parsing(format!("Unsupported mapping key: {:?}", key)))?;
                let full = match prefix {
                    Some(prefix) => format!("{}.{}", prefix, part),
                    None => part,
                };
                flatten_yaml(Some(&full), nested, out)?;
            }
            Ok(())
        }
        Value::Sequence(items) => {
            let key = prefix
                .ok_or_else(|| ConfigError::parsing("A top-level sequence cannot be flattened"))?;
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                let part = scalar_to_string(item).ok_or_else(|| {
                    ConfigError::parsing(format!("Sequence '{}' must contain scalars only", key))
                })?;
                parts.push(part);
            }
            out.push((key.to_string(), parts.join(",")));
            Ok(())
        }
        scalar => {
            let key = prefix
                .ok_or_else(|| ConfigError::parsing("A top-level scalar cannot be flattened"))?;
            if let Some(text) = scalar_to_string(scalar) {
                out.push((key.to_string(), text));
            }
            Ok(())
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const YAML: &str = r#"
server:
  port: 8080
  context-path: /hello
db:
  url: ${DB_URL:sqlite:hello.db}
  pool: ${db.pool-size}
  pool-size: 4
autumn:
  scan:
    - autumn_hello::service
    - autumn_hello::user
"#;

    fn resolver() -> PropertyResolver {
        PropertyResolver::from_yaml_str(YAML, "config.yml").unwrap()
    }

    #[test]
    fn test_nested_keys_are_flattened() {
        let props = resolver();

        assert_eq!(props.get_required::<u16>("server.port").unwrap(), 8080);
        assert_eq!(
            props.get_string("server.context-path").unwrap().as_deref(),
            Some("/hello")
        );
        assert_eq!(
            props.source_of("server.port"),
            Some(&ConfigSource::File("config.yml".to_string()))
        );
    }

    #[test]
    fn test_expression_default_and_reference() {
        let props = resolver();

        // default keeps everything after the first colon
        assert_eq!(
            props.get_string("db.url").unwrap().as_deref(),
            Some("sqlite:hello.db")
        );
        assert_eq!(props.get::<u32>("db.pool").unwrap(), Some(4));
        assert_eq!(
            props.get_string("${missing.key:fallback}").unwrap().as_deref(),
            Some("fallback")
        );
    }

    #[test]
    fn test_missing_reference_is_an_error() {
        let mut props = PropertyResolver::new();
        props.set("a", "${b}");

        let err = props.get_string("a").unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { ref key, .. } if key == "b"));
    }

    #[test]
    fn test_self_reference_is_caught() {
        let mut props = PropertyResolver::new();
        props.set("loop", "${loop}");

        assert!(matches!(
            props.get_string("loop"),
            Err(ConfigError::RecursiveExpression { .. })
        ));
    }

    #[test]
    fn test_empty_expression_key_is_invalid() {
        let props = PropertyResolver::new();

        assert!(matches!(
            props.get_string("${:x}"),
            Err(ConfigError::InvalidExpression { .. })
        ));
    }

    #[test]
    fn test_typed_lookup_reports_bad_values() {
        let mut props = PropertyResolver::new();
        props.set("server.port", "eighty");

        let err = props.get::<u16>("server.port").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "server.port"));
        assert_eq!(props.get_or::<u16>("server.timeout", 30).unwrap(), 30);
        assert!(props.get_required::<u16>("server.timeout").is_err());
    }

    #[test]
    fn test_sequences_become_lists() {
        let props = resolver();

        assert_eq!(
            props.get_list("autumn.scan").unwrap(),
            vec!["autumn_hello::service", "autumn_hello::user"]
        );
        assert!(props.get_list("autumn.none").unwrap().is_empty());
    }

    #[test]
    fn test_merge_prefers_later_source() {
        let mut overrides = PropertyResolver::new();
        overrides.set("server.port", "9090");

        let props = resolver().merge(overrides);

        assert_eq!(props.get_required::<u16>("server.port").unwrap(), 9090);
        assert_eq!(props.source_of("server.port"), Some(&ConfigSource::Programmatic));
        assert!(props.contains("db.url"));
    }

    #[test]
    fn test_set_default_does_not_override() {
        let mut props = resolver();
        props.set_default("server.port", "1");
        props.set_default("logging.level", "info");

        assert_eq!(props.get_required::<u16>("server.port").unwrap(), 8080);
        assert_eq!(props.source_of("logging.level"), Some(&ConfigSource::Default));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var("AUTUMN_TEST_SERVER_PORT", "7070");
        std::env::set_var("AUTUMN_TEST_AUTUMN_DECLARATION__POLICY", "last-wins");

        let props = resolver().with_env_overrides("AUTUMN_TEST_");

        std::env::remove_var("AUTUMN_TEST_SERVER_PORT");
        std::env::remove_var("AUTUMN_TEST_AUTUMN_DECLARATION__POLICY");

        assert_eq!(props.get_required::<u16>("server.port").unwrap(), 7070);
        assert_eq!(
            props.get_string("autumn.declaration-policy").unwrap().as_deref(),
            Some("last-wins")
        );
        assert!(props.source_of("server.port").unwrap().is_env_var());
    }

    #[test]
    #[serial]
    fn test_placeholders_read_raw_environment() {
        std::env::set_var("DB_URL", "postgres://db/hello");
        let props = PropertyResolver::from_env().merge(resolver());
        std::env::remove_var("DB_URL");

        assert_eq!(
            props.get_required_string("db.url").unwrap(),
            "postgres://db/hello"
        );
        assert!(props.source_of("DB_URL").unwrap().is_env_var());
        assert!(props.source_of("db.url").unwrap().is_file());

        let without = PropertyResolver::from_env().merge(resolver());
        assert_eq!(without.get_required_string("db.url").unwrap(), "sqlite:hello.db");
    }

    #[test]
    #[serial]
    fn test_file_wins_over_raw_environment() {
        std::env::set_var("server.port", "1234");
        let props = PropertyResolver::from_env().merge(resolver());
        std::env::remove_var("server.port");

        assert_eq!(props.get_required::<u16>("server.port").unwrap(), 8080);
    }

    #[test]
    fn test_load_yaml_from_disk() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "logging:\n  level: debug").unwrap();

        let props = PropertyResolver::load_yaml(file.path()).unwrap();

        assert_eq!(props.get_required_string("logging.level").unwrap(), "debug");
        assert!(props.source_of("logging.level").unwrap().is_file());
    }
}
