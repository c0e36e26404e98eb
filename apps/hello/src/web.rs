use autumn_core::config::{ConfigValidator, NonBlankValidator, PortValidator};
use autumn_core::{ComponentDefinition, ConfigurationDeclaration, CoreError};

pub const DECLARATION: &str = "WebMvcConfiguration";

/// Web layer settings read from `server.*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebMvcSettings {
    pub host: String,
    pub port: u16,
    pub context_path: String,
}

impl WebMvcSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub fn declaration() -> Result<ConfigurationDeclaration, CoreError> {
    let settings = ComponentDefinition::builder::<WebMvcSettings>()
        .order(0)
        .constructor(|ctx| {
            let host: String = ctx.property_or("server.host", "0.0.0.0".to_string())?;
            let port: u16 = ctx.property_or("server.port", 8080)?;
            let context_path: String = ctx.property_or("server.context-path", "/".to_string())?;

            NonBlankValidator.validate("server.host", host.as_str())?;
            PortValidator::default().validate("server.port", &port)?;

            Ok(WebMvcSettings {
                host,
                port,
                context_path,
            })
        })
        .on_init(|settings| {
            tracing::info!(
                "Web layer configured for http://{}{}",
                settings.address(),
                settings.context_path
            );
            Ok(())
        })
        .build()?;

    Ok(ConfigurationDeclaration::new(DECLARATION)
        .in_scope(module_path!())
        .with_component(settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use autumn_core::{assemble, Assembler, DeclarationCatalog, PropertyResolver};

    fn catalog() -> DeclarationCatalog {
        let mut catalog = DeclarationCatalog::new();
        catalog.register(declaration().unwrap());
        catalog
    }

    #[test]
    fn test_defaults() {
        let catalog = catalog();
        let container = assemble(&catalog, DECLARATION).unwrap();

        let settings = container.get::<WebMvcSettings>("webMvcSettings").unwrap();
        assert_eq!(settings.address(), "0.0.0.0:8080");
        assert_eq!(settings.context_path, "/");
    }

    #[test]
    fn test_invalid_port_fails_assembly() {
        let catalog = catalog();
        let mut properties = PropertyResolver::new();
        properties.set("server.port", "0");

        let result = Assembler::new(&catalog)
            .with_properties(properties)
            .assemble(DECLARATION);

        assert!(result.is_err());
    }
}
