use std::sync::RwLock;

use autumn_core::{ComponentDefinition, ConfigurationDeclaration, CoreError};
use serde::Serialize;

pub const DECLARATION: &str = "EventBusConfig";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HelloEvent {
    UserRegistered { id: i64, email: String },
    LoginSucceeded { email: String },
    LoginFailed { email: String },
}

type Listener = Box<dyn Fn(&HelloEvent) + Send + Sync>;

/// Synchronous in-process event distribution
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<Listener>>,
}

impl EventBus {
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&HelloEvent) + Send + Sync + 'static,
    {
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.push(Box::new(listener));
        }
    }

    /// Deliver to every listener; returns how many received it
    pub fn post(&self, event: HelloEvent) -> usize {
        match serde_json::to_string(&event) {
            Ok(json) => tracing::debug!("Posting event {}", json),
            Err(_) => tracing::debug!("Posting event {:?}", event),
        }
        match self.listeners.read() {
            Ok(listeners) => {
                for listener in listeners.iter() {
                    listener(&event);
                }
                listeners.len()
            }
            Err(_) => 0,
        }
    }
}

pub fn declaration() -> Result<ConfigurationDeclaration, CoreError> {
    let bus = ComponentDefinition::builder::<EventBus>()
        .constructor(|_| Ok(EventBus::default()))
        .build()?;

    Ok(ConfigurationDeclaration::new(DECLARATION)
        .in_scope(module_path!())
        .with_component(bus))
}
