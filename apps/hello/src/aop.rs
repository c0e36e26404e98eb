use std::sync::Mutex;
use std::time::{Duration, Instant};

use autumn_core::{ComponentDefinition, ConfigurationDeclaration, CoreError};

pub const DECLARATION: &str = "AroundAopConfiguration";

/// Before/after advice for service calls, recorded and logged
#[derive(Default)]
pub struct InvocationLog {
    entries: Mutex<Vec<String>>,
}

impl InvocationLog {
    /// Run `call` between the before and after advice
    pub fn around<T, F>(&self, target: &str, call: F) -> Result<T, CoreError>
    where
        F: FnOnce() -> Result<T, CoreError>,
    {
        self.record(format!("before {}", target));
        let started = Instant::now();
        let result = call();
        self.after(target, result.is_ok(), started.elapsed());
        result
    }

    fn after(&self, target: &str, ok: bool, elapsed: Duration) {
        let outcome = if ok { "ok" } else { "failed" };
        tracing::debug!("{} {} in {:?}", target, outcome, elapsed);
        self.record(format!("after {} ({})", target, outcome));
    }

    fn record(&self, entry: String) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

pub fn declaration() -> Result<ConfigurationDeclaration, CoreError> {
    let log = ComponentDefinition::builder::<InvocationLog>()
        .constructor(|_| Ok(InvocationLog::default()))
        .build()?;

    Ok(ConfigurationDeclaration::new(DECLARATION)
        .in_scope(module_path!())
        .with_component(log))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_around_records_outcome() {
        let log = InvocationLog::default();

        assert_eq!(log.around("login", || Ok(1)).unwrap(), 1);
        let failed: Result<(), CoreError> = log.around("register", || Err(CoreError::validation("taken")));
        assert!(failed.is_err());

        assert_eq!(
            log.entries(),
            vec![
                "before login",
                "after login (ok)",
                "before register",
                "after register (failed)",
            ]
        );
    }
}
