//! Capability traits for everything the resolver reaches outside the
//! document: environment variables, process-wide properties, and script
//! evaluation. All three are injected at construction so tests can
//! substitute deterministic fakes.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

/// Environment-variable lookup.
pub trait EnvironmentProvider {
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Process-wide key/value state, fed by the `system properties` section
/// and queried during substitution.
pub trait PropertyProvider {
    fn lookup(&self, name: &str) -> Option<String>;
    fn set(&self, name: &str, value: &str);
}

/// Script-evaluation failure, surfaced as an in-value marker string
/// rather than aborting substitution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct EvalError(pub String);

/// Executes the expression of a `${!- expr -!}` placeholder.
pub trait ScriptEvaluator {
    fn evaluate(&self, source: &str) -> Result<String, EvalError>;
}

/// Default [`EnvironmentProvider`] over the real process environment.
#[derive(Debug, Default)]
pub struct ProcessEnv;

impl EnvironmentProvider for ProcessEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Default [`PropertyProvider`]: an in-memory store scoped to one
/// document instance, not ambient process globals.
#[derive(Debug, Default)]
pub struct InMemoryProperties {
    values: Mutex<HashMap<String, String>>,
}

impl InMemoryProperties {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PropertyProvider for InMemoryProperties {
    fn lookup(&self, name: &str) -> Option<String> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.get(name).cloned()
    }

    fn set(&self, name: &str, value: &str) {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(name.to_string(), value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn process_env_reads_real_variables() {
        temp_env::with_var("INIFILE_PROVIDER_TEST", Some("present"), || {
            assert_eq!(
                ProcessEnv.lookup("INIFILE_PROVIDER_TEST"),
                Some("present".to_string())
            );
        });
        assert_eq!(ProcessEnv.lookup("INIFILE_PROVIDER_TEST"), None);
    }

    #[test]
    fn in_memory_properties_set_then_lookup() {
        let props = InMemoryProperties::new();
        assert_eq!(props.lookup("a"), None);
        props.set("a", "1");
        assert_eq!(props.lookup("a"), Some("1".to_string()));
        props.set("a", "2");
        assert_eq!(props.lookup("a"), Some("2".to_string()));
    }

    #[test]
    fn property_lookup_is_case_sensitive() {
        let props = InMemoryProperties::new();
        props.set("Mixed", "1");
        assert_eq!(props.lookup("mixed"), None);
    }
}
