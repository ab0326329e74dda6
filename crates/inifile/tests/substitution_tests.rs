//! End-to-end substitution behavior through the public `ConfigFile`
//! surface: cross-references, environment variables, the system
//! properties section, and script evaluation.

use inifile::{
    ConfigError, ConfigFile, EnvironmentProvider, EvalError, ResolveError, ScriptEvaluator,
};
use serial_test::serial;
use std::collections::HashMap;
use std::path::PathBuf;
use tempfile::TempDir;

struct FakeEnv(HashMap<String, String>);

impl FakeEnv {
    fn new(pairs: &[(&str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl EnvironmentProvider for FakeEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

struct EchoEval;

impl ScriptEvaluator for EchoEval {
    fn evaluate(&self, source: &str) -> Result<String, EvalError> {
        Ok(format!("<{source}>"))
    }
}

fn fixture(dir: &TempDir, text: &str) -> PathBuf {
    let path = dir.path().join("config.ini");
    std::fs::write(&path, text.as_bytes()).unwrap();
    path
}

#[test]
fn cross_reference_between_sections() {
    let dir = TempDir::new().unwrap();
    let path = fixture(
        &dir,
        "[General]\ndriver=${[Browser settings].webdriver.binary}\n\
         [Browser settings]\nwebdriver.binary=chrome.exe\n",
    );

    let config = ConfigFile::open(&path).unwrap();
    assert_eq!(
        config.get_value("General", "driver").unwrap().as_deref(),
        Some("chrome.exe")
    );
}

#[test]
fn injected_environment_provider_is_used() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, "[s]\nuser=${LOGIN}\n");

    let config = ConfigFile::builder(&path)
        .with_environment(FakeEnv::new(&[("LOGIN", "alice")]))
        .load()
        .unwrap();
    assert_eq!(config.get_value("s", "user").unwrap().as_deref(), Some("alice"));
}

#[test]
#[serial]
fn default_environment_provider_reads_process_env() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, "[s]\nk=${INIFILE_SUBST_TEST}\n");

    temp_env::with_var("INIFILE_SUBST_TEST", Some("from-process"), || {
        let config = ConfigFile::open(&path).unwrap();
        assert_eq!(
            config.get_value("s", "k").unwrap().as_deref(),
            Some("from-process")
        );
    });
}

#[test]
fn unresolvable_placeholder_survives_load_and_save() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, "[s]\na=${UNSET_ENV_VALUE}\n");

    let config = ConfigFile::builder(&path)
        .with_environment(FakeEnv::new(&[]))
        .load()
        .unwrap();
    assert_eq!(
        config.get_value("s", "a").unwrap().as_deref(),
        Some("${UNSET_ENV_VALUE}")
    );
    config.save().unwrap();
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "[s]\na=${UNSET_ENV_VALUE}\n"
    );
}

#[test]
fn system_properties_resolve_dependent_placeholders() {
    let dir = TempDir::new().unwrap();
    let path = fixture(
        &dir,
        "[app]\ngreeting=${app.greeting}\n[System Properties]\napp.greeting=hello\n",
    );

    let config = ConfigFile::builder(&path)
        .with_environment(FakeEnv::new(&[]))
        .load()
        .unwrap();
    assert_eq!(
        config.get_value("app", "greeting").unwrap().as_deref(),
        Some("hello")
    );
}

#[test]
fn malformed_system_property_aborts_load() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, "[system properties]\nbroken-entry\n");

    let result = ConfigFile::open(&path);
    assert!(matches!(
        result,
        Err(ConfigError::Resolve(ResolveError::MalformedProperty(data))) if data == "broken-entry"
    ));
}

#[test]
fn script_placeholder_uses_configured_evaluator() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, "[s]\nk=${!- 2 + 2 -!}\n");

    let config = ConfigFile::builder(&path)
        .with_environment(FakeEnv::new(&[]))
        .with_script_evaluator(EchoEval)
        .load()
        .unwrap();
    assert_eq!(config.get_value("s", "k").unwrap().as_deref(), Some("<2 + 2>"));
}

#[test]
fn script_placeholder_without_evaluator_stays_put() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, "[s]\nk=${!- expr -!}\n");

    let config = ConfigFile::builder(&path)
        .with_environment(FakeEnv::new(&[]))
        .load()
        .unwrap();
    assert_eq!(
        config.get_value("s", "k").unwrap().as_deref(),
        Some("${!- expr -!}")
    );
}

#[test]
fn resolved_values_are_what_mutations_persist() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, "[s]\nurl=${HOST}/api\n");

    let mut config = ConfigFile::builder(&path)
        .with_environment(FakeEnv::new(&[("HOST", "example.org")]))
        .load()
        .unwrap();
    config.set_item("s", "extra", Some("1")).unwrap();

    // The substituted text is what lands on disk once a mutation saves.
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "[s]\nurl=example.org/api\nextra=1\n"
    );
}

#[test]
fn placeholder_resolution_applies_to_values_set_after_load() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, "[s]\nbase=https://example.org\n");

    let mut config = ConfigFile::builder(&path)
        .with_environment(FakeEnv::new(&[]))
        .load()
        .unwrap();
    config
        .set_item("s", "endpoint", Some("${[s].base}/v1"))
        .unwrap();

    // The write-through reload re-runs substitution over the saved text.
    assert_eq!(
        config.get_value("s", "endpoint").unwrap().as_deref(),
        Some("https://example.org/v1")
    );
}
