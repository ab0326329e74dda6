//! The configuration file itself: load, query, mutate, save.
//!
//! Responsibilities:
//! - Orchestrate load: read bytes, detect/decode, classify, parse,
//!   resolve (including the system-properties pass).
//! - Orchestrate save: render, join with the detected separator, restore
//!   the BOM, encode, write.
//! - Validate arguments before any I/O.
//! - Write-through mutations: every `add_section`/`set_item` saves and
//!   reloads, so the in-memory state is always the durable state.
//!
//! Does NOT handle:
//! - Concurrency. One instance owns its backing file; concurrent writers
//!   (in-process or external) are undefined behavior at the file level.
//!
//! Invariants / Assumptions:
//! - Files are small enough for whole-file buffering.
//! - Detected encoding, BOM, and separator are reused verbatim on save,
//!   so lines never touched by a mutation or the resolver round-trip
//!   byte-for-byte.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::document::{ConfigDocument, ParseError};
use crate::encoding::TextEncoding;
use crate::line::ConfigLine;
use crate::providers::{
    EnvironmentProvider, InMemoryProperties, ProcessEnv, PropertyProvider, ScriptEvaluator,
};
use crate::raw::RawDocument;
use crate::resolver::{ResolveError, Resolver};

/// Errors from loading, querying, or mutating a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An empty or whitespace-only name was passed to a public call;
    /// rejected before any I/O.
    #[error("{0} must not be empty")]
    Validation(&'static str),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Builder for [`ConfigFile`]: target path, optional encoding override,
/// optional capability injection.
pub struct ConfigFileBuilder {
    path: PathBuf,
    encoding: Option<TextEncoding>,
    environment: Option<Box<dyn EnvironmentProvider>>,
    properties: Option<Box<dyn PropertyProvider>>,
    script: Option<Box<dyn ScriptEvaluator>>,
}

impl ConfigFileBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            encoding: None,
            environment: None,
            properties: None,
            script: None,
        }
    }

    /// Explicit encoding, used only when the file carries no BOM.
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Replace the default process-environment lookup.
    pub fn with_environment(mut self, provider: impl EnvironmentProvider + 'static) -> Self {
        self.environment = Some(Box::new(provider));
        self
    }

    /// Replace the default in-memory property store.
    pub fn with_properties(mut self, provider: impl PropertyProvider + 'static) -> Self {
        self.properties = Some(Box::new(provider));
        self
    }

    /// Attach a script evaluator for `${!- expr -!}` placeholders.
    /// Without one, script placeholders are left untouched.
    pub fn with_script_evaluator(mut self, evaluator: impl ScriptEvaluator + 'static) -> Self {
        self.script = Some(Box::new(evaluator));
        self
    }

    /// Read and fully interpret the file.
    pub fn load(self) -> Result<ConfigFile, ConfigError> {
        let mut file = ConfigFile {
            path: self.path,
            supplied_encoding: self.encoding,
            environment: self.environment.unwrap_or_else(|| Box::new(ProcessEnv)),
            properties: self
                .properties
                .unwrap_or_else(|| Box::new(InMemoryProperties::new())),
            script: self.script,
            encoding: TextEncoding::Utf8,
            has_bom: false,
            separator: String::new(),
            trailing_separator: false,
            document: ConfigDocument::default(),
        };
        file.reload()?;
        Ok(file)
    }
}

/// An INI-style configuration file that preserves its byte-level
/// formatting across load/modify/save cycles.
///
/// Single-writer, no concurrent access: the line arena and section index
/// are mutated in place without synchronization, and the backing file is
/// treated as exclusively owned by this instance.
pub struct ConfigFile {
    path: PathBuf,
    supplied_encoding: Option<TextEncoding>,
    environment: Box<dyn EnvironmentProvider>,
    properties: Box<dyn PropertyProvider>,
    script: Option<Box<dyn ScriptEvaluator>>,
    encoding: TextEncoding,
    has_bom: bool,
    separator: String,
    trailing_separator: bool,
    document: ConfigDocument,
}

impl ConfigFile {
    /// Load with all defaults: no encoding override, real process
    /// environment, fresh property store, no script evaluator.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        ConfigFileBuilder::new(path).load()
    }

    pub fn builder(path: impl Into<PathBuf>) -> ConfigFileBuilder {
        ConfigFileBuilder::new(path)
    }

    /// Re-read the backing file from scratch: detect, decode, classify,
    /// parse, substitute, apply system properties, substitute again.
    fn reload(&mut self) -> Result<(), ConfigError> {
        let bytes = std::fs::read(&self.path)?;
        let raw = RawDocument::from_bytes(&bytes, self.supplied_encoding);
        let lines = raw.lines.iter().map(|line| ConfigLine::new(line)).collect();
        let mut document = ConfigDocument::parse(lines)?;

        Resolver::new(
            self.environment.as_ref(),
            self.properties.as_ref(),
            self.script.as_deref(),
        )
        .run(&mut document)?;

        self.encoding = raw.encoding;
        self.has_bom = raw.has_bom;
        self.separator = raw.separator;
        self.trailing_separator = raw.trailing_separator;
        self.document = document;

        debug!(
            path = %self.path.display(),
            encoding = self.encoding.name(),
            bom = self.has_bom,
            lines = self.document.lines().len(),
            "configuration loaded"
        );
        Ok(())
    }

    /// Write the document back with the detected encoding, BOM, and
    /// separator.
    pub fn save(&self) -> Result<(), ConfigError> {
        let raw = RawDocument {
            encoding: self.encoding,
            has_bom: self.has_bom,
            separator: self.separator.clone(),
            trailing_separator: self.trailing_separator,
            lines: self.document.render_lines(),
        };
        std::fs::write(&self.path, raw.to_bytes())?;
        debug!(path = %self.path.display(), "configuration saved");
        Ok(())
    }

    /// Section names in first-seen order; the unnamed section `""` is
    /// always present and first.
    pub fn sections(&self) -> Vec<&str> {
        self.document.sections()
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.document.has_section(section)
    }

    /// Keys of one section in file order; empty for an unknown section.
    pub fn keys(&self, section: &str) -> Vec<&str> {
        self.document.keys(section)
    }

    pub fn has_key(&self, section: &str, key: &str) -> Result<bool, ConfigError> {
        validate_key(key)?;
        Ok(self.document.has_key(section, key))
    }

    /// `Ok(None)` when the section or key is absent, or when the key
    /// exists without a value.
    pub fn get_value(&self, section: &str, key: &str) -> Result<Option<String>, ConfigError> {
        validate_key(key)?;
        Ok(self.document.get_value(section, key).map(str::to_string))
    }

    /// Append a new `[section]` header and persist. The name must be
    /// non-empty after trimming; returns `false` without touching the
    /// file when the section already exists (any casing).
    pub fn add_section(&mut self, section: &str) -> Result<bool, ConfigError> {
        if section.trim().is_empty() {
            return Err(ConfigError::Validation("Section"));
        }
        if self.document.has_section(section) {
            return Ok(false);
        }
        self.document.add_header(section);
        self.save()?;
        self.reload()?;
        Ok(true)
    }

    /// Set `key` in `section`, creating the section when missing.
    /// An existing key is rewritten in place; a new key is appended
    /// right after the section's last entry. `value = None` writes a
    /// bare key, `Some("")` writes `key=`. Persists before returning.
    pub fn set_item(
        &mut self,
        section: &str,
        key: &str,
        value: Option<&str>,
    ) -> Result<bool, ConfigError> {
        validate_key(key)?;
        // The unnamed section always exists, so an empty `section` is
        // legal here even though `add_section` would reject it.
        if !self.document.has_section(section) {
            self.add_section(section)?;
        }
        let changed = self.document.upsert_item(section, key, value);
        if changed {
            self.save()?;
            self.reload()?;
        }
        Ok(changed)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn detected_encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn detected_bom(&self) -> bool {
        self.has_bom
    }

    pub fn detected_separator(&self) -> &str {
        &self.separator
    }

    pub fn supplied_encoding(&self) -> Option<TextEncoding> {
        self.supplied_encoding
    }
}

fn validate_key(key: &str) -> Result<(), ConfigError> {
    if key.trim().is_empty() {
        return Err(ConfigError::Validation("Key"));
    }
    Ok(())
}
