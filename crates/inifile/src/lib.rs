//! Format-preserving INI-style configuration files.
//!
//! This crate reads, interprets, and rewrites human-edited INI-style
//! files while preserving their byte-level formatting — character
//! encoding, byte-order mark, and line-ending style — across
//! load/modify/save cycles. Callers get case-insensitive section/key
//! lookup plus `${...}` value substitution from other keys, environment
//! variables, process properties, and pluggable script evaluation.
//!
//! ```no_run
//! use inifile::ConfigFile;
//!
//! # fn main() -> Result<(), inifile::ConfigError> {
//! let mut config = ConfigFile::open("settings.ini")?;
//! if let Some(host) = config.get_value("db", "host")? {
//!     println!("host = {host}");
//! }
//! config.set_item("db", "port", Some("5432"))?; // persisted immediately
//! # Ok(())
//! # }
//! ```
//!
//! Single-writer only: a `ConfigFile` instance assumes exclusive
//! ownership of its backing file and is not safe to share across
//! threads.

pub mod document;
pub mod encoding;
pub mod file;
pub mod line;
pub mod providers;
pub mod raw;
pub mod resolver;

pub use document::{ConfigDocument, ParseError};
pub use encoding::TextEncoding;
pub use file::{ConfigError, ConfigFile, ConfigFileBuilder};
pub use line::ConfigLine;
pub use providers::{
    EnvironmentProvider, EvalError, InMemoryProperties, ProcessEnv, PropertyProvider,
    ScriptEvaluator,
};
pub use raw::RawDocument;
pub use resolver::{ResolveError, Resolver};
