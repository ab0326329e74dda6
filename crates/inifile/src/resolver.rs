//! Fixed-point substitution of `${...}` placeholders in data lines.
//!
//! Responsibilities:
//! - Repeat full-document passes until a pass changes nothing, so a
//!   resolved value that itself contains a placeholder gets another
//!   round (chained cross-references).
//! - Resolve bare names via cross-reference (`[Section].key`), then the
//!   environment, then process properties; delegate `${!- expr -!}` to
//!   the script evaluator every pass it still appears.
//! - Apply the `system properties` sentinel section between two fixed
//!   points.
//!
//! Does NOT handle:
//! - Comments (the resolver rewrites data text only) or header lines.
//!
//! Invariants / Assumptions:
//! - A cross-reference only substitutes once its target value carries no
//!   placeholder of its own, so self- and mutually-referencing values
//!   that can never make progress are left unchanged.
//! - A pass that reproduces an earlier document state stops the loop, so
//!   cyclic provider values (an environment where `X` expands to `${Y}`
//!   and `Y` back to `${X}`) cannot spin forever.
//! - A placeholder that never resolves is left in place, which is the
//!   documented idempotent outcome, not an error.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::warn;

use crate::document::ConfigDocument;
use crate::providers::{EnvironmentProvider, PropertyProvider, ScriptEvaluator};

/// `${name}`, shortest match, never empty (`${}` is a no-op by design).
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern"));

/// `${!- expr -!}`, the script-delimited form.
static SCRIPT_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{!-(.*?)-!\}").expect("script placeholder pattern"));

/// `[Section].key` inside a bare placeholder.
static CROSS_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[(.*)\]\.(.*)$").expect("cross reference pattern"));

/// Name of the sentinel section applied to the property provider.
const SYSTEM_PROPERTIES_SECTION: &str = "system properties";

/// Fatal substitution-stage failures; these abort the whole load.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("System property '{0}' is invalid")]
    MalformedProperty(String),
}

/// One substitution run over a document, borrowing the injected
/// capabilities.
pub struct Resolver<'a> {
    environment: &'a dyn EnvironmentProvider,
    properties: &'a dyn PropertyProvider,
    script: Option<&'a dyn ScriptEvaluator>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        environment: &'a dyn EnvironmentProvider,
        properties: &'a dyn PropertyProvider,
        script: Option<&'a dyn ScriptEvaluator>,
    ) -> Self {
        Self {
            environment,
            properties,
            script,
        }
    }

    /// Resolve to a fixed point, apply the `system properties` section,
    /// then resolve again so placeholders over the new properties settle.
    pub fn run(&self, document: &mut ConfigDocument) -> Result<(), ResolveError> {
        self.resolve_to_fixed_point(document);
        self.apply_system_properties(document)?;
        self.resolve_to_fixed_point(document);
        Ok(())
    }

    fn resolve_to_fixed_point(&self, document: &mut ConfigDocument) {
        let mut seen: HashSet<Vec<String>> = HashSet::new();
        loop {
            // Oscillating rewrites revisit an earlier state; stop there.
            let state: Vec<String> = document
                .member_indices()
                .into_iter()
                .map(|index| document.line_data(index).unwrap_or("").to_string())
                .collect();
            if !seen.insert(state) {
                warn!("substitution cycle detected, leaving remaining placeholders in place");
                break;
            }

            let mut replaced = 0usize;
            for index in document.member_indices() {
                let Some(original) = document.line_data(index).map(str::to_string) else {
                    continue;
                };
                let mut text = original.clone();
                replaced += self.resolve_scripts(&mut text);
                replaced += self.resolve_names(document, &mut text);
                if text != original {
                    document.set_line_data(index, text);
                }
            }
            if replaced == 0 {
                break;
            }
        }
    }

    /// Evaluate every `${!- expr -!}` in `text`. Evaluation failures are
    /// contained: the error becomes a marker string in the value.
    fn resolve_scripts(&self, text: &mut String) -> usize {
        let Some(evaluator) = self.script else {
            return 0;
        };
        let mut replaced = 0;
        let tokens: Vec<(String, String)> = SCRIPT_PLACEHOLDER
            .captures_iter(text)
            .map(|caps| (caps[0].to_string(), caps[1].trim().to_string()))
            .collect();
        for (token, source) in tokens {
            if !text.contains(&token) {
                continue;
            }
            let replacement = match evaluator.evaluate(&source) {
                Ok(result) => result,
                Err(error) => {
                    warn!(source = source.as_str(), %error, "script evaluation failed");
                    format!("[script error: {error}]")
                }
            };
            let updated = text.replace(&token, &replacement);
            if updated != *text {
                *text = updated;
                replaced += 1;
            }
        }
        replaced
    }

    /// Resolve every bare `${name}` in `text` that has a source this
    /// pass; unresolved placeholders are left for the next pass (or
    /// forever).
    fn resolve_names(&self, document: &ConfigDocument, text: &mut String) -> usize {
        let mut replaced = 0;
        let names: Vec<String> = PLACEHOLDER
            .captures_iter(text)
            .map(|caps| caps[1].to_string())
            .collect();
        for name in names {
            // An unevaluated script form is not a variable name.
            if name.starts_with("!-") {
                continue;
            }
            let Some(value) = self.resolve_name(document, &name) else {
                continue;
            };
            let token = format!("${{{name}}}");
            let updated = text.replace(&token, &value);
            if updated != *text {
                *text = updated;
                replaced += 1;
            }
        }
        replaced
    }

    /// Cross-reference, then environment, then properties; first hit wins.
    fn resolve_name(&self, document: &ConfigDocument, name: &str) -> Option<String> {
        if name.starts_with('[') {
            if let Some(caps) = CROSS_REFERENCE.captures(name) {
                if let Some(value) = document.get_value(&caps[1], &caps[2]) {
                    // A target still carrying a placeholder has not
                    // settled; wait for a later pass instead of copying
                    // the unresolved text around.
                    if PLACEHOLDER.is_match(value) {
                        return None;
                    }
                    return Some(value.to_string());
                }
            }
        }
        if let Some(value) = self.environment.lookup(name) {
            return Some(value);
        }
        self.properties.lookup(name)
    }

    fn apply_system_properties(&self, document: &ConfigDocument) -> Result<(), ResolveError> {
        // Section lookup is case-insensitive, so any casing of the
        // sentinel name matches.
        let members: Vec<usize> = document
            .members_of(SYSTEM_PROPERTIES_SECTION)
            .map(|members| members.to_vec())
            .unwrap_or_default();

        for index in members {
            let Some(data) = document.line_data(index) else {
                continue;
            };
            let Some((key, value)) = data.split_once('=') else {
                return Err(ResolveError::MalformedProperty(data.to_string()));
            };
            if key.trim().is_empty() {
                return Err(ResolveError::MalformedProperty(data.to_string()));
            }
            self.properties.set(key.trim(), value);
        }
        Ok(())
    }
}
