//! Ordered document model with a derived section view.
//!
//! Responsibilities:
//! - Hold every physical line, in file order, in a single arena.
//! - Maintain the section index: name, header line, member data lines.
//! - Enforce uniqueness: section names and per-section keys are unique
//!   case-insensitively.
//! - In-place rewrites and position-aware inserts for mutations.
//!
//! Does NOT handle:
//! - Bytes, encodings, or separators (see `raw.rs`).
//! - Placeholder substitution (see `resolver.rs`).
//! - Persistence (see `file.rs`).
//!
//! Invariants / Assumptions:
//! - The section index stores arena indices only, never line copies, so
//!   the ordered and the per-section view cannot drift apart.
//! - The synthetic unnamed section `""` is always present and first; it
//!   has no header line and is never written to disk.
//! - Comment-only and blank lines pass through untouched: they are not
//!   section members and do not participate in duplicate checks.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::line::ConfigLine;

/// `[name]`, tolerating at most one whitespace character on either side.
static SECTION_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s?\[(.*)\]\s?$").expect("section header pattern"));

/// Structural conflicts discovered during parse. Fatal: no partial
/// document is exposed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Duplicate section '{0}'")]
    DuplicateSection(String),

    #[error("Duplicate key '{key}' in section '{section}'")]
    DuplicateKey { section: String, key: String },
}

#[derive(Debug, Clone)]
struct Section {
    /// Original casing, `""` for the unnamed section.
    name: String,
    /// Arena index of the header line, `None` for the unnamed section.
    header: Option<usize>,
    /// Arena indices of the member key/value lines, in file order.
    members: Vec<usize>,
}

/// An ordered sequence of [`ConfigLine`] plus the derived section map.
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    lines: Vec<ConfigLine>,
    sections: Vec<Section>,
}

/// Case-insensitive name comparison used for sections and keys.
pub(crate) fn fold_eq(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            sections: vec![Section {
                name: String::new(),
                header: None,
                members: Vec::new(),
            }],
        }
    }
}

impl ConfigDocument {
    /// Walk the classified lines in order, opening a section at each
    /// header and attaching key/value lines to the open section.
    pub fn parse(lines: Vec<ConfigLine>) -> Result<Self, ParseError> {
        let mut sections = vec![Section {
            name: String::new(),
            header: None,
            members: Vec::new(),
        }];
        let mut current = 0;

        for (index, line) in lines.iter().enumerate() {
            let Some(data) = line.data() else { continue };

            if let Some(caps) = SECTION_HEADER.captures(data) {
                let name = caps[1].trim().to_string();
                if sections.iter().any(|s| fold_eq(&s.name, &name)) {
                    return Err(ParseError::DuplicateSection(name));
                }
                sections.push(Section {
                    name,
                    header: Some(index),
                    members: Vec::new(),
                });
                current = sections.len() - 1;
                continue;
            }

            if !line.has_content() {
                continue;
            }

            let key = line.key().unwrap_or("");
            let section = &mut sections[current];
            let duplicate = section
                .members
                .iter()
                .any(|&m| lines[m].key().is_some_and(|k| fold_eq(k, key)));
            if duplicate {
                return Err(ParseError::DuplicateKey {
                    section: section.name.clone(),
                    key: key.to_string(),
                });
            }
            section.members.push(index);
        }

        Ok(Self { lines, sections })
    }

    /// Section names in first-seen order, the unnamed section first.
    pub fn sections(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.find_section(name).is_some()
    }

    /// Keys of one section, in file order; empty for an unknown section.
    pub fn keys(&self, section: &str) -> Vec<&str> {
        let Some(si) = self.find_section(section) else {
            return Vec::new();
        };
        self.sections[si]
            .members
            .iter()
            .filter_map(|&m| self.lines[m].key())
            .collect()
    }

    pub fn has_key(&self, section: &str, key: &str) -> bool {
        self.find_member(section, key).is_some()
    }

    /// `None` when the section or key is absent, and also when the key
    /// exists without a value (a bare key).
    pub fn get_value(&self, section: &str, key: &str) -> Option<&str> {
        self.find_member(section, key)
            .and_then(|m| self.lines[m].value())
    }

    /// Append a `[name]` header line to the document end and open an
    /// empty section for it. The caller is responsible for checking that
    /// the name is not already taken.
    pub fn add_header(&mut self, name: &str) {
        let name = name.trim().to_string();
        self.lines.push(ConfigLine::new(&format!("[{name}]")));
        self.sections.push(Section {
            name,
            header: Some(self.lines.len() - 1),
            members: Vec::new(),
        });
    }

    /// Rewrite a key's line in place — preserving the original left-hand
    /// spelling and any trailing comment — or insert a new line right
    /// after the section's last member (after the header for an empty
    /// section). Returns `false` when the section does not exist.
    ///
    /// `value = None` writes a bare key; `Some("")` writes `key=`.
    pub fn upsert_item(&mut self, section: &str, key: &str, value: Option<&str>) -> bool {
        let Some(si) = self.find_section(section) else {
            return false;
        };
        let key = key.trim();

        if let Some(mi) = self.member_in(si, key) {
            let data = self.lines[mi].data().unwrap_or("").to_string();
            let left = data.split_once('=').map_or(data.as_str(), |(l, _)| l);
            let new_data = match value {
                Some(v) => format!("{left}={v}"),
                None => left.to_string(),
            };
            self.lines[mi].set_data(new_data);
            return true;
        }

        let new_data = match value {
            Some(v) => format!("{key}={v}"),
            None => key.to_string(),
        };
        let insert_at = match (self.sections[si].members.last(), self.sections[si].header) {
            (Some(&m), _) => m + 1,
            (None, Some(h)) => h + 1,
            // Empty unnamed section: its lines live before everything else.
            (None, None) => 0,
        };
        self.lines.insert(insert_at, ConfigLine::new(&new_data));
        for s in &mut self.sections {
            if let Some(h) = s.header.as_mut() {
                if *h >= insert_at {
                    *h += 1;
                }
            }
            for m in &mut s.members {
                if *m >= insert_at {
                    *m += 1;
                }
            }
        }
        self.sections[si].members.push(insert_at);
        true
    }

    /// Every line, in file order.
    pub fn lines(&self) -> &[ConfigLine] {
        &self.lines
    }

    /// The physical lines as they would be written back.
    pub fn render_lines(&self) -> Vec<String> {
        self.lines.iter().map(ConfigLine::render).collect()
    }

    /// Arena indices of every section member, in section order. Used by
    /// the resolver, which rewrites data text only.
    pub(crate) fn member_indices(&self) -> Vec<usize> {
        self.sections
            .iter()
            .flat_map(|s| s.members.iter().copied())
            .collect()
    }

    /// Member indices of one section, if it exists.
    pub(crate) fn members_of(&self, section: &str) -> Option<&[usize]> {
        self.find_section(section)
            .map(|si| self.sections[si].members.as_slice())
    }

    pub(crate) fn line_data(&self, index: usize) -> Option<&str> {
        self.lines[index].data()
    }

    pub(crate) fn set_line_data(&mut self, index: usize, data: String) {
        self.lines[index].set_data(data);
    }

    fn find_section(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.sections.iter().position(|s| fold_eq(&s.name, name))
    }

    fn find_member(&self, section: &str, key: &str) -> Option<usize> {
        let si = self.find_section(section)?;
        self.member_in(si, key.trim())
    }

    fn member_in(&self, si: usize, key: &str) -> Option<usize> {
        self.sections[si]
            .members
            .iter()
            .copied()
            .find(|&m| self.lines[m].key().is_some_and(|k| fold_eq(k, key)))
    }
}
