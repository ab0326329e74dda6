//! Classification of one physical line into comment and data parts.
//!
//! A comment starts at a run of one or more of `;`, `#`, `!` that sits at
//! the start of the line, after nothing but whitespace, or immediately
//! after a single space. A marker embedded in a value (no preceding
//! space) does not start a comment. Reassembling `data + comment` always
//! reproduces the original line, which is what makes unmutated lines
//! round-trip byte-for-byte.

/// One physical input line: optional data, optional trailing (or whole
/// line) comment, with `key`/`value` derived from the data part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLine {
    data: Option<String>,
    comment: Option<String>,
    key: Option<String>,
    value: Option<String>,
}

impl ConfigLine {
    /// Classify one decoded line (no separator).
    pub fn new(line: &str) -> Self {
        let (data, comment) = split_comment(line);
        let mut this = Self {
            data: None,
            comment,
            key: None,
            value: None,
        };
        if let Some(data) = data {
            this.set_data(data);
        }
        this
    }

    /// Replace the data part and recompute `key`/`value`. The comment is
    /// left untouched.
    pub fn set_data(&mut self, data: impl Into<String>) {
        let data = data.into();
        let (key, value) = match data.split_once('=') {
            None => (data.trim().to_string(), None),
            Some((left, right)) => (left.trim().to_string(), Some(right.to_string())),
        };
        self.key = Some(key);
        self.value = value;
        self.data = Some(data);
    }

    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Trimmed key; present whenever data is present (empty for a blank
    /// line).
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Everything after the first `=`, untrimmed. `None` for a bare key.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Whether the data part holds anything beyond whitespace. Blank
    /// lines pass through the document untouched and never join a
    /// section's key set.
    pub fn has_content(&self) -> bool {
        self.data.as_deref().is_some_and(|data| !data.trim().is_empty())
    }

    /// Reconstruct the physical line.
    pub fn render(&self) -> String {
        format!(
            "{}{}",
            self.data.as_deref().unwrap_or(""),
            self.comment.as_deref().unwrap_or("")
        )
    }
}

fn is_comment_marker(ch: char) -> bool {
    matches!(ch, ';' | '#' | '!')
}

fn split_comment(line: &str) -> (Option<String>, Option<String>) {
    for (index, ch) in line.char_indices() {
        if !is_comment_marker(ch) {
            continue;
        }
        let before = &line[..index];
        // Only the first marker of a run can open a comment.
        if before.chars().next_back().is_some_and(is_comment_marker) {
            continue;
        }
        if before.trim().is_empty() {
            return (None, Some(line.to_string()));
        }
        if before.ends_with(' ') {
            // Exactly one space travels with the comment.
            let data = before[..before.len() - 1].to_string();
            let comment = format!(" {}", &line[index..]);
            return (Some(data), Some(comment));
        }
        // Embedded in a value; keep scanning for a later run.
    }
    (Some(line.to_string()), None)
}
