//! Environment-template (`.env`) model with name-keyed merging.

use std::fmt::Write as _;

use super::fragment::EnvDeclaration;

/// One `NAME=value` line, with the comment block directly above it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvEntry {
    pub name: String,
    pub value: String,
    pub description: Option<String>,
}

/// An ordered `.env` document.
///
/// Merging is keyed by variable name: a redeclared variable keeps its first
/// position and takes the latest value and description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFile {
    entries: Vec<EnvEntry>,
}

impl EnvFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an existing `.env`.
    ///
    /// `# ...` lines immediately above an assignment become its description;
    /// lines that are neither comments nor assignments are dropped.
    pub fn parse(text: &str) -> Self {
        let mut file = Self::new();
        let mut comment: Vec<&str> = Vec::new();

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                comment.clear();
            } else if let Some(c) = trimmed.strip_prefix('#') {
                comment.push(c.trim());
            } else if let Some((name, value)) = trimmed.split_once('=') {
                let description = (!comment.is_empty()).then(|| comment.join("\n"));
                file.upsert(EnvEntry {
                    name: name.trim().to_string(),
                    value: value.trim().to_string(),
                    description,
                });
                comment.clear();
            }
        }

        file
    }

    pub fn entries(&self) -> &[EnvEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge an already-substituted declaration.
    pub fn declare(&mut self, decl: &EnvDeclaration) {
        self.upsert(EnvEntry {
            name: decl.name.clone(),
            value: decl.value.clone().unwrap_or_default(),
            description: decl.description.clone(),
        });
    }

    fn upsert(&mut self, entry: EnvEntry) {
        match self.entries.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => {
                existing.value = entry.value;
                if entry.description.is_some() {
                    existing.description = entry.description;
                }
            }
            None => self.entries.push(entry),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            if let Some(description) = &entry.description {
                for line in description.lines() {
                    let _ = writeln!(out, "# {line}");
                }
            }
            let _ = writeln!(out, "{}={}", entry.name, entry.value);
        }
        out
    }
}
