//! Placeholder substitution.
//!
//! A placeholder is `{{NAME}}` where `NAME` matches `[A-Z][A-Z0-9_]*`.
//! Anything else between double braces (`{{ color: 1 }}` in JSX, Jinja
//! expressions in Python templates) is ordinary text and is left untouched.
//!
//! Unlike a lenient renderer that leaves unknown tokens in place, rendering
//! here is strict: the first unbound placeholder is reported by name so the
//! caller can attribute it to a fragment and file.

use std::collections::BTreeMap;

/// A placeholder occurrence that has no bound value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unbound(pub String);

/// Placeholder name → value bindings for one composition.
///
/// `BTreeMap` so that iteration (and therefore debug output and plan
/// snapshots) is ordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitutions {
    values: BTreeMap<String, String>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the standard name-derived placeholders for `app_name`.
    pub fn for_app(app_name: &str) -> Self {
        Self::new()
            .with("APP_NAME", app_name)
            .with("APP_NAME_SNAKE", to_snake_case(app_name))
            .with("APP_NAME_KEBAB", to_kebab_case(app_name))
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The first placeholder in `text` with no binding, if any.
    pub fn first_unbound<'a>(&self, text: &'a str) -> Option<&'a str> {
        placeholders(text).find(|name| !self.contains(name))
    }

    /// Replace every placeholder in `text`.
    ///
    /// Single left-to-right pass: substituted values are never re-scanned, so
    /// a value containing `{{X}}` is emitted literally.
    pub fn render(&self, text: &str) -> Result<String, Unbound> {
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;

        for (start, end, name) in scan(text) {
            let value = self.get(name).ok_or_else(|| Unbound(name.to_string()))?;
            out.push_str(&text[cursor..start]);
            out.push_str(value);
            cursor = end;
        }

        out.push_str(&text[cursor..]);
        Ok(out)
    }
}

/// Names of every placeholder in `text`, in order of appearance.
pub fn placeholders(text: &str) -> impl Iterator<Item = &str> {
    scan(text).map(|(_, _, name)| name)
}

/// Yield `(start, end, name)` for each well-formed placeholder.
fn scan(text: &str) -> impl Iterator<Item = (usize, usize, &str)> {
    let bytes = text.as_bytes();
    let mut i = 0;

    std::iter::from_fn(move || {
        while i + 1 < bytes.len() {
            if bytes[i] == b'{' && bytes[i + 1] == b'{' {
                let start = i;
                let name_start = i + 2;
                let mut j = name_start;
                while j < bytes.len() && is_name_byte(bytes[j], j == name_start) {
                    j += 1;
                }
                if j > name_start && j + 1 < bytes.len() && bytes[j] == b'}' && bytes[j + 1] == b'}'
                {
                    i = j + 2;
                    return Some((start, j + 2, &text[name_start..j]));
                }
                i += 1;
            } else {
                i += 1;
            }
        }
        None
    })
}

fn is_name_byte(b: u8, first: bool) -> bool {
    if first {
        b.is_ascii_uppercase()
    } else {
        b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_'
    }
}

// ============================================================================
// Case conversion
// ============================================================================

/// `"My Chat App"` → `"my_chat_app"`, used for Python package names.
pub fn to_snake_case(s: &str) -> String {
    split_words(s).join("_")
}

/// `"My Chat App"` → `"my-chat-app"`, used for npm package names.
pub fn to_kebab_case(s: &str) -> String {
    split_words(s).join("-")
}

/// Split on separators (`_`, `-`, `.`, whitespace), camelCase transitions and
/// acronym boundaries (`HTTPServer` → `http`, `server`).
fn split_words(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '_' || c == '-' || c == '.' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(current.to_lowercase());
                current.clear();
            }
            continue;
        }

        if let Some(&next) = chars.peek() {
            if c.is_lowercase() && next.is_uppercase() {
                current.push(c);
                words.push(current.to_lowercase());
                current.clear();
                continue;
            }

            if c.is_uppercase()
                && next.is_uppercase()
                && chars.clone().nth(1).is_some_and(|n| n.is_lowercase())
            {
                current.push(c);
                words.push(current.to_lowercase());
                current.clear();
                continue;
            }
        }

        current.push(c);
    }

    if !current.is_empty() {
        words.push(current.to_lowercase());
    }

    words
}
