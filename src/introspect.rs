//! Read-only view of the return annotations already present in a file.
//!
//! Annotations are resolved from an explicit alias table rather than by
//! evaluating anything: quoted forward references are unquoted, and bare
//! alias names are expanded from a typing module such as `redis/typing.py`.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::Result;

use crate::annotate::read_source;
use crate::python::{string_literal_value, PythonSource};

/// Expansion depth cap, guards against alias cycles.
const MAX_DEPTH: usize = 8;

#[derive(Debug, Default, Clone)]
pub struct TypeAliases {
    aliases: HashMap<String, String>,
}

impl TypeAliases {
    pub fn from_source(source: &str) -> Result<Self> {
        let parsed = PythonSource::parse(source)?;
        let aliases = parsed
            .aliases()
            .into_iter()
            .map(|a| (a.name, unquote(&a.value)))
            .collect();
        Ok(Self { aliases })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_source(&read_source(path)?)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Replace alias names with their definitions. Names used as generics
    /// (`ResponseT[...]`) are kept, since their parameters are substituted
    /// by the type checker, not here.
    pub fn expand(&self, annotation: &str) -> String {
        let mut current = annotation.to_string();
        for _ in 0..MAX_DEPTH {
            let next = self.expand_once(&current);
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    fn expand_once(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut chars = text.char_indices().peekable();
        let mut quote: Option<char> = None;

        while let Some((start, c)) = chars.next() {
            if let Some(q) = quote {
                out.push(c);
                if c == q {
                    quote = None;
                }
                continue;
            }
            if c == '"' || c == '\'' {
                quote = Some(c);
                out.push(c);
                continue;
            }
            if !is_ident_start(c) {
                out.push(c);
                continue;
            }

            let mut end = start + c.len_utf8();
            while let Some(&(i, next)) = chars.peek() {
                if !is_ident_char(next) {
                    break;
                }
                end = i + next.len_utf8();
                chars.next();
            }
            let word = &text[start..end];
            let followed_by_subscript = text[end..].starts_with('[');
            let after_dot = out.ends_with('.');
            match self.aliases.get(word) {
                Some(value) if !followed_by_subscript && !after_dot => out.push_str(value),
                _ => out.push_str(word),
            }
        }
        out
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `"Foo"` -> `Foo`; anything that isn't a whole string literal is kept.
fn unquote(annotation: &str) -> String {
    let trimmed = annotation.trim();
    string_literal_value(trimmed).unwrap_or_else(|| trimmed.to_string())
}

/// Function name to resolved return annotation, `None` for unannotated
/// functions. Later definitions of the same name win.
pub fn return_annotations(
    source: &str,
    aliases: Option<&TypeAliases>,
) -> Result<BTreeMap<String, Option<String>>> {
    let parsed = PythonSource::parse(source)?;
    let mut out = BTreeMap::new();
    for site in parsed.functions() {
        let resolved = parsed.annotation_text(&site).map(|text| {
            let text = unquote(text);
            match aliases {
                Some(aliases) => aliases.expand(&text),
                None => text,
            }
        });
        tracing::debug!(function = %site.name, annotation = ?resolved, "Resolved annotation");
        out.insert(site.name, resolved);
    }
    Ok(out)
}

pub fn return_annotations_of_file(
    path: &Path,
    aliases: Option<&TypeAliases>,
) -> Result<BTreeMap<String, Option<String>>> {
    return_annotations(&read_source(path)?, aliases)
}
