//! Field projection (`fields` parameter).
//!
//! `a,-b,-c.d` includes `a`, excludes `b`, and removes `d` inside `c`.

use serde_json::{Map, Value};

/// Top-level keys a projected document always keeps.
const ALWAYS_INCLUDED: [&str; 2] = ["id", "type"];

/// Excluded field: a whole top-level key or a nested path below one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExcludedField {
    Key(String),
    Path(String, Vec<String>),
}

/// Parsed field selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSelection {
    pub include: Vec<String>,
    pub exclude: Vec<ExcludedField>,
}

impl FieldSelection {
    /// Parse a comma-separated selection; `None` or empty selects everything.
    pub fn parse(fields: Option<&str>) -> Self {
        let mut selection = Self::default();

        let Some(fields) = fields else {
            return selection;
        };

        for field in fields.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            let Some(excluded) = field.strip_prefix('-') else {
                selection.include.push(field.to_string());
                continue;
            };

            let mut parts = excluded.split('.').map(str::to_string);
            let head = parts.next().unwrap_or_default();
            let rest: Vec<String> = parts.collect();
            selection.exclude.push(if rest.is_empty() {
                ExcludedField::Key(head)
            } else {
                ExcludedField::Path(head, rest)
            });
        }

        selection
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Top-level keys excluded as a whole.
    pub fn excluded_keys(&self) -> Vec<&str> {
        self.exclude
            .iter()
            .filter_map(|field| match field {
                ExcludedField::Key(key) => Some(key.as_str()),
                ExcludedField::Path(..) => None,
            })
            .collect()
    }

    pub fn excludes(&self, key: &str) -> bool {
        self.excluded_keys().contains(&key)
    }

    /// Project a document in place.
    ///
    /// Inclusions are applied first (dotted names keep a nested member),
    /// then exclusions.
    pub fn apply(&self, document: &mut Map<String, Value>) {
        if !self.include.is_empty() {
            let mut projected = Map::new();
            for key in ALWAYS_INCLUDED {
                if let Some(value) = document.get(key) {
                    projected.insert(key.to_string(), value.clone());
                }
            }
            for field in &self.include {
                let path: Vec<&str> = field.split('.').collect();
                copy_path(document, &mut projected, &path);
            }
            *document = projected;
        }

        for field in &self.exclude {
            match field {
                ExcludedField::Key(key) => {
                    document.remove(key);
                }
                ExcludedField::Path(head, rest) => remove_path(document, head, rest),
            }
        }
    }
}

fn copy_path(source: &Map<String, Value>, target: &mut Map<String, Value>, path: &[&str]) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };
    let Some(value) = source.get(*head) else {
        return;
    };

    if rest.is_empty() {
        target.insert((*head).to_string(), value.clone());
        return;
    }

    let Value::Object(nested_source) = value else {
        return;
    };
    let nested_target = target
        .entry((*head).to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(nested_target) = nested_target {
        copy_path(nested_source, nested_target, rest);
    }
}

fn remove_path(document: &mut Map<String, Value>, head: &str, rest: &[String]) {
    let Some((last, parents)) = rest.split_last() else {
        document.remove(head);
        return;
    };

    let mut current = document.get_mut(head);
    for key in parents {
        current = current.and_then(|value| value.get_mut(key.as_str()));
    }

    if let Some(Value::Object(parent)) = current {
        parent.remove(last.as_str());
    }
}
