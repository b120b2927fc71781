//! Mapping of free-form task statuses onto board column ids

use std::collections::HashMap;

use tracing::warn;

use crate::types::{COLUMN_DONE, COLUMN_IN_PROGRESS, COLUMN_REVIEW, COLUMN_TODO};

pub const DEFAULT_COLUMN: &str = COLUMN_TODO;

const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("Not Started", COLUMN_TODO),
    ("To Do", COLUMN_TODO),
    ("Todo", COLUMN_TODO),
    ("Backlog", COLUMN_TODO),
    ("Pending", COLUMN_TODO),
    ("In Progress", COLUMN_IN_PROGRESS),
    ("In-Progress", COLUMN_IN_PROGRESS),
    ("Started", COLUMN_IN_PROGRESS),
    ("Doing", COLUMN_IN_PROGRESS),
    ("Review", COLUMN_REVIEW),
    ("In Review", COLUMN_REVIEW),
    ("Under Review", COLUMN_REVIEW),
    ("Complete", COLUMN_DONE),
    ("Completed", COLUMN_DONE),
    ("Done", COLUMN_DONE),
    ("Closed", COLUMN_DONE),
];

/// Case-sensitive alias table with a fallback column.
///
/// Lookup order: a raw value that already names a valid column wins, then
/// the alias table, then the fallback. The fallback never drops a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMapper {
    aliases: HashMap<String, String>,
    default_column: String,
}

impl Default for StatusMapper {
    fn default() -> Self {
        Self {
            aliases: BUILTIN_ALIASES
                .iter()
                .map(|(alias, column)| ((*alias).to_string(), (*column).to_string()))
                .collect(),
            default_column: DEFAULT_COLUMN.to_string(),
        }
    }
}

impl StatusMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layers extra aliases over the built-in table; later entries win.
    pub fn with_aliases<I, K, V>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (alias, column) in aliases {
            self.aliases.insert(alias.into(), column.into());
        }
        self
    }

    pub fn with_default_column(mut self, column: impl Into<String>) -> Self {
        self.default_column = column.into();
        self
    }

    pub fn default_column(&self) -> &str {
        &self.default_column
    }

    /// True when `raw` resolves without hitting the fallback.
    pub fn is_known<S: AsRef<str>>(&self, raw: &str, valid_ids: &[S]) -> bool {
        contains(valid_ids, raw)
            || self
                .aliases
                .get(raw)
                .is_some_and(|column| contains(valid_ids, column))
    }

    pub fn map_status<S: AsRef<str>>(&self, raw: Option<&str>, valid_ids: &[S]) -> String {
        let raw = match raw {
            Some(value) if !value.is_empty() => value,
            _ => {
                warn!("task has no status; using fallback column");
                return self.fallback(valid_ids);
            }
        };

        if contains(valid_ids, raw) {
            return raw.to_string();
        }

        if let Some(column) = self.aliases.get(raw) {
            if contains(valid_ids, column) {
                return column.clone();
            }
            warn!(
                status = raw,
                column = column.as_str(),
                "status alias targets a column that is not on the board"
            );
        } else {
            warn!(status = raw, "unmapped task status; using fallback column");
        }

        self.fallback(valid_ids)
    }

    fn fallback<S: AsRef<str>>(&self, valid_ids: &[S]) -> String {
        if valid_ids.is_empty() || contains(valid_ids, &self.default_column) {
            return self.default_column.clone();
        }
        warn!(
            default_column = self.default_column.as_str(),
            "fallback column is not on the board; using first column"
        );
        valid_ids[0].as_ref().to_string()
    }
}

fn contains<S: AsRef<str>>(valid_ids: &[S], needle: &str) -> bool {
    valid_ids.iter().any(|id| id.as_ref() == needle)
}
