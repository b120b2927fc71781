//! Board UI preferences persisted between sessions

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Priority;

pub const UI_STATE_KEY: &str = "taskboard.ui-state";
pub const UI_STATE_VERSION: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Board,
    List,
    Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Order,
    Priority,
    DueDate,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Filters {
    pub search: String,
    pub assignee: Option<String>,
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
    pub show_archived: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub collapsed_columns: Vec<String>,
    pub side_panel_open: bool,
    pub compact_cards: bool,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            collapsed_columns: Vec::new(),
            side_panel_open: true,
            compact_cards: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub show_subtasks: bool,
    pub show_tags: bool,
    pub confirm_archive: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            show_subtasks: true,
            show_tags: true,
            confirm_archive: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiState {
    pub version: u64,
    pub view_mode: ViewMode,
    pub filters: Filters,
    pub sort: Sort,
    pub layout: Layout,
    pub preferences: Preferences,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            version: UI_STATE_VERSION,
            view_mode: ViewMode::default(),
            filters: Filters::default(),
            sort: Sort::default(),
            layout: Layout::default(),
            preferences: Preferences::default(),
        }
    }
}

/// Upgrades v1 payloads (camelCase keys, flat `sortBy`/`sortDir`) to v2.
pub fn migrate_ui_state(mut value: Value) -> Result<Value, String> {
    let Some(object) = value.as_object_mut() else {
        return Err("ui state must be a JSON object".to_string());
    };

    let version = match object.get("version") {
        None => 1,
        Some(raw) => raw
            .as_u64()
            .ok_or_else(|| format!("invalid ui state version: {raw}"))?,
    };

    if version > UI_STATE_VERSION {
        return Err(format!(
            "ui state version {version} is newer than supported version {UI_STATE_VERSION}"
        ));
    }
    if version == UI_STATE_VERSION {
        return Ok(value);
    }

    if let Some(mode) = object.remove("viewMode") {
        object.insert("view_mode".to_string(), mode);
    }

    let field = object.remove("sortBy");
    let direction = object.remove("sortDir");
    if field.is_some() || direction.is_some() {
        let mut sort = serde_json::Map::new();
        if let Some(field) = field {
            sort.insert("field".to_string(), field);
        }
        if let Some(direction) = direction {
            sort.insert("direction".to_string(), direction);
        }
        object.insert("sort".to_string(), Value::Object(sort));
    }

    object.insert("version".to_string(), Value::from(UI_STATE_VERSION));
    Ok(value)
}

pub fn validate_ui_state(value: &Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    object.get("version").is_none_or(Value::is_u64)
        && object.get("view_mode").is_none_or(Value::is_string)
}
