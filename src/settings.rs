use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::persistence::{
    DEFAULT_BREAKER_COOLDOWN_MS, DEFAULT_BREAKER_THRESHOLD, DEFAULT_BREAKER_WINDOW_MS,
    DEFAULT_DEBOUNCE_MS, PersistenceConfig,
};
use crate::status::{DEFAULT_COLUMN, StatusMapper};
use crate::types::{Column, default_columns};

const MIN_DEBOUNCE_MS: u64 = 0;
const MAX_DEBOUNCE_MS: u64 = 10_000;
const MIN_BREAKER_THRESHOLD: usize = 2;
const MAX_BREAKER_THRESHOLD: usize = 1_000;
const MIN_BREAKER_WINDOW_MS: u64 = 10;
const MAX_BREAKER_WINDOW_MS: u64 = 10_000;
const MIN_BREAKER_COOLDOWN_MS: u64 = 100;
const MAX_BREAKER_COOLDOWN_MS: u64 = 600_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub persistence: PersistenceSettings,
    pub status: StatusSettings,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceSettings {
    pub debounce_ms: u64,
    pub breaker_threshold: usize,
    pub breaker_window_ms: u64,
    pub breaker_cooldown_ms: u64,
    pub state_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusSettings {
    pub default_column: String,
    pub aliases: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            persistence: PersistenceSettings::default(),
            status: StatusSettings::default(),
            columns: default_columns(),
        }
    }
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            breaker_threshold: DEFAULT_BREAKER_THRESHOLD,
            breaker_window_ms: DEFAULT_BREAKER_WINDOW_MS,
            breaker_cooldown_ms: DEFAULT_BREAKER_COOLDOWN_MS,
            state_dir: None,
        }
    }
}

impl Default for StatusSettings {
    fn default() -> Self {
        Self {
            default_column: DEFAULT_COLUMN.to_string(),
            aliases: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("taskboard");
        path.push("settings.toml");
        Some(path)
    }

    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(mut settings) => {
                    settings.validate();
                    settings
                }
                Err(error) => {
                    warn!(
                        "failed to parse settings config '{}': {}",
                        path.display(),
                        error
                    );
                    Self::default()
                }
            },
            Err(error) => {
                warn!(
                    "failed to read settings config '{}': {}",
                    path.display(),
                    error
                );
                Self::default()
            }
        }
    }

    pub fn save_to_path(&self, path: &Path) -> anyhow::Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow!("invalid settings config path"))?;
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory '{}'", parent.display()))?;

        let mut validated = self.clone();
        validated.validate();
        let contents =
            toml::to_string_pretty(&validated).context("failed to serialize settings to TOML")?;

        let file_name = path
            .file_name()
            .ok_or_else(|| anyhow!("invalid settings config file name"))?
            .to_string_lossy()
            .to_string();
        let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

        fs::write(&tmp_path, contents).with_context(|| {
            format!(
                "failed to write temporary settings file '{}'",
                tmp_path.display()
            )
        })?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "failed to rename settings file '{}' to '{}'",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }

    pub fn persistence_config(&self) -> PersistenceConfig {
        PersistenceConfig {
            debounce: Duration::from_millis(self.persistence.debounce_ms),
            breaker_threshold: self.persistence.breaker_threshold,
            breaker_window: Duration::from_millis(self.persistence.breaker_window_ms),
            breaker_cooldown: Duration::from_millis(self.persistence.breaker_cooldown_ms),
        }
    }

    pub fn status_mapper(&self) -> StatusMapper {
        StatusMapper::new()
            .with_aliases(self.status.aliases.clone())
            .with_default_column(self.status.default_column.clone())
    }

    fn validate(&mut self) {
        let persistence = &mut self.persistence;
        persistence.debounce_ms = persistence
            .debounce_ms
            .clamp(MIN_DEBOUNCE_MS, MAX_DEBOUNCE_MS);
        persistence.breaker_threshold = persistence
            .breaker_threshold
            .clamp(MIN_BREAKER_THRESHOLD, MAX_BREAKER_THRESHOLD);
        persistence.breaker_window_ms = persistence
            .breaker_window_ms
            .clamp(MIN_BREAKER_WINDOW_MS, MAX_BREAKER_WINDOW_MS);
        persistence.breaker_cooldown_ms = persistence
            .breaker_cooldown_ms
            .clamp(MIN_BREAKER_COOLDOWN_MS, MAX_BREAKER_COOLDOWN_MS);

        let mut seen = Vec::new();
        self.columns.retain(|column| {
            let id = column.id.trim();
            if id.is_empty() || seen.iter().any(|existing: &String| existing == id) {
                warn!(
                    "ignoring empty or duplicate column id '{}' in settings config",
                    column.id
                );
                return false;
            }
            seen.push(id.to_string());
            true
        });
        if self.columns.is_empty() {
            warn!("settings config defines no columns; falling back to the default board");
            self.columns = default_columns();
        }

        let column_ids: Vec<&str> = self.columns.iter().map(|c| c.id.as_str()).collect();
        if !column_ids.contains(&self.status.default_column.as_str()) {
            let fallback = column_ids[0].to_string();
            warn!(
                "default_column '{}' is not a configured column; falling back to {}",
                self.status.default_column, fallback
            );
            self.status.default_column = fallback;
        }

        self.status.aliases.retain(|alias, column| {
            let known = column_ids.contains(&column.as_str());
            if !known {
                warn!(
                    "status alias '{}' targets unknown column '{}'; ignoring",
                    alias, column
                );
            }
            known
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings_file_path(temp_dir: &TempDir) -> PathBuf {
        temp_dir.path().join("taskboard").join("settings.toml")
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.persistence.debounce_ms, 300);
        assert_eq!(settings.persistence.breaker_threshold, 10);
        assert_eq!(settings.persistence.breaker_window_ms, 100);
        assert_eq!(settings.persistence.breaker_cooldown_ms, 5_000);
        assert_eq!(settings.status.default_column, "todo");
        assert_eq!(settings.columns, default_columns());
        assert_eq!(settings.persistence_config(), PersistenceConfig::default());
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().expect("tempdir");
        let settings = Settings::load_from_path(&settings_file_path(&temp_dir));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_malformed_toml() {
        let temp_dir = TempDir::new().expect("tempdir");
        let path = settings_file_path(&temp_dir);
        fs::create_dir_all(path.parent().expect("settings path should have parent"))
            .expect("failed to create config dir");
        fs::write(&path, "[persistence]\ndebounce_ms = [invalid")
            .expect("failed to write malformed settings");

        assert_eq!(Settings::load_from_path(&path), Settings::default());
    }

    #[test]
    fn test_load_partial_toml() {
        let temp_dir = TempDir::new().expect("tempdir");
        let path = settings_file_path(&temp_dir);
        fs::create_dir_all(path.parent().expect("settings path should have parent"))
            .expect("failed to create config dir");
        fs::write(
            &path,
            "[persistence]\ndebounce_ms = 500\n\n[status.aliases]\nBlocked = \"review\"\n",
        )
        .expect("failed to write partial settings");

        let settings = Settings::load_from_path(&path);
        assert_eq!(settings.persistence.debounce_ms, 500);
        assert_eq!(settings.persistence.breaker_threshold, 10);
        assert_eq!(settings.columns, default_columns());

        let mapper = settings.status_mapper();
        assert_eq!(
            mapper.map_status(Some("Blocked"), &["todo", "review"]),
            "review"
        );
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().expect("tempdir");
        let path = settings_file_path(&temp_dir);
        let mut expected = Settings::default();
        expected.persistence.debounce_ms = 150;
        expected.columns[0] = expected.columns[0].clone().with_wip_limit(4);
        expected
            .status
            .aliases
            .insert("Shipped".to_string(), "done".to_string());

        expected.save_to_path(&path).expect("save settings");
        assert_eq!(Settings::load_from_path(&path), expected);
        assert!(!path.with_file_name(".settings.toml.tmp").exists());
    }

    #[test]
    fn test_validate_clamps_values() {
        let mut settings = Settings::default();
        settings.persistence.debounce_ms = u64::MAX;
        settings.persistence.breaker_threshold = 0;
        settings.persistence.breaker_window_ms = 1;
        settings.persistence.breaker_cooldown_ms = u64::MAX;

        settings.validate();

        assert_eq!(settings.persistence.debounce_ms, MAX_DEBOUNCE_MS);
        assert_eq!(settings.persistence.breaker_threshold, MIN_BREAKER_THRESHOLD);
        assert_eq!(settings.persistence.breaker_window_ms, MIN_BREAKER_WINDOW_MS);
        assert_eq!(
            settings.persistence.breaker_cooldown_ms,
            MAX_BREAKER_COOLDOWN_MS
        );
    }

    #[test]
    fn test_validate_columns_and_default() {
        let mut settings = Settings {
            columns: vec![
                Column::new("backlog", "Backlog", "#111"),
                Column::new("backlog", "Dup", "#222"),
                Column::new("  ", "Blank", "#333"),
                Column::new("shipped", "Shipped", "#444"),
            ],
            ..Settings::default()
        };
        settings
            .status
            .aliases
            .insert("Done".to_string(), "done".to_string());

        settings.validate();

        let ids: Vec<&str> = settings.columns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["backlog", "shipped"]);
        assert_eq!(settings.status.default_column, "backlog");
        assert!(settings.status.aliases.is_empty());
    }

    #[test]
    fn test_validate_empty_columns_restores_default_board() {
        let mut settings = Settings {
            columns: Vec::new(),
            ..Settings::default()
        };
        settings.validate();
        assert_eq!(settings.columns, default_columns());
    }
}
