//! JSON board documents used by the command line front end

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::types::{Column, Task};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BoardFile {
    /// Empty when the document does not define its own columns.
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl BoardFile {
    pub fn columns_or<'a>(&'a self, fallback: &'a [Column]) -> &'a [Column] {
        if self.columns.is_empty() {
            fallback
        } else {
            &self.columns
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read board file '{}'", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse board file '{}'", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents =
            serde_json::to_string_pretty(self).context("failed to serialize board to JSON")?;
        let file_name = path
            .file_name()
            .ok_or_else(|| anyhow!("invalid board file path '{}'", path.display()))?
            .to_string_lossy()
            .to_string();
        let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

        fs::write(&tmp_path, contents).with_context(|| {
            format!(
                "failed to write temporary board file '{}'",
                tmp_path.display()
            )
        })?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "failed to rename board file '{}' to '{}'",
                tmp_path.display(),
                path.display()
            )
        })?;
        Ok(())
    }
}
