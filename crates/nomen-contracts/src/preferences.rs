use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::input::UserInput;

const THEME_KEY: &str = "theme";
const DRAFT_KEY: &str = "draft";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(format!("Unknown theme '{other}'; expected dark or light.")),
        }
    }
}

/// Small key-value file for UI preferences and the input draft.
///
/// Reads always go to disk so two handles on the same file agree; writes
/// merge only the touched key into the current file contents.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        read_json_object(&self.path)?.get(key).cloned()
    }

    pub fn set(&self, key: &str, value: Value) -> anyhow::Result<()> {
        let mut on_disk = read_json_object(&self.path).unwrap_or_default();
        if on_disk.get(key) == Some(&value) {
            return Ok(());
        }
        on_disk.insert(key.to_string(), value);
        write_json_object(&self.path, &on_disk)
    }

    pub fn remove(&self, key: &str) -> anyhow::Result<()> {
        let Some(mut on_disk) = read_json_object(&self.path) else {
            return Ok(());
        };
        if on_disk.remove(key).is_some() {
            write_json_object(&self.path, &on_disk)?;
        }
        Ok(())
    }

    pub fn theme(&self) -> Theme {
        self.get(THEME_KEY)
            .and_then(|value| value.as_str().and_then(|raw| raw.parse().ok()))
            .unwrap_or_default()
    }

    pub fn set_theme(&self, theme: Theme) -> anyhow::Result<()> {
        self.set(THEME_KEY, Value::String(theme.as_str().to_string()))
    }

    pub fn toggle_theme(&self) -> anyhow::Result<Theme> {
        let next = self.theme().toggled();
        self.set_theme(next)?;
        Ok(next)
    }

    /// Last form contents; unparsable drafts read as absent.
    pub fn draft(&self) -> Option<UserInput> {
        let value = self.get(DRAFT_KEY)?;
        serde_json::from_value(value).ok()
    }

    pub fn save_draft(&self, draft: &UserInput) -> anyhow::Result<()> {
        self.set(DRAFT_KEY, serde_json::to_value(draft)?)
    }

    pub fn clear_draft(&self) -> anyhow::Result<()> {
        self.remove(DRAFT_KEY)
    }
}

fn read_json_object(path: &Path) -> Option<Map<String, Value>> {
    let raw = std::fs::read_to_string(path).ok()?;
    let parsed: Value = serde_json::from_str(&raw).ok()?;
    parsed.as_object().cloned()
}

fn write_json_object(path: &Path, payload: &Map<String, Value>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(
        path,
        serde_json::to_string_pretty(&Value::Object(payload.clone()))?,
    )?;
    Ok(())
}
