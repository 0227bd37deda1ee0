use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::analysis::AnalysisResult;

/// Newest-first list of finished analyses, persisted as one JSON array.
///
/// Every write replaces the whole blob; the last writer wins.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries newest first. A missing or unreadable blob reads as empty;
    /// rows that no longer parse are skipped.
    pub fn list(&self) -> Vec<AnalysisResult> {
        let Some(Value::Array(rows)) = read_json(&self.path) else {
            return Vec::new();
        };
        rows.into_iter()
            .filter_map(|row| serde_json::from_value::<AnalysisResult>(row).ok())
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<AnalysisResult> {
        self.list().into_iter().find(|entry| entry.id == id)
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.list().is_empty()
    }

    pub fn prepend(&self, result: &AnalysisResult) -> anyhow::Result<()> {
        let mut rows = vec![serde_json::to_value(result)?];
        if let Some(Value::Array(existing)) = read_json(&self.path) {
            rows.extend(existing);
        }
        write_json(&self.path, &Value::Array(rows))
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        write_json(&self.path, &Value::Array(Vec::new()))
    }
}

fn read_json(path: &Path) -> Option<Value> {
    let raw = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

fn write_json(path: &Path, payload: &Value) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string(payload)?)?;
    Ok(())
}
