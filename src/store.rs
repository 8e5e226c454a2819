//! Extraction documents on disk: loading, provenance enrichment, and the
//! consolidated output file.
//!
//! Layout under the data directory:
//!   extractions/<conversation_id>.json   one extraction per conversation
//!   extractions/_manifest.json           upstream bookkeeping, ignored here
//!   consolidated/consolidated.json       this stage's output
//!   consolidation_status.json            progress record for the poller

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::SiftError;
use crate::types::{ConsolidatedData, EmotionalSignal, ItemType};

#[derive(Debug, Clone, Deserialize)]
pub struct Extraction {
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub conversation_title: Option<String>,
    #[serde(default)]
    pub conversation_date: Option<String>,
    #[serde(default)]
    pub extraction: Value,
}

impl Extraction {
    /// Failed or empty extractions carry nothing to consolidate.
    fn is_usable(&self) -> bool {
        let err = self.extraction.get("error").is_some_and(|v| !v.is_null());
        let empty = self
            .extraction
            .get("empty")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        !err && !empty
    }
}

pub fn extractions_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("extractions")
}

pub fn status_path(data_dir: &Path) -> PathBuf {
    data_dir.join("consolidation_status.json")
}

pub fn output_path(data_dir: &Path) -> PathBuf {
    data_dir.join("consolidated").join("consolidated.json")
}

/// Load every usable extraction from `<data_dir>/extractions/`.
/// Unreadable files are skipped with a warning rather than aborting the run.
pub fn load_extractions(data_dir: &Path) -> Result<Vec<Extraction>, SiftError> {
    let dir = extractions_dir(data_dir);
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    let mut entries: Vec<PathBuf> = std::fs::read_dir(&dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .filter(|p| p.file_name().map_or(true, |n| n != "_manifest.json"))
        .collect();
    entries.sort();

    for path in entries {
        let raw = match std::fs::read_to_string(&path) {
            Ok(r) => r,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable extraction");
                continue;
            }
        };
        match serde_json::from_str::<Extraction>(&raw) {
            Ok(ext) if ext.is_usable() => out.push(ext),
            Ok(_) => debug!(path = %path.display(), "skipping failed/empty extraction"),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping malformed extraction");
            }
        }
    }

    Ok(out)
}

/// Collect all raw items of one type across extractions, stamping each with
/// its conversation's provenance.
pub fn collect_items(extractions: &[Extraction], item_type: ItemType) -> Vec<Value> {
    let mut items = Vec::new();
    for ext in extractions {
        let Some(list) = ext
            .extraction
            .get(item_type.source_field())
            .and_then(Value::as_array)
        else {
            continue;
        };
        for item in list {
            let mut enriched = item.clone();
            if let Some(obj) = enriched.as_object_mut() {
                obj.insert("_source_id".into(), json!(ext.conversation_id));
                obj.insert("_source_date".into(), json!(ext.conversation_date));
                obj.insert("_source_title".into(), json!(ext.conversation_title));
            }
            items.push(enriched);
        }
    }
    items
}

/// Tool mention frequency across all extractions.
pub fn collect_tools(extractions: &[Extraction]) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    for ext in extractions {
        let Some(tools) = ext
            .extraction
            .get("tools_explored")
            .and_then(Value::as_array)
        else {
            continue;
        };
        for tool in tools.iter().filter_map(Value::as_str) {
            *counts.entry(tool.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

/// Emotional signals with dates, sorted chronologically for the timeline.
pub fn collect_emotions(extractions: &[Extraction]) -> Vec<EmotionalSignal> {
    let mut emotions: Vec<EmotionalSignal> = Vec::new();
    for ext in extractions {
        let signals = ext.extraction.get("emotional_signals");
        let Some(tone) = signals
            .and_then(|s| s.get("tone"))
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
        else {
            continue;
        };
        let notes = signals
            .and_then(|s| s.get("notes"))
            .and_then(Value::as_str)
            .unwrap_or("");
        emotions.push(EmotionalSignal {
            conversation_id: ext.conversation_id.clone().unwrap_or_default(),
            date: ext.conversation_date.clone().unwrap_or_default(),
            title: ext.conversation_title.clone().unwrap_or_default(),
            tone: tone.to_string(),
            notes: notes.to_string(),
        });
    }
    emotions.sort_by(|a, b| a.date.cmp(&b.date));
    emotions
}

/// Write the consolidated document, creating the output directory.
pub fn save_consolidated(data_dir: &Path, data: &ConsolidatedData) -> Result<PathBuf, SiftError> {
    let path = output_path(data_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, serde_json::to_vec_pretty(data)?)?;
    Ok(path)
}
