//! Item-type metadata and the structural glue between records and clusters.
//!
//! Records and clusters both travel through the engine as `serde_json::Value`
//! objects: after the first consolidation pass the working set is a mix of
//! the two, and the oracle consumes either shape. Records carry provenance
//! under `_source_id` / `_source_date` / `_source_title`; clusters carry a
//! `source_ids` list of everything they absorbed.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};

use crate::thresholds::{IDEAS_RANGE, NAME_CLIP, PROBLEMS_RANGE, WORKFLOWS_RANGE};
use crate::util::clip;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    Ideas,
    Problems,
    Workflows,
}

impl ItemType {
    /// Field in an extraction document that holds this type's raw items.
    pub fn source_field(self) -> &'static str {
        match self {
            ItemType::Ideas => "project_ideas",
            ItemType::Problems => "problems",
            ItemType::Workflows => "workflows",
        }
    }

    /// Field in a raw record that holds its primary text.
    pub fn text_field(self) -> &'static str {
        match self {
            ItemType::Ideas => "idea",
            ItemType::Problems => "problem",
            ItemType::Workflows => "workflow",
        }
    }

    /// Field in a raw record that holds the per-mention detail, and the
    /// cluster field those details merge into.
    fn merged_detail(self) -> (&'static str, &'static str) {
        match self {
            ItemType::Ideas => ("motivation", "motivations"),
            ItemType::Problems => ("context", "contexts"),
            ItemType::Workflows => ("status", "statuses"),
        }
    }

    /// Capitalized form for user-visible status messages.
    pub fn label(self) -> &'static str {
        match self {
            ItemType::Ideas => "Ideas",
            ItemType::Problems => "Problems",
            ItemType::Workflows => "Workflows",
        }
    }

    pub fn prompt(self) -> &'static str {
        match self {
            ItemType::Ideas => crate::prompts::IDEAS_PROMPT,
            ItemType::Problems => crate::prompts::PROBLEMS_PROMPT,
            ItemType::Workflows => crate::prompts::WORKFLOWS_PROMPT,
        }
    }

    /// Portion of the overall progress bar assigned to this type.
    pub fn progress_range(self) -> (f64, f64) {
        match self {
            ItemType::Ideas => IDEAS_RANGE,
            ItemType::Problems => PROBLEMS_RANGE,
            ItemType::Workflows => WORKFLOWS_RANGE,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemType::Ideas => "ideas",
            ItemType::Problems => "problems",
            ItemType::Workflows => "workflows",
        };
        f.write_str(s)
    }
}

/// All provenance ids reachable from one working-set item: a cluster's
/// `source_ids` list, or a raw record's own `_source_id`.
pub fn source_ids(item: &Value) -> Vec<String> {
    if let Some(ids) = item.get("source_ids").and_then(Value::as_array) {
        return ids
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
    }
    item.get("_source_id")
        .and_then(Value::as_str)
        .map(|s| vec![s.to_string()])
        .unwrap_or_default()
}

/// Wrap one record as a single-item cluster. Used when retry-by-halving hits
/// the floor: the record passes through unmerged so nothing is lost.
pub fn passthrough_cluster(record: &Value, item_type: ItemType) -> Value {
    // Already cluster-shaped (a later pass re-feeding earlier output),
    // so keep as is.
    if record.get("source_ids").is_some() {
        return record.clone();
    }

    let text = record
        .get(item_type.text_field())
        .and_then(Value::as_str)
        .unwrap_or("");
    let date = record
        .get("_source_date")
        .and_then(Value::as_str)
        .unwrap_or("");
    let id = record.get("_source_id").and_then(Value::as_str).unwrap_or("");

    let mut cluster = json!({
        "name": clip(text, NAME_CLIP),
        "description": text,
        "occurrences": 1,
        "date_range": [date, date],
        "source_ids": [id],
    });

    let (detail_field, merged_field) = item_type.merged_detail();
    if let Some(detail) = record.get(detail_field) {
        cluster[merged_field] = json!([detail]);
    }

    cluster
}

/// A dated emotional-tone entry collected across extractions.
#[derive(Debug, Clone, Serialize)]
pub struct EmotionalSignal {
    pub conversation_id: String,
    pub date: String,
    pub title: String,
    pub tone: String,
    pub notes: String,
}

#[derive(Debug, Serialize)]
pub struct RawCounts {
    pub ideas: usize,
    pub problems: usize,
    pub workflows: usize,
}

#[derive(Debug, Serialize)]
pub struct RunMetadata {
    pub source_extractions: usize,
    pub consolidated_at_ms: i64,
    pub raw_counts: RawCounts,
}

/// The final output document handed to the categorization stage.
#[derive(Debug, Serialize)]
pub struct ConsolidatedData {
    pub idea_clusters: Vec<Value>,
    pub problem_clusters: Vec<Value>,
    pub workflow_clusters: Vec<Value>,
    pub tool_frequency: BTreeMap<String, u32>,
    pub emotional_timeline: Vec<EmotionalSignal>,
    pub metadata: RunMetadata,
}
