//! Centralised oracle prompt texts and structured-output schemas.
//!
//! Every prompt and JSON schema the engine sends lives here so they can be
//! audited and tuned in one place. The rest of the codebase imports from
//! `crate::prompts`.

use serde_json::{json, Value};

use crate::types::ItemType;

/// System prompt shared by every consolidation call. For providers without
/// a system role it is prepended to the user message instead.
pub const SYSTEM: &str = "You are a data consolidation assistant. \
    Return only valid JSON arrays. Be concise in descriptions.";

pub const IDEAS_PROMPT: &str = r#"Here are project ideas extracted from multiple conversations over time.
Group them into unique concepts—merge duplicates and near-duplicates that represent the same underlying idea.

For each unique concept, return:
- name: A clear consolidated name
- description: 2-3 sentence synthesis of all mentions
- occurrences: How many times it appeared
- date_range: [earliest_mention, latest_mention]
- evolution: Did it get more specific over time? Note any progression.
- source_ids: List of conversation_ids that contained this idea
- motivations: Combined list of motivations from all mentions
- detail_levels: List of detail levels from each mention

Return as a JSON array. Only return valid JSON, no other text."#;

pub const PROBLEMS_PROMPT: &str = r#"Here are problems/frustrations extracted from multiple conversations over time.
Group them into unique themes—merge duplicates and near-duplicates that represent the same underlying issue.

For each unique theme, return:
- name: A clear consolidated name
- description: 2-3 sentence synthesis of all mentions
- occurrences: How many times it appeared
- date_range: [earliest_mention, latest_mention]
- source_ids: List of conversation_ids that contained this problem
- contexts: Combined list of contexts from all mentions

Return as a JSON array. Only return valid JSON, no other text."#;

pub const WORKFLOWS_PROMPT: &str = r#"Here are workflows/automations extracted from multiple conversations over time.
Group them into unique concepts—merge duplicates and near-duplicates that represent the same workflow.

For each unique concept, return:
- name: A clear consolidated name
- description: 2-3 sentence synthesis of all mentions
- occurrences: How many times it appeared
- date_range: [earliest_mention, latest_mention]
- source_ids: List of conversation_ids that contained this workflow
- statuses: List of statuses from each mention (exploring/building/optimizing)

Return as a JSON array. Only return valid JSON, no other text."#;

/// Render the full user prompt for one batch: instructions plus the
/// serialized items.
pub fn render_batch(item_type: ItemType, items: &[Value]) -> String {
    let items_text = serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".into());
    format!(
        "{}\n\nItems to consolidate:\n{}",
        item_type.prompt(),
        items_text
    )
}

fn cluster_base_properties() -> Value {
    json!({
        "name": { "type": "string", "description": "Clear consolidated name" },
        "description": { "type": "string", "description": "2-3 sentence synthesis" },
        "occurrences": { "type": "integer", "description": "How many times it appeared" },
        "date_range": {
            "type": "array",
            "items": { "type": "string" },
            "description": "[earliest, latest] dates"
        },
        "source_ids": {
            "type": "array",
            "items": { "type": "string" },
            "description": "Conversation IDs containing this item"
        }
    })
}

/// Ollama `format` schema: array of consolidated clusters for `item_type`.
/// Cloud providers get the shape from the prompt text instead.
pub fn cluster_array_schema(item_type: ItemType) -> Value {
    let mut properties = cluster_base_properties();
    let extra = match item_type {
        ItemType::Ideas => json!({
            "evolution": { "type": "string", "description": "How the idea evolved over time" },
            "motivations": { "type": "array", "items": { "type": "string" } },
            "detail_levels": { "type": "array", "items": { "type": "string" } }
        }),
        ItemType::Problems => json!({
            "contexts": { "type": "array", "items": { "type": "string" } }
        }),
        ItemType::Workflows => json!({
            "statuses": { "type": "array", "items": { "type": "string" } }
        }),
    };
    if let (Some(props), Some(more)) = (properties.as_object_mut(), extra.as_object()) {
        for (k, v) in more {
            props.insert(k.clone(), v.clone());
        }
    }

    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": properties,
            "required": ["name", "description", "occurrences", "source_ids"]
        }
    })
}
