use std::path::Path;

use serde_json::{json, Value};

use sift::store;
use sift::types::ItemType;

fn write_extraction(data_dir: &Path, id: &str, body: Value) {
    let dir = store::extractions_dir(data_dir);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join(format!("{id}.json")),
        serde_json::to_string_pretty(&body).unwrap(),
    )
    .unwrap();
}

fn good_extraction(id: &str, date: &str) -> Value {
    json!({
        "conversation_id": id,
        "conversation_title": format!("About {id}"),
        "conversation_date": date,
        "extraction": {
            "project_ideas": [
                {"idea": format!("idea from {id}"), "motivation": "scratch an itch", "detail_level": "vague"}
            ],
            "problems": [
                {"problem": format!("problem from {id}"), "context": "daily work"}
            ],
            "workflows": [],
            "tools_explored": ["ripgrep", "just"],
            "emotional_signals": {"tone": "curious", "notes": "poking around"}
        }
    })
}

#[test]
fn load_skips_manifest_failed_and_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path();

    write_extraction(data_dir, "c1", good_extraction("c1", "2024-01-10"));
    write_extraction(data_dir, "c2", json!({
        "conversation_id": "c2",
        "extraction": {"error": "rate limited"}
    }));
    write_extraction(data_dir, "c3", json!({
        "conversation_id": "c3",
        "extraction": {"empty": true, "reason": "nothing extractable"}
    }));
    write_extraction(data_dir, "_manifest", json!({"conversations": []}));
    std::fs::write(
        store::extractions_dir(data_dir).join("broken.json"),
        "{not json",
    )
    .unwrap();

    let loaded = store::load_extractions(data_dir).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].conversation_id.as_deref(), Some("c1"));
}

#[test]
fn load_missing_directory_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    assert!(store::load_extractions(dir.path()).unwrap().is_empty());
}

#[test]
fn collect_items_enriches_provenance() {
    let dir = tempfile::tempdir().unwrap();
    write_extraction(dir.path(), "c1", good_extraction("c1", "2024-01-10"));
    write_extraction(dir.path(), "c2", good_extraction("c2", "2024-02-20"));

    let loaded = store::load_extractions(dir.path()).unwrap();
    let ideas = store::collect_items(&loaded, ItemType::Ideas);
    assert_eq!(ideas.len(), 2);
    for idea in &ideas {
        let id = idea["_source_id"].as_str().unwrap();
        assert!(id.starts_with('c'));
        assert_eq!(idea["_source_title"], format!("About {id}"));
        assert!(idea["_source_date"].is_string());
        assert!(idea["motivation"].is_string());
    }

    let workflows = store::collect_items(&loaded, ItemType::Workflows);
    assert!(workflows.is_empty());
}

#[test]
fn collect_tools_counts_across_extractions() {
    let dir = tempfile::tempdir().unwrap();
    write_extraction(dir.path(), "c1", good_extraction("c1", "2024-01-10"));
    write_extraction(dir.path(), "c2", good_extraction("c2", "2024-02-20"));

    let loaded = store::load_extractions(dir.path()).unwrap();
    let tools = store::collect_tools(&loaded);
    assert_eq!(tools.get("ripgrep"), Some(&2));
    assert_eq!(tools.get("just"), Some(&2));
}

#[test]
fn collect_emotions_sorted_by_date() {
    let dir = tempfile::tempdir().unwrap();
    write_extraction(dir.path(), "late", good_extraction("late", "2024-06-01"));
    write_extraction(dir.path(), "early", good_extraction("early", "2024-01-01"));
    // No tone, must be skipped.
    write_extraction(dir.path(), "mute", json!({
        "conversation_id": "mute",
        "conversation_date": "2024-03-01",
        "extraction": {"emotional_signals": {"notes": "nothing"}}
    }));

    let loaded = store::load_extractions(dir.path()).unwrap();
    let emotions = store::collect_emotions(&loaded);
    assert_eq!(emotions.len(), 2);
    assert_eq!(emotions[0].conversation_id, "early");
    assert_eq!(emotions[1].conversation_id, "late");
    assert_eq!(emotions[0].tone, "curious");
}

#[test]
fn save_consolidated_round_trips() {
    use sift::types::{ConsolidatedData, RawCounts, RunMetadata};

    let dir = tempfile::tempdir().unwrap();
    let data = ConsolidatedData {
        idea_clusters: vec![json!({"name": "cli tools", "occurrences": 3, "source_ids": ["a", "b", "c"]})],
        problem_clusters: vec![],
        workflow_clusters: vec![],
        tool_frequency: [("ripgrep".to_string(), 2u32)].into_iter().collect(),
        emotional_timeline: vec![],
        metadata: RunMetadata {
            source_extractions: 3,
            consolidated_at_ms: 1_700_000_000_000,
            raw_counts: RawCounts {
                ideas: 5,
                problems: 0,
                workflows: 0,
            },
        },
    };

    let path = store::save_consolidated(dir.path(), &data).unwrap();
    assert_eq!(path, store::output_path(dir.path()));

    let v: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(v["idea_clusters"][0]["name"], "cli tools");
    assert_eq!(v["tool_frequency"]["ripgrep"], 2);
    assert_eq!(v["metadata"]["raw_counts"]["ideas"], 5);
}
