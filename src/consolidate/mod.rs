//! The consolidation engine: a convergence loop per item type plus the
//! full-run pipeline that feeds it.
//!
//! Each pass batches the working set, asks the oracle to merge each batch,
//! and concatenates the results. When a pass yields no net reduction the set
//! has stabilized; a pass cap bounds runtime against an oracle that never
//! stabilizes. Once the set fits in one batch, a single final call finishes
//! the type.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, warn};

mod batch;
pub use batch::{consolidate_batch_with_retry, split_batches};

use crate::config::Config;
use crate::error::SiftError;
use crate::oracle::Oracle;
use crate::progress::{weighted_batch_pct, ProgressTracker};
use crate::rate::RateLimiter;
use crate::store;
use crate::thresholds::MAX_PASSES;
use crate::types::{ConsolidatedData, ItemType, RawCounts, RunMetadata};
use crate::util::now_ms;

pub struct Engine<'a> {
    oracle: &'a dyn Oracle,
    limiter: RateLimiter,
    tracker: &'a ProgressTracker,
}

impl<'a> Engine<'a> {
    pub fn new(oracle: &'a dyn Oracle, limiter: RateLimiter, tracker: &'a ProgressTracker) -> Self {
        Self {
            oracle,
            limiter,
            tracker,
        }
    }

    /// Repeatedly batch and merge `items` until the oracle stops reducing
    /// the set. `range` is this item type's slice of the overall progress
    /// bar.
    pub async fn consolidate_all(
        &self,
        items: Vec<Value>,
        item_type: ItemType,
        batch_size: usize,
        range: (f64, f64),
    ) -> Result<Vec<Value>, SiftError> {
        if items.is_empty() {
            return Ok(items);
        }

        let (_, end_pct) = range;
        let mut current = items;
        let mut iteration: u32 = 1;

        loop {
            debug!(%item_type, iteration, items = current.len(), "consolidation pass");

            // Small enough for one call: the common terminal case.
            if current.len() <= batch_size {
                self.tracker.update(
                    &format!("Final pass: {} {item_type}", current.len()),
                    Some(end_pct - 2.0),
                );
                let consolidated = batch::consolidate_batch_with_retry(
                    self.oracle,
                    &self.limiter,
                    &current,
                    item_type,
                )
                .await?;
                info!(
                    %item_type,
                    from = current.len(),
                    to = consolidated.len(),
                    "final pass complete"
                );
                return Ok(consolidated);
            }

            let batches = batch::split_batches(&current, batch_size);
            let total_batches = batches.len();
            let mut consolidated = Vec::new();

            for (i, b) in batches.iter().enumerate() {
                self.tracker.update(
                    &format!(
                        "{} pass {iteration}: batch {}/{total_batches}",
                        item_type.label(),
                        i + 1
                    ),
                    Some(weighted_batch_pct(range, iteration, i, total_batches)),
                );
                let result =
                    batch::consolidate_batch_with_retry(self.oracle, &self.limiter, b, item_type)
                        .await?;
                consolidated.extend(result);
            }

            info!(
                %item_type,
                iteration,
                from = current.len(),
                to = consolidated.len(),
                "pass complete"
            );

            // No net reduction, so further passes can't help. Equality counts
            // as non-progress; continuing would leave termination to the cap.
            if consolidated.len() >= current.len() {
                debug!(%item_type, "stabilized");
                return Ok(consolidated);
            }

            current = consolidated;
            iteration += 1;
            if iteration > MAX_PASSES {
                warn!(%item_type, items = current.len(), "pass limit reached, stopping");
                return Ok(current);
            }
        }
    }
}

/// Run the full consolidation pipeline over the data directory: load
/// extractions, consolidate each item type, write the output document.
/// A fatal error is reported through the tracker before propagating.
pub async fn run_consolidation(
    cfg: &Config,
    oracle: &dyn Oracle,
    tracker: &ProgressTracker,
    data_dir: &Path,
) -> Result<ConsolidatedData, SiftError> {
    match run_inner(cfg, oracle, tracker, data_dir).await {
        Ok(data) => Ok(data),
        Err(e) => {
            tracker.fail(&format!("Error: {e}"));
            Err(e)
        }
    }
}

async fn run_inner(
    cfg: &Config,
    oracle: &dyn Oracle,
    tracker: &ProgressTracker,
    data_dir: &Path,
) -> Result<ConsolidatedData, SiftError> {
    tracker.update("Starting consolidation...", Some(0.0));

    let extractions = store::load_extractions(data_dir)?;
    info!(count = extractions.len(), "loaded extractions");

    let mut data = ConsolidatedData {
        idea_clusters: Vec::new(),
        problem_clusters: Vec::new(),
        workflow_clusters: Vec::new(),
        tool_frequency: store::collect_tools(&extractions),
        emotional_timeline: store::collect_emotions(&extractions),
        metadata: RunMetadata {
            source_extractions: extractions.len(),
            consolidated_at_ms: now_ms(),
            raw_counts: RawCounts {
                ideas: 0,
                problems: 0,
                workflows: 0,
            },
        },
    };

    if extractions.is_empty() {
        tracker.complete("No extractions to consolidate");
        return Ok(data);
    }

    tracker.update(
        &format!("Collecting items from {} extractions...", extractions.len()),
        Some(5.0),
    );
    let ideas = store::collect_items(&extractions, ItemType::Ideas);
    let problems = store::collect_items(&extractions, ItemType::Problems);
    let workflows = store::collect_items(&extractions, ItemType::Workflows);
    data.metadata.raw_counts = RawCounts {
        ideas: ideas.len(),
        problems: problems.len(),
        workflows: workflows.len(),
    };

    let total = ideas.len() + problems.len() + workflows.len();
    tracker.update(&format!("Found {total} items to consolidate"), Some(10.0));
    info!(
        ideas = ideas.len(),
        problems = problems.len(),
        workflows = workflows.len(),
        tools = data.tool_frequency.len(),
        emotions = data.emotional_timeline.len(),
        "collected items"
    );

    let engine = Engine::new(
        oracle,
        RateLimiter::from_rpm(cfg.requests_per_minute),
        tracker,
    );

    for (item_type, raw) in [
        (ItemType::Ideas, ideas),
        (ItemType::Problems, problems),
        (ItemType::Workflows, workflows),
    ] {
        if raw.is_empty() {
            continue;
        }
        let range = item_type.progress_range();
        let raw_count = raw.len();
        tracker.update(
            &format!("Consolidating {raw_count} {item_type}..."),
            Some(range.0),
        );

        let clusters = engine
            .consolidate_all(raw, item_type, cfg.batch_size, range)
            .await?;

        tracker.update(
            &format!(
                "{}: {raw_count} -> {} clusters",
                item_type.label(),
                clusters.len()
            ),
            Some(range.1),
        );
        match item_type {
            ItemType::Ideas => data.idea_clusters = clusters,
            ItemType::Problems => data.problem_clusters = clusters,
            ItemType::Workflows => data.workflow_clusters = clusters,
        }
    }

    let path = store::save_consolidated(data_dir, &data)?;
    info!(path = %path.display(), "consolidated output written");

    tracker.complete(&format!(
        "Complete: {} ideas, {} problems, {} workflows",
        data.idea_clusters.len(),
        data.problem_clusters.len(),
        data.workflow_clusters.len()
    ));

    Ok(data)
}
