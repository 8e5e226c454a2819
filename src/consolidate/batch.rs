//! Order-preserving batch splitting and the retry-by-halving executor.
//!
//! Larger batches fail to parse more often, so a failing batch is split at
//! its midpoint and each half retried independently instead of resubmitting
//! the whole thing. Below the floor the records pass through unmerged,
//! degraded but lossless.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::SiftError;
use crate::oracle::Oracle;
use crate::parse;
use crate::prompts;
use crate::rate::RateLimiter;
use crate::thresholds::RETRY_FLOOR;
use crate::types::{passthrough_cluster, ItemType};

/// Partition `items` into ordered chunks of at most `size`. Concatenating
/// the chunks reproduces the original order exactly.
pub fn split_batches<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    items.chunks(size.max(1)).map(<[T]>::to_vec).collect()
}

/// Consolidate one batch, halving on parse failure until the floor.
///
/// Guarantees: every record in `items` is represented in the result (merged
/// into a cluster or passed through), and only transport/auth errors
/// propagate. The rate-limit pause runs after every oracle call, including
/// recursive ones.
pub fn consolidate_batch_with_retry<'a>(
    oracle: &'a dyn Oracle,
    limiter: &'a RateLimiter,
    items: &'a [Value],
    item_type: ItemType,
) -> Pin<Box<dyn Future<Output = Result<Vec<Value>, SiftError>> + Send + 'a>> {
    Box::pin(async move {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        debug!(count = items.len(), %item_type, "consolidating batch");

        let prompt = prompts::render_batch(item_type, items);
        let reply = match oracle.call(&prompt, item_type).await {
            Ok(text) => Some(text),
            Err(e) if e.is_recoverable() => {
                debug!(%item_type, "oracle timeout, treating as parse failure");
                None
            }
            Err(e) => return Err(e),
        };
        limiter.pause().await;

        if let Some(text) = reply {
            if let Some(clusters) = parse::parse_array(&text).filter(|c| !c.is_empty()) {
                check_occurrences(&clusters, items.len(), item_type);
                return Ok(clusters);
            }
        }

        if items.len() <= RETRY_FLOOR {
            warn!(
                count = items.len(),
                %item_type,
                "cannot consolidate batch, keeping originals unmerged"
            );
            return Ok(items
                .iter()
                .map(|r| passthrough_cluster(r, item_type))
                .collect());
        }

        debug!(count = items.len(), %item_type, "unparsable reply, splitting batch");
        let mid = items.len() / 2;
        let mut merged =
            consolidate_batch_with_retry(oracle, limiter, &items[..mid], item_type).await?;
        let right =
            consolidate_batch_with_retry(oracle, limiter, &items[mid..], item_type).await?;
        merged.extend(right);
        Ok(merged)
    })
}

/// Clusters only merge, never fabricate provenance: the occurrences they
/// claim can't exceed the records fed in. Violations are logged and the
/// result kept; semantic validation is not this engine's job.
fn check_occurrences(clusters: &[Value], batch_len: usize, item_type: ItemType) {
    let claimed: u64 = clusters
        .iter()
        .filter_map(|c| c.get("occurrences").and_then(Value::as_u64))
        .sum();
    if claimed > batch_len as u64 {
        warn!(claimed, batch = batch_len, %item_type, "oracle overclaims occurrences");
    }
}
