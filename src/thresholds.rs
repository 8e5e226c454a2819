/// Tuning constants for the consolidation engine.
///
/// Kept in one place so the retry/convergence behavior can be audited
/// without chasing literals through the engine.

/// Minimum batch size for retry-by-halving. At or below this, a failing
/// batch is passed through unmerged instead of split further. The
/// passthrough is part of the no-data-loss contract, not just retry policy.
pub const RETRY_FLOOR: usize = 5;

/// Hard cap on consolidation passes per item type. Bounds runtime against
/// an oracle that reduces by one item forever and never stabilizes.
pub const MAX_PASSES: u32 = 10;

/// Items per oracle call when nothing else is configured.
pub const DEFAULT_BATCH_SIZE: usize = 25;

/// Token budget for one consolidation reply.
pub const ORACLE_MAX_TOKENS: u32 = 8192;

/// Overall progress range assigned to each item type within a run.
/// Collection takes 0-10, the gaps between ranges are the per-type
/// summary updates.
pub const IDEAS_RANGE: (f64, f64) = (15.0, 40.0);
pub const PROBLEMS_RANGE: (f64, f64) = (45.0, 70.0);
pub const WORKFLOWS_RANGE: (f64, f64) = (75.0, 95.0);

/// Cluster names in passthrough fallbacks and log lines get clipped to this.
pub const NAME_CLIP: usize = 80;
