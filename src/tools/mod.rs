//! Maintenance tools
//!
//! Passes run over an already seeded database: glycemic backfill,
//! popularity scoring and compaction, statistics and search.

pub mod backfill;
pub mod optimize;
pub mod search;
pub mod stats;

pub use backfill::{backfill_glycemic, BackfillSummary};
pub use optimize::{optimize, recompute_popularity, OptimizeSummary, POPULAR_TERMS};
pub use search::{search_foods, FoodSummary, SearchFoodsResponse};
pub use stats::{collect_stats, DatabaseStats, GiLevelCounts};
