mod handle_cache;
mod user_sort;

pub use handle_cache::{
    ledger_path, CacheStats, EvictionKind, EvictionPolicy, InsertionOrder, LeastRecentlyUsed,
    LedgerCache,
};
pub use user_sort::{find_scan_results, MergeSummary, UserSort};
