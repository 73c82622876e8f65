mod batch;
mod rules;
mod target;

pub use batch::{purge_list, PurgeTally};
pub use rules::{cutoff, stage_destination, PurgeAction, PurgeRules};
pub use target::{PurgeOutcome, PurgeTarget};
