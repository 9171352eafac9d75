/// Aggregation Layer
///
/// Turns historical vote change events into the set of active delegators:
///
/// - One concurrent query per configured source
/// - Inclusion predicate on the triggering value, identity extraction
/// - Deduplicated union, fail-fast when any source is unreachable

pub mod aggregator;
pub mod config;
pub mod delegator_set;
pub mod predicate;
pub mod service;

#[cfg(test)]
mod tests;

pub use aggregator::{DelegatorAggregator, ExtractionRule, FoldStats, SourceQuery};
pub use config::{DelegatorsConfigSection, SourceConfig};
pub use delegator_set::DelegatorSet;
pub use predicate::{InclusionPredicate, is_active_delegation};
pub use service::{DelegatorService, DelegatorServiceBuilder};
