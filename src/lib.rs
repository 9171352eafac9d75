// Two-Layer Architecture
pub mod event_source; // Event Source Layer: schemas, filters, log providers
pub mod aggregation;  // Aggregation Layer: delegator discovery and caching service

pub mod error;

// Common utilities and constants
pub mod utils;

// Re-export key components from each layer
pub use event_source::{
    ArgKind, ArgSlot, ArgValue, BlockRange, EventFilter, EventRecord, EventSchema, EventSource,
    InMemoryLogProvider, LogProvider, RpcConfig, RpcLogProvider,
};
pub use aggregation::{
    DelegatorAggregator, DelegatorService, DelegatorServiceBuilder, DelegatorSet, DelegatorsConfigSection,
    ExtractionRule, SourceConfig, SourceQuery, is_active_delegation,
};
pub use error::ScanError;
pub use utils::{CouncilAddress, DelegatorCache, STARTING_BLOCK_NUMBER};
