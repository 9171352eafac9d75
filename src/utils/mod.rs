pub mod cache;
pub mod config_loader;
pub mod constants;

pub use cache::{CacheItem, CacheStats, DelegatorCache};
pub use config_loader::*;
pub use constants::*;
