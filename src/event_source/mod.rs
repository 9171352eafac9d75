/// Event Source Layer
///
/// Read-only access to historical contract logs:
///
/// - Event schemas, filters over indexed arguments and block ranges
/// - Decoded event records with provenance
/// - `LogProvider` implementations: JSON-RPC (`eth_getLogs`) and in-memory

pub mod config;
pub mod filter;
pub mod memory;
pub mod provider;
pub mod record;
pub mod rpc;
pub mod schema;

pub use config::RpcConfig;
pub use filter::{BlockRange, EventFilter};
pub use memory::InMemoryLogProvider;
pub use provider::LogProvider;
pub use record::{ArgValue, EventRecord};
pub use rpc::{RpcLog, RpcLogProvider};
pub use schema::{ArgKind, ArgSlot, EventSchema, EventSource};
