use super::filter::{BlockRange, EventFilter};
use super::provider::LogProvider;
use super::record::{ArgValue, EventRecord};
use super::schema::EventSource;
use crate::error::ScanError;
use alloy_primitives::Address;
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// In-memory [`LogProvider`] with the same filter and range semantics as the
/// RPC provider. Used by tests, benches and local tooling.
#[derive(Debug, Default)]
pub struct InMemoryLogProvider {
    head: AtomicU64,
    // contract address -> emitted logs
    logs: DashMap<Address, Vec<EventRecord>>,
    unreachable: DashSet<Address>,
    queries: AtomicUsize,
}

impl InMemoryLogProvider {
    pub fn new(head: u64) -> Self {
        Self { head: AtomicU64::new(head), ..Default::default() }
    }

    pub fn set_head(&self, head: u64) {
        self.head.store(head, Ordering::Relaxed);
    }

    /// Record a log emitted by `address`. The source label is filled in at query time.
    pub fn push_log(&self, address: Address, block_number: u64, log_index: u64, args: Vec<ArgValue>) {
        let record = EventRecord::new("", address, block_number, log_index, args);
        self.logs.entry(address).or_default().push(record);
    }

    /// Make every query against `address` fail as if the node were down
    pub fn fail_source(&self, address: Address) {
        self.unreachable.insert(address);
    }

    pub fn restore_source(&self, address: Address) {
        self.unreachable.remove(&address);
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    /// A stored log must decode under the source schema, as a node log would
    fn check_shape(source: &EventSource, record: &EventRecord) -> Result<(), ScanError> {
        let schema = &source.schema;
        if record.args.len() != schema.args.len() {
            return Err(ScanError::schema_mismatch(
                &source.label,
                format!(
                    "log at {:?} has {} arguments, {} declares {}",
                    record.position(),
                    record.args.len(),
                    schema.name,
                    schema.args.len()
                ),
            ));
        }
        for (slot, value) in schema.args.iter().zip(&record.args) {
            if value.kind() != slot.kind {
                return Err(ScanError::schema_mismatch(
                    &source.label,
                    format!("log at {:?} has {} in {} slot '{}'", record.position(), value.kind(), slot.kind, slot.name),
                ));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LogProvider for InMemoryLogProvider {
    async fn chain_head(&self) -> Result<u64, ScanError> {
        Ok(self.head.load(Ordering::Relaxed))
    }

    async fn query_logs(
        &self,
        source: &EventSource,
        filter: &EventFilter,
        range: BlockRange,
    ) -> Result<Vec<EventRecord>, ScanError> {
        filter.validate(source)?;
        self.queries.fetch_add(1, Ordering::Relaxed);

        if self.unreachable.contains(&source.address) {
            return Err(ScanError::unreachable(&source.label, "connection refused"));
        }

        let Some((from_block, to_block)) = range.resolve(self.chain_head().await?) else {
            return Ok(Vec::new());
        };

        let mut records = Vec::new();
        if let Some(logs) = self.logs.get(&source.address) {
            for record in logs.iter().filter(|record| (from_block..=to_block).contains(&record.block_number)) {
                Self::check_shape(source, record)?;
                if filter.matches(source, record) {
                    records.push(EventRecord { source_label: source.label.clone(), ..record.clone() });
                }
            }
        }

        records.sort_by_key(EventRecord::position);
        Ok(records)
    }
}
