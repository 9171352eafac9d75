use super::record::{ArgValue, EventRecord};
use super::schema::EventSource;
use crate::error::ScanError;

/// One entry per indexed slot of the schema: `None` matches anything,
/// `Some(value)` pins the slot to a literal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub entries: Vec<Option<ArgValue>>,
}

impl EventFilter {
    pub fn new(entries: Vec<Option<ArgValue>>) -> Self {
        Self { entries }
    }

    /// Unconstrained filter for a source
    pub fn any(source: &EventSource) -> Self {
        Self { entries: vec![None; source.schema.indexed_count()] }
    }

    pub fn is_wildcard(&self) -> bool {
        self.entries.iter().all(Option::is_none)
    }

    pub fn validate(&self, source: &EventSource) -> Result<(), ScanError> {
        let indexed = source.schema.indexed_positions();
        if self.entries.len() != indexed.len() {
            return Err(ScanError::schema_mismatch(
                &source.label,
                format!(
                    "filter has {} slots but {} declares {} indexed arguments",
                    self.entries.len(),
                    source.schema.name,
                    indexed.len()
                ),
            ));
        }

        for (entry, position) in self.entries.iter().zip(indexed) {
            if let Some(value) = entry {
                let slot = &source.schema.args[position];
                if value.kind() != slot.kind {
                    return Err(ScanError::schema_mismatch(
                        &source.label,
                        format!("filter value for '{}' is {} but slot is {}", slot.name, value.kind(), slot.kind),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Whether a decoded record satisfies every pinned entry.
    /// Assumes the filter was validated against the record's source.
    pub fn matches(&self, source: &EventSource, record: &EventRecord) -> bool {
        self.entries.iter().zip(source.schema.indexed_positions()).all(|(entry, position)| match entry {
            None => true,
            Some(value) => record.arg(position) == Some(value),
        })
    }
}

/// Blocks from `from_block` (inclusive) up to the chain head at query time,
/// or up to `to_block` when it is set and below the head.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlockRange {
    pub from_block: u64,
    pub to_block: Option<u64>,
}

impl BlockRange {
    pub fn from_block(from_block: u64) -> Self {
        Self { from_block, to_block: None }
    }

    pub fn bounded(from_block: u64, to_block: u64) -> Self {
        Self { from_block, to_block: Some(to_block) }
    }

    /// Concrete inclusive bounds against the current head, `None` when empty
    pub fn resolve(&self, head: u64) -> Option<(u64, u64)> {
        let end = self.to_block.map_or(head, |to| to.min(head));
        if self.from_block > end {
            return None;
        }
        Some((self.from_block, end))
    }

    /// Split the resolved range into inclusive pages of at most `page_size` blocks
    pub fn pages(&self, head: u64, page_size: u64) -> Vec<(u64, u64)> {
        let Some((start, end)) = self.resolve(head) else {
            return Vec::new();
        };
        let page_size = page_size.max(1);

        let mut pages = Vec::new();
        let mut page_start = start;
        loop {
            let page_end = page_start.saturating_add(page_size - 1).min(end);
            pages.push((page_start, page_end));
            if page_end >= end {
                break;
            }
            page_start = page_end + 1;
        }
        pages
    }
}
