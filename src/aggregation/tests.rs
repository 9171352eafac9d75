/// Integration tests for the aggregation layer
///
/// These drive the in-memory log provider through the delegator scenarios:
/// inclusion and exclusion, deduplication across sources, empty ranges and
/// fail-fast behaviour.

#[cfg(test)]
mod integration_tests {
    use super::super::*;
    use crate::error::ScanError;
    use crate::event_source::{ArgValue, BlockRange, EventFilter, EventSchema, EventSource, InMemoryLogProvider};
    use crate::utils::constants::STARTING_BLOCK_NUMBER;
    use alloy_primitives::{Address, I256};
    use std::collections::HashSet;
    use std::sync::Arc;

    const HEAD: u64 = STARTING_BLOCK_NUMBER + 1_000;

    fn locking_address() -> Address {
        Address::repeat_byte(0x10)
    }

    fn vesting_address() -> Address {
        Address::repeat_byte(0x20)
    }

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn identity(address: Address) -> String {
        address.to_checksum(None)
    }

    fn vote(from: Address, to: Address, amount: i64) -> Vec<ArgValue> {
        vec![ArgValue::Address(from), ArgValue::Address(to), ArgValue::Int(I256::try_from(amount).unwrap())]
    }

    fn query(label: &str, address: Address, start_block: u64) -> SourceQuery {
        let source = EventSource::new(label, address, EventSchema::vote_change());
        let filter = EventFilter::any(&source);
        SourceQuery::new(source, filter, BlockRange::from_block(start_block), ExtractionRule::new(0, 2))
    }

    fn council_queries() -> Vec<SourceQuery> {
        vec![
            query("locking_vault", locking_address(), STARTING_BLOCK_NUMBER),
            query("vesting_vault", vesting_address(), STARTING_BLOCK_NUMBER),
        ]
    }

    fn as_set(delegators: Vec<String>) -> HashSet<String> {
        delegators.into_iter().collect()
    }

    #[tokio::test]
    async fn test_zero_value_in_one_source_positive_in_other() {
        let provider = Arc::new(InMemoryLogProvider::new(HEAD));
        let (addr1, addr2) = (addr(0x01), addr(0x02));
        provider.push_log(locking_address(), STARTING_BLOCK_NUMBER + 1, 0, vote(addr1, addr1, 10));
        provider.push_log(locking_address(), STARTING_BLOCK_NUMBER + 2, 0, vote(addr2, addr2, 0));
        provider.push_log(vesting_address(), STARTING_BLOCK_NUMBER + 3, 0, vote(addr2, addr1, 5));
        provider.push_log(vesting_address(), STARTING_BLOCK_NUMBER + 4, 0, vote(addr1, addr1, 10));

        let aggregator = DelegatorAggregator::new(provider);
        let delegators = aggregator.recent_delegators(&council_queries()).await.unwrap();

        assert_eq!(delegators.len(), 2);
        assert_eq!(as_set(delegators), HashSet::from([identity(addr1), identity(addr2)]));
    }

    #[tokio::test]
    async fn test_both_sources_empty() {
        let provider = Arc::new(InMemoryLogProvider::new(HEAD));
        let aggregator = DelegatorAggregator::new(provider);

        let delegators = aggregator.recent_delegators(&council_queries()).await.unwrap();
        assert!(delegators.is_empty());
    }

    #[tokio::test]
    async fn test_exclusion_and_inclusion() {
        let provider = Arc::new(InMemoryLogProvider::new(HEAD));
        let positive = addr(0x01);
        let zero = addr(0x02);
        let negative = addr(0x03);
        provider.push_log(locking_address(), HEAD, 0, vote(positive, positive, 1));
        provider.push_log(locking_address(), HEAD, 1, vote(zero, positive, 0));
        provider.push_log(vesting_address(), HEAD, 0, vote(negative, positive, -50));

        let aggregator = DelegatorAggregator::new(provider);
        let set = aggregator.aggregate(&council_queries()).await.unwrap();

        assert!(set.contains(&identity(positive)));
        assert!(!set.contains(&identity(zero)));
        assert!(!set.contains(&identity(negative)));
    }

    #[tokio::test]
    async fn test_deduplication_within_and_across_sources() {
        let provider = Arc::new(InMemoryLogProvider::new(HEAD));
        let alice = addr(0xaa);
        for block in 0..5 {
            provider.push_log(locking_address(), STARTING_BLOCK_NUMBER + block, 0, vote(alice, alice, 7));
            provider.push_log(vesting_address(), STARTING_BLOCK_NUMBER + block, 0, vote(alice, alice, 7));
        }

        let aggregator = DelegatorAggregator::new(provider);
        let delegators = aggregator.recent_delegators(&council_queries()).await.unwrap();
        assert_eq!(delegators, vec![identity(alice)]);
    }

    #[tokio::test]
    async fn test_idempotent() {
        let provider = Arc::new(InMemoryLogProvider::new(HEAD));
        for i in 1..=20u8 {
            let source = if i % 2 == 0 { locking_address() } else { vesting_address() };
            provider.push_log(source, STARTING_BLOCK_NUMBER + i as u64, 0, vote(addr(i), addr(i), i as i64 - 10));
        }

        let aggregator = DelegatorAggregator::new(provider);
        let first = aggregator.aggregate(&council_queries()).await.unwrap();
        let second = aggregator.aggregate(&council_queries()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 10);
    }

    #[tokio::test]
    async fn test_start_block_beyond_head() {
        let provider = Arc::new(InMemoryLogProvider::new(HEAD));
        provider.push_log(locking_address(), HEAD, 0, vote(addr(0x01), addr(0x01), 10));

        let queries = vec![query("locking_vault", locking_address(), HEAD + 1)];
        let aggregator = DelegatorAggregator::new(provider);
        let delegators = aggregator.recent_delegators(&queries).await.unwrap();
        assert!(delegators.is_empty());
    }

    #[tokio::test]
    async fn test_events_before_start_block_ignored() {
        let provider = Arc::new(InMemoryLogProvider::new(HEAD));
        provider.push_log(locking_address(), STARTING_BLOCK_NUMBER - 1, 0, vote(addr(0x01), addr(0x01), 10));

        let aggregator = DelegatorAggregator::new(provider);
        let delegators = aggregator.recent_delegators(&council_queries()).await.unwrap();
        assert!(delegators.is_empty());
    }

    #[tokio::test]
    async fn test_fail_fast() {
        let provider = Arc::new(InMemoryLogProvider::new(HEAD));
        provider.push_log(locking_address(), HEAD, 0, vote(addr(0x01), addr(0x01), 10));
        provider.fail_source(vesting_address());

        let aggregator = DelegatorAggregator::new(provider);
        let result = aggregator.recent_delegators(&council_queries()).await;

        match result {
            Err(ScanError::AggregationIncomplete { source_label, cause }) => {
                assert_eq!(source_label, "vesting_vault");
                assert!(matches!(*cause, ScanError::SourceUnreachable { .. }));
            }
            other => panic!("expected AggregationIncomplete, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_pinned_filter() {
        let provider = Arc::new(InMemoryLogProvider::new(HEAD));
        let delegatee = addr(0xdd);
        provider.push_log(locking_address(), HEAD, 0, vote(addr(0x01), delegatee, 10));
        provider.push_log(locking_address(), HEAD, 1, vote(addr(0x02), addr(0xee), 10));

        let mut pinned = query("locking_vault", locking_address(), STARTING_BLOCK_NUMBER);
        pinned.filter = EventFilter::new(vec![None, Some(ArgValue::Address(delegatee))]);

        let aggregator = DelegatorAggregator::new(provider);
        let delegators = aggregator.recent_delegators(&[pinned]).await.unwrap();
        assert_eq!(delegators, vec![identity(addr(0x01))]);
    }

    #[tokio::test]
    async fn test_service_with_cache_serves_stale_on_failure() {
        let provider = Arc::new(InMemoryLogProvider::new(HEAD));
        let alice = addr(0xaa);
        provider.push_log(locking_address(), HEAD, 0, vote(alice, alice, 10));

        let mut config = DelegatorsConfigSection::default();
        config.cache_ttl_secs = 0;
        config.sources[0].address = locking_address().to_string();
        config.sources[1].address = vesting_address().to_string();

        let service = DelegatorServiceBuilder::new()
            .with_provider(provider.clone())
            .with_config(config)
            .build()
            .unwrap();

        let fresh = service.cached_recent_delegators().await.unwrap();
        assert_eq!(fresh, vec![identity(alice)]);

        provider.fail_source(vesting_address());
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        // the direct call fails, the cached one falls back to the last good list
        assert!(service.recent_delegators().await.is_err());
        let stale = service.cached_recent_delegators().await.unwrap();
        assert_eq!(stale, fresh);
    }
}
