use super::config::RpcConfig;
use super::filter::{BlockRange, EventFilter};
use super::provider::LogProvider;
use super::record::{ArgValue, EventRecord};
use super::schema::EventSource;
use crate::error::ScanError;
use alloy_primitives::{Address, B256, Bytes};
use async_trait::async_trait;
use eyre::{Result, eyre};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Log entry as returned by `eth_getLogs`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: Option<String>,
    pub log_index: Option<String>,
    #[serde(default)]
    pub removed: bool,
}

/// Label of `SourceUnreachable` errors raised while fetching the chain head
pub const CHAIN_HEAD_LABEL: &str = "chain head";

/// Parse a `0x` prefixed quantity
pub fn parse_hex_u64(quantity: &str) -> Result<u64> {
    let digits = quantity.trim_start_matches("0x");
    u64::from_str_radix(digits, 16).map_err(|e| eyre!("Invalid quantity '{}': {}", quantity, e))
}

/// JSON-RPC over HTTP implementation of [`LogProvider`]
#[derive(Debug)]
pub struct RpcLogProvider {
    http_client: reqwest::Client,
    rpc_url: String,
    max_blocks_per_query: u64,
    request_id: AtomicU64,
}

impl RpcLogProvider {
    pub fn new(rpc_url: String, timeout: Duration, max_blocks_per_query: u64) -> Result<Self, ScanError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScanError::InvalidConfig(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { http_client, rpc_url, max_blocks_per_query: max_blocks_per_query.max(1), request_id: AtomicU64::new(1) })
    }

    pub fn from_config(config: &RpcConfig) -> Result<Self, ScanError> {
        Self::new(config.rpc_http_url.clone(), config.http_timeout(), config.max_blocks_per_query)
    }

    /// Topic list for `eth_getLogs`: the event signature followed by one
    /// entry per indexed slot, `null` for wildcards
    pub fn topics(source: &EventSource, filter: &EventFilter) -> Value {
        let mut topics = vec![json!(source.schema.topic0())];
        for entry in &filter.entries {
            topics.push(match entry {
                Some(value) => json!(value.to_word()),
                None => Value::Null,
            });
        }
        Value::Array(topics)
    }

    /// Decode a raw log against the source schema
    pub fn decode_log(source: &EventSource, log: &RpcLog) -> Result<EventRecord> {
        let schema = &source.schema;
        let (topic0, indexed_topics) = log.topics.split_first().ok_or_else(|| eyre!("log without topics"))?;
        if *topic0 != schema.topic0() {
            return Err(eyre!("unexpected topic0 {}", topic0));
        }

        let indexed = schema.indexed_positions();
        if indexed_topics.len() != indexed.len() {
            return Err(eyre!("expected {} indexed topics, got {}", indexed.len(), indexed_topics.len()));
        }

        let data_positions = schema.data_positions();
        if log.data.len() < data_positions.len() * 32 {
            return Err(eyre!("log data too short: {} bytes for {} words", log.data.len(), data_positions.len()));
        }

        let mut args: Vec<Option<ArgValue>> = vec![None; schema.args.len()];
        for (position, topic) in indexed.iter().zip(indexed_topics) {
            let value = ArgValue::decode_word(schema.args[*position].kind, *topic).map_err(|e| eyre!(e))?;
            args[*position] = Some(value);
        }
        for (word_idx, position) in data_positions.iter().enumerate() {
            let word = B256::from_slice(&log.data[word_idx * 32..(word_idx + 1) * 32]);
            let value = ArgValue::decode_word(schema.args[*position].kind, word).map_err(|e| eyre!(e))?;
            args[*position] = Some(value);
        }
        let args = args.into_iter().collect::<Option<Vec<_>>>().ok_or_else(|| eyre!("incomplete arguments"))?;

        let block_number = parse_hex_u64(log.block_number.as_deref().ok_or_else(|| eyre!("pending log"))?)?;
        let log_index = parse_hex_u64(log.log_index.as_deref().ok_or_else(|| eyre!("pending log"))?)?;

        Ok(EventRecord::new(&source.label, log.address, block_number, log_index, args))
    }

    async fn rpc_request(&self, method: &str, params: Value) -> Result<Value> {
        let request_body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": self.request_id.fetch_add(1, Ordering::Relaxed)
        });

        let response = self
            .http_client
            .post(&self.rpc_url)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        // error messages must not carry the endpoint, it may embed an API key
        let mut response_json: Value = response.json().await.map_err(reqwest::Error::without_url)?;

        if let Some(error) = response_json.get("error") {
            return Err(eyre!("RPC error: {}", error));
        }

        response_json.get_mut("result").map(Value::take).ok_or_else(|| eyre!("Missing result in RPC response"))
    }

    async fn block_number(&self) -> Result<u64> {
        let result = self.rpc_request("eth_blockNumber", json!([])).await?;
        let quantity = result.as_str().ok_or_else(|| eyre!("Invalid eth_blockNumber result: {}", result))?;
        parse_hex_u64(quantity)
    }

    async fn get_logs(&self, address: Address, topics: &Value, from_block: u64, to_block: u64) -> Result<Vec<RpcLog>> {
        let params = json!([{
            "address": address,
            "topics": topics,
            "fromBlock": format!("0x{:x}", from_block),
            "toBlock": format!("0x{:x}", to_block),
        }]);
        let result = self.rpc_request("eth_getLogs", params).await?;
        Ok(serde_json::from_value(result)?)
    }
}

#[async_trait]
impl LogProvider for RpcLogProvider {
    async fn chain_head(&self) -> Result<u64, ScanError> {
        self.block_number().await.map_err(|e| ScanError::unreachable(CHAIN_HEAD_LABEL, e))
    }

    async fn query_logs(
        &self,
        source: &EventSource,
        filter: &EventFilter,
        range: BlockRange,
    ) -> Result<Vec<EventRecord>, ScanError> {
        filter.validate(source)?;

        let start_time = Instant::now();
        let head = self.chain_head().await.map_err(|e| match e {
            ScanError::SourceUnreachable { reason, .. } => ScanError::unreachable(&source.label, reason),
            other => other,
        })?;
        let pages = range.pages(head, self.max_blocks_per_query);
        if pages.is_empty() {
            debug!("{}: start block {} is beyond head {}, nothing to query", source.label, range.from_block, head);
            return Ok(Vec::new());
        }

        let topics = Self::topics(source, filter);
        let mut records = Vec::new();
        let mut removed = 0usize;

        for (page_idx, (from_block, to_block)) in pages.iter().enumerate() {
            let page_start = Instant::now();
            let logs = self
                .get_logs(source.address, &topics, *from_block, *to_block)
                .await
                .map_err(|e| ScanError::unreachable(&source.label, e))?;

            debug!(
                "{}: page {}/{} (blocks {}..={}) returned {} logs in {:?}",
                source.label,
                page_idx + 1,
                pages.len(),
                from_block,
                to_block,
                logs.len(),
                page_start.elapsed()
            );

            for log in logs {
                if log.removed {
                    removed += 1;
                    continue;
                }
                let record = Self::decode_log(source, &log)
                    .map_err(|e| ScanError::unreachable(&source.label, format!("undecodable log: {e}")))?;
                records.push(record);
            }
        }

        if removed > 0 {
            warn!("{}: skipped {} logs removed by reorg", source.label, removed);
        }

        records.sort_by_key(EventRecord::position);
        info!(
            "{}: fetched {} {} events from blocks {}..={} in {:?}",
            source.label,
            records.len(),
            source.schema.name,
            range.from_block,
            pages.last().map_or(head, |(_, to)| *to),
            start_time.elapsed()
        );

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_source::schema::{EventSchema, VoteChange};
    use alloy_primitives::{I256, address};
    use alloy_sol_types::SolEvent;
    use httpmock::prelude::*;

    fn locking_source() -> EventSource {
        EventSource::new(
            "locking",
            address!("0x1111111111111111111111111111111111111111"),
            EventSchema::vote_change(),
        )
    }

    fn vote_change_log(from: Address, to: Address, amount: i64, block: u64, index: u64) -> RpcLog {
        serde_json::from_value(vote_change_json(from, to, amount, block, index)).unwrap()
    }

    fn vote_change_json(from: Address, to: Address, amount: i64, block: u64, index: u64) -> Value {
        let event = VoteChange { from, to, amount: I256::try_from(amount).unwrap() };
        let log_data = event.encode_log_data();
        json!({
            "address": "0x1111111111111111111111111111111111111111",
            "topics": log_data.topics(),
            "data": log_data.data,
            "blockNumber": format!("0x{:x}", block),
            "logIndex": format!("0x{:x}", index),
            "removed": false
        })
    }

    fn rpc_result(result: Value) -> Value {
        json!({ "jsonrpc": "2.0", "id": 1, "result": result })
    }

    #[test]
    fn test_parse_hex_u64() {
        assert_eq!(parse_hex_u64("0x1a2b3c").unwrap(), 0x1a2b3c);
        assert_eq!(parse_hex_u64("0x0").unwrap(), 0);
        assert!(parse_hex_u64("0xzz").is_err());
    }

    #[test]
    fn test_decode_vote_change_log() {
        let source = locking_source();
        let from = Address::repeat_byte(0xaa);
        let to = Address::repeat_byte(0xbb);
        let log = vote_change_log(from, to, -25, 14_496_300, 3);

        let record = RpcLogProvider::decode_log(&source, &log).unwrap();
        assert_eq!(record.block_number, 14_496_300);
        assert_eq!(record.log_index, 3);
        assert_eq!(record.source_label, "locking");
        assert_eq!(record.args[0], ArgValue::Address(from));
        assert_eq!(record.args[1], ArgValue::Address(to));
        assert_eq!(record.args[2], ArgValue::Int(I256::try_from(-25).unwrap()));
    }

    #[test]
    fn test_decode_rejects_foreign_event() {
        let other = EventSource::new(
            "other",
            Address::repeat_byte(0x11),
            EventSchema::parse("Transfer(address indexed from, address indexed to, uint256 value)").unwrap(),
        );
        let log = vote_change_log(Address::repeat_byte(0xaa), Address::repeat_byte(0xbb), 1, 1, 0);
        assert!(RpcLogProvider::decode_log(&other, &log).is_err());
    }

    #[test]
    fn test_topics_layout() {
        let source = locking_source();
        let to = Address::repeat_byte(0xbb);
        let filter = EventFilter::new(vec![None, Some(ArgValue::Address(to))]);

        let topics = RpcLogProvider::topics(&source, &filter);
        let topics = topics.as_array().unwrap();
        assert_eq!(topics.len(), 3);
        assert_eq!(topics[0], json!(VoteChange::SIGNATURE_HASH));
        assert!(topics[1].is_null());
        assert_eq!(topics[2], json!(to.into_word()));
    }

    #[tokio::test]
    async fn test_unreachable_node() {
        let provider = RpcLogProvider::new("http://127.0.0.1:1".to_string(), Duration::from_secs(1), 1000).unwrap();
        let source = locking_source();
        let result = provider.query_logs(&source, &EventFilter::any(&source), BlockRange::from_block(0)).await;
        assert!(matches!(result, Err(ScanError::SourceUnreachable { .. })));
    }

    #[tokio::test]
    async fn test_schema_mismatch_before_any_request() {
        let provider = RpcLogProvider::new("http://127.0.0.1:1".to_string(), Duration::from_secs(1), 1000).unwrap();
        let source = locking_source();
        let filter = EventFilter::new(vec![None]);
        let result = provider.query_logs(&source, &filter, BlockRange::from_block(0)).await;
        assert!(matches!(result, Err(ScanError::SchemaMismatch { .. })));
    }

    #[tokio::test]
    async fn test_query_logs_pages_against_node() {
        let server = MockServer::start_async().await;
        let head = server
            .mock_async(|when, then| {
                when.method(POST).path("/").body_contains("eth_blockNumber");
                then.status(200).json_body(rpc_result(json!("0x18")));
            })
            .await;

        let alice = Address::repeat_byte(0xaa);
        let bob = Address::repeat_byte(0xbb);
        let delegate = Address::repeat_byte(0xee);
        let mut reorged = vote_change_json(bob, delegate, 7, 12, 0);
        reorged["removed"] = json!(true);

        // head 24 with 10 blocks per query: 0..=9, 10..=19, 20..=24
        let first_page = server
            .mock_async(|when, then| {
                when.method(POST).path("/").body_contains("eth_getLogs").body_contains("\"fromBlock\":\"0x0\"");
                then.status(200).json_body(rpc_result(json!([
                    vote_change_json(alice, delegate, 5, 9, 1),
                    vote_change_json(bob, delegate, -5, 3, 0),
                ])));
            })
            .await;
        let second_page = server
            .mock_async(|when, then| {
                when.method(POST).path("/").body_contains("eth_getLogs").body_contains("\"fromBlock\":\"0xa\"");
                then.status(200).json_body(rpc_result(json!([reorged])));
            })
            .await;
        let third_page = server
            .mock_async(|when, then| {
                when.method(POST).path("/").body_contains("eth_getLogs").body_contains("\"fromBlock\":\"0x14\"");
                then.status(200).json_body(rpc_result(json!([vote_change_json(alice, delegate, 1, 21, 0)])));
            })
            .await;

        let provider = RpcLogProvider::new(server.url("/"), Duration::from_secs(5), 10).unwrap();
        let source = locking_source();
        assert_eq!(provider.chain_head().await.unwrap(), 24);

        let records = provider.query_logs(&source, &EventFilter::any(&source), BlockRange::from_block(0)).await.unwrap();
        let positions: Vec<_> = records.iter().map(EventRecord::position).collect();
        assert_eq!(positions, vec![(3, 0), (9, 1), (21, 0)]);
        assert_eq!(records[0].args[0], ArgValue::Address(bob));
        assert!(records.iter().all(|r| r.source_label == "locking"));

        first_page.assert_hits_async(1).await;
        second_page.assert_hits_async(1).await;
        third_page.assert_hits_async(1).await;

        // start past the head never reaches eth_getLogs
        let records = provider.query_logs(&source, &EventFilter::any(&source), BlockRange::from_block(25)).await.unwrap();
        assert!(records.is_empty());
        first_page.assert_hits_async(1).await;
        third_page.assert_hits_async(1).await;
        head.assert_hits_async(3).await;
    }

    #[tokio::test]
    async fn test_errors_do_not_leak_node_url() {
        let rpc_url = "http://127.0.0.1:1/v2/secret-api-key".to_string();
        let provider = RpcLogProvider::new(rpc_url, Duration::from_secs(1), 1000).unwrap();

        let err = provider.chain_head().await.unwrap_err();
        assert!(matches!(&err, ScanError::SourceUnreachable { source_label, .. } if source_label == CHAIN_HEAD_LABEL));
        assert!(!err.to_string().contains("secret-api-key"));

        let source = locking_source();
        let err = provider.query_logs(&source, &EventFilter::any(&source), BlockRange::from_block(0)).await.unwrap_err();
        assert!(matches!(&err, ScanError::SourceUnreachable { source_label, .. } if source_label == "locking"));
        assert!(!err.to_string().contains("secret-api-key"));
        assert!(!format!("{err:?}").contains("secret-api-key"));
    }
}
