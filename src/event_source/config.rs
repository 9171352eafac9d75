use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Configuration for the JSON-RPC log provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// HTTP RPC URL used for `eth_blockNumber` and `eth_getLogs`
    pub rpc_http_url: String,
    /// Timeout for HTTP requests in seconds
    pub http_timeout_secs: u64,
    /// Maximum number of blocks covered by a single `eth_getLogs` request
    pub max_blocks_per_query: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self { rpc_http_url: "http://127.0.0.1:8545".to_string(), http_timeout_secs: 30, max_blocks_per_query: 100_000 }
    }
}

impl RpcConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> eyre::Result<Self> {
        let mut config = Self::default();

        if let Ok(rpc_http_url) = std::env::var("RPC_HTTP_URL") {
            let _url = Url::parse(&rpc_http_url).map_err(|e| eyre::eyre!("Invalid RPC_HTTP_URL: {}", e))?;
            config.rpc_http_url = rpc_http_url;
        }

        if let Ok(timeout_str) = std::env::var("HTTP_TIMEOUT_SECS") {
            config.http_timeout_secs =
                timeout_str.parse().map_err(|e| eyre::eyre!("Invalid HTTP_TIMEOUT_SECS: {}", e))?;
        }

        if let Ok(max_blocks_str) = std::env::var("MAX_BLOCKS_PER_QUERY") {
            config.max_blocks_per_query =
                max_blocks_str.parse().map_err(|e| eyre::eyre!("Invalid MAX_BLOCKS_PER_QUERY: {}", e))?;
            if config.max_blocks_per_query == 0 {
                return Err(eyre::eyre!("MAX_BLOCKS_PER_QUERY must be positive"));
            }
        }

        Ok(config)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
