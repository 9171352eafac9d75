use super::aggregator::{DelegatorAggregator, SourceQuery};
use super::config::DelegatorsConfigSection;
use crate::error::ScanError;
use crate::event_source::{LogProvider, RpcConfig, RpcLogProvider};
use crate::utils::cache::DelegatorCache;
use crate::utils::constants::RECENT_DELEGATORS_KEY;
use eyre::Result;
use std::sync::Arc;
use tracing::info;

/// Delegator discovery over the configured sources.
///
/// Builds the source queries once from configuration; every call to
/// [`recent_delegators`](Self::recent_delegators) runs a fresh aggregation.
pub struct DelegatorService {
    config: DelegatorsConfigSection,
    aggregator: DelegatorAggregator,
    queries: Vec<SourceQuery>,
    cache: DelegatorCache,
}

impl DelegatorService {
    /// Create a service backed by the JSON-RPC provider
    pub fn new(rpc_config: &RpcConfig, config: DelegatorsConfigSection) -> Result<Self> {
        let provider = RpcLogProvider::from_config(rpc_config)?;
        info!("Using RPC endpoint {}", rpc_config.rpc_http_url);
        Self::with_provider(Arc::new(provider), config)
    }

    pub fn with_provider(provider: Arc<dyn LogProvider>, config: DelegatorsConfigSection) -> Result<Self> {
        let queries = config.to_queries()?;
        info!(
            "Initializing DelegatorService with {} sources: {}",
            queries.len(),
            queries.iter().map(|q| q.source.label.as_str()).collect::<Vec<_>>().join(", ")
        );

        let cache = DelegatorCache::new(config.cache_ttl());
        Ok(Self { config, aggregator: DelegatorAggregator::new(provider), queries, cache })
    }

    /// Distinct addresses with at least one positive vote change across all sources
    pub async fn recent_delegators(&self) -> Result<Vec<String>, ScanError> {
        self.aggregator.recent_delegators(&self.queries).await
    }

    /// Same as `recent_delegators`, served from the TTL cache while fresh and
    /// falling back to the last good value if a refresh fails
    pub async fn cached_recent_delegators(&self) -> Result<Vec<String>, ScanError> {
        self.cache.get_or_refresh(RECENT_DELEGATORS_KEY, || self.recent_delegators()).await
    }

    pub fn sources(&self) -> &[SourceQuery] {
        &self.queries
    }

    pub fn cache(&self) -> &DelegatorCache {
        &self.cache
    }

    pub fn get_config(&self) -> &DelegatorsConfigSection {
        &self.config
    }
}

/// Builder for DelegatorService
pub struct DelegatorServiceBuilder {
    rpc_config: Option<RpcConfig>,
    config: Option<DelegatorsConfigSection>,
    provider: Option<Arc<dyn LogProvider>>,
}

impl DelegatorServiceBuilder {
    pub fn new() -> Self {
        Self { rpc_config: None, config: None, provider: None }
    }

    pub fn with_rpc_config(mut self, rpc_config: RpcConfig) -> Self {
        self.rpc_config = Some(rpc_config);
        self
    }

    pub fn with_config(mut self, config: DelegatorsConfigSection) -> Self {
        self.config = Some(config);
        self
    }

    /// Use an existing provider instead of building one from the RPC config
    pub fn with_provider(mut self, provider: Arc<dyn LogProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn build(self) -> Result<DelegatorService> {
        let config = self.config.unwrap_or_default();

        match self.provider {
            Some(provider) => DelegatorService::with_provider(provider, config),
            None => {
                let rpc_config = match self.rpc_config {
                    Some(rpc_config) => rpc_config,
                    None => RpcConfig::from_env()?,
                };
                DelegatorService::new(&rpc_config, config)
            }
        }
    }
}

impl Default for DelegatorServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
