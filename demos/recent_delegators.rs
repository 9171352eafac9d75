/// Recent Delegators Example
///
/// Loads the source configuration (a TOML file passed as first argument, or the
/// built-in council vaults), queries the RPC node once and prints every address
/// that currently delegates voting power.
///
/// RPC settings come from the environment: RPC_HTTP_URL, HTTP_TIMEOUT_SECS,
/// MAX_BLOCKS_PER_QUERY.

use delegator_scan::utils::ScanConfigLoader;
use delegator_scan::{DelegatorServiceBuilder, DelegatorsConfigSection, RpcConfig};
use eyre::Result;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = match std::env::args().nth(1) {
        Some(file_name) => {
            info!("Loading sources from {}", file_name);
            DelegatorsConfigSection::load_section_from_file(file_name).await?
        }
        None => {
            warn!("No config file given, using the council locking and vesting vaults");
            DelegatorsConfigSection::default()
        }
    };

    let rpc_config = RpcConfig::from_env()?;
    info!("Configuration loaded: HTTP={}, {} sources", rpc_config.rpc_http_url, config.sources.len());

    let service = DelegatorServiceBuilder::new().with_rpc_config(rpc_config).with_config(config).build()?;

    let start = Instant::now();
    let mut delegators = service.recent_delegators().await?;
    delegators.sort();

    for delegator in &delegators {
        println!("{delegator}");
    }
    info!("{} delegators found in {:?}", delegators.len(), start.elapsed());

    Ok(())
}
