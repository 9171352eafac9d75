use super::aggregator::{ExtractionRule, SourceQuery};
use crate::error::ScanError;
use crate::event_source::{ArgValue, BlockRange, EventFilter, EventSchema, EventSource};
use crate::utils::config_loader::{
    LoadConfigError, ScanConfigLoader, ScanConfigLoaderSync, load_from_file, load_from_file_sync, load_from_str,
};
use crate::utils::constants::{CouncilAddress, DEFAULT_CACHE_TTL_SECS, STARTING_BLOCK_NUMBER, VOTE_CHANGE_DECLARATION};
use alloy_primitives::Address;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Deserialize, Debug)]
pub struct DelegatorsConfigRoot {
    pub delegators: DelegatorsConfigSection,
}

/// `[delegators]` section: the tracked sources and how long results stay fresh
#[derive(Clone, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct DelegatorsConfigSection {
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    pub sources: Vec<SourceConfig>,
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

fn default_event() -> String {
    VOTE_CHANGE_DECLARATION.to_string()
}

fn default_identity_arg() -> String {
    "from".to_string()
}

fn default_trigger_arg() -> String {
    "amount".to_string()
}

/// One `[[delegators.sources]]` entry
#[derive(Clone, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub label: String,
    pub address: String,
    #[serde(default = "default_event")]
    pub event: String,
    pub start_block: u64,
    #[serde(default)]
    pub end_block: Option<u64>,
    #[serde(default = "default_identity_arg")]
    pub identity_arg: String,
    #[serde(default = "default_trigger_arg")]
    pub trigger_arg: String,
    /// Indexed argument name -> literal it must equal
    #[serde(default)]
    pub pinned: BTreeMap<String, String>,
}

impl SourceConfig {
    pub fn vote_change(label: &str, address: Address, start_block: u64) -> Self {
        Self {
            label: label.to_string(),
            address: address.to_string(),
            event: default_event(),
            start_block,
            end_block: None,
            identity_arg: default_identity_arg(),
            trigger_arg: default_trigger_arg(),
            pinned: BTreeMap::new(),
        }
    }

    pub fn to_query(&self) -> Result<SourceQuery, ScanError> {
        let address = Address::from_str(&self.address)
            .map_err(|e| ScanError::InvalidConfig(format!("{}: invalid address '{}': {}", self.label, self.address, e)))?;
        let schema = EventSchema::parse(&self.event)?;
        let source = EventSource::new(&self.label, address, schema);

        let mut entries = Vec::with_capacity(source.schema.indexed_count());
        for position in source.schema.indexed_positions() {
            let slot = &source.schema.args[position];
            let entry = match self.pinned.get(&slot.name) {
                Some(literal) => Some(ArgValue::parse(slot.kind, literal).map_err(|e| {
                    ScanError::InvalidConfig(format!("{}: bad value for '{}': {}", self.label, slot.name, e))
                })?),
                None => None,
            };
            entries.push(entry);
        }
        if let Some(name) = self.pinned.keys().find(|name| {
            !source.schema.args.iter().any(|arg| arg.indexed && &arg.name == *name)
        }) {
            return Err(ScanError::schema_mismatch(&self.label, format!("'{name}' is not an indexed argument")));
        }

        let range = match self.end_block {
            Some(end_block) => BlockRange::bounded(self.start_block, end_block),
            None => BlockRange::from_block(self.start_block),
        };
        let rule = ExtractionRule::by_name(&source, &self.identity_arg, &self.trigger_arg)?;

        let query = SourceQuery::new(source, EventFilter::new(entries), range, rule);
        query.validate()?;
        Ok(query)
    }
}

impl DelegatorsConfigSection {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn to_queries(&self) -> Result<Vec<SourceQuery>, ScanError> {
        self.sources.iter().map(SourceConfig::to_query).collect()
    }
}

/// The council locking and vesting vaults on mainnet
impl Default for DelegatorsConfigSection {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            sources: vec![
                SourceConfig::vote_change("locking_vault", CouncilAddress::LOCKING_VAULT, STARTING_BLOCK_NUMBER),
                SourceConfig::vote_change("vesting_vault", CouncilAddress::VESTING_VAULT, STARTING_BLOCK_NUMBER),
            ],
        }
    }
}

#[async_trait]
impl ScanConfigLoader for DelegatorsConfigSection {
    type SectionType = DelegatorsConfigSection;

    async fn load_section_from_file(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        let root: DelegatorsConfigRoot = load_from_file(file_name).await?;
        Ok(root.delegators)
    }
}

impl ScanConfigLoaderSync for DelegatorsConfigSection {
    type SectionType = DelegatorsConfigSection;

    fn load_section_from_file_sync(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        let root: DelegatorsConfigRoot = load_from_file_sync(file_name)?;
        Ok(root.delegators)
    }

    fn load_section_from_str(contents: &str) -> Result<Self::SectionType, LoadConfigError> {
        let root: DelegatorsConfigRoot = load_from_str(contents)?;
        Ok(root.delegators)
    }
}
