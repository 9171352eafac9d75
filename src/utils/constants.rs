use alloy_primitives::{Address, address};

/// First block in which the council vaults emitted `VoteChange` events
pub const STARTING_BLOCK_NUMBER: u64 = 14_496_292;

#[non_exhaustive]
pub struct CouncilAddress;

impl CouncilAddress {
    // Ethereum mainnet
    pub const LOCKING_VAULT: Address = address!("02bd4a3b1b95b01f2aa61655415a5d3eaacaafdd");
    pub const VESTING_VAULT: Address = address!("6de73946eab234f1ee61256f10067d713af0e37a");
}

pub const VOTE_CHANGE_DECLARATION: &str = "VoteChange(address indexed from, address indexed to, int256 amount)";

/// Cache key used by the service for the combined delegator list
pub const RECENT_DELEGATORS_KEY: &str = "recent_delegators";

pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
