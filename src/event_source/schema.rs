use crate::error::ScanError;
use alloy_primitives::{Address, B256, keccak256};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum_macros::{Display, EnumString};

// Compile-time ABI of the council vault event, checked against the
// hand-built schema below.
#[cfg(test)]
alloy_sol_types::sol! {
    /// Emitted by the council locking and vesting vaults whenever delegated voting power moves.
    event VoteChange(address indexed from, address indexed to, int256 amount);
}

/// Static ABI types an event argument can take
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgKind {
    #[strum(to_string = "address")]
    Address,
    #[strum(to_string = "uint256", serialize = "uint")]
    Uint256,
    #[strum(to_string = "int256", serialize = "int")]
    Int256,
    #[strum(to_string = "bool")]
    Bool,
    #[strum(to_string = "bytes32")]
    Bytes32,
}

impl ArgKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ArgKind::Uint256 | ArgKind::Int256)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgSlot {
    pub name: String,
    pub kind: ArgKind,
    pub indexed: bool,
}

impl ArgSlot {
    pub fn new(name: &str, kind: ArgKind, indexed: bool) -> Self {
        Self { name: name.to_string(), kind, indexed }
    }
}

/// Event name plus its ordered argument slots
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSchema {
    pub name: String,
    pub args: Vec<ArgSlot>,
}

impl EventSchema {
    pub fn new(name: &str, args: Vec<ArgSlot>) -> Self {
        Self { name: name.to_string(), args }
    }

    /// `VoteChange(address indexed from, address indexed to, int256 amount)`
    pub fn vote_change() -> Self {
        Self::new(
            "VoteChange",
            vec![
                ArgSlot::new("from", ArgKind::Address, true),
                ArgSlot::new("to", ArgKind::Address, true),
                ArgSlot::new("amount", ArgKind::Int256, false),
            ],
        )
    }

    /// Canonical signature, e.g. `VoteChange(address,address,int256)`
    pub fn signature(&self) -> String {
        let kinds: Vec<String> = self.args.iter().map(|arg| arg.kind.to_string()).collect();
        format!("{}({})", self.name, kinds.join(","))
    }

    /// First log topic identifying this event on chain
    pub fn topic0(&self) -> B256 {
        keccak256(self.signature().as_bytes())
    }

    pub fn indexed_count(&self) -> usize {
        self.args.iter().filter(|arg| arg.indexed).count()
    }

    /// Positions of indexed slots in declaration order
    pub fn indexed_positions(&self) -> Vec<usize> {
        self.args.iter().enumerate().filter(|(_, arg)| arg.indexed).map(|(i, _)| i).collect()
    }

    pub fn data_positions(&self) -> Vec<usize> {
        self.args.iter().enumerate().filter(|(_, arg)| !arg.indexed).map(|(i, _)| i).collect()
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.args.iter().position(|arg| arg.name == name)
    }

    /// Parse a human readable declaration such as
    /// `VoteChange(address indexed from, address indexed to, int256 amount)`.
    /// Unnamed arguments get `arg{position}` as name.
    pub fn parse(declaration: &str) -> Result<Self, ScanError> {
        let re = Regex::new(r"^\s*(?:event\s+)?([A-Za-z_][A-Za-z0-9_]*)\s*\((.*)\)\s*;?\s*$")
            .map_err(|e| ScanError::InvalidConfig(e.to_string()))?;
        let caps = re
            .captures(declaration)
            .ok_or_else(|| ScanError::InvalidConfig(format!("malformed event declaration: {declaration}")))?;

        let name = &caps[1];
        let params = caps[2].trim();
        let mut args = Vec::new();
        if params.is_empty() {
            return Ok(Self::new(name, args));
        }

        for (position, param) in params.split(',').enumerate() {
            let tokens: Vec<&str> = param.split_whitespace().collect();
            let (kind, rest) = tokens
                .split_first()
                .ok_or_else(|| ScanError::InvalidConfig(format!("empty parameter in {declaration}")))?;
            let kind = ArgKind::from_str(kind)
                .map_err(|_| ScanError::InvalidConfig(format!("unsupported argument type '{kind}' in {declaration}")))?;

            let (indexed, rest) = match rest.split_first() {
                Some((&"indexed", rest)) => (true, rest),
                _ => (false, rest),
            };
            let arg_name = match rest {
                [] => format!("arg{position}"),
                [arg_name] => arg_name.to_string(),
                _ => return Err(ScanError::InvalidConfig(format!("cannot parse parameter '{}'", param.trim()))),
            };
            args.push(ArgSlot { name: arg_name, kind, indexed });
        }

        Ok(Self::new(name, args))
    }
}

/// One queryable log stream: a contract address and the event it emits
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventSource {
    pub label: String,
    pub address: Address,
    pub schema: EventSchema,
}

impl EventSource {
    pub fn new(label: &str, address: Address, schema: EventSchema) -> Self {
        Self { label: label.to_string(), address, schema }
    }
}
