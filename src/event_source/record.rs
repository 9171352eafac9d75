use super::schema::ArgKind;
use alloy_primitives::{Address, B256, I256, U256};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A decoded event argument
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArgValue {
    Address(Address),
    Uint(U256),
    Int(I256),
    Bool(bool),
    FixedBytes(B256),
}

impl ArgValue {
    pub fn kind(&self) -> ArgKind {
        match self {
            ArgValue::Address(_) => ArgKind::Address,
            ArgValue::Uint(_) => ArgKind::Uint256,
            ArgValue::Int(_) => ArgKind::Int256,
            ArgValue::Bool(_) => ArgKind::Bool,
            ArgValue::FixedBytes(_) => ArgKind::Bytes32,
        }
    }

    /// Strictly greater than zero. Non numeric values never are.
    pub fn is_positive(&self) -> bool {
        match self {
            ArgValue::Uint(value) => !value.is_zero(),
            ArgValue::Int(value) => value.is_positive(),
            _ => false,
        }
    }

    /// Decode one 32 byte ABI word (a topic or a static data slot)
    pub fn decode_word(kind: ArgKind, word: B256) -> Result<Self, String> {
        match kind {
            ArgKind::Address => {
                if word[..12].iter().any(|b| *b != 0) {
                    return Err(format!("dirty address word {word}"));
                }
                Ok(ArgValue::Address(Address::from_word(word)))
            }
            ArgKind::Uint256 => Ok(ArgValue::Uint(U256::from_be_bytes(word.0))),
            ArgKind::Int256 => Ok(ArgValue::Int(I256::from_raw(U256::from_be_bytes(word.0)))),
            ArgKind::Bool => match U256::from_be_bytes(word.0) {
                v if v.is_zero() => Ok(ArgValue::Bool(false)),
                v if v == U256::from(1) => Ok(ArgValue::Bool(true)),
                _ => Err(format!("invalid bool word {word}")),
            },
            ArgKind::Bytes32 => Ok(ArgValue::FixedBytes(word)),
        }
    }

    /// ABI word used as a topic filter
    pub fn to_word(&self) -> B256 {
        match self {
            ArgValue::Address(address) => address.into_word(),
            ArgValue::Uint(value) => B256::from(value.to_be_bytes::<32>()),
            ArgValue::Int(value) => B256::from(value.into_raw().to_be_bytes::<32>()),
            ArgValue::Bool(value) => B256::from(U256::from(*value as u8).to_be_bytes::<32>()),
            ArgValue::FixedBytes(bytes) => *bytes,
        }
    }

    /// Parse a literal from configuration, e.g. a pinned filter value
    pub fn parse(kind: ArgKind, literal: &str) -> Result<Self, String> {
        let literal = literal.trim();
        match kind {
            ArgKind::Address => Address::from_str(literal).map(ArgValue::Address).map_err(|e| e.to_string()),
            ArgKind::Uint256 => U256::from_str(literal).map(ArgValue::Uint).map_err(|e| e.to_string()),
            ArgKind::Int256 => I256::from_str(literal).map(ArgValue::Int).map_err(|e| e.to_string()),
            ArgKind::Bool => bool::from_str(literal).map(ArgValue::Bool).map_err(|e| e.to_string()),
            ArgKind::Bytes32 => B256::from_str(literal).map(ArgValue::FixedBytes).map_err(|e| e.to_string()),
        }
    }
}

/// Addresses render EIP-55 checksummed, numbers in decimal
impl Display for ArgValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgValue::Address(address) => write!(f, "{}", address.to_checksum(None)),
            ArgValue::Uint(value) => write!(f, "{value}"),
            ArgValue::Int(value) => write!(f, "{value}"),
            ArgValue::Bool(value) => write!(f, "{value}"),
            ArgValue::FixedBytes(bytes) => write!(f, "{bytes}"),
        }
    }
}

/// One decoded log occurrence with its provenance
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventRecord {
    pub source_label: String,
    pub address: Address,
    pub block_number: u64,
    pub log_index: u64,
    pub args: Vec<ArgValue>,
}

impl EventRecord {
    pub fn new(source_label: &str, address: Address, block_number: u64, log_index: u64, args: Vec<ArgValue>) -> Self {
        Self { source_label: source_label.to_string(), address, block_number, log_index, args }
    }

    pub fn arg(&self, position: usize) -> Option<&ArgValue> {
        self.args.get(position)
    }

    /// Chain order key
    pub fn position(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_is_positive() {
        assert!(ArgValue::Int(I256::try_from(10).unwrap()).is_positive());
        assert!(!ArgValue::Int(I256::ZERO).is_positive());
        assert!(!ArgValue::Int(I256::try_from(-5).unwrap()).is_positive());
        assert!(ArgValue::Uint(U256::from(1)).is_positive());
        assert!(!ArgValue::Uint(U256::ZERO).is_positive());
        assert!(!ArgValue::Bool(true).is_positive());
    }

    #[test]
    fn test_negative_int_word() {
        let value = ArgValue::Int(I256::try_from(-42).unwrap());
        let word = value.to_word();
        assert_eq!(word[0], 0xff);
        assert_eq!(ArgValue::decode_word(ArgKind::Int256, word).unwrap(), value);
    }

    #[test]
    fn test_address_word_must_be_clean() {
        let addr = address!("0x1234567890123456789012345678901234567890");
        let word = ArgValue::Address(addr).to_word();
        assert_eq!(ArgValue::decode_word(ArgKind::Address, word).unwrap(), ArgValue::Address(addr));
        assert!(ArgValue::decode_word(ArgKind::Address, B256::repeat_byte(0x11)).is_err());
    }

    #[test]
    fn test_display_is_checksummed() {
        let addr = address!("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");
        assert_eq!(ArgValue::Address(addr).to_string(), "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(ArgValue::parse(ArgKind::Uint256, "100").unwrap(), ArgValue::Uint(U256::from(100)));
        assert_eq!(ArgValue::parse(ArgKind::Int256, "-3").unwrap(), ArgValue::Int(I256::try_from(-3).unwrap()));
        assert_eq!(ArgValue::parse(ArgKind::Bool, "true").unwrap(), ArgValue::Bool(true));
        assert!(ArgValue::parse(ArgKind::Address, "0x12").is_err());
    }
}
