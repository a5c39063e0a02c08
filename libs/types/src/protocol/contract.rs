//! Subscription contracts

use num_enum::TryFromPrimitive;
use std::fmt;

/// Delivery semantics category for a subscription
///
/// Each contract owns exactly one data message type and one pair of
/// add/remove subscription message types, see
/// [`MessageType::for_data`](crate::MessageType::for_data).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Contract {
    /// Latest value only
    Ticker = 0,
    /// Every event, in order
    Stream = 1,
    /// Time-ranged history
    History = 2,
}

impl Contract {
    /// All contracts in ordinal order
    pub const ALL: [Contract; 3] = [Contract::Ticker, Contract::Stream, Contract::History];

    pub fn name(&self) -> &'static str {
        match self {
            Contract::Ticker => "TICKER",
            Contract::Stream => "STREAM",
            Contract::History => "HISTORY",
        }
    }

    pub fn ordinal(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_ordinals_follow_declaration() {
        for (i, contract) in Contract::ALL.iter().enumerate() {
            assert_eq!(contract.ordinal(), i);
            assert_eq!(Contract::try_from(i as u8).unwrap(), *contract);
        }
        assert!(Contract::try_from(3u8).is_err());
    }
}
