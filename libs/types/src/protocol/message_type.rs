//! Canonical QTP message types
//!
//! Every message on the wire is identified by a small integer id. Handshake
//! descriptors may additionally carry the canonical name, which lets legacy
//! or forward-compatible peers identify messages purely by name.

use crate::Contract;
use num_enum::TryFromPrimitive;
use std::fmt;

/// Classification flags attached to each message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageTypeFlag {
    Ticker,
    Stream,
    History,
    Data,
    AddSubscription,
    RemoveSubscription,
}

/// Canonical `{id, name}` identity of a QTP message
///
/// Ids are part of the wire protocol and must never be renumbered. Message
/// types that are not in this table travel as "other" messages identified
/// only by their integer id.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MessageType {
    Heartbeat = 0,
    DescribeProtocol = 1,
    DescribeRecords = 2,
    DescribeReserved = 3,
    Part = 4,
    RawData = 5,

    TickerData = 10,
    TickerAddSubscription = 11,
    TickerRemoveSubscription = 12,

    StreamData = 15,
    StreamAddSubscription = 16,
    StreamRemoveSubscription = 17,

    HistoryData = 20,
    HistoryAddSubscription = 21,
    HistoryRemoveSubscription = 22,

    /// First byte of a text-format stream (`'='`)
    TextFormat = 61,
}

impl MessageType {
    /// All canonical message types in id order
    pub const ALL: [MessageType; 16] = [
        MessageType::Heartbeat,
        MessageType::DescribeProtocol,
        MessageType::DescribeRecords,
        MessageType::DescribeReserved,
        MessageType::Part,
        MessageType::RawData,
        MessageType::TickerData,
        MessageType::TickerAddSubscription,
        MessageType::TickerRemoveSubscription,
        MessageType::StreamData,
        MessageType::StreamAddSubscription,
        MessageType::StreamRemoveSubscription,
        MessageType::HistoryData,
        MessageType::HistoryAddSubscription,
        MessageType::HistoryRemoveSubscription,
        MessageType::TextFormat,
    ];

    /// Largest id this table may ever use; pending-message bit masks rely on it
    pub const MAX_ID: i32 = 63;

    /// Wire id
    pub fn id(&self) -> i32 {
        *self as i32
    }

    /// Canonical name as it appears in handshake descriptors
    pub fn name(&self) -> &'static str {
        match self {
            MessageType::Heartbeat => "HEARTBEAT",
            MessageType::DescribeProtocol => "DESCRIBE_PROTOCOL",
            MessageType::DescribeRecords => "DESCRIBE_RECORDS",
            MessageType::DescribeReserved => "DESCRIBE_RESERVED",
            MessageType::Part => "PART",
            MessageType::RawData => "RAW_DATA",
            MessageType::TickerData => "TICKER_DATA",
            MessageType::TickerAddSubscription => "TICKER_ADD_SUBSCRIPTION",
            MessageType::TickerRemoveSubscription => "TICKER_REMOVE_SUBSCRIPTION",
            MessageType::StreamData => "STREAM_DATA",
            MessageType::StreamAddSubscription => "STREAM_ADD_SUBSCRIPTION",
            MessageType::StreamRemoveSubscription => "STREAM_REMOVE_SUBSCRIPTION",
            MessageType::HistoryData => "HISTORY_DATA",
            MessageType::HistoryAddSubscription => "HISTORY_ADD_SUBSCRIPTION",
            MessageType::HistoryRemoveSubscription => "HISTORY_REMOVE_SUBSCRIPTION",
            MessageType::TextFormat => "TEXT_FORMAT",
        }
    }

    /// Look up a canonical type by wire id
    pub fn find_by_id(id: i32) -> Option<MessageType> {
        MessageType::try_from(id).ok()
    }

    /// Look up a canonical type by its canonical name (exact match)
    pub fn find_by_name(name: &str) -> Option<MessageType> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    pub fn flags(&self) -> &'static [MessageTypeFlag] {
        use MessageTypeFlag::*;
        match self {
            MessageType::RawData => &[Data],
            MessageType::TickerData => &[Ticker, Data],
            MessageType::TickerAddSubscription => &[Ticker, AddSubscription],
            MessageType::TickerRemoveSubscription => &[Ticker, RemoveSubscription],
            MessageType::StreamData => &[Stream, Data],
            MessageType::StreamAddSubscription => &[Stream, AddSubscription],
            MessageType::StreamRemoveSubscription => &[Stream, RemoveSubscription],
            MessageType::HistoryData => &[History, Data],
            MessageType::HistoryAddSubscription => &[History, AddSubscription],
            MessageType::HistoryRemoveSubscription => &[History, RemoveSubscription],
            _ => &[],
        }
    }

    fn has_flag(&self, flag: MessageTypeFlag) -> bool {
        self.flags().contains(&flag)
    }

    pub fn is_data(&self) -> bool {
        self.has_flag(MessageTypeFlag::Data)
    }

    pub fn is_subscription(&self) -> bool {
        self.is_subscription_add() || self.is_subscription_remove()
    }

    pub fn is_subscription_add(&self) -> bool {
        self.has_flag(MessageTypeFlag::AddSubscription)
    }

    pub fn is_subscription_remove(&self) -> bool {
        self.has_flag(MessageTypeFlag::RemoveSubscription)
    }

    /// Whether the message body is a list of records
    pub fn has_records(&self) -> bool {
        self.is_data() || self.is_subscription()
    }

    /// Contract this message belongs to, `None` for non-record and raw messages
    pub fn contract(&self) -> Option<Contract> {
        if self.has_flag(MessageTypeFlag::Ticker) {
            Some(Contract::Ticker)
        } else if self.has_flag(MessageTypeFlag::Stream) {
            Some(Contract::Stream)
        } else if self.has_flag(MessageTypeFlag::History) {
            Some(Contract::History)
        } else {
            None
        }
    }

    pub fn for_data(contract: Contract) -> MessageType {
        match contract {
            Contract::Ticker => MessageType::TickerData,
            Contract::Stream => MessageType::StreamData,
            Contract::History => MessageType::HistoryData,
        }
    }

    pub fn for_add_subscription(contract: Contract) -> MessageType {
        match contract {
            Contract::Ticker => MessageType::TickerAddSubscription,
            Contract::Stream => MessageType::StreamAddSubscription,
            Contract::History => MessageType::HistoryAddSubscription,
        }
    }

    pub fn for_remove_subscription(contract: Contract) -> MessageType {
        match contract {
            Contract::Ticker => MessageType::TickerRemoveSubscription,
            Contract::Stream => MessageType::StreamRemoveSubscription,
            Contract::History => MessageType::HistoryRemoveSubscription,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
