//! Record model consumed by the message pump
//!
//! The storage engine that owns subscriptions and market data lives outside
//! the transport core. This module only fixes the shape of what crosses the
//! boundary: records, pull-style providers that drain into capacity-aware
//! visitors, and iterators handed to inbound consumers.

mod buffer;
mod scheme;

pub use buffer::RecordBuffer;
pub use scheme::DataScheme;

/// One market data record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataRecord {
    /// Index of the record layout in the [`DataScheme`]
    pub record_id: i32,
    pub symbol: String,
    pub fields: Vec<i32>,
}

impl DataRecord {
    pub fn new(record_id: i32, symbol: impl Into<String>, fields: Vec<i32>) -> Self {
        Self {
            record_id,
            symbol: symbol.into(),
            fields,
        }
    }
}

/// One subscription entry (record + symbol, with a start time for history)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubscriptionRecord {
    pub record_id: i32,
    pub symbol: String,
    pub time: i64,
}

impl SubscriptionRecord {
    pub fn new(record_id: i32, symbol: impl Into<String>, time: i64) -> Self {
        Self {
            record_id,
            symbol: symbol.into(),
            time,
        }
    }
}

/// Capacity-aware sink that a provider drains into
pub trait RecordVisitor<R> {
    /// Whether another record can be accepted right now
    fn has_capacity(&self) -> bool;

    fn visit_record(&mut self, record: &R);
}

/// Pull-style record source
pub trait RecordProvider<R> {
    /// Moves as many records as the visitor accepts.
    ///
    /// Returns `true` if records remain after the visitor ran out of capacity,
    /// `false` once everything available was drained.
    fn retrieve(&mut self, visitor: &mut dyn RecordVisitor<R>) -> bool;
}

/// Inbound record sequence handed to a consumer for a single message
pub trait RecordIterator<R> {
    fn next_record(&mut self) -> Option<R>;
}

pub type DataVisitor<'a> = dyn RecordVisitor<DataRecord> + 'a;
pub type DataProvider<'a> = dyn RecordProvider<DataRecord> + 'a;
pub type DataIterator<'a> = dyn RecordIterator<DataRecord> + 'a;
pub type SubscriptionVisitor<'a> = dyn RecordVisitor<SubscriptionRecord> + 'a;
pub type SubscriptionProvider<'a> = dyn RecordProvider<SubscriptionRecord> + 'a;
pub type SubscriptionIterator<'a> = dyn RecordIterator<SubscriptionRecord> + 'a;
