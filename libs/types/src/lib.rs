//! # QTP Types
//!
//! Canonical identities and the record model shared by every layer of the QTP
//! transport core.
//!
//! ## Contents
//!
//! - **Contracts**: delivery semantics of a subscription (`Ticker`, `Stream`, `History`)
//! - **Message types**: the canonical `{id, name}` table used to identify QTP messages
//!   on the wire, plus the contract dispatch table (data / add / remove subscription)
//! - **Record model**: data and subscription records, pull providers, capacity-aware
//!   visitors and inbound iterators
//! - **Data scheme**: record layout used to resolve record ids to names
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → libs/codec → libs/messaging/pump → libs/network
//!     ↑             ↓               ↓                  ↓
//! Identities   Descriptors    Provider/Visitor    Worker threads
//! Records      Compact ints   Consumer/Listener   Connection state
//! ```
//!
//! This crate has no I/O and no threading of its own.

pub mod protocol;
pub mod records;

pub use protocol::contract::Contract;
pub use protocol::message_type::{MessageType, MessageTypeFlag};
pub use records::{
    DataIterator, DataProvider, DataRecord, DataScheme, DataVisitor, RecordBuffer,
    RecordIterator, RecordProvider, RecordVisitor, SubscriptionIterator, SubscriptionProvider,
    SubscriptionRecord, SubscriptionVisitor,
};
