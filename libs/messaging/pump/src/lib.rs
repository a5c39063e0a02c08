//! # QTP Message Pump
//!
//! Pull protocol between producers and a transport thread:
//!
//! ```text
//! producer ──add──▶ MessageProvider ──listener──▶ "messages available"
//!                        │
//! transport thread ──retrieve_messages(visitor)──▶ BinaryComposer ──▶ bytes
//!
//! bytes ──▶ BinaryParser ──▶ MessageConsumer (records, handshake, error signals)
//! ```
//!
//! Memory stays bounded because the transport only pulls what fits into its
//! output buffer. A provider answers every retrieval with "more remains" or
//! "drained"; absence of data is signalled through the listener, never by
//! blocking the caller.

pub mod buffered;
pub mod composer;
pub mod consumer;
pub mod error;
pub mod frame;
pub mod mask;
pub mod parser;
pub mod provider;
pub mod test_utils;
pub mod visitor;

pub use buffered::BufferedProvider;
pub use composer::BinaryComposer;
pub use consumer::MessageConsumer;
pub use error::{PumpError, PumpResult};
pub use mask::MessageMask;
pub use parser::BinaryParser;
pub use provider::{ListenerSlot, MessageListener, MessageProvider};
pub use visitor::MessageVisitor;
