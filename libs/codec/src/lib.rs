//! # QTP Wire Codec
//!
//! ## Purpose
//!
//! Pure encoding layer of the QTP transport core:
//! - Compact variable-length integers and UTF strings ([`io`])
//! - Shared property maps ([`Properties`])
//! - Handshake descriptors ([`ProtocolDescriptor`], [`MessageDescriptor`]) in
//!   binary and whitespace-token text form
//! - `HEARTBEAT` bodies ([`HeartbeatPayload`])
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → [codec] → messaging/pump → network
//!     ↑           ↓
//! MessageType  descriptors, compact primitives
//! ```
//!
//! No I/O and no shared state: every function works on a caller-owned buffer
//! and is safe to use from whichever thread owns it.
//!
//! ## Failure Model
//!
//! Every [`ProtocolError`] means the byte or token stream is corrupt. Callers
//! report it as a corrupted stream and tear the connection down; nothing in
//! this crate tries to resynchronise.

pub mod error;
pub mod heartbeat;
pub mod io;
pub mod message_descriptor;
pub mod properties;
pub mod protocol_descriptor;
pub mod text;

pub use error::{ProtocolError, ProtocolResult};
pub use heartbeat::HeartbeatPayload;
pub use io::{compact_int_size, BufferedInput, BufferedOutput};
pub use message_descriptor::{MessageDescriptor, UNKNOWN_ID};
pub use properties::Properties;
pub use protocol_descriptor::{MessageView, ProtocolDescriptor, MAGIC};
pub use text::{join_text_tokens, split_text_tokens};
