//! Handshake descriptor carried by `DESCRIBE_PROTOCOL`
//!
//! ## Binary layout
//!
//! ```text
//! "DXP3" | properties | send count | send descriptors | receive count | receive descriptors
//! ```
//!
//! The text form has no magic: property tokens, then `+NAME` descriptors for
//! messages this side sends, then `-NAME` descriptors for messages it receives.
//!
//! Message descriptors inherit the protocol's own properties on read. The
//! inheritance is a lookup through [`MessageView`], never a copy.

use crate::{BufferedInput, BufferedOutput, MessageDescriptor, ProtocolError, ProtocolResult, Properties};
use std::fmt;
use types::{MessageType, MessageTypeFlag};

pub const MAGIC: &[u8; 4] = b"DXP3";

pub const TYPE_PROPERTY: &str = "type";
pub const VERSION_PROPERTY: &str = "version";
pub const OPT_PROPERTY: &str = "opt";
pub const TIME_PROPERTY: &str = "time";
pub const NAME_PROPERTY: &str = "name";
pub const FILTER_PROPERTY: &str = "filter";
pub const STRIPE_PROPERTY: &str = "stripe";
pub const SERVICES_PROPERTY: &str = "services";
pub const AUTHORIZATION_PROPERTY: &str = "authorization";
pub const AUTHENTICATION_PROPERTY: &str = "authentication";
pub const RMI_PROPERTY: &str = "rmi";

const SEND_PREFIX: &str = "+";
const RECEIVE_PREFIX: &str = "-";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtocolDescriptor {
    properties: Properties,
    send: Vec<MessageDescriptor>,
    receive: Vec<MessageDescriptor>,
}

impl ProtocolDescriptor {
    /// Descriptor for this side, stamped with the protocol `type` and our version
    pub fn new_self(protocol_type: &str) -> Self {
        let mut desc = Self::default();
        desc.set_property(TYPE_PROPERTY, protocol_type);
        desc.set_property(VERSION_PROPERTY, concat!("QTP-", env!("CARGO_PKG_VERSION")));
        desc
    }

    /// Descriptor to send back to a peer, seeded from what it previously sent
    pub fn new_peer(previously_read: Option<&ProtocolDescriptor>) -> Self {
        previously_read.cloned().unwrap_or_default()
    }

    /// Peer descriptor where every record-carrying send message is folded into `read_as`.
    ///
    /// Used when a stream is replayed under a different contract: all record
    /// messages collapse into one, keeping their properties.
    pub fn new_peer_read_as(original: &ProtocolDescriptor, read_as: MessageType) -> Self {
        let mut result = original.clone();
        let mut folded = MessageDescriptor::for_type(read_as);
        result.send.retain(|md| {
            let has_records = md.message_type().is_some_and(|t| t.has_records());
            if has_records {
                folded.properties_mut().extend_from(md.properties());
            }
            !has_records
        });
        result.add_send(folded);
        result
    }

    pub fn new_message_descriptor(&self, message_type: MessageType) -> MessageDescriptor {
        MessageDescriptor::for_type(message_type)
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.set(key, value);
    }

    pub fn remove_property(&mut self, key: &str) -> Option<String> {
        self.properties.remove(key)
    }

    pub fn send_messages(&self) -> &[MessageDescriptor] {
        &self.send
    }

    pub fn receive_messages(&self) -> &[MessageDescriptor] {
        &self.receive
    }

    /// Adds a send descriptor; returns `false` if one with the same id is already listed
    pub fn add_send(&mut self, md: MessageDescriptor) -> bool {
        add_unique(&mut self.send, md)
    }

    /// Adds a receive descriptor; returns `false` if one with the same id is already listed
    pub fn add_receive(&mut self, md: MessageDescriptor) -> bool {
        add_unique(&mut self.receive, md)
    }

    pub fn can_send(&self, message_type: MessageType) -> bool {
        self.get_send(message_type).is_some()
    }

    pub fn can_receive(&self, message_type: MessageType) -> bool {
        self.get_receive(message_type).is_some()
    }

    pub fn get_send(&self, message_type: MessageType) -> Option<&MessageDescriptor> {
        find_resolved(&self.send, message_type)
    }

    pub fn get_receive(&self, message_type: MessageType) -> Option<&MessageDescriptor> {
        find_resolved(&self.receive, message_type)
    }

    /// Resolved send types in listing order; unresolved descriptors are left out
    pub fn send_set(&self) -> Vec<MessageType> {
        resolved_set(&self.send)
    }

    pub fn receive_set(&self) -> Vec<MessageType> {
        resolved_set(&self.receive)
    }

    /// Effective properties of `md` as seen through this descriptor
    pub fn message_view<'a>(&'a self, md: &'a MessageDescriptor) -> MessageView<'a> {
        MessageView {
            message: md,
            parent: &self.properties,
        }
    }

    /// Composes the descriptor including its magic
    pub fn compose_to(&self, out: &mut BufferedOutput) {
        out.write_bytes(MAGIC);
        self.properties.compose_to(out);
        compose_list(out, &self.send);
        compose_list(out, &self.receive);
    }

    /// Parses a descriptor including its magic
    pub fn parse_from(input: &mut BufferedInput<'_>) -> ProtocolResult<Self> {
        let magic = input.read_bytes(MAGIC.len()).map_err(|_| ProtocolError::InvalidMagic {
            expected: String::from_utf8_lossy(MAGIC).into_owned(),
            actual: String::new(),
        })?;
        if magic != MAGIC {
            return Err(ProtocolError::InvalidMagic {
                expected: String::from_utf8_lossy(MAGIC).into_owned(),
                actual: String::from_utf8_lossy(magic).into_owned(),
            });
        }
        let mut desc = Self::default();
        desc.properties.parse_from(input)?;
        parse_list(input, &mut desc.send)?;
        parse_list(input, &mut desc.receive)?;
        Ok(desc)
    }

    /// Renders the descriptor as text tokens, without magic
    pub fn to_text_tokens(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        self.properties.to_text_tokens(&mut tokens);
        for md in &self.send {
            md.to_text_tokens(&mut tokens, SEND_PREFIX);
        }
        for md in &self.receive {
            md.to_text_tokens(&mut tokens, RECEIVE_PREFIX);
        }
        tokens
    }

    /// Adds everything described by `tokens[i..]`, returning the next unconsumed index
    pub fn append_from_text_tokens(&mut self, tokens: &[String], i: usize) -> ProtocolResult<usize> {
        let i = self.properties.append_from_text_tokens(tokens, i);
        let i = append_list_from_text(tokens, SEND_PREFIX, &mut self.send, i)?;
        append_list_from_text(tokens, RECEIVE_PREFIX, &mut self.receive, i)
    }
}

fn add_unique(list: &mut Vec<MessageDescriptor>, md: MessageDescriptor) -> bool {
    if list.contains(&md) {
        return false;
    }
    list.push(md);
    true
}

fn find_resolved(list: &[MessageDescriptor], message_type: MessageType) -> Option<&MessageDescriptor> {
    list.iter().find(|md| md.message_type() == Some(message_type))
}

fn resolved_set(list: &[MessageDescriptor]) -> Vec<MessageType> {
    let mut set = Vec::new();
    for t in list.iter().filter_map(MessageDescriptor::message_type) {
        if !set.contains(&t) {
            set.push(t);
        }
    }
    set
}

fn compose_list(out: &mut BufferedOutput, list: &[MessageDescriptor]) {
    out.write_compact_int(list.len() as i32);
    for md in list {
        md.compose_to(out);
    }
}

fn parse_list(input: &mut BufferedInput<'_>, list: &mut Vec<MessageDescriptor>) -> ProtocolResult<()> {
    let size = input.read_size("message descriptor count")?;
    for _ in 0..size {
        add_unique(list, MessageDescriptor::parse_from(input)?);
    }
    Ok(())
}

fn append_list_from_text(
    tokens: &[String],
    prefix: &str,
    list: &mut Vec<MessageDescriptor>,
    mut i: usize,
) -> ProtocolResult<usize> {
    while tokens.get(i).is_some_and(|t| t.starts_with(prefix)) {
        let (md, next) = MessageDescriptor::parse_text_tokens(tokens, prefix, i)?;
        add_unique(list, md);
        i = next;
    }
    Ok(i)
}

impl fmt::Display for ProtocolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, (key, value)) in self.properties.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            // Only the scheme of an authorization header is printed
            let value = if key == AUTHORIZATION_PROPERTY {
                value.split(' ').next().unwrap_or_default()
            } else {
                value
            };
            write!(f, "{key}={value}")?;
        }
        f.write_str("] sending [")?;
        let send_types = self.send_set();
        let flags = [
            MessageTypeFlag::Ticker,
            MessageTypeFlag::Stream,
            MessageTypeFlag::History,
            MessageTypeFlag::Data,
            MessageTypeFlag::AddSubscription,
            MessageTypeFlag::RemoveSubscription,
        ]
        .into_iter()
        .filter(|flag| send_types.iter().any(|t| t.flags().contains(flag)));
        for (i, flag) in flags.enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{flag:?}")?;
        }
        f.write_str("]")
    }
}

/// Message properties with fallback to the owning protocol descriptor
#[derive(Debug, Clone, Copy)]
pub struct MessageView<'a> {
    message: &'a MessageDescriptor,
    parent: &'a Properties,
}

impl<'a> MessageView<'a> {
    pub fn message(&self) -> &'a MessageDescriptor {
        self.message
    }

    /// Message's own value, else the protocol's
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.message.property(key).or_else(|| self.parent.get(key))
    }

    /// Merged snapshot: protocol properties overridden by the message's own
    pub fn materialize(&self) -> Properties {
        let mut merged = self.parent.clone();
        merged.extend_from(self.message.properties());
        merged
    }
}
