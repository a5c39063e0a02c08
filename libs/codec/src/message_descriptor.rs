//! Handshake description of a single supported message
//!
//! Binary form: compact id, UTF name, properties. A peer may send
//! [`UNKNOWN_ID`] and identify the message purely by name; the id is then
//! adopted from the canonical table on decode.

use crate::{BufferedInput, BufferedOutput, ProtocolError, ProtocolResult, Properties};
use std::fmt;
use std::hash::{Hash, Hasher};
use tracing::debug;
use types::MessageType;

/// Id sentinel for messages identified by name only
pub const UNKNOWN_ID: i32 = -1;

#[derive(Debug, Clone)]
pub struct MessageDescriptor {
    id: i32,
    name: String,
    properties: Properties,
}

impl MessageDescriptor {
    pub fn new() -> Self {
        Self::with_id_and_name(UNKNOWN_ID, "")
    }

    pub fn with_id_and_name(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            properties: Properties::new(),
        }
    }

    pub fn for_type(message_type: MessageType) -> Self {
        Self::with_id_and_name(message_type.id(), message_type.name())
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_id(&mut self, id: i32) {
        self.id = id;
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_message_type(&mut self, message_type: MessageType) {
        self.id = message_type.id();
        self.name = message_type.name().to_string();
    }

    /// Canonical type this descriptor stands for.
    ///
    /// An unknown id resolves by name. A known id resolves only when the
    /// canonical name for it equals the stored name; any disagreement leaves
    /// the descriptor unresolved.
    pub fn message_type(&self) -> Option<MessageType> {
        if self.id == UNKNOWN_ID {
            return MessageType::find_by_name(&self.name);
        }
        MessageType::find_by_id(self.id).filter(|t| t.name() == self.name)
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.properties.set(key, value)
    }

    pub fn remove_property(&mut self, key: &str) -> Option<String> {
        self.properties.remove(key)
    }

    /// Own properties only, without anything inherited from the protocol descriptor
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    pub fn compose_to(&self, out: &mut BufferedOutput) {
        out.write_compact_int(self.id);
        out.write_utf_string(&self.name);
        self.properties.compose_to(out);
    }

    pub fn parse_from(input: &mut BufferedInput<'_>) -> ProtocolResult<Self> {
        let id = input.read_compact_int()?;
        let offset = input.position();
        let name = input
            .read_utf_string()?
            .ok_or_else(|| ProtocolError::invalid_size(-1, offset, "message descriptor name"))?;
        let mut md = Self::with_id_and_name(id, name);
        md.properties.parse_from(input)?;
        if md.id == UNKNOWN_ID {
            if let Some(t) = MessageType::find_by_name(&md.name) {
                md.id = t.id();
            }
        }
        if md.message_type().is_none() {
            debug!(id = md.id, name = %md.name, "Unresolved message descriptor");
        }
        Ok(md)
    }

    /// Appends `prefix + name` followed by one token per property
    pub fn to_text_tokens(&self, tokens: &mut Vec<String>, prefix: &str) {
        tokens.push(format!("{prefix}{}", self.name));
        self.properties.to_text_tokens(tokens);
    }

    /// Parses the descriptor whose name token is at `start`.
    ///
    /// Returns the descriptor and the index of the first token it did not consume.
    pub fn parse_text_tokens(tokens: &[String], prefix: &str, start: usize) -> ProtocolResult<(Self, usize)> {
        let token = tokens
            .get(start)
            .ok_or_else(|| ProtocolError::invalid_text_token(start, "", "missing message descriptor"))?;
        let name = token
            .strip_prefix(prefix)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                ProtocolError::invalid_text_token(start, token.as_str(), format!("expected {prefix:?} and a message name"))
            })?;
        let id = MessageType::find_by_name(name).map_or(UNKNOWN_ID, |t| t.id());
        let mut md = Self::with_id_and_name(id, name);
        let next = md.properties.append_from_text_tokens(tokens, start + 1);
        Ok((md, next))
    }
}

impl Default for MessageDescriptor {
    fn default() -> Self {
        Self::new()
    }
}

// Wire identity: descriptors are deduplicated by id, names are not compared.
impl PartialEq for MessageDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MessageDescriptor {}

impl Hash for MessageDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for MessageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.properties.is_empty() {
            write!(f, "{}", self.properties)?;
        }
        Ok(())
    }
}
