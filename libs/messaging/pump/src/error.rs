use codec::ProtocolError;
use thiserror::Error;
use types::MessageType;

/// Message pump failures
///
/// Stream-level variants mean the connection must be torn down; message-level
/// variants carry the offending message's type id.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PumpError {
    #[error("Corrupted stream: {0}")]
    CorruptedStream(#[from] ProtocolError),

    #[error("Frame too large: {size}B exceeds limit of {limit}B")]
    FrameTooLarge { size: usize, limit: usize },

    #[error("Corrupted message of type {type_id}: {reason}")]
    CorruptedMessage { type_id: i32, reason: String },

    #[error("Unknown message type {type_id}")]
    UnknownMessage { type_id: i32 },

    #[error("Message type {0} does not carry records of this kind")]
    NotRecordMessage(MessageType),
}

impl PumpError {
    /// Whether the error leaves the byte stream unusable
    pub fn is_stream_corruption(&self) -> bool {
        matches!(self, PumpError::CorruptedStream(_) | PumpError::FrameTooLarge { .. })
    }

    /// Type id of the message the error is about, if it concerns a single message
    pub fn type_id(&self) -> Option<i32> {
        match self {
            PumpError::CorruptedMessage { type_id, .. } | PumpError::UnknownMessage { type_id } => Some(*type_id),
            PumpError::NotRecordMessage(t) => Some(t.id()),
            _ => None,
        }
    }
}

pub type PumpResult<T> = std::result::Result<T, PumpError>;
