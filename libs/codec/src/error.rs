//! Protocol-level errors for QTP wire decoding
//!
//! Every error in this module describes stream corruption: once one of them
//! is produced the byte or token stream can no longer be trusted and the
//! connection that carried it must be torn down. Each variant includes the
//! position and enough context to diagnose the peer that produced it.

use thiserror::Error;

/// Wire decoding errors with diagnostic context
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProtocolError {
    /// Input ended before a complete value could be read
    #[error("Truncated input: need {need} bytes, got {got} at offset {offset} (context: {context})")]
    Truncated {
        need: usize,
        got: usize,
        offset: usize,
        context: String,
    },

    /// Compact integer uses a prefix that is not valid for a 32-bit value
    #[error("Malformed compact integer at offset {offset}: prefix byte {prefix:#04x} ({diagnosis})")]
    MalformedCompactInt {
        offset: usize,
        prefix: u8,
        diagnosis: String,
    },

    /// A count or length field is negative or absurdly large
    #[error("Invalid size {size} at offset {offset} (context: {context})")]
    InvalidSize {
        size: i64,
        offset: usize,
        context: String,
    },

    /// Handshake does not start with the expected magic
    #[error("Invalid protocol descriptor magic: expected {expected:?}, got {actual:?}. Wrong protocol")]
    InvalidMagic { expected: String, actual: String },

    /// String bytes are not valid UTF-8
    #[error("Invalid UTF-8 string at offset {offset}: {reason}")]
    InvalidUtf8 { offset: usize, reason: String },

    /// A text token is not what the grammar expects at this position
    #[error("Invalid text token {index} {token:?}: {reason}")]
    InvalidTextToken {
        index: usize,
        token: String,
        reason: String,
    },

    /// Heartbeat content bitmask carries unknown bits
    #[error("Invalid heartbeat content {content:#x}")]
    InvalidHeartbeatContent { content: i32 },
}

impl ProtocolError {
    pub fn truncated(need: usize, got: usize, offset: usize, context: impl Into<String>) -> Self {
        Self::Truncated {
            need,
            got,
            offset,
            context: context.into(),
        }
    }

    /// Create MalformedCompactInt error with a diagnosis derived from the prefix
    pub fn malformed_compact_int(offset: usize, prefix: u8) -> Self {
        let diagnosis = if prefix >= 0xF8 {
            "compact long encoding where an int was expected"
        } else {
            "data corruption or wrong protocol"
        };
        Self::MalformedCompactInt {
            offset,
            prefix,
            diagnosis: diagnosis.to_string(),
        }
    }

    pub fn invalid_size(size: i64, offset: usize, context: impl Into<String>) -> Self {
        Self::InvalidSize {
            size,
            offset,
            context: context.into(),
        }
    }

    pub fn invalid_text_token(index: usize, token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTextToken {
            index,
            token: token.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for protocol operations
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_int_diagnosis() {
        let err = ProtocolError::malformed_compact_int(3, 0xF9);
        assert!(err.to_string().contains("compact long"));
        assert!(err.to_string().contains("offset 3"));

        let err = ProtocolError::malformed_compact_int(0, 0xF0);
        assert!(err.to_string().contains("corruption"));
    }

    #[test]
    fn test_truncated_formatting() {
        let err = ProtocolError::truncated(4, 1, 10, "utf string body");
        assert_eq!(
            err.to_string(),
            "Truncated input: need 4 bytes, got 1 at offset 10 (context: utf string body)"
        );
    }
}
