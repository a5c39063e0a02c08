//! `HEARTBEAT` message body
//!
//! A compact content bitmask says which optional fields follow, in bit order.

use crate::{BufferedInput, BufferedOutput, ProtocolError, ProtocolResult};

const CONTENT_TIME_MILLIS: i32 = 0x01;
const CONTENT_TIME_MARK: i32 = 0x02;
const CONTENT_DELTA_MARK: i32 = 0x04;
const CONTENT_LAG_MARK: i32 = 0x08;
const CONTENT_ALL: i32 = CONTENT_TIME_MILLIS | CONTENT_TIME_MARK | CONTENT_DELTA_MARK | CONTENT_LAG_MARK;

/// Liveness and clock-skew probe exchanged on idle connections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeartbeatPayload {
    pub time_millis: Option<i64>,
    pub time_mark: Option<i32>,
    pub delta_mark: Option<i32>,
    pub lag_mark: Option<i32>,
}

impl HeartbeatPayload {
    pub fn is_empty(&self) -> bool {
        self.content() == 0
    }

    fn content(&self) -> i32 {
        let mut content = 0;
        if self.time_millis.is_some() {
            content |= CONTENT_TIME_MILLIS;
        }
        if self.time_mark.is_some() {
            content |= CONTENT_TIME_MARK;
        }
        if self.delta_mark.is_some() {
            content |= CONTENT_DELTA_MARK;
        }
        if self.lag_mark.is_some() {
            content |= CONTENT_LAG_MARK;
        }
        content
    }

    pub fn compose_to(&self, out: &mut BufferedOutput) {
        out.write_compact_int(self.content());
        if let Some(millis) = self.time_millis {
            out.write_i64(millis);
        }
        for mark in [self.time_mark, self.delta_mark, self.lag_mark].into_iter().flatten() {
            out.write_compact_int(mark);
        }
    }

    /// Parses a heartbeat body; an empty body is a valid empty heartbeat
    pub fn parse_from(input: &mut BufferedInput<'_>) -> ProtocolResult<Self> {
        if !input.has_available() {
            return Ok(Self::default());
        }
        let content = input.read_compact_int()?;
        if content & !CONTENT_ALL != 0 {
            return Err(ProtocolError::InvalidHeartbeatContent { content });
        }
        let mut payload = Self::default();
        if content & CONTENT_TIME_MILLIS != 0 {
            payload.time_millis = Some(input.read_i64()?);
        }
        if content & CONTENT_TIME_MARK != 0 {
            payload.time_mark = Some(input.read_compact_int()?);
        }
        if content & CONTENT_DELTA_MARK != 0 {
            payload.delta_mark = Some(input.read_compact_int()?);
        }
        if content & CONTENT_LAG_MARK != 0 {
            payload.lag_mark = Some(input.read_compact_int()?);
        }
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_content() {
        let payload = HeartbeatPayload {
            time_millis: Some(1_700_000_000_000),
            lag_mark: Some(-5),
            ..Default::default()
        };
        let mut out = BufferedOutput::new();
        payload.compose_to(&mut out);
        assert_eq!(out.as_slice()[0], 0x09);
        assert_eq!(out.len(), 1 + 8 + 1);

        let parsed = HeartbeatPayload::parse_from(&mut BufferedInput::new(out.as_slice())).unwrap();
        assert_eq!(parsed, payload);
    }

    #[test]
    fn test_empty_body() {
        let parsed = HeartbeatPayload::parse_from(&mut BufferedInput::new(&[])).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_unknown_content_bits() {
        let err = HeartbeatPayload::parse_from(&mut BufferedInput::new(&[0x10])).unwrap_err();
        assert_eq!(err, ProtocolError::InvalidHeartbeatContent { content: 0x10 });
    }
}
