use crate::frame::{read_data_records, read_subscription_records};
use crate::{MessageConsumer, PumpError, PumpResult};
use bytes::BytesMut;
use codec::{BufferedInput, HeartbeatPayload, ProtocolDescriptor, ProtocolError};
use qtp_config::{ErrorPolicy, PumpConfig};
use tracing::{debug, error, warn};
use types::MessageType;

/// Splits received bytes into frames and dispatches them to a consumer.
///
/// Bytes of an incomplete trailing frame are kept until more arrive.
#[derive(Debug)]
pub struct BinaryParser {
    buffer: BytesMut,
    max_frame_size: usize,
    policy: ErrorPolicy,
}

enum Frame {
    Complete { header: usize, length: usize },
    Incomplete,
}

impl BinaryParser {
    pub fn new(config: &PumpConfig, policy: ErrorPolicy) -> Self {
        Self {
            buffer: BytesMut::new(),
            max_frame_size: config.max_frame_size,
            policy,
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Bytes received but not yet parsed
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Dispatches every complete frame, returning how many were processed.
    ///
    /// An error means the connection has to close: either the stream is
    /// corrupt, or the error policy refused to skip a bad message.
    pub fn parse(&mut self, consumer: &mut dyn MessageConsumer) -> PumpResult<usize> {
        let mut processed = 0;
        loop {
            let (header, length) = match self.next_frame() {
                Ok(Frame::Complete { header, length }) => (header, length),
                Ok(Frame::Incomplete) => return Ok(processed),
                Err(e) => return Err(self.corrupted_stream(consumer, e)),
            };
            let frame = self.buffer.split_to(header + length).freeze();
            let mut input = BufferedInput::new(&frame[header..]);
            let type_id = match input.read_compact_int() {
                Ok(type_id) => type_id,
                Err(e) => return Err(self.corrupted_stream(consumer, e.into())),
            };
            let body = &frame[header + input.position()..];
            self.dispatch(consumer, type_id, body)?;
            processed += 1;
        }
    }

    fn next_frame(&self) -> PumpResult<Frame> {
        let mut input = BufferedInput::new(&self.buffer);
        let length = match input.read_compact_int() {
            Ok(length) => length,
            Err(ProtocolError::Truncated { .. }) => return Ok(Frame::Incomplete),
            Err(e) => return Err(e.into()),
        };
        if length <= 0 {
            return Err(ProtocolError::invalid_size(length as i64, 0, "frame length").into());
        }
        let length = length as usize;
        if length > self.max_frame_size {
            return Err(PumpError::FrameTooLarge {
                size: length,
                limit: self.max_frame_size,
            });
        }
        if input.remaining() < length {
            return Ok(Frame::Incomplete);
        }
        Ok(Frame::Complete {
            header: input.position(),
            length,
        })
    }

    fn dispatch(&self, consumer: &mut dyn MessageConsumer, type_id: i32, body: &[u8]) -> PumpResult<()> {
        let mut input = BufferedInput::new(body);
        match MessageType::find_by_id(type_id) {
            Some(MessageType::DescribeProtocol) => match ProtocolDescriptor::parse_from(&mut input) {
                Ok(desc) => consumer.process_describe_protocol(&desc, true),
                Err(e) => return self.corrupted_message(consumer, type_id, e.to_string()),
            },
            Some(MessageType::Heartbeat) => match HeartbeatPayload::parse_from(&mut input) {
                Ok(heartbeat) => consumer.process_heartbeat(&heartbeat),
                Err(e) => return self.corrupted_message(consumer, type_id, e.to_string()),
            },
            Some(message) if message.is_data() && message.contract().is_some() => {
                match read_data_records(&mut input) {
                    Ok(mut records) => consumer.process_data(&mut records, message),
                    Err(e) => return self.corrupted_message(consumer, type_id, e.to_string()),
                }
            }
            Some(message) if message.is_subscription() => match read_subscription_records(&mut input) {
                Ok(mut records) => consumer.process_subscription(&mut records, message),
                Err(e) => return self.corrupted_message(consumer, type_id, e.to_string()),
            },
            _ => {
                if !consumer.process_other_message(type_id, body) {
                    return self.unknown_message(consumer, type_id);
                }
            }
        }
        Ok(())
    }

    fn corrupted_stream(&mut self, consumer: &mut dyn MessageConsumer, e: PumpError) -> PumpError {
        error!(error = %e, pending = self.buffer.len(), "Corrupted stream, dropping unparsed bytes");
        self.buffer.clear();
        consumer.handle_corrupted_stream();
        e
    }

    fn corrupted_message(&self, consumer: &mut dyn MessageConsumer, type_id: i32, reason: String) -> PumpResult<()> {
        warn!(type_id, %reason, "Corrupted message");
        consumer.handle_corrupted_message(type_id);
        if self.policy.skip_corrupted_messages {
            return Ok(());
        }
        Err(PumpError::CorruptedMessage { type_id, reason })
    }

    fn unknown_message(&self, consumer: &mut dyn MessageConsumer, type_id: i32) -> PumpResult<()> {
        debug!(type_id, "Unknown message");
        consumer.handle_unknown_message(type_id);
        if self.policy.skip_unknown_messages {
            return Ok(());
        }
        self.corrupted_message(consumer, type_id, PumpError::UnknownMessage { type_id }.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::write_frame;
    use crate::test_utils::{ConsumerEvent, RecordingConsumer};
    use codec::BufferedOutput;

    fn parser(policy: ErrorPolicy) -> BinaryParser {
        BinaryParser::new(&PumpConfig::default(), policy)
    }

    fn frame(type_id: i32, body: &[u8]) -> Vec<u8> {
        let mut out = BufferedOutput::new();
        write_frame(&mut out, type_id, body);
        out.as_slice().to_vec()
    }

    #[test]
    fn test_incomplete_frame_is_retained() {
        let bytes = frame(MessageType::Heartbeat.id(), &[0]);
        let mut parser = parser(ErrorPolicy::default());
        let mut consumer = RecordingConsumer::new();

        parser.feed(&bytes[..2]);
        assert_eq!(parser.parse(&mut consumer).unwrap(), 0);
        assert_eq!(parser.pending_bytes(), 2);

        parser.feed(&bytes[2..]);
        assert_eq!(parser.parse(&mut consumer).unwrap(), 1);
        assert_eq!(parser.pending_bytes(), 0);
        assert!(matches!(consumer.events()[0], ConsumerEvent::Heartbeat(_)));
    }

    #[test]
    fn test_corrupted_message_is_contained() {
        let mut bytes = frame(MessageType::TickerData.id(), &[0x05]);
        bytes.extend(frame(MessageType::Heartbeat.id(), &[]));
        let mut parser = parser(ErrorPolicy::default());
        let mut consumer = RecordingConsumer::new();
        parser.feed(&bytes);

        assert_eq!(parser.parse(&mut consumer).unwrap(), 2);
        assert_eq!(consumer.events()[0], ConsumerEvent::CorruptedMessage(MessageType::TickerData.id()));
        assert!(matches!(consumer.events()[1], ConsumerEvent::Heartbeat(_)));
    }

    #[test]
    fn test_corrupted_message_closes_when_not_skipped() {
        let mut parser = parser(ErrorPolicy {
            skip_corrupted_messages: false,
            skip_unknown_messages: true,
        });
        let mut consumer = RecordingConsumer::new();
        parser.feed(&frame(MessageType::StreamAddSubscription.id(), &[0x01]));
        let err = parser.parse(&mut consumer).unwrap_err();
        assert_eq!(err.type_id(), Some(MessageType::StreamAddSubscription.id()));
        assert!(!err.is_stream_corruption());
    }

    #[test]
    fn test_unknown_message_skipped_by_default() {
        let mut parser = parser(ErrorPolicy::default());
        let mut consumer = RecordingConsumer::new();
        parser.feed(&frame(42, b"opaque"));
        assert_eq!(parser.parse(&mut consumer).unwrap(), 1);
        assert_eq!(consumer.events(), [ConsumerEvent::UnknownMessage(42)]);
    }

    #[test]
    fn test_unknown_message_raised_to_corrupted() {
        let mut parser = parser(ErrorPolicy {
            skip_corrupted_messages: false,
            skip_unknown_messages: false,
        });
        let mut consumer = RecordingConsumer::new();
        parser.feed(&frame(42, b"opaque"));
        assert!(parser.parse(&mut consumer).is_err());
        assert_eq!(
            consumer.events(),
            [ConsumerEvent::UnknownMessage(42), ConsumerEvent::CorruptedMessage(42)]
        );
    }

    #[test]
    fn test_recognized_other_message() {
        let mut parser = parser(ErrorPolicy::default());
        let mut consumer = RecordingConsumer::new().recognizing(42);
        parser.feed(&frame(42, b"opaque"));
        parser.parse(&mut consumer).unwrap();
        assert_eq!(consumer.events(), [ConsumerEvent::Other(42, b"opaque".to_vec())]);
    }

    #[test]
    fn test_corrupted_stream_stops_parsing() {
        let mut bytes = vec![0xf8, 0, 0, 0, 0];
        bytes.extend(frame(MessageType::Heartbeat.id(), &[]));
        let mut parser = parser(ErrorPolicy::default());
        let mut consumer = RecordingConsumer::new();
        parser.feed(&bytes);

        let err = parser.parse(&mut consumer).unwrap_err();
        assert!(err.is_stream_corruption());
        assert_eq!(consumer.events(), [ConsumerEvent::CorruptedStream]);
        assert_eq!(parser.pending_bytes(), 0);
    }

    #[test]
    fn test_oversized_frame_is_stream_corruption() {
        let config = PumpConfig {
            max_frame_size: 16,
            ..PumpConfig::default()
        };
        let mut parser = BinaryParser::new(&config, ErrorPolicy::default());
        let mut consumer = RecordingConsumer::new();
        parser.feed(&frame(MessageType::RawData.id(), &[0; 32]));
        assert_eq!(
            parser.parse(&mut consumer).unwrap_err(),
            PumpError::FrameTooLarge { size: 33, limit: 16 }
        );
    }
}
